pub mod oracle;
pub mod pool;

use serde::Serialize;

use crate::time::UnixMillis;

pub use oracle::PriceOracle;
pub use pool::PoolConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceSource {
    SwapLog,
    PoolState,
}

/// Latest fiat/ETH rate. `fiat_per_eth == 0.0` means no valid quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceQuote {
    pub fiat_per_eth: f64,
    pub derived_at: UnixMillis,
    pub source: Option<PriceSource>,
}

impl PriceQuote {
    pub fn new(fiat_per_eth: f64, derived_at: UnixMillis, source: PriceSource) -> Self {
        Self {
            fiat_per_eth,
            derived_at,
            source: Some(source),
        }
    }

    pub fn unavailable(at: UnixMillis) -> Self {
        Self {
            fiat_per_eth: 0.0,
            derived_at: at,
            source: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.fiat_per_eth > 0.0
    }
}
