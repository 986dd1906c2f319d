pub mod poller;
pub mod resolver;

use serde::Serialize;

use crate::network::NetworkId;
use crate::time::UnixMillis;

pub use poller::ChainPoller;
pub use resolver::resolve;

/// One successful fee observation. Fees are in Gwei.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeeSample {
    pub network: NetworkId,
    pub observed_at: UnixMillis,
    pub base_fee_gwei: f64,
    pub priority_fee_gwei: f64,
}

impl FeeSample {
    pub fn new(
        network: NetworkId,
        observed_at: UnixMillis,
        base_fee_gwei: f64,
        priority_fee_gwei: f64,
    ) -> Self {
        Self {
            network,
            observed_at,
            base_fee_gwei,
            priority_fee_gwei,
        }
    }

    /// The value charted in candles.
    pub fn total_gwei(&self) -> f64 {
        self.base_fee_gwei + self.priority_fee_gwei
    }
}
