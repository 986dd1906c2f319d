use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::AppError;
use crate::price::pool::{self, PoolConfig, SWAP_EVENT_TOPIC};
use crate::price::{PriceQuote, PriceSource};
use crate::services::rpc::{LogFilter, RpcClient};
use crate::store::IngestionStore;
use crate::time::UnixMillis;

/// How far back the swap-log scan looks.
pub const SWAP_LOOKBACK_BLOCKS: u64 = 50;

pub const MIN_PLAUSIBLE_FIAT_PER_ETH: f64 = 100.0;
pub const MAX_PLAUSIBLE_FIAT_PER_ETH: f64 = 100_000.0;

/// Derives fiat/ETH from a Uniswap V3 pool.
///
/// The most recent Swap log in the lookback window is preferred; when there
/// is none, or it cannot be read, the pool's `slot0` is used instead.
#[derive(Debug, Clone)]
pub struct PriceOracle {
    client: Option<Arc<dyn RpcClient>>,
    pool: PoolConfig,
}

pub fn ensure_plausible(fiat_per_eth: f64) -> Result<f64, AppError> {
    if (MIN_PLAUSIBLE_FIAT_PER_ETH..=MAX_PLAUSIBLE_FIAT_PER_ETH).contains(&fiat_per_eth) {
        Ok(fiat_per_eth)
    } else {
        Err(AppError::PriceUnavailable(format!(
            "derived price {fiat_per_eth} is outside [{MIN_PLAUSIBLE_FIAT_PER_ETH}, {MAX_PLAUSIBLE_FIAT_PER_ETH}]"
        )))
    }
}

impl PriceOracle {
    pub fn new(client: Option<Arc<dyn RpcClient>>, pool: PoolConfig) -> Self {
        Self { client, pool }
    }

    #[instrument(skip(self), name = "price_oracle")]
    pub async fn derive_fiat_per_eth(&self) -> Result<PriceQuote, AppError> {
        let client = self
            .client
            .as_deref()
            .ok_or_else(|| AppError::PriceUnavailable("price RPC endpoint not configured".into()))?;

        let (fiat_per_eth, source) = match self.price_from_swap_logs(client).await {
            Ok(Some(price)) if price > 0.0 => (price, PriceSource::SwapLog),
            Ok(_) => {
                debug!("no usable swap in the last {SWAP_LOOKBACK_BLOCKS} blocks, reading pool state");
                (self.price_from_pool_state(client).await?, PriceSource::PoolState)
            }
            Err(err) => {
                warn!(%err, "swap log scan failed, reading pool state");
                (self.price_from_pool_state(client).await?, PriceSource::PoolState)
            }
        };

        let fiat_per_eth = ensure_plausible(fiat_per_eth)?;
        debug!(fiat_per_eth, ?source, "derived ETH price");
        Ok(PriceQuote::new(fiat_per_eth, UnixMillis::now(), source))
    }

    /// `Ok(None)` when the window holds no swaps.
    async fn price_from_swap_logs(&self, client: &dyn RpcClient) -> Result<Option<f64>, AppError> {
        let latest = client.block_number().await?;
        let filter = LogFilter {
            address: self.pool.address,
            topics: vec![SWAP_EVENT_TOPIC],
            from_block: latest.saturating_sub(SWAP_LOOKBACK_BLOCKS),
            to_block: latest,
        };

        let logs = client.get_logs(&filter).await?;
        let Some(newest) = logs
            .iter()
            .filter(|log| log.address == self.pool.address && log.topics.first() == Some(&SWAP_EVENT_TOPIC))
            .max_by_key(|log| (log.block_number, log.log_index))
        else {
            return Ok(None);
        };

        let sqrt_price = pool::decode_swap_sqrt_price(&newest.data)?;
        Ok(Some(self.pool.fiat_per_eth(sqrt_price)))
    }

    async fn price_from_pool_state(&self, client: &dyn RpcClient) -> Result<f64, AppError> {
        let output = client
            .call(self.pool.address, pool::slot0_calldata())
            .await
            .map_err(|err| AppError::PriceUnavailable(format!("pool state read failed: {err}")))?;

        let sqrt_price = pool::decode_slot0_sqrt_price(&output)
            .map_err(|err| AppError::PriceUnavailable(format!("pool state undecodable: {err}")))?;
        Ok(self.pool.fiat_per_eth(sqrt_price))
    }

    /// One oracle cycle: derive, then publish the quote or the sentinel.
    pub async fn run_once(&self, store: &IngestionStore) {
        let outcome = self.derive_fiat_per_eth().await;
        store.publish_price(outcome);
    }
}
