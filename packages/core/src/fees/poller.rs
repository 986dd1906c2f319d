use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::{AppError, Fault};
use crate::fees::{resolve, FeeSample};
use crate::network::NetworkId;
use crate::services::rpc::RpcClient;
use crate::store::IngestionStore;
use crate::time::UnixMillis;

/// Samples one network's fees through its own RPC endpoint.
#[derive(Debug, Clone)]
pub struct ChainPoller {
    network: NetworkId,
    client: Arc<dyn RpcClient>,
}

impl ChainPoller {
    pub fn new(network: NetworkId, client: Arc<dyn RpcClient>) -> Self {
        Self { network, client }
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    /// Latest block, then fee resolution. Never touches the store.
    pub async fn poll(&self) -> Result<FeeSample, Fault> {
        match self.fetch().await {
            Ok(sample) => {
                debug!(
                    network = %self.network,
                    base_fee_gwei = sample.base_fee_gwei,
                    priority_fee_gwei = sample.priority_fee_gwei,
                    "polled fees"
                );
                Ok(sample)
            }
            Err(err) => {
                warn!(network = %self.network, %err, "fee poll failed");
                Err(Fault::transient(&err))
            }
        }
    }

    async fn fetch(&self) -> Result<FeeSample, AppError> {
        let number = self.client.block_number().await?;
        let block = self.client.block_by_number(number).await?;

        let fees = resolve(
            self.network,
            block.base_fee_per_gas,
            || self.client.gas_price(),
            || self.client.max_priority_fee_per_gas(),
        )
        .await?;
        debug!(network = %self.network, model = ?fees.model, block = block.number, "resolved fee model");

        Ok(FeeSample::new(
            self.network,
            UnixMillis::now(),
            fees.base_fee_gwei,
            fees.priority_fee_gwei,
        ))
    }

    /// One poll cycle against the store. Loading is held for the duration
    /// of the poll and released even if this future is dropped mid-flight.
    #[instrument(skip_all, fields(network = %self.network))]
    pub async fn run_once(&self, store: &IngestionStore) {
        let _loading = store.begin_loading(self.network);
        let outcome = self.poll().await;
        store.record_poll(self.network, outcome);
    }
}
