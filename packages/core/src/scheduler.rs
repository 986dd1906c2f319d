use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::fees::ChainPoller;
use crate::price::PriceOracle;
use crate::services::{JsonRpcClient, RpcClient};
use crate::store::IngestionStore;

#[derive(Debug, Clone, Copy)]
pub struct Intervals {
    pub poll: Duration,
    pub price: Duration,
}

impl Intervals {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll: Duration::from_secs(config.poll_interval_seconds),
            price: Duration::from_secs(config.price_interval_seconds),
        }
    }
}

// ============================================================
// POLLING LOOPS
// ============================================================

/// Ticks immediately, then every `period`, until cancelled. A cycle still
/// in flight when cancellation arrives is dropped.
async fn run_every<F, Fut>(period: Duration, cancel: CancellationToken, mut cycle: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = cycle() => {}
                }
            }
        }
    }
}

async fn run_fee_polling(
    poller: ChainPoller,
    store: Arc<IngestionStore>,
    period: Duration,
    cancel: CancellationToken,
) {
    let network = poller.network();
    tracing::info!(
        %network,
        chain_id = network.chain_id(),
        "Fee polling started (interval: {}s)",
        period.as_secs_f64()
    );

    run_every(period, cancel, || poller.run_once(&store)).await;

    tracing::info!(%network, "Fee polling stopped cleanly");
}

async fn run_price_polling(
    oracle: PriceOracle,
    store: Arc<IngestionStore>,
    period: Duration,
    cancel: CancellationToken,
) {
    tracing::info!("Price polling started (interval: {}s)", period.as_secs_f64());

    run_every(period, cancel, || oracle.run_once(&store)).await;

    tracing::info!("Price polling stopped cleanly");
}

// ============================================================
// LIFECYCLE
// ============================================================

/// Owns every polling task. [`IngestionHandle::shutdown`] stops them all.
#[derive(Debug)]
pub struct IngestionHandle {
    cancel: CancellationToken,
    tasks: Mutex<Option<JoinSet<()>>>,
}

impl IngestionHandle {
    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.tasks.lock().is_some()
    }

    /// Cancels every task and waits for them to finish. Later calls return
    /// immediately.
    pub async fn shutdown(&self) {
        let Some(mut tasks) = self.tasks.lock().take() else {
            return;
        };

        self.cancel.cancel();
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    tracing::warn!(%err, "polling task panicked");
                }
            }
        }

        tracing::info!("Ingestion stopped");
    }
}

impl Drop for IngestionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawns one task per poller plus one for the oracle.
pub fn spawn(
    pollers: Vec<ChainPoller>,
    oracle: PriceOracle,
    store: Arc<IngestionStore>,
    intervals: Intervals,
) -> IngestionHandle {
    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();

    for poller in pollers {
        tasks.spawn(run_fee_polling(poller, store.clone(), intervals.poll, cancel.child_token()));
    }
    tasks.spawn(run_price_polling(oracle, store, intervals.price, cancel.child_token()));

    IngestionHandle {
        cancel,
        tasks: Mutex::new(Some(tasks)),
    }
}

/// Wires pollers to their configured endpoints. Networks without one get a
/// configuration fault and no task.
pub fn spawn_ingestion(config: &Config, store: Arc<IngestionStore>) -> IngestionHandle {
    let networks: Vec<_> = store.networks().collect();
    let mut pollers = Vec::with_capacity(networks.len());

    for network in networks {
        match config.rpc_url(network) {
            Some(url) => {
                let client: Arc<dyn RpcClient> = Arc::new(JsonRpcClient::new(url.to_string()));
                pollers.push(ChainPoller::new(network, client));
            }
            None => store.record_configuration_fault(network),
        }
    }

    let price_client = config
        .price_rpc_url
        .clone()
        .map(|url| Arc::new(JsonRpcClient::new(url)) as Arc<dyn RpcClient>);
    if price_client.is_none() {
        tracing::warn!("No Ethereum RPC configured; ETH price will stay unavailable");
    }

    let oracle = PriceOracle::new(price_client, config.price_pool);
    spawn(pollers, oracle, store, Intervals::from_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::poller::tests::FakeNode;
    use crate::network::NetworkId;
    use crate::price::PoolConfig;
    use std::sync::atomic::Ordering;

    const INTERVALS: Intervals = Intervals {
        poll: Duration::from_secs(6),
        price: Duration::from_secs(30),
    };

    fn no_price() -> PriceOracle {
        PriceOracle::new(None, PoolConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn polls_immediately_then_on_interval_until_shutdown() {
        let node = Arc::new(FakeNode::fee_market(10, Some(1)));
        let store = Arc::new(IngestionStore::new(NetworkId::all()));
        let poller = ChainPoller::new(NetworkId::Ethereum, node.clone());

        let handle = spawn(vec![poller], no_price(), store.clone(), INTERVALS);

        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(node.polls.load(Ordering::SeqCst), 1);
        assert_eq!(store.snapshot(NetworkId::Ethereum).unwrap().base_fee_gwei, 10.0);

        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(node.polls.load(Ordering::SeqCst), 2);

        handle.shutdown().await;
        assert!(!handle.is_running());

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(node.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_network_does_not_delay_others() {
        let healthy = Arc::new(FakeNode::fee_market(10, Some(1)));
        let stalled = Arc::new(FakeNode {
            delay: Duration::from_secs(3_600),
            ..FakeNode::legacy(5)
        });
        let store = Arc::new(IngestionStore::new(NetworkId::all()));
        let pollers = vec![
            ChainPoller::new(NetworkId::Ethereum, healthy.clone()),
            ChainPoller::new(NetworkId::Arbitrum, stalled.clone()),
        ];

        let handle = spawn(pollers, no_price(), store.clone(), INTERVALS);
        time::sleep(Duration::from_secs(13)).await;

        assert_eq!(healthy.polls.load(Ordering::SeqCst), 3);
        assert_eq!(stalled.polls.load(Ordering::SeqCst), 1);
        assert!(store.snapshot(NetworkId::Arbitrum).unwrap().loading);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_mid_poll_clears_loading() {
        let stalled = Arc::new(FakeNode {
            delay: Duration::from_secs(3_600),
            ..FakeNode::legacy(5)
        });
        let store = Arc::new(IngestionStore::new(NetworkId::all()));
        let poller = ChainPoller::new(NetworkId::Polygon, stalled);

        let handle = spawn(vec![poller], no_price(), store.clone(), INTERVALS);
        time::sleep(Duration::from_millis(1)).await;
        assert!(store.snapshot(NetworkId::Polygon).unwrap().loading);

        handle.shutdown().await;
        assert!(!store.snapshot(NetworkId::Polygon).unwrap().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_ingestion_faults_and_shuts_down_twice() {
        let config = Config::from_lookup(|_| None).unwrap();
        let store = Arc::new(IngestionStore::new(NetworkId::all()));

        let handle = spawn_ingestion(&config, store.clone());
        time::sleep(Duration::from_millis(1)).await;

        for state in store.snapshots() {
            assert!(!state.loading);
            assert!(state.fault.is_some());
        }
        assert_eq!(store.fiat_per_eth(), 0.0);

        handle.shutdown().await;
        handle.shutdown().await;
        assert!(!handle.is_running());
    }
}
