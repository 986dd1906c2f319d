//! Shared ingestion state.
//!
//! Every network has its own lock, as does the price quote, so a writer for
//! one network never contends with another. Each public mutator takes the
//! lock once and applies its whole change under it; readers get owned
//! snapshots and never see a half-applied update.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::Serialize;

use crate::candles::CandleSeries;
use crate::error::{AppError, Fault};
use crate::fees::FeeSample;
use crate::network::NetworkId;
use crate::price::PriceQuote;
use crate::time::UnixMillis;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkState {
    pub network: NetworkId,
    pub base_fee_gwei: f64,
    pub priority_fee_gwei: f64,
    pub candles: CandleSeries,
    pub loading: bool,
    pub fault: Option<String>,
}

impl NetworkState {
    fn new(network: NetworkId) -> Self {
        Self {
            network,
            base_fee_gwei: 0.0,
            priority_fee_gwei: 0.0,
            candles: CandleSeries::new(),
            loading: true,
            fault: None,
        }
    }

    fn set_current_fees(&mut self, base_fee_gwei: f64, priority_fee_gwei: f64) {
        self.base_fee_gwei = base_fee_gwei;
        self.priority_fee_gwei = priority_fee_gwei;
    }

    fn append_sample(&mut self, sample: &FeeSample) {
        let first = self.candles.is_empty();
        let outcome = self.candles.append(sample);
        if first {
            tracing::debug!(network = %self.network, "opened first candle");
        }
        tracing::trace!(network = %self.network, ?outcome, candles = self.candles.len(), "folded sample");
    }

    fn set_fault(&mut self, fault: Option<String>) {
        self.fault = fault;
    }
}

#[derive(Debug)]
pub struct IngestionStore {
    networks: BTreeMap<NetworkId, RwLock<NetworkState>>,
    price: RwLock<PriceQuote>,
}

impl IngestionStore {
    pub fn new(networks: impl IntoIterator<Item = NetworkId>) -> Self {
        Self {
            networks: networks
                .into_iter()
                .map(|network| (network, RwLock::new(NetworkState::new(network))))
                .collect(),
            price: RwLock::new(PriceQuote::unavailable(UnixMillis(0))),
        }
    }

    fn update<R>(&self, network: NetworkId, apply: impl FnOnce(&mut NetworkState) -> R) -> Option<R> {
        match self.networks.get(&network) {
            Some(lock) => Some(apply(&mut lock.write())),
            None => {
                tracing::warn!(%network, "update for a network the store does not track");
                None
            }
        }
    }

    pub fn networks(&self) -> impl Iterator<Item = NetworkId> + '_ {
        self.networks.keys().copied()
    }

    pub fn set_loading(&self, network: NetworkId, loading: bool) {
        self.update(network, |state| state.loading = loading);
    }

    /// Marks `network` as loading until the guard is dropped.
    pub fn begin_loading(&self, network: NetworkId) -> LoadingGuard<'_> {
        self.set_loading(network, true);
        LoadingGuard { store: self, network }
    }

    /// Applies the outcome of one poll.
    ///
    /// A sample clears the fault, replaces the current fees and is folded
    /// into the candle history. A fault only replaces the fault message; the
    /// last good fees and candles stay as they were.
    pub fn record_poll(&self, network: NetworkId, outcome: Result<FeeSample, Fault>) {
        self.update(network, |state| match outcome {
            Ok(sample) => {
                state.set_fault(None);
                state.set_current_fees(sample.base_fee_gwei, sample.priority_fee_gwei);
                state.append_sample(&sample);
            }
            Err(fault) => state.set_fault(Some(fault.message)),
        });
    }

    /// For networks whose poller will never run.
    pub fn record_configuration_fault(&self, network: NetworkId) {
        let fault = Fault::configuration(network);
        tracing::warn!(%network, "{}", fault.message);
        self.update(network, |state| {
            state.set_fault(Some(fault.message));
            state.loading = false;
        });
    }

    pub fn set_price(&self, quote: PriceQuote) {
        *self.price.write() = quote;
    }

    /// Publishes a derivation result. Failures replace the quote with the
    /// unavailable sentinel instead of keeping a stale price.
    pub fn publish_price(&self, outcome: Result<PriceQuote, AppError>) {
        let quote = match outcome {
            Ok(quote) => quote,
            Err(err) => {
                tracing::error!(%err, "ETH price unavailable");
                PriceQuote::unavailable(UnixMillis::now())
            }
        };
        self.set_price(quote);
    }

    pub fn snapshot(&self, network: NetworkId) -> Option<NetworkState> {
        self.networks.get(&network).map(|lock| lock.read().clone())
    }

    pub fn snapshots(&self) -> Vec<NetworkState> {
        self.networks.values().map(|lock| lock.read().clone()).collect()
    }

    pub fn price(&self) -> PriceQuote {
        *self.price.read()
    }

    pub fn fiat_per_eth(&self) -> f64 {
        self.price.read().fiat_per_eth
    }
}

/// Clears the loading flag on drop, including when the poll is cancelled.
#[must_use = "loading is cleared as soon as the guard is dropped"]
pub struct LoadingGuard<'a> {
    store: &'a IngestionStore,
    network: NetworkId,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.set_loading(self.network, false);
    }
}
