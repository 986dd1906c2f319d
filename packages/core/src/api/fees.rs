use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::candles::Candle;
use crate::error::AppError;
use crate::network::NetworkId;
use crate::price::PriceQuote;
use crate::simulation::{simulate_cost, CostEstimate, SimulationDefaults};
use crate::store::{IngestionStore, NetworkState};
use crate::time::UnixSeconds;

/// Shared state for the fee routes.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<IngestionStore>,
    pub defaults: SimulationDefaults,
}

impl ApiState {
    pub fn new(store: Arc<IngestionStore>, defaults: SimulationDefaults) -> Self {
        Self { store, defaults }
    }
}

#[derive(Debug, Serialize)]
pub struct NetworkFeeResponse {
    pub network: NetworkId,
    pub display_name: &'static str,
    pub base_fee_gwei: f64,
    pub priority_fee_gwei: f64,
    pub total_fee_gwei: f64,
    pub loading: bool,
    pub fault: Option<String>,
    pub candle_count: usize,
    pub latest_candle: Option<Candle>,
}

impl From<NetworkState> for NetworkFeeResponse {
    fn from(state: NetworkState) -> Self {
        Self {
            network: state.network,
            display_name: state.network.display_name(),
            base_fee_gwei: state.base_fee_gwei,
            priority_fee_gwei: state.priority_fee_gwei,
            total_fee_gwei: state.base_fee_gwei + state.priority_fee_gwei,
            loading: state.loading,
            fault: state.fault,
            candle_count: state.candles.len(),
            latest_candle: state.candles.last().cloned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentFeeResponse {
    pub networks: Vec<NetworkFeeResponse>,
    pub fiat_per_eth: f64,
}

/// One candle in the shape chart widgets expect: time in epoch seconds.
#[derive(Debug, Serialize)]
pub struct ChartPoint {
    pub time: UnixSeconds,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SimulateParams {
    pub gas_limit: Option<u64>,
    pub value_eth: Option<f64>,
}

fn network_state(store: &IngestionStore, slug: &str) -> Result<NetworkState, AppError> {
    let network: NetworkId = slug.parse()?;
    store
        .snapshot(network)
        .ok_or_else(|| AppError::UnknownNetwork(slug.to_string()))
}

pub async fn current_fees(State(state): State<ApiState>) -> Json<CurrentFeeResponse> {
    Json(CurrentFeeResponse {
        networks: state.store.snapshots().into_iter().map(Into::into).collect(),
        fiat_per_eth: state.store.fiat_per_eth(),
    })
}

pub async fn candles(
    State(state): State<ApiState>,
    Path(network): Path<String>,
) -> Result<Json<Vec<ChartPoint>>, AppError> {
    let snapshot = network_state(&state.store, &network)?;

    // Bucket starts are multiples of the bucket width, so every candle converts.
    let points = snapshot
        .candles
        .iter()
        .filter_map(|candle| {
            Some(ChartPoint {
                time: candle.bucket_start.checked_to_seconds()?,
                open: candle.open,
                high: candle.high,
                low: candle.low,
                close: candle.close,
            })
        })
        .collect();

    Ok(Json(points))
}

pub async fn price(State(state): State<ApiState>) -> Result<Json<PriceQuote>, AppError> {
    let quote = state.store.price();
    if !quote.is_available() {
        return Err(AppError::PriceUnavailable("fetching ETH price".into()));
    }
    Ok(Json(quote))
}

pub async fn simulate(
    State(state): State<ApiState>,
    Path(network): Path<String>,
    Query(params): Query<SimulateParams>,
) -> Result<Json<CostEstimate>, AppError> {
    let snapshot = network_state(&state.store, &network)?;

    simulate_cost(
        snapshot.base_fee_gwei,
        snapshot.priority_fee_gwei,
        params.gas_limit.unwrap_or(state.defaults.gas_limit),
        params.value_eth.unwrap_or(state.defaults.tx_value_eth),
        state.store.fiat_per_eth(),
    )
    .map(Json)
    .ok_or_else(|| AppError::PriceUnavailable("fetching ETH price".into()))
}
