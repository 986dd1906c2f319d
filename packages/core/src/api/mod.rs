pub mod fees;

use axum::{routing::get, Router};

pub use fees::ApiState;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/fees", get(fees::current_fees))
        .route("/fees/:network/candles", get(fees::candles))
        .route("/price", get(fees::price))
        .route("/simulate/:network", get(fees::simulate))
        .with_state(state)
}
