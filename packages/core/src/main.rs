mod api;
mod candles;
mod config;
mod error;
mod fees;
mod logging;
mod network;
mod price;
mod scheduler;
mod services;
mod simulation;
mod store;
mod time;

use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;

use crate::api::ApiState;
use crate::config::Config;
use crate::error::AppError;
use crate::logging::init_logging;
use crate::network::NetworkId;
use crate::simulation::SimulationDefaults;
use crate::store::IngestionStore;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let config = Config::from_env()
        .map_err(AppError::Config)
        .unwrap_or_else(|err| {
            tracing::error!("{}", err);
            std::process::exit(1);
        });

    tracing::info!("Gas tracker starting up");
    tracing::info!("Loaded config: {:?}", config);

    let store = Arc::new(IngestionStore::new(NetworkId::all()));
    let ingestion = scheduler::spawn_ingestion(&config, store.clone());

    let defaults = SimulationDefaults {
        gas_limit: config.sim_gas_limit,
        tx_value_eth: config.sim_tx_value_eth,
    };
    let app = api::router(ApiState::new(store, defaults));

    match TcpListener::bind(("0.0.0.0", config.api_port)).await {
        Ok(listener) => {
            tracing::info!("API listening on port {}", config.api_port);
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
            {
                tracing::error!("API server error: {}", err);
            }
        }
        Err(err) => {
            tracing::error!("Could not bind API port {}: {}", config.api_port, err);
            ingestion.shutdown().await;
            std::process::exit(1);
        }
    }

    ingestion.shutdown().await;
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received. Stopping ingestion.");
}
