use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;

use crate::network::NetworkId;
use crate::price::pool::{PoolConfig, PoolOrientation, MAINNET_USDC_WETH_POOL};

const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 6;
const DEFAULT_PRICE_INTERVAL_SECONDS: u64 = 30;
const DEFAULT_API_PORT: u16 = 8080;
const DEFAULT_SIM_GAS_LIMIT: u64 = 21_000;
const DEFAULT_SIM_TX_VALUE_ETH: f64 = 0.5;

/// Runtime configuration, read from the environment (and `.env`).
///
/// A missing network endpoint is not an error here: that network is
/// reported as misconfigured in the store and its poller never starts.
#[derive(Clone)]
pub struct Config {
    pub rpc_urls: BTreeMap<NetworkId, String>,
    pub price_rpc_url: Option<String>,
    pub price_pool: PoolConfig,
    pub poll_interval_seconds: u64,
    pub price_interval_seconds: u64,
    pub api_port: u16,
    pub sim_gas_limit: u64,
    pub sim_tx_value_eth: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let rpc_urls: BTreeMap<_, _> = NetworkId::all()
            .into_iter()
            .filter_map(|network| non_empty(network.rpc_env_var()).map(|url| (network, url)))
            .collect();

        let price_rpc_url = non_empty("PRICE_RPC_HTTP")
            .or_else(|| rpc_urls.get(&NetworkId::Ethereum).cloned());

        let price_pool = PoolConfig {
            address: parse_or::<Address, _>(&non_empty, "PRICE_POOL_ADDRESS", MAINNET_USDC_WETH_POOL)?,
            orientation: parse_or(
                &non_empty,
                "PRICE_POOL_STABLECOIN_TOKEN",
                PoolOrientation::StablecoinIsToken0,
            )?,
            decimals_delta: parse_or(&non_empty, "PRICE_POOL_DECIMALS_DELTA", 12)?,
        };

        let poll_interval_seconds =
            parse_or(&non_empty, "POLL_INTERVAL_SECONDS", DEFAULT_POLL_INTERVAL_SECONDS)?;
        let price_interval_seconds =
            parse_or(&non_empty, "PRICE_INTERVAL_SECONDS", DEFAULT_PRICE_INTERVAL_SECONDS)?;
        if poll_interval_seconds == 0 || price_interval_seconds == 0 {
            return Err("polling intervals must be at least one second".into());
        }

        let sim_tx_value_eth = parse_or(&non_empty, "SIM_TX_VALUE_ETH", DEFAULT_SIM_TX_VALUE_ETH)?;
        if !sim_tx_value_eth.is_finite() || sim_tx_value_eth < 0.0 {
            return Err(format!("SIM_TX_VALUE_ETH must be a non-negative number, got {sim_tx_value_eth}"));
        }

        Ok(Self {
            rpc_urls,
            price_rpc_url,
            price_pool,
            poll_interval_seconds,
            price_interval_seconds,
            api_port: parse_or(&non_empty, "API_PORT", DEFAULT_API_PORT)?,
            sim_gas_limit: parse_or(&non_empty, "SIM_GAS_LIMIT", DEFAULT_SIM_GAS_LIMIT)?,
            sim_tx_value_eth,
        })
    }

    pub fn rpc_url(&self, network: NetworkId) -> Option<&str> {
        self.rpc_urls.get(&network).map(String::as_str)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|err| format!("invalid value for {key} ({raw:?}): {err}")),
        None => Ok(default),
    }
}

/// Keeps scheme and host, drops the path where providers put API keys.
fn redact_url(url: &str) -> String {
    let host_start = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[host_start..].find('/') {
        Some(slash) => format!("{}/***", &url[..host_start + slash]),
        None => url.to_string(),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rpc_urls: BTreeMap<_, _> = self
            .rpc_urls
            .iter()
            .map(|(network, url)| (network.as_str(), redact_url(url)))
            .collect();

        f.debug_struct("Config")
            .field("rpc_urls", &rpc_urls)
            .field("price_rpc_url", &self.price_rpc_url.as_deref().map(redact_url))
            .field("price_pool", &self.price_pool)
            .field("poll_interval_seconds", &self.poll_interval_seconds)
            .field("price_interval_seconds", &self.price_interval_seconds)
            .field("api_port", &self.api_port)
            .field("sim_gas_limit", &self.sim_gas_limit)
            .field("sim_tx_value_eth", &self.sim_tx_value_eth)
            .finish()
    }
}
