use serde::Serialize;

const GWEI_PER_ETH: f64 = 1e9;

/// Gas limit and transferred value used when a caller does not give their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationDefaults {
    pub gas_limit: u64,
    pub tx_value_eth: f64,
}

impl Default for SimulationDefaults {
    fn default() -> Self {
        Self {
            gas_limit: 21_000,
            tx_value_eth: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEstimate {
    pub gas_limit: u64,
    pub fee_per_gas_gwei: f64,
    pub gas_cost_eth: f64,
    pub gas_cost_fiat: f64,
    pub tx_value_fiat: f64,
    pub total_fiat: f64,
}

/// Fiat cost of sending `tx_value_eth` with `gas_limit` gas at the given fees.
///
/// `None` while no price is available (`fiat_per_eth <= 0`).
pub fn simulate_cost(
    base_fee_gwei: f64,
    priority_fee_gwei: f64,
    gas_limit: u64,
    tx_value_eth: f64,
    fiat_per_eth: f64,
) -> Option<CostEstimate> {
    if fiat_per_eth <= 0.0 || !fiat_per_eth.is_finite() {
        return None;
    }

    let fee_per_gas_gwei = base_fee_gwei + priority_fee_gwei;
    let gas_cost_eth = fee_per_gas_gwei * gas_limit as f64 / GWEI_PER_ETH;
    let gas_cost_fiat = gas_cost_eth * fiat_per_eth;
    let tx_value_fiat = tx_value_eth * fiat_per_eth;

    Some(CostEstimate {
        gas_limit,
        fee_per_gas_gwei,
        gas_cost_eth,
        gas_cost_fiat,
        tx_value_fiat,
        total_fiat: gas_cost_fiat + tx_value_fiat,
    })
}
