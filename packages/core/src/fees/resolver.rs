//! Fee model detection.
//!
//! Networks price gas one of three ways:
//!
//! - **Fee market**: the block carries a base fee and users bid a separate
//!   priority fee on top.
//! - **Legacy**: a single gas price, no split.
//! - **Rollup surcharge**: legacy pricing plus an estimate of what the rollup
//!   pays to post its data to L1. The estimate is a flat 30% of the L2 gas
//!   price, not a calldata-level computation.

use std::future::Future;

use alloy_primitives::U256;
use serde::Serialize;

use crate::error::AppError;
use crate::network::NetworkId;

/// Used when a fee-market node cannot suggest a priority fee.
pub const DEFAULT_PRIORITY_FEE_GWEI: f64 = 1.5;

const L1_SURCHARGE_NUMERATOR: u64 = 3;
const L1_SURCHARGE_DENOMINATOR: u64 = 10;

const WEI_PER_GWEI: f64 = 1e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeModel {
    FeeMarket,
    Legacy,
    RollupSurcharge,
}

impl FeeModel {
    pub fn detect(network: NetworkId, block_base_fee: Option<U256>) -> Self {
        match block_base_fee {
            Some(_) => FeeModel::FeeMarket,
            None if network.has_l1_surcharge() => FeeModel::RollupSurcharge,
            None => FeeModel::Legacy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedFees {
    pub model: FeeModel,
    pub base_fee_gwei: f64,
    pub priority_fee_gwei: f64,
}

pub fn wei_to_gwei(wei: U256) -> f64 {
    f64::from(wei) / WEI_PER_GWEI
}

/// `gas_price + gas_price * 3 / 10`, in integer wei.
pub fn apply_l1_surcharge(gas_price: U256) -> U256 {
    let surcharge = gas_price.saturating_mul(U256::from(L1_SURCHARGE_NUMERATOR))
        / U256::from(L1_SURCHARGE_DENOMINATOR);
    gas_price.saturating_add(surcharge)
}

/// Resolves base and priority fee for one block.
///
/// `gas_price` is only awaited for blocks without a base fee and
/// `priority_fee` only for blocks with one. A failing priority-fee query is
/// absorbed into [`DEFAULT_PRIORITY_FEE_GWEI`]; a failing gas-price query is
/// returned to the caller.
pub async fn resolve<G, GF, P, PF>(
    network: NetworkId,
    block_base_fee: Option<U256>,
    gas_price: G,
    priority_fee: P,
) -> Result<ResolvedFees, AppError>
where
    G: FnOnce() -> GF,
    GF: Future<Output = Result<U256, AppError>>,
    P: FnOnce() -> PF,
    PF: Future<Output = Result<U256, AppError>>,
{
    let model = FeeModel::detect(network, block_base_fee);

    let resolved = match block_base_fee {
        Some(base_fee) => {
            let priority_fee_gwei = match priority_fee().await {
                Ok(wei) => wei_to_gwei(wei),
                Err(err) => {
                    tracing::debug!(%network, %err, "priority fee unavailable, using default");
                    DEFAULT_PRIORITY_FEE_GWEI
                }
            };
            ResolvedFees {
                model,
                base_fee_gwei: wei_to_gwei(base_fee),
                priority_fee_gwei,
            }
        }
        None => {
            let price = gas_price().await?;
            let base = match model {
                FeeModel::RollupSurcharge => apply_l1_surcharge(price),
                _ => price,
            };
            ResolvedFees {
                model,
                base_fee_gwei: wei_to_gwei(base),
                priority_fee_gwei: 0.0,
            }
        }
    };

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn gwei(value: u64) -> U256 {
        U256::from(value) * U256::from(1_000_000_000u64)
    }

    async fn ok(value: U256) -> Result<U256, AppError> {
        Ok(value)
    }

    async fn fail(err: AppError) -> Result<U256, AppError> {
        Err(err)
    }

    #[tokio::test]
    async fn rollup_surcharge_adds_thirty_percent() {
        let fees = resolve(
            NetworkId::Arbitrum,
            None,
            || ok(gwei(5)),
            || ok(U256::ZERO),
        )
        .await
        .unwrap();

        assert_eq!(fees.model, FeeModel::RollupSurcharge);
        assert_eq!(fees.base_fee_gwei, 6.5);
        assert_eq!(fees.priority_fee_gwei, 0.0);
    }

    #[tokio::test]
    async fn legacy_network_uses_gas_price_without_priority() {
        let fees = resolve(
            NetworkId::Polygon,
            None,
            || ok(gwei(30)),
            || ok(gwei(99)),
        )
        .await
        .unwrap();

        assert_eq!(fees.model, FeeModel::Legacy);
        assert_eq!(fees.base_fee_gwei, 30.0);
        assert_eq!(fees.priority_fee_gwei, 0.0);
    }

    #[tokio::test]
    async fn fee_market_uses_block_base_fee_and_suggested_priority() {
        let gas_price_called = Cell::new(false);
        let fees = resolve(
            NetworkId::Ethereum,
            Some(gwei(12)),
            || {
                gas_price_called.set(true);
                ok(gwei(1))
            },
            || ok(U256::from(2_000_000_000u64)),
        )
        .await
        .unwrap();

        assert_eq!(fees.model, FeeModel::FeeMarket);
        assert_eq!(fees.base_fee_gwei, 12.0);
        assert_eq!(fees.priority_fee_gwei, 2.0);
        assert!(!gas_price_called.get());
    }

    #[tokio::test]
    async fn failed_priority_query_falls_back_to_default() {
        let fees = resolve(
            NetworkId::Ethereum,
            Some(gwei(20)),
            || ok(U256::ZERO),
            || fail(AppError::UnsupportedMethod("eth_maxPriorityFeePerGas".into())),
        )
        .await
        .unwrap();

        assert_eq!(fees.priority_fee_gwei, 1.5);
        assert_eq!(fees.base_fee_gwei, 20.0);
    }

    #[tokio::test]
    async fn base_fee_wins_over_surcharge_flag() {
        let fees = resolve(
            NetworkId::Arbitrum,
            Some(U256::from(10_000_000u64)),
            || ok(gwei(5)),
            || ok(U256::ZERO),
        )
        .await
        .unwrap();

        assert_eq!(fees.model, FeeModel::FeeMarket);
        assert_eq!(fees.base_fee_gwei, 0.01);
    }

    #[tokio::test]
    async fn gas_price_failure_reaches_caller() {
        let result = resolve(
            NetworkId::Polygon,
            None,
            || fail(AppError::Network("timeout".into())),
            || ok(U256::ZERO),
        )
        .await;

        assert!(matches!(result, Err(AppError::Network(_))));
    }

    #[test]
    fn surcharge_is_integer_wei_math() {
        assert_eq!(apply_l1_surcharge(U256::from(10u64)), U256::from(13u64));
        assert_eq!(apply_l1_surcharge(U256::from(5u64)), U256::from(6u64));
        assert_eq!(apply_l1_surcharge(U256::MAX), U256::MAX);
    }

    #[test]
    fn wei_converts_to_gwei() {
        assert_eq!(wei_to_gwei(U256::from(1_500_000_000u64)), 1.5);
    }
}
