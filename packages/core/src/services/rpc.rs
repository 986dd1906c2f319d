use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use crate::error::AppError;

/// The fee-relevant part of a block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    /// Present only on fee-market (EIP-1559) networks.
    pub base_fee_per_gas: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topics: Vec<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
}

/// The node primitives pollers and the price oracle rely on.
///
/// Quantities are returned in wei.
#[async_trait]
pub trait RpcClient: Send + Sync + std::fmt::Debug {
    async fn block_number(&self) -> Result<u64, AppError>;

    async fn block_by_number(&self, number: u64) -> Result<BlockHeader, AppError>;

    async fn gas_price(&self) -> Result<U256, AppError>;

    /// May fail with [`AppError::UnsupportedMethod`] on nodes without EIP-1559 helpers.
    async fn max_priority_fee_per_gas(&self) -> Result<U256, AppError>;

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, AppError>;

    /// `eth_call` against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, AppError>;
}
