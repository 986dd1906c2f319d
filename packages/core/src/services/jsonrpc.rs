use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::services::rpc::{BlockHeader, Log, LogFilter, RpcClient};

/// JSON-RPC 2.0 over HTTP POST.
#[derive(Debug)]
pub struct JsonRpcClient {
    url: String,
    http: Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: String) -> Self {
        Self {
            url,
            http: Client::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Header fields we read; quantities decode from `0x` hex via alloy's serde.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlock {
    number: U64,
    #[serde(default)]
    base_fee_per_gas: Option<U256>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    log_index: Option<U64>,
}

impl From<RawLog> for Log {
    fn from(raw: RawLog) -> Self {
        Log {
            address: raw.address,
            topics: raw.topics,
            data: raw.data,
            block_number: raw.block_number.map(|n| n.to::<u64>()),
            log_index: raw.log_index.map(|i| i.to::<u64>()),
        }
    }
}

impl JsonRpcClient {
    /// Sends one request. `Ok(None)` is a `null` result.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, AppError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "RPC endpoint returned HTTP {} for {}",
                response.status(),
                method
            )));
        }

        let envelope = response
            .json::<RpcEnvelope<T>>()
            .await
            .map_err(|err| AppError::Parse(err.to_string()))?;

        match envelope.error {
            Some(err) => Err(AppError::from_rpc(method, err.code, err.message)),
            None => Ok(envelope.result),
        }
    }

    async fn request_required<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, AppError> {
        self.request(method, params)
            .await?
            .ok_or_else(|| AppError::Parse(format!("{method} returned a null result")))
    }
}

#[async_trait]
impl RpcClient for JsonRpcClient {
    async fn block_number(&self) -> Result<u64, AppError> {
        let number: U64 = self.request_required("eth_blockNumber", json!([])).await?;
        Ok(number.to())
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockHeader, AppError> {
        let block: RawBlock = self
            .request("eth_getBlockByNumber", json!([U64::from(number), false]))
            .await?
            .ok_or_else(|| AppError::Parse(format!("block {number} not found")))?;

        Ok(BlockHeader {
            number: block.number.to(),
            base_fee_per_gas: block.base_fee_per_gas,
        })
    }

    async fn gas_price(&self) -> Result<U256, AppError> {
        self.request_required("eth_gasPrice", json!([])).await
    }

    async fn max_priority_fee_per_gas(&self) -> Result<U256, AppError> {
        self.request_required("eth_maxPriorityFeePerGas", json!([])).await
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, AppError> {
        let params = json!([{
            "address": filter.address,
            "topics": filter.topics,
            "fromBlock": U64::from(filter.from_block),
            "toBlock": U64::from(filter.to_block),
        }]);

        let logs: Vec<RawLog> = self.request("eth_getLogs", params).await?.unwrap_or_default();
        Ok(logs.into_iter().map(Log::from).collect())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, AppError> {
        self.request_required("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }
}
