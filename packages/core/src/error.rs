use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::network::NetworkId;

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("method {0} is not supported by the endpoint")]
    UnsupportedMethod(String),

    #[error("price unavailable: {0}")]
    PriceUnavailable(String),

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}

impl AppError {
    /// Classifies a JSON-RPC error object returned for `method`.
    pub fn from_rpc(method: &str, code: i64, message: String) -> Self {
        let lower = message.to_ascii_lowercase();
        if code == METHOD_NOT_FOUND
            || lower.contains("not supported")
            || lower.contains("does not exist")
        {
            AppError::UnsupportedMethod(method.to_string())
        } else {
            AppError::Rpc { code, message }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::UnknownNetwork(_) => StatusCode::NOT_FOUND,
            AppError::PriceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The network has no RPC endpoint; its poller never runs.
    Configuration,
    /// A single poll failed; cleared by the next successful poll.
    TransientFetch,
}

/// What a failed poll hands to the store in place of a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    pub fn configuration(network: NetworkId) -> Self {
        Self {
            kind: FaultKind::Configuration,
            message: format!(
                "RPC URL for {} not configured (set {})",
                network.display_name(),
                network.rpc_env_var()
            ),
        }
    }

    pub fn transient(err: &AppError) -> Self {
        Self {
            kind: FaultKind::TransientFetch,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_not_found_is_unsupported() {
        let err = AppError::from_rpc("eth_maxPriorityFeePerGas", -32601, "Method not found".into());
        assert!(matches!(err, AppError::UnsupportedMethod(ref m) if m == "eth_maxPriorityFeePerGas"));
    }

    #[test]
    fn unsupported_message_is_unsupported_regardless_of_code() {
        let err = AppError::from_rpc(
            "eth_maxPriorityFeePerGas",
            -32000,
            "the method eth_maxPriorityFeePerGas does not exist/is not available".into(),
        );
        assert!(matches!(err, AppError::UnsupportedMethod(_)));
    }

    #[test]
    fn unavailable_data_is_not_an_unsupported_method() {
        let err = AppError::from_rpc("eth_getLogs", -32000, "header not available".into());
        assert!(matches!(err, AppError::Rpc { code: -32000, .. }));
    }

    #[test]
    fn other_rpc_errors_keep_code_and_message() {
        let err = AppError::from_rpc("eth_getLogs", -32005, "query returned more than 10000 results".into());
        match err {
            AppError::Rpc { code, message } => {
                assert_eq!(code, -32005);
                assert!(message.contains("10000"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(AppError::UnknownNetwork("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::PriceUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::Network("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn configuration_fault_names_the_env_var() {
        let fault = Fault::configuration(NetworkId::Polygon);
        assert_eq!(fault.kind, FaultKind::Configuration);
        assert!(fault.message.contains("Polygon"));
        assert!(fault.message.contains("POLYGON_RPC_HTTP"));
    }

    #[test]
    fn transient_fault_carries_error_text() {
        let fault = Fault::transient(&AppError::Network("connection reset".into()));
        assert_eq!(fault.kind, FaultKind::TransientFetch);
        assert_eq!(fault.message, "network error: connection reset");
    }
}
