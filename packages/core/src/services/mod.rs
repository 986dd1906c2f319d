pub mod jsonrpc;
pub mod rpc;

pub use jsonrpc::JsonRpcClient;
pub use rpc::RpcClient;
