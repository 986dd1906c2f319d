use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The networks the tracker knows how to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Ethereum,
    Polygon,
    Arbitrum,
}

impl NetworkId {
    pub const fn all() -> [NetworkId; 3] {
        [NetworkId::Ethereum, NetworkId::Polygon, NetworkId::Arbitrum]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            NetworkId::Ethereum => "ethereum",
            NetworkId::Polygon => "polygon",
            NetworkId::Arbitrum => "arbitrum",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            NetworkId::Ethereum => "Ethereum",
            NetworkId::Polygon => "Polygon",
            NetworkId::Arbitrum => "Arbitrum",
        }
    }

    pub const fn chain_id(self) -> u64 {
        match self {
            NetworkId::Ethereum => 1,
            NetworkId::Polygon => 137,
            NetworkId::Arbitrum => 42161,
        }
    }

    /// Rollups that pay for posting their data to L1 on top of the L2 gas price.
    pub const fn has_l1_surcharge(self) -> bool {
        matches!(self, NetworkId::Arbitrum)
    }

    /// Environment variable holding this network's HTTP RPC endpoint.
    pub const fn rpc_env_var(self) -> &'static str {
        match self {
            NetworkId::Ethereum => "ETHEREUM_RPC_HTTP",
            NetworkId::Polygon => "POLYGON_RPC_HTTP",
            NetworkId::Arbitrum => "ARBITRUM_RPC_HTTP",
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NetworkId::all()
            .into_iter()
            .find(|network| network.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::UnknownNetwork(s.to_string()))
    }
}
