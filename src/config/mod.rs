//! Configuration for the fund session layer

pub mod rpc;

pub use rpc::RpcConfig;

use crate::provider::WALLET_KEY_ENV;
use serde::{Deserialize, Serialize};

/// Supported networks for the fund protocol deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Arbitrum,
    Optimism,
    Base,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Arbitrum => 42161,
            Network::Optimism => 10,
            Network::Base => 8453,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Arbitrum => "arbitrum",
            Network::Optimism => "optimism",
            Network::Base => "base",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "ethereum" | "mainnet" => Ok(Network::Ethereum),
            "arbitrum" => Ok(Network::Arbitrum),
            "optimism" => Ok(Network::Optimism),
            "base" => Ok(Network::Base),
            other => Err(crate::Error::Config(format!("unknown network '{}'", other))),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network the fund protocol is deployed on
    pub network: Network,
    /// Environment variable holding the wallet private key
    pub wallet_key_env: String,
    /// Path of the persisted session file
    pub state_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Ethereum,
            wallet_key_env: WALLET_KEY_ENV.to_string(),
            state_file: "fund-session.json".to_string(),
        }
    }
}
