//! RPC endpoint configuration
//!
//! Resolved from the environment following Ethereum ecosystem conventions:
//! 1. Per-chain env vars (ETH_RPC_URL, ARBITRUM_RPC_URL, ...) - highest priority
//! 2. Provider API keys (ALCHEMY_API_KEY, INFURA_API_KEY) - builds URLs automatically
//! 3. Public RPC fallbacks - rate limited, for testing only

use std::collections::HashMap;

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const ARBITRUM: u64 = 42161;
    pub const OPTIMISM: u64 = 10;
    pub const BASE: u64 = 8453;
}

/// Provider API key environment variables
mod env_vars {
    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
    pub const INFURA_API_KEY: &str = "INFURA_API_KEY";
}

/// Per-chain endpoint naming: (chain id, env var, alchemy slug, infura slug, public URL)
///
/// Infura has no Base endpoint; that chain relies on the other sources.
const CHAIN_TABLE: &[(u64, &str, &str, Option<&str>, &str)] = &[
    (
        chains::ETHEREUM,
        "ETH_RPC_URL",
        "eth-mainnet",
        Some("mainnet"),
        "https://eth.llamarpc.com",
    ),
    (
        chains::ARBITRUM,
        "ARBITRUM_RPC_URL",
        "arb-mainnet",
        Some("arbitrum-mainnet"),
        "https://arb1.arbitrum.io/rpc",
    ),
    (
        chains::OPTIMISM,
        "OPTIMISM_RPC_URL",
        "opt-mainnet",
        Some("optimism-mainnet"),
        "https://mainnet.optimism.io",
    ),
    (
        chains::BASE,
        "BASE_RPC_URL",
        "base-mainnet",
        None,
        "https://mainnet.base.org",
    ),
];

/// RPC configuration for the supported chains
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// RPC URLs indexed by chain ID
    urls: HashMap<u64, String>,
}

impl RpcConfig {
    /// Create RPC config from environment variables
    pub fn from_env() -> Self {
        let mut urls = HashMap::new();

        for (chain_id, var, _, _, _) in CHAIN_TABLE {
            if let Ok(url) = std::env::var(var) {
                tracing::debug!(chain_id, "using {} from environment", var);
                urls.insert(*chain_id, url);
            }
        }

        if urls.is_empty() {
            if let Ok(key) = std::env::var(env_vars::ALCHEMY_API_KEY) {
                tracing::info!("building RPC URLs from ALCHEMY_API_KEY");
                for (chain_id, _, alchemy, _, _) in CHAIN_TABLE {
                    urls.insert(
                        *chain_id,
                        format!("https://{}.g.alchemy.com/v2/{}", alchemy, key),
                    );
                }
            }
        }

        if urls.is_empty() {
            if let Ok(key) = std::env::var(env_vars::INFURA_API_KEY) {
                tracing::info!("building RPC URLs from INFURA_API_KEY");
                for (chain_id, _, _, infura, _) in CHAIN_TABLE {
                    if let Some(infura) = infura {
                        urls.insert(*chain_id, format!("https://{}.infura.io/v3/{}", infura, key));
                    }
                }
            }
        }

        for (chain_id, _, _, _, public) in CHAIN_TABLE {
            urls.entry(*chain_id).or_insert_with(|| {
                tracing::warn!(chain_id, "no RPC configured, using public RPC (rate limited)");
                public.to_string()
            });
        }

        Self { urls }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self { urls }
    }

    /// Get RPC URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }

    /// Check if a chain is configured
    pub fn has_chain(&self, chain_id: u64) -> bool {
        self.urls.contains_key(&chain_id)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
