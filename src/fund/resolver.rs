//! Vault address resolution
//!
//! One read-only contract call: ask a fund's controller for its paired
//! vault. This is the only piece of the protocol ABI this crate speaks.

use crate::{Error, Result};
use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

/// Resolves a fund controller to its vault address
#[async_trait]
pub trait VaultResolver: Send + Sync {
    async fn resolve_vault(&self, controller: Address) -> Result<Address>;
}

/// Selector of the controller's `getVaultProxy()` view function
const GET_VAULT_PROXY_SELECTOR: [u8; 4] = [0xc9, 0x80, 0x91, 0x87];

/// Resolver backed by an `eth_call` against a JSON-RPC endpoint
pub struct ComptrollerResolver {
    rpc_url: String,
}

impl ComptrollerResolver {
    pub fn new(rpc_url: String) -> Self {
        Self { rpc_url }
    }

    /// Build from the RPC config for a specific chain
    pub fn from_rpc_config(rpc_config: &crate::config::RpcConfig, chain_id: u64) -> Result<Self> {
        let rpc_url = rpc_config
            .get(chain_id)
            .ok_or_else(|| Error::Config(format!("no RPC URL configured for chain {}", chain_id)))?
            .to_string();
        Ok(Self::new(rpc_url))
    }
}

#[async_trait]
impl VaultResolver for ComptrollerResolver {
    async fn resolve_vault(&self, controller: Address) -> Result<Address> {
        let url: url::Url = self
            .rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("invalid RPC URL: {}", e)))?;

        let provider = ProviderBuilder::new().connect_http(url);

        let tx = TransactionRequest::default()
            .to(controller)
            .input(Bytes::from(GET_VAULT_PROXY_SELECTOR.to_vec()).into());

        let result = provider
            .call(tx)
            .await
            .map_err(|e| Error::FundLoad(format!("getVaultProxy call failed: {}", e)))?;

        // Return data is one ABI word: the address right-aligned in 32 bytes
        if result.len() < 32 {
            return Err(Error::FundLoad(format!(
                "short return data from controller {}: {} bytes",
                controller,
                result.len()
            )));
        }
        let vault = Address::from_slice(&result[12..32]);
        if vault == Address::ZERO {
            return Err(Error::FundLoad(format!(
                "controller {} resolved to the zero address",
                controller
            )));
        }
        Ok(vault)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted resolver for session tests

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Test resolver with per-controller routes, optional delays, and a
    /// call counter
    #[derive(Default)]
    pub struct MockResolver {
        routes: Mutex<HashMap<Address, std::result::Result<Address, String>>>,
        delays: Mutex<HashMap<Address, Duration>>,
        calls: AtomicUsize,
    }

    impl MockResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(&self, controller: Address, vault: Address) {
            self.routes.lock().unwrap().insert(controller, Ok(vault));
        }

        pub fn fail(&self, controller: Address, reason: &str) {
            self.routes
                .lock()
                .unwrap()
                .insert(controller, Err(reason.to_string()));
        }

        pub fn delay(&self, controller: Address, delay: Duration) {
            self.delays.lock().unwrap().insert(controller, delay);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VaultResolver for MockResolver {
        async fn resolve_vault(&self, controller: Address) -> Result<Address> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let delay = self.delays.lock().unwrap().get(&controller).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let route = self.routes.lock().unwrap().get(&controller).cloned();
            match route {
                Some(Ok(vault)) => Ok(vault),
                Some(Err(reason)) => Err(Error::FundLoad(reason)),
                None => Err(Error::FundLoad(format!("unknown controller {}", controller))),
            }
        }
    }
}
