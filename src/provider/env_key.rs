//! Environment-backed account provider
//!
//! Headless stand-in for a browser-injected wallet: the account is derived
//! from a hex private key held in an environment variable. Exactly one
//! account, no interactive approval prompt.

use super::{AccountProvider, AccountsChanged, SigningHandle};
use crate::{Error, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Default environment variable holding the wallet's private key
pub const WALLET_KEY_ENV: &str = "FUND_WALLET_KEY";

/// Account provider backed by a private key from the environment
pub struct EnvKeyProvider {
    address: Address,
    wallet: EthereumWallet,
    events: broadcast::Sender<AccountsChanged>,
}

impl EnvKeyProvider {
    /// Detect the provider in the current environment
    ///
    /// Fails with [`Error::ProviderUnavailable`] when the default key
    /// variable is not set — the analogue of "no wallet installed".
    pub fn detect() -> Result<Self> {
        Self::from_env(WALLET_KEY_ENV)
    }

    /// Build from a named environment variable containing a hex private key
    pub fn from_env(var_name: &str) -> Result<Self> {
        let key_hex = std::env::var(var_name).map_err(|_| Error::ProviderUnavailable)?;
        Self::from_hex(&key_hex)
    }

    /// Build from a hex-encoded private key
    ///
    /// The original string should be dropped promptly by the caller.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| Error::ConnectionRejected(format!("invalid private key: {}", e)))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer);
        let (events, _) = broadcast::channel(8);

        Ok(Self {
            address,
            wallet,
            events,
        })
    }

    /// Push an account-change notification to subscribers
    ///
    /// Used by key-rotation tooling and tests; the provider itself never
    /// changes accounts spontaneously.
    pub fn push_accounts(&self, accounts: Vec<Address>) {
        let _ = self.events.send(AccountsChanged(accounts));
    }
}

impl std::fmt::Debug for EnvKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvKeyProvider")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl AccountProvider for EnvKeyProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        Ok(vec![self.address])
    }

    async fn signer(&self) -> Result<SigningHandle> {
        Ok(SigningHandle::new(self.address, self.wallet.clone()))
    }

    fn subscribe(&self) -> broadcast::Receiver<AccountsChanged> {
        self.events.subscribe()
    }
}
