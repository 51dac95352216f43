//! Account provider abstraction
//!
//! Mediates access to an externally-owned account: the session layer never
//! touches key material directly, it only receives an opaque [`SigningHandle`].
//!
//! SECURITY:
//! - Private keys live inside alloy's `PrivateKeySigner` and never leave
//!   this module except wrapped in an `EthereumWallet`
//! - Keys are never serialized and never logged; `Debug` output is redacted

mod env_key;

pub use env_key::{EnvKeyProvider, WALLET_KEY_ENV};

use crate::Result;
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Provider-pushed notification that the set of available accounts changed
///
/// An empty list means no account is available any more.
#[derive(Debug, Clone)]
pub struct AccountsChanged(pub Vec<Address>);

/// Opaque signing capability for one account
///
/// Exposes the public address and an `EthereumWallet` usable with alloy
/// providers; the raw key is not reachable through this type.
#[derive(Clone)]
pub struct SigningHandle {
    address: Address,
    wallet: EthereumWallet,
}

impl SigningHandle {
    pub fn new(address: Address, wallet: EthereumWallet) -> Self {
        Self { address, wallet }
    }

    /// Public address (safe to share)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Checksummed address string
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Wallet for use with alloy providers; exposes signing only
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

impl std::fmt::Debug for SigningHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningHandle")
            .field("address", &self.address)
            .field("wallet", &"[REDACTED]")
            .finish()
    }
}

/// External account-management capability
///
/// The contract mirrors a browser-injected EOA provider: request access to
/// accounts, obtain a signing handle, and subscribe to account-change
/// notifications. Absence of a provider in the environment is a first-class
/// condition ([`crate::Error::ProviderUnavailable`]) raised at construction,
/// not by these methods.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Request access to the provider's accounts
    ///
    /// Errors map to a rejected connection; an empty list means the provider
    /// has no account to offer.
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// Obtain the signing handle for the current account
    async fn signer(&self) -> Result<SigningHandle>;

    /// Subscribe to account-change notifications
    ///
    /// Each call returns an independent receiver; subscriptions end when the
    /// receiver is dropped.
    fn subscribe(&self) -> broadcast::Receiver<AccountsChanged>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted provider for session tests

    use super::*;
    use alloy::signers::local::PrivateKeySigner;
    use std::sync::Mutex;

    /// Test provider with a settable account list and failure switch
    pub struct MockProvider {
        accounts: Mutex<Vec<Address>>,
        handle: SigningHandle,
        reject: Mutex<bool>,
        events: broadcast::Sender<AccountsChanged>,
    }

    impl MockProvider {
        pub fn new(address: Address) -> Self {
            let signer = PrivateKeySigner::random();
            let wallet = EthereumWallet::from(signer);
            let (events, _) = broadcast::channel(8);
            Self {
                accounts: Mutex::new(vec![address]),
                handle: SigningHandle::new(address, wallet),
                reject: Mutex::new(false),
                events,
            }
        }

        /// Make subsequent `request_accounts` calls fail
        pub fn set_reject(&self, reject: bool) {
            *self.reject.lock().unwrap() = reject;
        }

        /// Replace the account list and push an accounts-changed event
        pub fn push_accounts(&self, accounts: Vec<Address>) {
            *self.accounts.lock().unwrap() = accounts.clone();
            let _ = self.events.send(AccountsChanged(accounts));
        }
    }

    #[async_trait]
    impl AccountProvider for MockProvider {
        async fn request_accounts(&self) -> Result<Vec<Address>> {
            if *self.reject.lock().unwrap() {
                return Err(crate::Error::ConnectionRejected(
                    "user denied account access".to_string(),
                ));
            }
            Ok(self.accounts.lock().unwrap().clone())
        }

        async fn signer(&self) -> Result<SigningHandle> {
            let accounts = self.accounts.lock().unwrap();
            let address = *accounts.first().ok_or(crate::Error::SignerMissing)?;
            Ok(SigningHandle::new(address, self.handle.wallet().clone()))
        }

        fn subscribe(&self) -> broadcast::Receiver<AccountsChanged> {
            self.events.subscribe()
        }
    }
}
