//! Wallet session
//!
//! Owns connectivity to exactly one externally-owned account at a time and
//! exposes it as a capability: address plus signing handle, tagged with the
//! user-chosen role. Connection state lives only in memory; every process
//! start begins disconnected.

use crate::provider::{AccountProvider, AccountsChanged, SigningHandle};
use crate::{Error, Result};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// User-selected persona
///
/// Only affects which workflows the caller offers; it is not verified
/// against any on-chain permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Investor,
    Manager,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Investor => "investor",
            Role::Manager => "manager",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "investor" => Ok(Role::Investor),
            "manager" => Ok(Role::Manager),
            other => Err(Error::Config(format!(
                "unknown role '{}', expected 'investor' or 'manager'",
                other
            ))),
        }
    }
}

/// Snapshot of the wallet session state
///
/// Invariant: `connected` is true iff `address` and `signer` are both set.
/// `role` may be `None` only when disconnected.
#[derive(Debug, Clone, Default)]
pub struct WalletState {
    pub connected: bool,
    pub address: Option<Address>,
    pub role: Option<Role>,
    pub signer: Option<SigningHandle>,
}

struct WalletCore {
    state: RwLock<WalletState>,
    provider: Arc<dyn AccountProvider>,
}

impl WalletCore {
    async fn connect(&self, role: Role) -> Result<Address> {
        let accounts = self.provider.request_accounts().await.map_err(|e| match e {
            Error::ProviderUnavailable | Error::ConnectionRejected(_) => e,
            other => Error::ConnectionRejected(other.to_string()),
        })?;
        if accounts.is_empty() {
            return Err(Error::ConnectionRejected(
                "provider returned no accounts".to_string(),
            ));
        }

        let signer = self
            .provider
            .signer()
            .await
            .map_err(|e| Error::ConnectionRejected(e.to_string()))?;
        let address = signer.address();

        let mut state = self.state.write().await;
        *state = WalletState {
            connected: true,
            address: Some(address),
            role: Some(role),
            signer: Some(signer),
        };
        Ok(address)
    }

    async fn disconnect(&self) {
        let mut state = self.state.write().await;
        *state = WalletState::default();
    }

    /// React to a provider account-change push
    async fn on_accounts_changed(&self, accounts: Vec<Address>) {
        if accounts.is_empty() {
            tracing::info!("provider reports no accounts, disconnecting wallet");
            self.disconnect().await;
            return;
        }

        let (current, role) = {
            let state = self.state.read().await;
            (state.address, state.role)
        };
        if current == Some(accounts[0]) {
            return;
        }

        // Resync to the new account with the previously selected role.
        // Fire-and-forget: a failed resync leaves the old state in place.
        if let Some(role) = role {
            if let Err(e) = self.connect(role).await {
                tracing::warn!(error = %e, "wallet resync after account change failed");
            } else {
                tracing::info!(address = %accounts[0], "wallet resynced to new account");
            }
        }
    }
}

/// Aborts the account watcher when the last session handle drops
struct WatchGuard {
    task: JoinHandle<()>,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Process-wide wallet session handle
///
/// Clone-able; all clones share one underlying state. Construct once at
/// application start and pass by handle to whatever needs it.
#[derive(Clone)]
pub struct WalletSession {
    core: Arc<WalletCore>,
    _watch: Arc<WatchGuard>,
}

impl WalletSession {
    /// Create a disconnected session and start watching the provider's
    /// account-change notifications for the session's lifetime
    pub fn new(provider: Arc<dyn AccountProvider>) -> Self {
        let core = Arc::new(WalletCore {
            state: RwLock::new(WalletState::default()),
            provider: provider.clone(),
        });

        let mut events = provider.subscribe();
        let watcher = core.clone();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AccountsChanged(accounts)) => {
                        watcher.on_accounts_changed(accounts).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "missed account-change notifications");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self {
            core,
            _watch: Arc::new(WatchGuard { task }),
        }
    }

    /// Connect to the provider's account under the given role
    ///
    /// One awaited external call; no automatic retry. The caller decides
    /// whether to retry by calling again. Success and failure are both
    /// logged as the user-facing acknowledgment.
    pub async fn connect(&self, role: Role) -> Result<Address> {
        match self.core.connect(role).await {
            Ok(address) => {
                tracing::info!(address = %address, role = role.name(), "wallet connected");
                Ok(address)
            }
            Err(e) => {
                tracing::error!(error = %e, "wallet connection failed");
                Err(e)
            }
        }
    }

    /// Reset to the initial disconnected state
    ///
    /// No external call; idempotent.
    pub async fn disconnect(&self) {
        self.core.disconnect().await;
        tracing::info!("wallet disconnected");
    }

    /// Snapshot of the current state
    pub async fn state(&self) -> WalletState {
        self.core.state.read().await.clone()
    }

    /// Signing handle, if connected
    pub async fn signer(&self) -> Option<SigningHandle> {
        self.core.state.read().await.signer.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.core.state.read().await.connected
    }

    pub async fn address(&self) -> Option<Address> {
        self.core.state.read().await.address
    }
}
