//! Fund session
//!
//! Resolves and caches the mapping from a fund's controller address to its
//! vault address using exactly one on-chain read, and keeps the pair
//! available across restarts through the durable store. One session per
//! running application; clone the handle freely.

mod resolver;

pub use resolver::{ComptrollerResolver, VaultResolver};

use crate::storage::FundStore;
use crate::wallet::WalletSession;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Fixed key of the persisted controller/vault pair
pub const FUND_STORE_KEY: &str = "fund-session";

/// User-facing message for any failed vault resolution
pub const LOAD_FAILED_MSG: &str = "Failed to load fund details.";

/// User-facing message when a load is attempted without a signer
pub const SIGNER_MISSING_MSG: &str = "Connect a wallet first.";

/// Snapshot of the fund session state
///
/// Invariant: `vault` is `Some` only if `controller` is `Some` and was
/// successfully resolved (or committed directly via `set_fund`).
#[derive(Debug, Clone, Default)]
pub struct FundState {
    pub controller: Option<Address>,
    pub vault: Option<Address>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Durable form of a committed pair
#[derive(Debug, Serialize, Deserialize)]
struct PersistedFund {
    controller: Address,
    vault: Address,
}

/// Process-wide fund session handle
///
/// Depends on the wallet session only for the signer precondition of
/// [`FundSession::load_fund`].
#[derive(Clone)]
pub struct FundSession {
    state: Arc<RwLock<FundState>>,
    /// Monotone load counter; completions commit only when still latest
    seq: Arc<AtomicU64>,
    wallet: WalletSession,
    resolver: Arc<dyn VaultResolver>,
    store: Arc<dyn FundStore>,
}

impl FundSession {
    /// Create a session, rehydrating any persisted pair from the store
    ///
    /// Rehydration is best-effort: a corrupt entry is discarded and the
    /// session starts empty. Construction never fails on storage content.
    pub fn new(
        wallet: WalletSession,
        resolver: Arc<dyn VaultResolver>,
        store: Arc<dyn FundStore>,
    ) -> Self {
        let mut state = FundState::default();
        match store.get(FUND_STORE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<PersistedFund>(&raw) {
                Ok(fund) => {
                    tracing::debug!(
                        controller = %fund.controller,
                        vault = %fund.vault,
                        "rehydrated persisted fund"
                    );
                    state.controller = Some(fund.controller);
                    state.vault = Some(fund.vault);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "discarding corrupt persisted fund entry");
                    if let Err(e) = store.remove(FUND_STORE_KEY) {
                        tracing::warn!(error = %e, "failed to remove corrupt fund entry");
                    }
                }
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to read persisted fund"),
        }

        Self {
            state: Arc::new(RwLock::new(state)),
            seq: Arc::new(AtomicU64::new(0)),
            wallet,
            resolver,
            store,
        }
    }

    /// Resolve and commit the vault address for `controller`
    ///
    /// Requires a connected wallet. Loading the already-loaded controller is
    /// a no-op (coarse cache by address identity). At most one completion
    /// commits: a completion whose attempt is no longer the latest issued is
    /// discarded, so newer requests win regardless of settle order. Failures
    /// are captured on the session's `error` field, never returned.
    pub async fn load_fund(&self, controller: Address) {
        if self.wallet.signer().await.is_none() {
            let mut state = self.state.write().await;
            state.error = Some(SIGNER_MISSING_MSG.to_string());
            state.loading = false;
            return;
        }

        let attempt = {
            let mut state = self.state.write().await;
            if state.controller == Some(controller) {
                state.loading = false;
                return;
            }
            state.loading = true;
            state.vault = None;
            state.error = None;
            self.seq.fetch_add(1, Ordering::SeqCst) + 1
        };

        let result = self.resolver.resolve_vault(controller).await;

        if self.seq.load(Ordering::SeqCst) != attempt {
            tracing::debug!(controller = %controller, "discarding stale fund load completion");
            return;
        }

        match result {
            Ok(vault) => {
                self.commit(Some(controller), Some(vault)).await;
                self.persist(controller, vault);
                tracing::info!(controller = %controller, vault = %vault, "fund loaded");
            }
            Err(e) => {
                tracing::error!(controller = %controller, error = %e, "fund load failed");
                {
                    let mut state = self.state.write().await;
                    *state = FundState {
                        controller: None,
                        vault: None,
                        loading: false,
                        error: Some(LOAD_FAILED_MSG.to_string()),
                    };
                }
                self.unpersist();
            }
        }
    }

    /// Directly commit a known-good pair, bypassing the read
    pub async fn set_fund(&self, controller: Address, vault: Address) {
        self.commit(Some(controller), Some(vault)).await;
        self.persist(controller, vault);
        tracing::info!(controller = %controller, vault = %vault, "fund set");
    }

    /// Reset the pair and remove the persisted entry
    pub async fn clear_fund(&self) {
        self.commit(None, None).await;
        self.unpersist();
        tracing::info!("fund cleared");
    }

    /// Snapshot of the current state
    pub async fn state(&self) -> FundState {
        self.state.read().await.clone()
    }

    /// Pure state transition; storage writes happen separately
    async fn commit(&self, controller: Option<Address>, vault: Option<Address>) {
        let mut state = self.state.write().await;
        *state = FundState {
            controller,
            vault,
            loading: false,
            error: None,
        };
    }

    fn persist(&self, controller: Address, vault: Address) {
        let entry = PersistedFund { controller, vault };
        match serde_json::to_string(&entry) {
            Ok(raw) => {
                if let Err(e) = self.store.set(FUND_STORE_KEY, &raw) {
                    tracing::warn!(error = %e, "failed to persist fund pair");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize fund pair"),
        }
    }

    fn unpersist(&self) {
        if let Err(e) = self.store.remove(FUND_STORE_KEY) {
            tracing::warn!(error = %e, "failed to remove persisted fund pair");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::resolver::mock::MockResolver;
    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::storage::MemoryStore;
    use crate::wallet::Role;
    use alloy::primitives::address;
    use std::time::Duration;

    const ACCOUNT: Address = address!("00000000000000000000000000000000000000aa");
    const CONTROLLER_1: Address = address!("0000000000000000000000000000000000000c01");
    const CONTROLLER_2: Address = address!("0000000000000000000000000000000000000c02");
    const VAULT_1: Address = address!("0000000000000000000000000000000000000f01");
    const VAULT_2: Address = address!("0000000000000000000000000000000000000f02");

    struct Fixture {
        session: FundSession,
        resolver: Arc<MockResolver>,
        store: Arc<MemoryStore>,
        wallet: WalletSession,
    }

    async fn fixture(connected: bool) -> Fixture {
        let provider = Arc::new(MockProvider::new(ACCOUNT));
        let wallet = WalletSession::new(provider);
        if connected {
            wallet.connect(Role::Manager).await.unwrap();
        }
        let resolver = Arc::new(MockResolver::new());
        let store = Arc::new(MemoryStore::new());
        let session = FundSession::new(wallet.clone(), resolver.clone(), store.clone());
        Fixture {
            session,
            resolver,
            store,
            wallet,
        }
    }

    #[tokio::test]
    async fn load_commits_and_persists_the_pair() {
        let fx = fixture(true).await;
        fx.resolver.route(CONTROLLER_1, VAULT_1);

        fx.session.load_fund(CONTROLLER_1).await;

        let state = fx.session.state().await;
        assert_eq!(state.controller, Some(CONTROLLER_1));
        assert_eq!(state.vault, Some(VAULT_1));
        assert!(!state.loading);
        assert!(state.error.is_none());

        let raw = fx.store.get(FUND_STORE_KEY).unwrap().unwrap();
        let persisted: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            persisted["controller"].as_str().unwrap().to_lowercase(),
            format!("{:?}", CONTROLLER_1).to_lowercase()
        );
    }

    #[tokio::test]
    async fn repeated_load_of_same_controller_reads_at_most_once() {
        let fx = fixture(true).await;
        fx.resolver.route(CONTROLLER_1, VAULT_1);

        fx.session.load_fund(CONTROLLER_1).await;
        fx.session.load_fund(CONTROLLER_1).await;

        assert_eq!(fx.resolver.calls(), 1);
        let state = fx.session.state().await;
        assert_eq!(state.vault, Some(VAULT_1));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn failed_load_clears_the_whole_pair() {
        let fx = fixture(true).await;
        fx.resolver.route(CONTROLLER_1, VAULT_1);
        fx.resolver.fail(CONTROLLER_2, "execution reverted");

        fx.session.load_fund(CONTROLLER_1).await;
        fx.session.load_fund(CONTROLLER_2).await;

        let state = fx.session.state().await;
        assert!(state.controller.is_none());
        assert!(state.vault.is_none());
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some(LOAD_FAILED_MSG));

        // The stale persisted pair is gone too
        assert!(fx.store.get(FUND_STORE_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn load_without_signer_fails_fast_and_keeps_pair() {
        let fx = fixture(false).await;
        fx.resolver.route(CONTROLLER_2, VAULT_2);
        fx.session.set_fund(CONTROLLER_1, VAULT_1).await;

        fx.session.load_fund(CONTROLLER_2).await;

        let state = fx.session.state().await;
        assert_eq!(state.error.as_deref(), Some(SIGNER_MISSING_MSG));
        assert!(!state.loading);
        // Existing pair untouched
        assert_eq!(state.controller, Some(CONTROLLER_1));
        assert_eq!(state.vault, Some(VAULT_1));
        assert_eq!(fx.resolver.calls(), 0);
    }

    #[tokio::test]
    async fn set_fund_round_trips_through_a_fresh_session() {
        let fx = fixture(true).await;
        fx.session.set_fund(CONTROLLER_1, VAULT_1).await;

        // Simulated reload: new session over the same store
        let reloaded = FundSession::new(
            fx.wallet.clone(),
            Arc::new(MockResolver::new()),
            fx.store.clone(),
        );
        let state = reloaded.state().await;
        assert_eq!(state.controller, Some(CONTROLLER_1));
        assert_eq!(state.vault, Some(VAULT_1));
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn corrupt_persisted_entry_is_discarded() {
        let fx = fixture(true).await;
        fx.store.set(FUND_STORE_KEY, "not json at all").unwrap();

        let session = FundSession::new(
            fx.wallet.clone(),
            Arc::new(MockResolver::new()),
            fx.store.clone(),
        );

        let state = session.state().await;
        assert!(state.controller.is_none());
        assert!(state.vault.is_none());
        assert!(fx.store.get(FUND_STORE_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_fund_removes_state_and_persisted_entry() {
        let fx = fixture(true).await;
        fx.session.set_fund(CONTROLLER_1, VAULT_1).await;

        fx.session.clear_fund().await;

        let state = fx.session.state().await;
        assert!(state.controller.is_none() && state.vault.is_none());
        assert!(fx.store.get(FUND_STORE_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_completion_is_discarded() {
        let fx = fixture(true).await;
        fx.resolver.route(CONTROLLER_1, VAULT_1);
        fx.resolver.route(CONTROLLER_2, VAULT_2);
        // First load settles after the second one
        fx.resolver.delay(CONTROLLER_1, Duration::from_millis(100));

        let slow = {
            let session = fx.session.clone();
            tokio::spawn(async move { session.load_fund(CONTROLLER_1).await })
        };
        // Let the slow load issue first
        tokio::time::sleep(Duration::from_millis(10)).await;
        fx.session.load_fund(CONTROLLER_2).await;
        slow.await.unwrap();

        // The later-issued load wins even though it settled first
        let state = fx.session.state().await;
        assert_eq!(state.controller, Some(CONTROLLER_2));
        assert_eq!(state.vault, Some(VAULT_2));
        assert!(!state.loading);
    }
}
