//! Fund session layer
//!
//! Session state for a tokenized on-chain investment-fund application:
//! - [`wallet::WalletSession`] owns connectivity to one externally-owned
//!   account and exposes it as an address plus signing capability
//! - [`fund::FundSession`] resolves a fund controller to its vault with a
//!   single contract read and persists the pair across restarts
//!
//! Both sessions are explicit dependency-injected handles: construct them
//! once at application start and clone freely. All failures are recoverable
//! by retrying the triggering user action.

pub mod config;
pub mod fund;
pub mod provider;
pub mod storage;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::{Config, Network, RpcConfig};
pub use error::{Error, Result};
pub use fund::{ComptrollerResolver, FundSession, FundState, VaultResolver};
pub use provider::{AccountProvider, AccountsChanged, EnvKeyProvider, SigningHandle};
pub use storage::{FundStore, JsonFileStore, MemoryStore};
pub use wallet::{Role, WalletSession, WalletState};
