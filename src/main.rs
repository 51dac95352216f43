//! Fund session CLI
//!
//! Command-line surface over the wallet and fund sessions: connect a wallet,
//! resolve a fund's vault from its controller, and inspect or clear the
//! persisted pair.

use clap::{Parser, Subcommand};
use fund_session::{
    AccountsChanged, Config, ComptrollerResolver, EnvKeyProvider, Error, FundSession,
    JsonFileStore, Network, Result, Role, RpcConfig, WalletSession,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "fund-session")]
#[command(about = "Wallet and fund session layer for tokenized on-chain funds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Network the fund protocol is deployed on
    #[arg(short, long, global = true)]
    network: Option<Network>,

    /// Path of the persisted session file
    #[arg(short, long, global = true)]
    state_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect the wallet and print the account address
    Connect {
        /// Persona to connect as (investor, manager)
        #[arg(short, long)]
        role: Role,
    },

    /// Resolve a fund's vault from its controller and persist the pair
    Load {
        /// Fund controller address
        controller: String,

        /// Persona to connect as (investor, manager)
        #[arg(short, long, default_value = "investor")]
        role: Role,
    },

    /// Directly commit a known controller/vault pair
    Set {
        /// Fund controller address
        controller: String,

        /// Fund vault address
        vault: String,
    },

    /// Print the rehydrated session state
    Status,

    /// Clear the persisted pair
    Clear,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load config, then apply CLI overrides
    let mut config = if let Some(config_path) = cli.config {
        let content =
            std::fs::read_to_string(&config_path).map_err(|e| Error::Config(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))?
    } else {
        Config::default()
    };
    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(state_file) = cli.state_file {
        config.state_file = state_file.display().to_string();
    }

    match cli.command {
        Commands::Connect { role } => {
            let wallet = connect_wallet(&config, role).await?;
            let address = wallet.address().await.ok_or(Error::SignerMissing)?;
            println!("Connected as {} ({})", address.to_checksum(None), role.name());
        }
        Commands::Load { controller, role } => {
            let controller = parse_address(&controller)?;
            let wallet = connect_wallet(&config, role).await?;
            let fund = online_session(&config, wallet)?;

            fund.load_fund(controller).await;

            let state = fund.state().await;
            match (state.controller, state.vault) {
                (Some(controller), Some(vault)) => {
                    println!("Controller: {}", controller.to_checksum(None));
                    println!("Vault:      {}", vault.to_checksum(None));
                }
                _ => {
                    let reason = state.error.unwrap_or_else(|| "unknown error".to_string());
                    return Err(Error::FundLoad(reason));
                }
            }
        }
        Commands::Set { controller, vault } => {
            let controller = parse_address(&controller)?;
            let vault = parse_address(&vault)?;
            let fund = offline_session(&config)?;
            fund.set_fund(controller, vault).await;
        }
        Commands::Status => {
            let fund = offline_session(&config)?;
            let state = fund.state().await;
            match (state.controller, state.vault) {
                (Some(controller), Some(vault)) => {
                    println!("Controller: {}", controller.to_checksum(None));
                    println!("Vault:      {}", vault.to_checksum(None));
                }
                _ => println!("No fund loaded"),
            }
        }
        Commands::Clear => {
            let fund = offline_session(&config)?;
            fund.clear_fund().await;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config).unwrap());
        }
    }

    Ok(())
}

/// Detect the account provider and connect under the given role
async fn connect_wallet(config: &Config, role: Role) -> Result<WalletSession> {
    let provider = Arc::new(EnvKeyProvider::from_env(&config.wallet_key_env)?);
    let wallet = WalletSession::new(provider);
    wallet.connect(role).await?;
    Ok(wallet)
}

/// Build a fund session wired to the configured chain and state file
fn online_session(config: &Config, wallet: WalletSession) -> Result<FundSession> {
    let rpc = RpcConfig::from_env();
    let resolver = ComptrollerResolver::from_rpc_config(&rpc, config.network.chain_id())?;
    let store = JsonFileStore::new(&config.state_file);
    Ok(FundSession::new(wallet, Arc::new(resolver), Arc::new(store)))
}

/// Session for commands that never touch the chain or the wallet
fn offline_session(config: &Config) -> Result<FundSession> {
    let wallet = WalletSession::new(Arc::new(NullProvider::new()));
    let store = JsonFileStore::new(&config.state_file);
    Ok(FundSession::new(wallet, Arc::new(NullResolver), Arc::new(store)))
}

fn parse_address(s: &str) -> Result<alloy::primitives::Address> {
    s.parse()
        .map_err(|e| Error::InvalidAddress(format!("{}: {}", s, e)))
}

/// Provider that never connects; for offline subcommands
struct NullProvider {
    events: tokio::sync::broadcast::Sender<AccountsChanged>,
}

impl NullProvider {
    fn new() -> Self {
        let (events, _) = tokio::sync::broadcast::channel(1);
        Self { events }
    }
}

#[async_trait::async_trait]
impl fund_session::AccountProvider for NullProvider {
    async fn request_accounts(&self) -> Result<Vec<alloy::primitives::Address>> {
        Err(Error::ProviderUnavailable)
    }

    async fn signer(&self) -> Result<fund_session::SigningHandle> {
        Err(Error::SignerMissing)
    }

    fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AccountsChanged> {
        self.events.subscribe()
    }
}

/// Resolver that always fails; for offline subcommands
struct NullResolver;

#[async_trait::async_trait]
impl fund_session::VaultResolver for NullResolver {
    async fn resolve_vault(
        &self,
        _controller: alloy::primitives::Address,
    ) -> Result<alloy::primitives::Address> {
        Err(Error::FundLoad("no RPC configured".to_string()))
    }
}
