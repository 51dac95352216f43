//! Error types for the fund session layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No account provider available in this environment")]
    ProviderUnavailable,

    #[error("Wallet connection rejected: {0}")]
    ConnectionRejected(String),

    #[error("No signing capability: connect a wallet first")]
    SignerMissing,

    #[error("Fund load failed: {0}")]
    FundLoad(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
