// src/error.rs
use thiserror::Error;

use crate::mint::state::CorrelationId;

/// User-facing failures of a chat turn or a mint attempt.
///
/// Every variant renders to a stable, plain-text message through
/// [`ChatError::user_message`]; the `Display` impl is meant for logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("empty input")]
    EmptyInput,
    #[error("missing wallet address")]
    MissingAddress,
    #[error("upstream error: {0}")]
    UpstreamError(String),
    #[error("wallet is on chain {actual}, expected chain {expected}")]
    NetworkMismatch { expected: u64, actual: u64 },
    #[error("signature rejected by the user")]
    SigningRejected,
    #[error("signing prompt closed by the user")]
    SigningCancelled,
    #[error("signing failed: {0}")]
    SigningFailed(String),
    #[error("receipt for {tx_hash} not available in time")]
    ReceiptTimeout { tx_hash: String },
    #[error("token id could not be read from the receipt")]
    TokenIdUnresolved,
}

impl ChatError {
    pub fn user_message(&self) -> String {
        match self {
            ChatError::EmptyInput => {
                "No message received. Try \"Show me collection stats\" or \"Mint me a Medalist\".".to_string()
            }
            ChatError::MissingAddress => {
                "Please provide a valid wallet address (for example \"Show me my collection for 0xYourAddress\").".to_string()
            }
            ChatError::UpstreamError(detail) => {
                format!("Sorry, the collection service could not answer right now ({}). Please try again.", detail)
            }
            ChatError::NetworkMismatch { expected, .. } => format!(
                "Mint failed: please switch your wallet to Shape Mainnet (chain id {}).",
                expected
            ),
            ChatError::SigningRejected => "Mint cancelled: the transaction was rejected in your wallet.".to_string(),
            ChatError::SigningCancelled => "Mint cancelled: the wallet prompt was closed.".to_string(),
            ChatError::SigningFailed(detail) => format!("Mint failed: {}", detail),
            ChatError::ReceiptTimeout { tx_hash } => format!(
                "Your mint was submitted (transaction {}) but the receipt is not available yet. Please verify it on the explorer.",
                tx_hash
            ),
            ChatError::TokenIdUnresolved => {
                "The token id was estimated from the collection supply and may be approximate.".to_string()
            }
        }
    }
}

/// Misuse of the mint orchestrator. Never changes the active state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MintError {
    #[error("no mint in progress")]
    NoActiveMint,
    #[error("mint {0} is no longer the active one")]
    Stale(CorrelationId),
    #[error("mint {id} is {actual}, expected {expected}")]
    WrongPhase {
        id: CorrelationId,
        actual: &'static str,
        expected: &'static str,
    },
    #[error("mint {0} was already sent to the wallet")]
    AlreadySigned(CorrelationId),
}
