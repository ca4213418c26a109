// src/mint/wallet.rs

use async_trait::async_trait;
use ethers_core::types::H256;
use thiserror::Error;

use crate::error::ChatError;
use crate::mint::state::MintCall;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("rejected")]
    Rejected,
    #[error("cancelled")]
    Cancelled,
    #[error("signing failed: {0}")]
    Failed(String),
}

impl From<WalletError> for ChatError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected => ChatError::SigningRejected,
            WalletError::Cancelled => ChatError::SigningCancelled,
            WalletError::Failed(detail) => ChatError::SigningFailed(detail),
        }
    }
}

/// The user's connected wallet. Signing waits for the user without a timeout.
#[async_trait]
pub trait WalletSession: Send + Sync {
    async fn chain_id(&self) -> Result<u64, WalletError>;

    fn address(&self) -> Option<String>;

    /// Signs and broadcasts the mint, returning the transaction hash.
    async fn submit_mint(&self, call: &MintCall) -> Result<H256, WalletError>;
}
