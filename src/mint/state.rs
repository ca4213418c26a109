// src/mint/state.rs

use std::fmt;
use std::time::Duration;

use ethers_core::abi::Token;
use ethers_core::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blockchain::abi::encode_call;

/// Identifies one mint attempt from validation to its final chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum MintPhase {
    Idle,
    AwaitingServerValidation,
    ValidatedReadyToSign,
    Signing,
    #[serde(rename_all = "camelCase")]
    AwaitingReceipt { attempt: u32, max_attempts: u32 },
    #[serde(rename_all = "camelCase")]
    Resolved { token_id: Option<String>, approximate: bool },
    Failed { reason: String },
}

impl MintPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MintPhase::Resolved { .. } | MintPhase::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            MintPhase::Idle => "idle",
            MintPhase::AwaitingServerValidation => "awaiting_server_validation",
            MintPhase::ValidatedReadyToSign => "validated_ready_to_sign",
            MintPhase::Signing => "signing",
            MintPhase::AwaitingReceipt { .. } => "awaiting_receipt",
            MintPhase::Resolved { .. } => "resolved",
            MintPhase::Failed { .. } => "failed",
        }
    }
}

/// One mint attempt. Owned by the orchestrator; never shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintLifecycleState {
    pub correlation_id: CorrelationId,
    pub owner_address: String,
    pub quantity: u32,
    pub phase: MintPhase,
    pub transaction_hash: Option<H256>,
}

impl MintLifecycleState {
    pub fn new(owner_address: impl Into<String>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            owner_address: owner_address.into(),
            quantity: 1,
            phase: MintPhase::Idle,
            transaction_hash: None,
        }
    }
}

/// Parameters of the collection's on-chain mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintSettings {
    pub contract: Address,
    pub required_chain_id: u64,
    pub mint_price: U256,
    pub collector_fee: U256,
    pub max_attempts: u32,
    pub poll_delay: Duration,
    pub explorer_tx_url: String,
}

impl MintSettings {
    /// Wei sent per minted token.
    pub fn unit_value(&self) -> U256 {
        self.mint_price + self.collector_fee
    }

    pub fn explorer_link(&self, tx_hash: &H256) -> String {
        format!("{}/{:?}", self.explorer_tx_url.trim_end_matches('/'), tx_hash)
    }
}

/// A ready-to-sign call to `mint(uint256)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl MintCall {
    pub fn new(settings: &MintSettings, quantity: u32) -> Self {
        Self {
            to: settings.contract,
            data: encode_call("mint(uint256)", vec![Token::Uint(U256::from(quantity))]),
            value: settings.unit_value() * U256::from(quantity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_mint_call_encoding() {
        let settings = Config::default().mint_settings().unwrap();
        let call = MintCall::new(&settings, 1);

        // mint(uint256) selector followed by one 32 byte word
        assert_eq!(&call.data[..4], &[0xa0, 0x71, 0x2d, 0x68]);
        assert_eq!(call.data.len(), 36);
        assert_eq!(call.data[35], 1);
        assert_eq!(call.value, U256::from(3_000_000_000_000_000u64));
        assert_eq!(call.to, settings.contract);
    }

    #[test]
    fn test_explorer_link() {
        let settings = Config::default().mint_settings().unwrap();
        let link = settings.explorer_link(&H256::repeat_byte(0xab));
        assert!(link.starts_with("https://shapescan.xyz/tx/0xabab"));
        assert_eq!(link.len(), "https://shapescan.xyz/tx/".len() + 66);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(MintPhase::Failed { reason: "x".into() }.is_terminal());
        assert!(MintPhase::Resolved { token_id: None, approximate: true }.is_terminal());
        assert!(!MintPhase::Signing.is_terminal());
        assert!(!MintPhase::AwaitingReceipt { attempt: 1, max_attempts: 10 }.is_terminal());
    }
}
