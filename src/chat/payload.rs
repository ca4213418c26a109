// src/chat/payload.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mint::state::CorrelationId;

/// A single NFT trait, as reported by the metadata providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trait {
    pub trait_type: String,
    pub value: String,
}

impl Trait {
    /// Providers disagree on key names (`trait_type` / `traitType` / `type`) and
    /// sometimes send numeric values.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let trait_type = ["trait_type", "traitType", "type"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(|v| v.as_str()))
            .unwrap_or("Unknown")
            .to_string();
        let value = match obj.get("value") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "N/A".to_string(),
            Some(other) => other.to_string(),
        };
        Some(Self { trait_type, value })
    }

    pub fn list_from(value: Option<&Value>) -> Vec<Self> {
        value
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(Trait::from_value).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedNft {
    pub token_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub traits: Vec<Trait>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderEntry {
    pub owner_address: String,
    pub balance: u64,
    pub token_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default)]
    pub traits: Vec<Trait>,
}

/// The canonical, renderable result of one chat turn.
///
/// Upstream payloads carry no discriminant; [`crate::chat::normalizer::normalize`]
/// picks the variant. On the wire the variant is written as an explicit `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChatPayload {
    Error {
        message: String,
    },
    PlainMessage {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    CollectionSummary {
        total_supply: u64,
        holders: u64,
        network: String,
        chain_id: u64,
        contract_address: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        token_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        traits: Option<Vec<Trait>>,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    OwnerSummary {
        owner: String,
        total_count: u64,
        network: String,
        nfts: Vec<OwnedNft>,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    TopHolders {
        unique_holders: u64,
        holders: Vec<HolderEntry>,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    MintStatus {
        contract_address: String,
        status: Value,
        current_phase: u64,
        active_phase: Value,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    MintReady {
        #[serde(skip_serializing_if = "Option::is_none")]
        owner_address: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        correlation_id: Option<CorrelationId>,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    MintResult {
        #[serde(skip_serializing_if = "Option::is_none")]
        correlation_id: Option<CorrelationId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        transaction_hash: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        token_id: Option<String>,
        #[serde(default)]
        approximate: bool,
        text: String,
    },
}

impl ChatPayload {
    pub fn error(message: impl Into<String>) -> Self {
        ChatPayload::Error {
            message: message.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        ChatPayload::PlainMessage { text: text.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ChatPayload::Error { .. })
    }

    /// The human-readable line every variant carries.
    pub fn text(&self) -> &str {
        match self {
            ChatPayload::Error { message } => message,
            ChatPayload::PlainMessage { text }
            | ChatPayload::CollectionSummary { text, .. }
            | ChatPayload::OwnerSummary { text, .. }
            | ChatPayload::TopHolders { text, .. }
            | ChatPayload::MintStatus { text, .. }
            | ChatPayload::MintReady { text, .. }
            | ChatPayload::MintResult { text, .. } => text,
        }
    }

    /// Correlation id of a `MintReady` that can start a signing flow.
    pub fn mint_correlation(&self) -> Option<&CorrelationId> {
        match self {
            ChatPayload::MintReady { correlation_id, .. } => correlation_id.as_ref(),
            _ => None,
        }
    }
}
