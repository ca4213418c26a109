//! # Command Router
//!
//! Turns an [`Intent`] into gateway calls and hands the result to the
//! normalizer. Calls run one after another in a fixed order, and every path
//! ends in a [`ChatPayload`]: gateway failures become `Error` payloads, never
//! Rust errors.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::chat::intent::Intent;
use crate::chat::normalizer::{has_error, normalize, NormalizeContext};
use crate::chat::payload::ChatPayload;
use crate::error::ChatError;
use crate::mcp::gateway::{ToolGateway, ToolOperation};
use crate::mint::state::CorrelationId;
use crate::utils::{short_address, value_as_u64};

pub const HELP_TEXT: &str = "Welcome to The Medalists! This on-chain NFT collection celebrates digital creativity. Try:
- \"Collection stats\" for total NFTs and holders
- \"Show me token id 3\" or \"Show me a random medalist\" for NFT details
- \"Who is the top holder\" or \"Show me top three holders\" for top collectors
- \"Show me my collection for 0xYourWalletAddress\" for your NFTs
- \"Mint me a Medalist\" to grab your own
- \"Mint status\" for minting details";

/// Collection facts stamped onto summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionInfo {
    pub contract_address: String,
    pub network: String,
    pub chain_id: u64,
}

pub struct CommandRouter {
    gateway: Arc<dyn ToolGateway>,
    collection: CollectionInfo,
    rng: Mutex<StdRng>,
}

impl CommandRouter {
    pub fn new(gateway: Arc<dyn ToolGateway>, collection: CollectionInfo) -> Self {
        Self::with_rng(gateway, collection, StdRng::from_entropy())
    }

    /// Deterministic random-token picks, for tests.
    pub fn with_seed(gateway: Arc<dyn ToolGateway>, collection: CollectionInfo, seed: u64) -> Self {
        Self::with_rng(gateway, collection, StdRng::seed_from_u64(seed))
    }

    fn with_rng(gateway: Arc<dyn ToolGateway>, collection: CollectionInfo, rng: StdRng) -> Self {
        Self {
            gateway,
            collection,
            rng: Mutex::new(rng),
        }
    }

    pub async fn route(&self, intent: &Intent) -> ChatPayload {
        info!(?intent, "Routing intent");
        match intent {
            Intent::CollectionStats => self.collection_lookup(None, false).await,
            Intent::TokenLookup { token_id } => self.collection_lookup(token_id.as_deref(), true).await,
            Intent::RandomTokenLookup => self.collection_lookup(None, true).await,
            Intent::OwnerLookup { address } => self.owner_lookup(address.as_deref()).await,
            Intent::TopHolders { count } => self.top_holders(*count).await,
            Intent::MintStatus => self.mint_status().await,
            Intent::MintValidate { address } => match address {
                Some(owner) => self.validate_mint(owner, CorrelationId::new()).await,
                None => mint_invitation(),
            },
            Intent::Greeting | Intent::Unknown => ChatPayload::plain(HELP_TEXT),
        }
    }

    /// Pre-validates a mint for `owner`, tagging a positive answer with `correlation_id`.
    pub async fn validate_mint(&self, owner: &str, correlation_id: CorrelationId) -> ChatPayload {
        let response = self
            .gateway
            .call(
                ToolOperation::MintValidate,
                json!({ "owner": owner, "quantity": 1 }),
            )
            .await;
        let payload = match response.into_result() {
            Ok(payload) => payload,
            Err(e) => return upstream_error(e),
        };

        if has_error(&payload) {
            return normalize(&payload, &self.context());
        }
        if !is_ready(&payload) {
            warn!(owner, "Mint validation returned neither a ready marker nor an error");
            return ChatPayload::error("Mint validation was inconclusive. Please try again.");
        }

        info!(owner, %correlation_id, "Mint validated");
        ChatPayload::MintReady {
            owner_address: Some(owner.to_string()),
            correlation_id: Some(correlation_id),
            text: format!(
                "Mint request ready for {}! Confirm to mint one Medalist (0.003 ETH).",
                short_address(owner)
            ),
        }
    }

    fn context(&self) -> NormalizeContext {
        NormalizeContext {
            collection: self.collection.clone(),
            ..Default::default()
        }
    }

    /// `CollectionStats`, `TokenLookup` and `RandomTokenLookup` share this path.
    ///
    /// With `show_token` set and no id, a random token in `[1, totalNfts]` is
    /// fetched with a second count lookup.
    async fn collection_lookup(&self, token_id: Option<&str>, show_token: bool) -> ChatPayload {
        let mut arguments = json!({ "contractAddress": self.collection.contract_address });
        if let Some(id) = token_id {
            arguments["tokenId"] = json!(id);
        }
        let primary = match self
            .gateway
            .call(ToolOperation::CollectionNftCount, arguments)
            .await
            .into_result()
        {
            Ok(payload) => payload,
            Err(e) => return upstream_error(e),
        };
        if has_error(&primary) {
            return normalize(&primary, &self.context());
        }

        let mut ctx = self.context();
        let mut payload = primary;

        if show_token && token_id.is_none() {
            ctx.random_token = true;
            if let Some(random_id) = self.pick_token(value_as_u64(payload.get("totalNfts"))) {
                debug!(token_id = random_id, "Picked random token");
                payload = self.random_token_details(payload, random_id).await;
            }
        }

        self.fill_analytics(&mut ctx).await;
        normalize(&payload, &ctx)
    }

    fn pick_token(&self, total: Option<u64>) -> Option<u64> {
        let total = total.filter(|t| *t > 0)?;
        let mut rng = self.rng.lock().ok()?;
        Some(rng.gen_range(1..=total))
    }

    /// Merges image and traits of `token_id` into the primary payload. A failed
    /// lookup leaves the primary payload as it was.
    async fn random_token_details(&self, primary: Value, token_id: u64) -> Value {
        let response = self
            .gateway
            .call(
                ToolOperation::CollectionNftCount,
                json!({
                    "contractAddress": self.collection.contract_address,
                    "tokenId": token_id.to_string(),
                }),
            )
            .await;
        match response.into_result() {
            Ok(details) if !has_error(&details) => {
                let mut merged = primary;
                for key in ["tokenId", "nftImageUrl", "imageData", "traits"] {
                    if let Some(v) = details.get(key) {
                        merged[key] = v.clone();
                    }
                }
                merged
            }
            Ok(details) => {
                warn!(token_id, "Random token lookup reported an error: {}", details);
                primary
            }
            Err(e) => {
                warn!(token_id, "Random token lookup failed: {}", e);
                primary
            }
        }
    }

    /// Holder count plus name and symbol from the analytics tool. Failure leaves them unset.
    async fn fill_analytics(&self, ctx: &mut NormalizeContext) {
        let response = self
            .gateway
            .call(
                ToolOperation::CollectionAnalytics,
                json!({ "contractAddress": self.collection.contract_address }),
            )
            .await;
        match response.into_result() {
            Ok(analytics) if !has_error(&analytics) => {
                ctx.holders = value_as_u64(analytics.get("owners"));
                ctx.collection_name = analytics.get("name").and_then(Value::as_str).map(str::to_string);
                ctx.collection_symbol = analytics.get("symbol").and_then(Value::as_str).map(str::to_string);
            }
            Ok(analytics) => warn!("Holder count unavailable: {}", analytics),
            Err(e) => warn!("Holder count unavailable: {}", e),
        }
    }

    async fn owner_lookup(&self, address: Option<&str>) -> ChatPayload {
        let Some(owner) = address else {
            return ChatPayload::error(ChatError::MissingAddress.user_message());
        };
        let response = self
            .gateway
            .call(
                ToolOperation::NftsForOwner,
                json!({ "owner": owner, "contractAddress": self.collection.contract_address }),
            )
            .await;
        match response.into_result() {
            Ok(payload) => {
                let ctx = NormalizeContext {
                    owner: Some(owner.to_string()),
                    ..self.context()
                };
                normalize(&payload, &ctx)
            }
            Err(e) => upstream_error(e),
        }
    }

    async fn top_holders(&self, count: u32) -> ChatPayload {
        let response = self
            .gateway
            .call(
                ToolOperation::NftOwners,
                json!({
                    "contractAddress": self.collection.contract_address,
                    "topHoldersCount": count,
                }),
            )
            .await;
        match response.into_result() {
            Ok(payload) => normalize(&payload, &self.context()),
            Err(e) => upstream_error(e),
        }
    }

    async fn mint_status(&self) -> ChatPayload {
        let response = self
            .gateway
            .call(
                ToolOperation::MintStatus,
                json!({ "contractAddress": self.collection.contract_address }),
            )
            .await;
        match response.into_result() {
            Ok(payload) => normalize(&payload, &self.context()),
            Err(e) => upstream_error(e),
        }
    }
}

/// `ready: true`, or a message that says the request was validated.
fn is_ready(payload: &Value) -> bool {
    if payload.get("ready").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    payload
        .get("message")
        .and_then(Value::as_str)
        .map(|m| m.to_lowercase().contains("validated"))
        .unwrap_or(false)
}

fn mint_invitation() -> ChatPayload {
    ChatPayload::MintReady {
        owner_address: None,
        correlation_id: None,
        text: "Ready to mint a Medalist? Connect your wallet and confirm the mint (0.003 ETH).".to_string(),
    }
}

fn upstream_error(detail: String) -> ChatPayload {
    warn!("Gateway call failed: {}", detail);
    ChatPayload::error(ChatError::UpstreamError(detail).user_message())
}
