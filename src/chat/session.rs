//! A single user's conversation with the assistant, including the client-side
//! half of minting: filling in the connected wallet, confirming a `MintReady`,
//! and turning receipt events into follow-up turns.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::chat::intent::{classify, Intent};
use crate::chat::payload::ChatPayload;
use crate::chat::router::CommandRouter;
use crate::mint::orchestrator::{FollowUp, MintOrchestrator};
use crate::mint::receipt::ChainReader;
use crate::mint::state::CorrelationId;
use crate::mint::wallet::WalletSession;
use crate::mint::watch::MintEvent;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum Turn {
    User { text: String, at: DateTime<Utc> },
    Assistant { payload: ChatPayload, at: DateTime<Utc> },
}

pub struct ChatSession<W: WalletSession, R: ChainReader> {
    router: Arc<CommandRouter>,
    orchestrator: MintOrchestrator<W, R>,
    turns: Vec<Turn>,
}

impl<W, R> ChatSession<W, R>
where
    W: WalletSession + 'static,
    R: ChainReader + 'static,
{
    pub fn new(router: Arc<CommandRouter>, orchestrator: MintOrchestrator<W, R>) -> Self {
        Self {
            router,
            orchestrator,
            turns: Vec::new(),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn orchestrator(&self) -> &MintOrchestrator<W, R> {
        &self.orchestrator
    }

    /// Handles one user utterance and returns the assistant turns it produced.
    pub async fn send(&mut self, text: &str) -> Vec<ChatPayload> {
        self.push_user(text);
        let intent = match classify(text) {
            Ok(intent) => self.with_wallet_address(intent),
            Err(e) => return vec![self.push_assistant(ChatPayload::error(e.user_message()))],
        };

        let payload = match intent {
            Intent::MintValidate {
                address: Some(owner),
            } => {
                let id = self.orchestrator.begin_validation(owner.as_str());
                let payload = self.router.validate_mint(&owner, id).await;
                if let Err(e) = self.orchestrator.deliver_validation(id, &payload) {
                    warn!("Validation result not applied: {}", e);
                }
                payload
            }
            other => self.router.route(&other).await,
        };
        vec![self.push_assistant(payload)]
    }

    /// Missing addresses for "mint" and "my collection" come from the connected wallet.
    fn with_wallet_address(&self, intent: Intent) -> Intent {
        let wallet = self.orchestrator.wallet().address();
        match intent {
            Intent::MintValidate { address: None } if wallet.is_some() => {
                Intent::MintValidate { address: wallet }
            }
            Intent::OwnerLookup { address: None } if wallet.is_some() => {
                Intent::OwnerLookup { address: wallet }
            }
            other => other,
        }
    }

    /// Correlation id of the newest `MintReady` in the conversation.
    pub fn latest_mint_ready(&self) -> Option<CorrelationId> {
        self.turns.iter().rev().find_map(|turn| match turn {
            Turn::Assistant { payload, .. } => payload.mint_correlation().copied(),
            Turn::User { .. } => None,
        })
    }

    /// Confirms the mint behind `id` (or the newest `MintReady`) and starts
    /// tracking its receipt in the background.
    pub async fn confirm(&mut self, id: Option<CorrelationId>) -> Vec<ChatPayload> {
        let Some(id) = id.or_else(|| self.latest_mint_ready()) else {
            return vec![self.push_assistant(ChatPayload::error(
                "There is no mint waiting for confirmation. Say \"Mint me a Medalist\" first.",
            ))];
        };
        if !self.orchestrator.is_confirm_enabled(&id) {
            debug!(correlation_id = %id, "Confirm control is not enabled");
        }

        match self.orchestrator.confirm(id).await {
            Ok(confirmation) => {
                if let Some(watch) = confirmation.watch {
                    tokio::spawn(watch.run());
                }
                self.follow_up(confirmation.follow_ups).await
            }
            Err(e) => vec![self.push_assistant(ChatPayload::error(format!(
                "That mint can no longer be confirmed ({}).",
                e
            )))],
        }
    }

    pub async fn cancel(&mut self) -> Vec<ChatPayload> {
        let follow_ups = self.orchestrator.cancel();
        self.follow_up(follow_ups).await
    }

    /// Applies every receipt event that has already arrived.
    pub async fn pump(&mut self) -> Vec<ChatPayload> {
        let mut out = Vec::new();
        while let Some(event) = self.orchestrator.try_next_event() {
            out.extend(self.apply_event(event).await);
        }
        out
    }

    /// Waits for the next receipt event. Cancel safe.
    pub async fn next_event(&mut self) -> Option<MintEvent> {
        self.orchestrator.next_event().await
    }

    pub async fn apply_event(&mut self, event: MintEvent) -> Vec<ChatPayload> {
        let follow_ups = self.orchestrator.apply(event);
        self.follow_up(follow_ups).await
    }

    /// Waits for the next receipt event and applies it.
    pub async fn next_update(&mut self) -> Vec<ChatPayload> {
        match self.next_event().await {
            Some(event) => self.apply_event(event).await,
            None => Vec::new(),
        }
    }

    async fn follow_up(&mut self, follow_ups: Vec<FollowUp>) -> Vec<ChatPayload> {
        let mut out = Vec::new();
        for follow_up in follow_ups {
            match follow_up {
                FollowUp::Turn(payload) => out.push(self.push_assistant(payload)),
                FollowUp::Lookup(intent) => {
                    if let Intent::TokenLookup { token_id: Some(id) } = &intent {
                        self.push_user(&format!("show me my new token id {}", id));
                    }
                    // An error here is just another turn; the mint stays resolved.
                    let payload = self.router.route(&intent).await;
                    out.push(self.push_assistant(payload));
                }
            }
        }
        out
    }

    fn push_user(&mut self, text: &str) {
        self.turns.push(Turn::User {
            text: text.to_string(),
            at: Utc::now(),
        });
    }

    fn push_assistant(&mut self, payload: ChatPayload) -> ChatPayload {
        self.turns.push(Turn::Assistant {
            payload: payload.clone(),
            at: Utc::now(),
        });
        payload
    }
}
