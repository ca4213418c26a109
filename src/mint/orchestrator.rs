//! # Mint Lifecycle Orchestrator
//!
//! Client-side state machine for a single mint attempt:
//!
//! ```text
//! Idle -> AwaitingServerValidation -> ValidatedReadyToSign -> Signing
//!      -> AwaitingReceipt(attempt, max) -> Resolved | Failed
//! ```
//!
//! Only one attempt is active at a time. Starting a new validation supersedes
//! the previous one; anything that arrives later for the old correlation id is
//! dropped. Resolved and failed attempts leave the active slot and are kept as
//! the last settled state.

use std::sync::Arc;

use ethers_core::types::H256;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::intent::Intent;
use crate::chat::payload::ChatPayload;
use crate::error::{ChatError, MintError};
use crate::mint::receipt::ChainReader;
use crate::mint::state::{CorrelationId, MintCall, MintLifecycleState, MintPhase, MintSettings};
use crate::mint::wallet::{WalletError, WalletSession};
use crate::mint::watch::{MintEvent, ReceiptWatch};

/// Something the conversation should do as a consequence of a mint step.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    /// Append this payload as an assistant turn.
    Turn(ChatPayload),
    /// Route this intent as if the user had asked for it.
    Lookup(Intent),
}

/// Result of [`MintOrchestrator::confirm`]. The watch, when present, must be
/// driven (usually with `tokio::spawn(watch.run())`) for the mint to resolve.
pub struct Confirmation<R: ChainReader> {
    pub follow_ups: Vec<FollowUp>,
    pub watch: Option<ReceiptWatch<R>>,
}

pub struct MintOrchestrator<W: WalletSession, R: ChainReader> {
    settings: MintSettings,
    wallet: Arc<W>,
    reader: Arc<R>,
    active: Option<MintLifecycleState>,
    last_settled: Option<MintLifecycleState>,
    /// Newest attempt handed to the wallet. Older ids can no longer be active.
    last_signed: Option<CorrelationId>,
    active_id: watch::Sender<Option<CorrelationId>>,
    events_tx: mpsc::UnboundedSender<MintEvent>,
    events_rx: mpsc::UnboundedReceiver<MintEvent>,
    tracking: Option<CancellationToken>,
}

impl<W: WalletSession, R: ChainReader + 'static> MintOrchestrator<W, R> {
    pub fn new(settings: MintSettings, wallet: Arc<W>, reader: Arc<R>) -> Self {
        let (active_id, _) = watch::channel(None);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            settings,
            wallet,
            reader,
            active: None,
            last_settled: None,
            last_signed: None,
            active_id,
            events_tx,
            events_rx,
            tracking: None,
        }
    }

    pub fn active(&self) -> Option<&MintLifecycleState> {
        self.active.as_ref()
    }

    pub fn last_settled(&self) -> Option<&MintLifecycleState> {
        self.last_settled.as_ref()
    }

    pub fn wallet(&self) -> &Arc<W> {
        &self.wallet
    }

    /// Starts a new attempt for `owner`, superseding whatever was active.
    pub fn begin_validation(&mut self, owner: impl Into<String>) -> CorrelationId {
        if let Some(previous) = self.active.take() {
            info!(correlation_id = %previous.correlation_id, phase = previous.phase.label(), "Mint superseded");
        }
        // An outstanding watch notices the id change on its own; the old
        // transaction keeps going on-chain either way.
        self.tracking = None;

        let mut state = MintLifecycleState::new(owner);
        state.phase = MintPhase::AwaitingServerValidation;
        let id = state.correlation_id;
        info!(correlation_id = %id, owner = %state.owner_address, "Mint validation started");

        self.active = Some(state);
        self.active_id.send_replace(Some(id));
        id
    }

    /// Feeds the router's answer to the validation request of attempt `id`.
    pub fn deliver_validation(
        &mut self,
        id: CorrelationId,
        payload: &ChatPayload,
    ) -> Result<(), MintError> {
        self.expect_phase(id, "awaiting_server_validation")?;

        match payload {
            ChatPayload::MintReady { correlation_id, .. } if *correlation_id == Some(id) => {
                self.transition(MintPhase::ValidatedReadyToSign);
                Ok(())
            }
            ChatPayload::Error { message } => {
                self.settle(MintPhase::Failed {
                    reason: message.clone(),
                });
                Ok(())
            }
            _ => {
                debug!(correlation_id = %id, "Validation payload for another attempt discarded");
                Err(MintError::Stale(id))
            }
        }
    }

    /// Whether the confirm control of the `MintReady` carrying `id` may be used.
    pub fn is_confirm_enabled(&self, id: &CorrelationId) -> bool {
        matches!(
            &self.active,
            Some(state) if state.correlation_id == *id
                && state.phase == MintPhase::ValidatedReadyToSign
        ) && self.last_signed != Some(*id)
    }

    /// Hands the mint to the wallet. Runs at most once per correlation id.
    ///
    /// The orchestrator is borrowed exclusively until the wallet answers, so
    /// no other attempt can start while the signing prompt is open.
    pub async fn confirm(&mut self, id: CorrelationId) -> Result<Confirmation<R>, MintError> {
        if self.last_signed == Some(id) {
            return Err(MintError::AlreadySigned(id));
        }
        self.expect_phase(id, "validated_ready_to_sign")?;

        match self.wallet.chain_id().await {
            Ok(chain) if chain == self.settings.required_chain_id => {}
            Ok(chain) => {
                warn!(correlation_id = %id, chain, expected = self.settings.required_chain_id, "Wallet on the wrong network");
                let err = ChatError::NetworkMismatch {
                    expected: self.settings.required_chain_id,
                    actual: chain,
                };
                self.settle(MintPhase::Failed {
                    reason: "wrong network".to_string(),
                });
                return Ok(Self::without_watch(ChatPayload::error(err.user_message())));
            }
            Err(e) => return Ok(self.fail_signing(e)),
        }

        self.last_signed = Some(id);
        self.transition(MintPhase::Signing);

        let quantity = self.active.as_ref().map(|s| s.quantity).unwrap_or(1);
        let call = MintCall::new(&self.settings, quantity);
        let tx_hash = match self.wallet.submit_mint(&call).await {
            Ok(hash) => hash,
            Err(e) => return Ok(self.fail_signing(e)),
        };

        if let Some(state) = self.active.as_mut() {
            state.transaction_hash = Some(tx_hash);
        }
        self.transition(MintPhase::AwaitingReceipt {
            attempt: 1,
            max_attempts: self.settings.max_attempts,
        });

        let cancel = CancellationToken::new();
        self.tracking = Some(cancel.clone());
        let watch = ReceiptWatch {
            reader: self.reader.clone(),
            correlation_id: id,
            tx_hash,
            contract: self.settings.contract,
            max_attempts: self.settings.max_attempts,
            poll_delay: self.settings.poll_delay,
            active: self.active_id.subscribe(),
            events: self.events_tx.clone(),
            cancel,
        };

        let crafting = ChatPayload::plain(format!(
            "Your Medalist is being crafted. Transaction submitted: {}",
            self.settings.explorer_link(&tx_hash)
        ));
        Ok(Confirmation {
            follow_ups: vec![FollowUp::Turn(crafting)],
            watch: Some(watch),
        })
    }

    /// Stops tracking the active receipt. The transaction itself is unaffected.
    pub fn cancel(&mut self) -> Vec<FollowUp> {
        let Some(token) = self.tracking.take() else {
            return Vec::new();
        };
        token.cancel();

        let tx_hash = self.active.as_ref().and_then(|s| s.transaction_hash);
        let correlation_id = self.active.as_ref().map(|s| s.correlation_id);
        self.settle(MintPhase::Failed {
            reason: "cancelled".to_string(),
        });
        vec![FollowUp::Turn(ChatPayload::MintResult {
            correlation_id,
            transaction_hash: tx_hash.map(|h| format!("{:?}", h)),
            token_id: None,
            approximate: false,
            text: self.with_link(
                "Stopped tracking your mint. The transaction was already submitted.",
                tx_hash.as_ref(),
            ),
        })]
    }

    /// Waits for the next event from a receipt watch.
    pub async fn next_event(&mut self) -> Option<MintEvent> {
        self.events_rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<MintEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Applies a watch event. Events for anything but the active attempt are dropped.
    pub fn apply(&mut self, event: MintEvent) -> Vec<FollowUp> {
        let id = event.correlation_id();
        let Some(state) = self.active.as_ref() else {
            debug!(correlation_id = %id, "No active mint, dropping event");
            return Vec::new();
        };
        if state.correlation_id != id || !matches!(state.phase, MintPhase::AwaitingReceipt { .. }) {
            debug!(correlation_id = %id, "Stale mint event dropped");
            return Vec::new();
        }
        let tx_hash = state.transaction_hash;

        match event {
            MintEvent::Progress {
                attempt,
                max_attempts,
                ..
            } => {
                self.transition(MintPhase::AwaitingReceipt {
                    attempt,
                    max_attempts,
                });
                Vec::new()
            }
            MintEvent::Resolved {
                token_id,
                approximate,
                ..
            } => {
                let text = match (&token_id, approximate) {
                    (Some(token), false) => format!("Your Medalist #{} has been minted!", token),
                    (Some(token), true) => format!(
                        "Your Medalist #{} has been minted! {}",
                        token,
                        ChatError::TokenIdUnresolved.user_message()
                    ),
                    (None, _) => "Your Medalist has been minted, but its token id could not be determined."
                        .to_string(),
                };
                let mut follow_ups = vec![FollowUp::Turn(ChatPayload::MintResult {
                    correlation_id: Some(id),
                    transaction_hash: tx_hash.map(|h| format!("{:?}", h)),
                    token_id: token_id.clone(),
                    approximate,
                    text: self.with_link(&text, tx_hash.as_ref()),
                })];
                if token_id.is_some() {
                    follow_ups.push(FollowUp::Lookup(Intent::TokenLookup {
                        token_id: token_id.clone(),
                    }));
                }
                self.settle(MintPhase::Resolved {
                    token_id,
                    approximate,
                });
                follow_ups
            }
            MintEvent::Reverted { .. } => {
                self.settle(MintPhase::Failed {
                    reason: "transaction reverted".to_string(),
                });
                vec![FollowUp::Turn(ChatPayload::MintResult {
                    correlation_id: Some(id),
                    transaction_hash: tx_hash.map(|h| format!("{:?}", h)),
                    token_id: None,
                    approximate: false,
                    text: self.with_link("Mint failed: the transaction reverted.", tx_hash.as_ref()),
                })]
            }
            MintEvent::TimedOut { .. } => {
                let hash_text = tx_hash.map(|h| format!("{:?}", h));
                let message = ChatError::ReceiptTimeout {
                    tx_hash: hash_text.clone().unwrap_or_default(),
                }
                .user_message();
                self.settle(MintPhase::Failed {
                    reason: "receipt timeout".to_string(),
                });
                vec![FollowUp::Turn(ChatPayload::MintResult {
                    correlation_id: Some(id),
                    transaction_hash: hash_text,
                    token_id: None,
                    approximate: false,
                    text: self.with_link(&message, tx_hash.as_ref()),
                })]
            }
        }
    }

    fn expect_phase(&self, id: CorrelationId, expected: &'static str) -> Result<(), MintError> {
        let state = self.active.as_ref().ok_or(MintError::NoActiveMint)?;
        if state.correlation_id != id {
            return Err(MintError::Stale(id));
        }
        if state.phase.label() != expected {
            return Err(MintError::WrongPhase {
                id,
                actual: state.phase.label(),
                expected,
            });
        }
        Ok(())
    }

    fn transition(&mut self, phase: MintPhase) {
        if let Some(state) = self.active.as_mut() {
            debug!(correlation_id = %state.correlation_id, from = state.phase.label(), to = phase.label(), "Mint transition");
            state.phase = phase;
        }
    }

    fn settle(&mut self, phase: MintPhase) {
        debug_assert!(phase.is_terminal(), "settling into {}", phase.label());
        self.transition(phase);
        if let Some(state) = self.active.take() {
            info!(correlation_id = %state.correlation_id, phase = state.phase.label(), "Mint settled");
            self.last_settled = Some(state);
        }
        self.tracking = None;
        self.active_id.send_replace(None);
    }

    fn fail_signing(&mut self, err: WalletError) -> Confirmation<R> {
        warn!("Wallet signing failed: {}", err);
        self.settle(MintPhase::Failed {
            reason: err.to_string(),
        });
        Self::without_watch(ChatPayload::error(ChatError::from(err).user_message()))
    }

    fn without_watch(payload: ChatPayload) -> Confirmation<R> {
        Confirmation {
            follow_ups: vec![FollowUp::Turn(payload)],
            watch: None,
        }
    }

    fn with_link(&self, text: &str, tx_hash: Option<&H256>) -> String {
        match tx_hash {
            Some(hash) => format!("{} View transaction: {}", text, self.settings.explorer_link(hash)),
            None => text.to_string(),
        }
    }
}
