// src/mint/watch.rs

use std::sync::Arc;
use std::time::Duration;

use ethers_core::types::{Address, H256};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::mint::receipt::{decode_minted_token_id, is_reverted, ChainReader};
use crate::mint::state::CorrelationId;

/// Messages from a detached [`ReceiptWatch`] back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintEvent {
    Progress {
        correlation_id: CorrelationId,
        attempt: u32,
        max_attempts: u32,
    },
    Resolved {
        correlation_id: CorrelationId,
        token_id: Option<String>,
        approximate: bool,
    },
    Reverted {
        correlation_id: CorrelationId,
    },
    TimedOut {
        correlation_id: CorrelationId,
    },
}

impl MintEvent {
    pub fn correlation_id(&self) -> CorrelationId {
        match self {
            MintEvent::Progress { correlation_id, .. }
            | MintEvent::Resolved { correlation_id, .. }
            | MintEvent::Reverted { correlation_id }
            | MintEvent::TimedOut { correlation_id } => *correlation_id,
        }
    }
}

/// Bounded receipt poll for one submitted mint.
///
/// Runs independently of the orchestrator and only talks to it through the
/// event channel. It goes quiet as soon as the active correlation id moves on
/// or the cancellation token fires.
pub struct ReceiptWatch<R: ChainReader> {
    pub(crate) reader: Arc<R>,
    pub(crate) correlation_id: CorrelationId,
    pub(crate) tx_hash: H256,
    pub(crate) contract: Address,
    pub(crate) max_attempts: u32,
    pub(crate) poll_delay: Duration,
    pub(crate) active: watch::Receiver<Option<CorrelationId>>,
    pub(crate) events: mpsc::UnboundedSender<MintEvent>,
    pub(crate) cancel: CancellationToken,
}

impl<R: ChainReader + 'static> ReceiptWatch<R> {
    fn is_current(&self) -> bool {
        !self.cancel.is_cancelled() && *self.active.borrow() == Some(self.correlation_id)
    }

    /// Sends `event` unless this watch has been superseded. Returns whether it was sent.
    fn emit(&self, event: MintEvent) -> bool {
        if !self.is_current() {
            debug!(correlation_id = %self.correlation_id, "Watch superseded, dropping event");
            return false;
        }
        self.events.send(event).is_ok()
    }

    pub async fn run(self) {
        let id = self.correlation_id;
        for attempt in 1..=self.max_attempts {
            let progressed = self.emit(MintEvent::Progress {
                correlation_id: id,
                attempt,
                max_attempts: self.max_attempts,
            });
            if !progressed {
                return;
            }

            match self.reader.transaction_receipt(self.tx_hash).await {
                Ok(Some(receipt)) => {
                    if is_reverted(&receipt) {
                        warn!(correlation_id = %id, tx = ?self.tx_hash, "Mint transaction reverted");
                        self.emit(MintEvent::Reverted { correlation_id: id });
                        return;
                    }
                    let event = match decode_minted_token_id(&receipt, self.contract) {
                        Some(token_id) => MintEvent::Resolved {
                            correlation_id: id,
                            token_id: Some(token_id.to_string()),
                            approximate: false,
                        },
                        None => self.supply_fallback().await,
                    };
                    info!(correlation_id = %id, attempt, "Mint receipt found");
                    self.emit(event);
                    return;
                }
                Ok(None) => debug!(correlation_id = %id, attempt, "Receipt not available yet"),
                Err(e) => warn!(correlation_id = %id, attempt, "Receipt lookup failed: {}", e),
            }

            if attempt < self.max_attempts {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_delay) => {}
                    _ = self.cancel.cancelled() => {
                        info!(correlation_id = %id, "Receipt tracking cancelled");
                        return;
                    }
                }
            }
        }

        warn!(correlation_id = %id, tx = ?self.tx_hash, "Gave up waiting for the mint receipt");
        self.emit(MintEvent::TimedOut { correlation_id: id });
    }

    /// The newest token is assumed to be ours. Wrong under concurrent mints.
    async fn supply_fallback(&self) -> MintEvent {
        let token_id = match self.reader.total_supply(self.contract).await {
            Ok(supply) => Some(supply.to_string()),
            Err(e) => {
                warn!(correlation_id = %self.correlation_id, "totalSupply fallback failed: {}", e);
                None
            }
        };
        MintEvent::Resolved {
            correlation_id: self.correlation_id,
            token_id,
            approximate: true,
        }
    }
}
