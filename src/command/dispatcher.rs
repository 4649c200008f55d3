//! Command dispatcher - classifies bus messages and drives holds and taps

use bedlink_shared::registry::{self, CONTINUOUS_PREFIX};
use bedlink_shared::encode;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::supervisor::{ContinuousSupervisor, HoldTransition};
use crate::link::LinkManager;

/// Shape of an inbound payload, before registry lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inbound<'a> {
    /// `start_<name>`
    StartContinuous(&'a str),
    /// Anything else, matched against tap commands by exact name
    Bare(&'a str),
}

/// Split a trimmed payload into hold request or bare name
fn classify(payload: &str) -> Inbound<'_> {
    let payload = payload.trim();
    match payload.strip_prefix(CONTINUOUS_PREFIX) {
        Some(name) => Inbound::StartContinuous(name),
        None => Inbound::Bare(payload),
    }
}

/// What the dispatcher did with one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    HoldStarted(String),
    HoldRefreshed(String),
    OneShotSpawned(String),
    UnknownContinuous(String),
    Unknown(String),
    InvalidPayload,
}

/// Single serialized consumer of bus messages
pub struct CommandDispatcher {
    link: Arc<LinkManager>,
    supervisor: Arc<ContinuousSupervisor>,
}

impl CommandDispatcher {
    pub fn new(link: Arc<LinkManager>, supervisor: Arc<ContinuousSupervisor>) -> Self {
        Self { link, supervisor }
    }

    /// Consume messages in arrival order until the bus side closes
    pub async fn run(&self, mut rx: mpsc::Receiver<Bytes>) {
        while let Some(payload) = rx.recv().await {
            self.handle_message(&payload).await;
        }
        info!("[DISPATCH] Command channel closed");
    }

    /// Handle one message. Never fails; unknown input is logged and dropped.
    pub async fn handle_message(&self, payload: &[u8]) -> DispatchOutcome {
        let text = match std::str::from_utf8(payload) {
            Ok(text) => text,
            Err(e) => {
                warn!("[DISPATCH] Dropping non UTF-8 payload: {}", e);
                return DispatchOutcome::InvalidPayload;
            }
        };

        debug!("[DISPATCH] Received message: {}", text.trim());

        match classify(text) {
            Inbound::StartContinuous(name) => {
                let Some(code) = registry::resolve_continuous(name) else {
                    warn!("[DISPATCH] Unknown continuous command: {}", name);
                    return DispatchOutcome::UnknownContinuous(name.to_string());
                };

                match self.supervisor.start_or_refresh(name, code).await {
                    HoldTransition::Started => DispatchOutcome::HoldStarted(name.to_string()),
                    HoldTransition::Refreshed => DispatchOutcome::HoldRefreshed(name.to_string()),
                }
            }
            Inbound::Bare(name) => {
                let Some(action) = registry::resolve_one_shot(name) else {
                    warn!("[DISPATCH] Unknown command received: {}", name);
                    return DispatchOutcome::Unknown(name.to_string());
                };

                // Fire and forget; link failures are logged by the link manager
                let link = self.link.clone();
                tokio::spawn(async move {
                    info!("[ONE-SHOT] {}", action.description);
                    link.write(&encode(action.code)).await;
                });

                DispatchOutcome::OneShotSpawned(action.name.to_string())
            }
        }
    }
}
