//! Link manager with serialized writes and self-healing reconnection

use bedlink_shared::{timing, Frame};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::transport::LinkTransport;

/// Events emitted by the link manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Session established
    Connected,
    /// Session torn down after a failed write
    Disconnected { reason: String },
    /// A connect attempt failed or timed out
    ConnectFailed { reason: String },
}

/// What happened to a single frame handed to [`LinkManager::write`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Frame reached the transport
    Written,
    /// No session could be established, frame was not sent
    Dropped,
    /// Transport rejected the write, link was recycled
    Failed,
    /// Caller cancelled before the frame reached the transport
    Cancelled,
}

/// Configuration for the link manager
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Upper bound on one connect attempt
    pub connect_timeout: Duration,
    /// Upper bound on one frame write
    pub write_timeout: Duration,
    /// Reconnect attempts made immediately after a failed write
    pub reconnect_attempts: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(2),
            reconnect_attempts: timing::WRITE_RECONNECT_ATTEMPTS,
        }
    }
}

/// Single owner of the session to the actuator controller
///
/// Every write from every hold loop and tap task funnels through here. Link
/// failures never escape: they degrade to a [`WriteOutcome`] and a log line.
pub struct LinkManager {
    transport: Arc<dyn LinkTransport>,
    config: LinkConfig,
    /// One frame on the wire at a time
    write_lock: Mutex<()>,
    /// One connect attempt at a time
    connect_lock: Mutex<()>,
    event_tx: broadcast::Sender<LinkEvent>,
}

impl LinkManager {
    pub fn new(transport: Arc<dyn LinkTransport>, config: LinkConfig) -> Self {
        let (event_tx, _) = broadcast::channel(32);
        Self {
            transport,
            config,
            write_lock: Mutex::new(()),
            connect_lock: Mutex::new(()),
            event_tx,
        }
    }

    /// Subscribe to link state changes
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.event_tx.subscribe()
    }

    /// Current session state, without attempting to connect
    pub async fn is_connected(&self) -> bool {
        self.transport.is_connected().await
    }

    /// Try to establish the session. Failures are logged, not returned.
    pub async fn connect(&self) {
        let _guard = self.connect_lock.lock().await;

        // Another caller may have connected while we waited for the lock
        if self.transport.is_connected().await {
            return;
        }

        let reason = match timeout(self.config.connect_timeout, self.transport.connect()).await {
            Ok(Ok(())) => {
                info!("[LINK] {} connected", self.transport.name());
                let _ = self.event_tx.send(LinkEvent::Connected);
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.config.connect_timeout),
        };

        warn!("[LINK] {} connection error: {}", self.transport.name(), reason);
        let _ = self.event_tx.send(LinkEvent::ConnectFailed { reason });
    }

    /// Return whether the session is up, connecting first if it is not
    pub async fn ensure_connected(&self) -> bool {
        if !self.transport.is_connected().await {
            warn!("[LINK] Not connected, attempting reconnect...");
            self.connect().await;
        }
        self.transport.is_connected().await
    }

    /// Write one frame. Never fails the caller.
    ///
    /// On a transport error the session is torn down and reconnected, but the
    /// frame itself is not retried; hold loops resend on their next tick.
    pub async fn write(&self, frame: &Frame) -> WriteOutcome {
        self.write_until(frame, &CancellationToken::new()).await
    }

    /// Write one frame unless `cancel` fires before it reaches the transport.
    ///
    /// Connecting and waiting for the write lock are abandoned on cancellation.
    /// A frame already handed to the transport is left to complete.
    pub async fn write_until(&self, frame: &Frame, cancel: &CancellationToken) -> WriteOutcome {
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return WriteOutcome::Cancelled,
            connected = self.ensure_connected() => connected,
        };
        if !connected {
            warn!("[LINK] Could not connect, dropping frame {}", frame);
            return WriteOutcome::Dropped;
        }

        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return WriteOutcome::Cancelled,
            guard = self.write_lock.lock() => guard,
        };
        if cancel.is_cancelled() {
            return WriteOutcome::Cancelled;
        }

        let reason = match timeout(self.config.write_timeout, self.transport.write(frame.as_bytes())).await {
            Ok(Ok(())) => {
                debug!("[LINK] Wrote {}", frame);
                return WriteOutcome::Written;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.config.write_timeout),
        };

        error!("[LINK] Error writing command: {}", reason);
        self.recycle(reason).await;
        WriteOutcome::Failed
    }

    /// Disconnect the session (used on shutdown)
    pub async fn disconnect(&self) {
        let _guard = self.connect_lock.lock().await;
        if let Err(e) = self.transport.disconnect().await {
            warn!("[LINK] Disconnect failed: {}", e);
        }
    }

    /// Drop the session and immediately try to bring it back
    async fn recycle(&self, reason: String) {
        if let Err(e) = self.transport.disconnect().await {
            warn!("[LINK] Disconnect after write failure failed: {}", e);
        }
        let _ = self.event_tx.send(LinkEvent::Disconnected { reason });

        for _ in 0..self.config.reconnect_attempts {
            self.connect().await;
            if self.transport.is_connected().await {
                break;
            }
        }
    }
}
