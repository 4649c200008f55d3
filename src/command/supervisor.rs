//! Continuous-command supervisor
//!
//! Each held command name is either idle or has exactly one writer loop
//! re-sending its frame. Holds are refreshed by repeated `start_<name>`
//! messages and released once refreshes stop for longer than the refresh
//! window.

use bedlink_shared::{encode, timing, CommandCode};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::link::{LinkManager, WriteOutcome};

/// Configuration for hold supervision
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Release a hold after this long without a refresh
    pub refresh_window: Duration,
    /// Gap between frames of an active hold
    pub write_interval: Duration,
    /// Gap between stale-hold scans
    pub scan_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            refresh_window: Duration::from_millis(timing::REFRESH_WINDOW_MS),
            write_interval: Duration::from_millis(timing::HOLD_WRITE_INTERVAL_MS),
            scan_interval: Duration::from_millis(timing::SUPERVISOR_SCAN_INTERVAL_MS),
        }
    }
}

/// Result of a `start_<name>` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldTransition {
    /// No hold was active, a writer loop was spawned
    Started,
    /// Hold was already active, its deadline moved forward
    Refreshed,
}

struct ContinuousEntry {
    task: JoinHandle<()>,
    cancel: CancellationToken,
    last_update: Instant,
}

/// Owns every active hold and its writer loop
pub struct ContinuousSupervisor {
    link: Arc<LinkManager>,
    config: SupervisorConfig,
    entries: RwLock<HashMap<String, ContinuousEntry>>,
}

impl ContinuousSupervisor {
    pub fn new(link: Arc<LinkManager>, config: SupervisorConfig) -> Self {
        Self {
            link,
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Start a hold for `name`, or refresh it if already active
    pub async fn start_or_refresh(&self, name: &str, code: CommandCode) -> HoldTransition {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(name) {
            entry.last_update = now;
            debug!("[HOLD] Refreshed {}", name);
            return HoldTransition::Refreshed;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(hold_loop(
            self.link.clone(),
            name.to_string(),
            code,
            self.config.write_interval,
            cancel.clone(),
        ));

        entries.insert(
            name.to_string(),
            ContinuousEntry {
                task,
                cancel,
                last_update: now,
            },
        );
        info!("[HOLD] Started continuous command: {}", name);
        HoldTransition::Started
    }

    /// Release every hold whose refresh window has elapsed
    ///
    /// Released loops are cancelled under the table lock and joined after it
    /// is dropped, so the dispatcher is never held up by a loop winding down.
    /// Entries whose loop already ended are reaped too. Returns the released
    /// names once every released loop has exited.
    pub async fn expire_stale(&self) -> Vec<String> {
        let now = Instant::now();
        let released: Vec<(String, JoinHandle<()>)> = {
            let mut entries = self.entries.write().await;

            let stale: Vec<String> = entries
                .iter()
                .filter(|(_, e)| {
                    now.duration_since(e.last_update) > self.config.refresh_window
                        || e.task.is_finished()
                })
                .map(|(name, _)| name.clone())
                .collect();

            stale
                .into_iter()
                .filter_map(|name| entries.remove(&name).map(|entry| (name, entry.stop())))
                .collect()
        };

        let mut names = Vec::with_capacity(released.len());
        for (name, task) in released {
            join_stopped(&name, task).await;
            names.push(name);
        }
        names
    }

    /// Whether a hold is active for `name`
    pub async fn is_active(&self, name: &str) -> bool {
        self.entries.read().await.contains_key(name)
    }

    /// Number of active holds
    pub async fn active_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Release every hold (used on shutdown)
    pub async fn shutdown(&self) {
        let released: Vec<(String, JoinHandle<()>)> = self
            .entries
            .write()
            .await
            .drain()
            .map(|(name, entry)| (name, entry.stop()))
            .collect();

        for (name, task) in released {
            join_stopped(&name, task).await;
        }
    }

    /// Start the scan loop in the background
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Scan for stale holds forever
    pub async fn run(&self) {
        let mut ticker = interval(self.config.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.expire_stale().await;
        }
    }
}

impl ContinuousEntry {
    /// Signal the writer loop to stop; it sends nothing after this
    fn stop(self) -> JoinHandle<()> {
        self.cancel.cancel();
        self.task
    }
}

async fn join_stopped(name: &str, task: JoinHandle<()>) {
    match task.await {
        Ok(()) => info!("[HOLD] Stopped continuous command: {}", name),
        Err(e) => error!("[HOLD] Continuous command {} ended abnormally: {}", name, e),
    }
}

/// Writer loop for one hold: write, wait, repeat until cancelled
async fn hold_loop(
    link: Arc<LinkManager>,
    name: String,
    code: CommandCode,
    write_interval: Duration,
    cancel: CancellationToken,
) {
    let frame = encode(code);

    while !cancel.is_cancelled() {
        if link.write_until(&frame, &cancel).await == WriteOutcome::Cancelled {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(write_interval) => {}
        }
    }

    debug!("[HOLD] Writer loop for {} exited", name);
}
