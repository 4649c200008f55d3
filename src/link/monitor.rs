//! Liveness monitor
//!
//! Periodically checks the link and reconnects it when it has dropped.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use super::LinkManager;

pub struct LivenessMonitor {
    link: Arc<LinkManager>,
    check_interval: Duration,
}

impl LivenessMonitor {
    pub fn new(link: Arc<LinkManager>, check_interval: Duration) -> Self {
        Self {
            link,
            check_interval,
        }
    }

    /// Run one check, reconnecting if needed. Returns the resulting state.
    pub async fn check(&self) -> bool {
        if self.link.is_connected().await {
            return true;
        }

        warn!("[LIVENESS] Link disconnected, attempting reconnect...");
        self.link.connect().await;
        self.link.is_connected().await
    }

    /// Start the monitoring loop in the background
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Check forever at the configured cadence
    pub async fn run(&self) {
        info!("[LIVENESS] Checking link every {:?}", self.check_interval);
        let mut ticker = interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.check().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkConfig;
    use crate::transport::mock::RecordingTransport;

    #[tokio::test]
    async fn test_check_reconnects_dropped_link() {
        let transport = Arc::new(RecordingTransport::new());
        let link = Arc::new(LinkManager::new(transport.clone(), LinkConfig::default()));
        let monitor = LivenessMonitor::new(link.clone(), Duration::from_secs(5));

        assert!(monitor.check().await);
        assert_eq!(transport.connect_calls(), 1);

        // Healthy link is left alone
        assert!(monitor.check().await);
        assert_eq!(transport.connect_calls(), 1);

        transport.drop_link();
        assert!(monitor.check().await);
        assert_eq!(transport.connect_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_keeps_retrying() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail_next_connects(2);
        let link = Arc::new(LinkManager::new(transport.clone(), LinkConfig::default()));
        let handle = LivenessMonitor::new(link.clone(), Duration::from_secs(5)).spawn();

        // Ticks at 0s, 5s and 10s; the third attempt succeeds
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert!(link.is_connected().await);
        assert_eq!(transport.connect_calls(), 3);

        handle.abort();
    }
}
