//! Bedlink Shared Protocol Types
//!
//! This crate provides the frame codec and the static command tables used to
//! drive the bed actuator controller over its write-only characteristic.

pub mod codec;
pub mod registry;

pub use codec::{decode, encode, CodecError, Frame, FRAME_LEN};
pub use registry::{resolve_continuous, resolve_one_shot, CommandCode, OneShotAction};

/// Timing parameters for hold commands and link supervision
pub mod timing {
    /// Maximum gap between `start_<name>` refreshes before a hold is released
    pub const REFRESH_WINDOW_MS: u64 = 300;

    /// Cadence at which an active hold re-sends its frame
    pub const HOLD_WRITE_INTERVAL_MS: u64 = 100;

    /// Cadence of the stale-hold scan
    pub const SUPERVISOR_SCAN_INTERVAL_MS: u64 = 100;

    /// Cadence of the link liveness check
    pub const LIVENESS_CHECK_INTERVAL_MS: u64 = 5000;

    /// Reconnect attempts made right after a failed write
    pub const WRITE_RECONNECT_ATTEMPTS: u32 = 1;
}

#[cfg(test)]
mod tests {
    use super::timing;

    #[test]
    fn test_refresh_window_spans_several_writes() {
        assert!(timing::REFRESH_WINDOW_MS >= 2 * timing::HOLD_WRITE_INTERVAL_MS);
        assert!(timing::SUPERVISOR_SCAN_INTERVAL_MS < timing::REFRESH_WINDOW_MS);
    }
}
