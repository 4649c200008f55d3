//! Link management for the actuator controller
//!
//! This module handles:
//! - The single session to the controller and its write lock
//! - Reconnection after a failed write
//! - Periodic liveness checks

mod manager;
mod monitor;

pub use manager::{LinkConfig, LinkEvent, LinkManager, WriteOutcome};
pub use monitor::LivenessMonitor;
