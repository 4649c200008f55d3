//! Command handling for the bed bridge
//!
//! This module handles:
//! - Classifying inbound bus messages
//! - Spawning tap (one-shot) writes
//! - Supervising hold (continuous) commands and expiring them

mod dispatcher;
mod supervisor;

pub use dispatcher::{CommandDispatcher, DispatchOutcome};
pub use supervisor::{ContinuousSupervisor, HoldTransition, SupervisorConfig};
