//! Transport trait abstraction for the actuator link

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a link transport
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] bluer::Error),

    #[error("Device {0} not found")]
    DeviceNotFound(String),

    #[error("Characteristic {0} not found on device")]
    CharacteristicNotFound(String),

    #[error("Timed out {0}")]
    Timeout(&'static str),

    #[error("Not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// A write-only session to the actuator controller
///
/// Implementations own their connection state; callers go through
/// [`LinkManager`](crate::link::LinkManager) and never hold the session.
#[async_trait]
pub trait LinkTransport: Send + Sync {
    /// Establish the session
    async fn connect(&self) -> Result<(), LinkError>;

    /// Current session state
    async fn is_connected(&self) -> bool;

    /// Write one complete frame
    async fn write(&self, frame: &[u8]) -> Result<(), LinkError>;

    /// Tear the session down
    async fn disconnect(&self) -> Result<(), LinkError>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
