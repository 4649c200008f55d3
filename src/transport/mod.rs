pub mod gatt;
#[cfg(test)]
pub mod mock;
pub mod traits;

pub use gatt::{GattConfig, GattTransport};
pub use traits::{LinkError, LinkTransport};
