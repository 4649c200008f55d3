//! Inbound command bus

mod mqtt;

pub use mqtt::{BusConfig, MqttBus};
