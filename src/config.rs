//! Process configuration
//!
//! Defaults match the deployed bed; `BEDLINK_*` environment variables
//! override individual values.

use anyhow::{Context, Result};
use bedlink_shared::timing;
use bluer::Uuid;
use std::str::FromStr;
use std::time::Duration;

use crate::bus::BusConfig;
use crate::command::SupervisorConfig;
use crate::link::LinkConfig;
use crate::transport::GattConfig;

/// Everything the bridge needs at startup
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub link: LinkConfig,
    pub gatt: GattConfig,
    pub bus: BusConfig,
    pub supervisor: SupervisorConfig,
    /// Cadence of the link liveness check
    pub liveness_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            gatt: GattConfig::default(),
            bus: BusConfig::default(),
            supervisor: SupervisorConfig::default(),
            liveness_interval: Duration::from_millis(timing::LIVENESS_CHECK_INTERVAL_MS),
        }
    }
}

impl BridgeConfig {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("BEDLINK_BLE_ADDRESS") {
            config.gatt.address = parse("BEDLINK_BLE_ADDRESS", &addr)?;
        }
        if let Some(uuid) = lookup("BEDLINK_WRITE_CHAR") {
            config.gatt.write_char = parse::<Uuid>("BEDLINK_WRITE_CHAR", &uuid)?;
        }
        if let Some(host) = lookup("BEDLINK_MQTT_HOST") {
            config.bus.host = host;
        }
        if let Some(port) = lookup("BEDLINK_MQTT_PORT") {
            config.bus.port = parse("BEDLINK_MQTT_PORT", &port)?;
        }
        if let Some(topic) = lookup("BEDLINK_MQTT_TOPIC") {
            config.bus.topic = topic;
        }
        if let Some(client_id) = lookup("BEDLINK_MQTT_CLIENT_ID") {
            config.bus.client_id = client_id;
        }
        config.bus.username = lookup("BEDLINK_MQTT_USERNAME");
        config.bus.password = lookup("BEDLINK_MQTT_PASSWORD");

        Ok(config)
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {}: {:?}", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluer::Address;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = BridgeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.supervisor.refresh_window, Duration::from_millis(300));
        assert_eq!(config.supervisor.write_interval, Duration::from_millis(100));
        assert_eq!(config.supervisor.scan_interval, Duration::from_millis(100));
        assert_eq!(config.liveness_interval, Duration::from_secs(5));
        assert_eq!(config.link.reconnect_attempts, 1);
        assert!(config.bus.username.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("BEDLINK_BLE_ADDRESS", "00:11:22:33:44:55"),
            ("BEDLINK_MQTT_HOST", "192.168.1.138"),
            ("BEDLINK_MQTT_PORT", "1884"),
            ("BEDLINK_MQTT_USERNAME", "bed"),
            ("BEDLINK_MQTT_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(
            config.gatt.address,
            Address::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55])
        );
        assert_eq!(config.bus.host, "192.168.1.138");
        assert_eq!(config.bus.port, 1884);
        assert_eq!(config.bus.username.as_deref(), Some("bed"));
        assert_eq!(config.bus.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert!(BridgeConfig::from_lookup(lookup(&[("BEDLINK_MQTT_PORT", "http")])).is_err());
        assert!(BridgeConfig::from_lookup(lookup(&[("BEDLINK_BLE_ADDRESS", "nope")])).is_err());
        assert!(BridgeConfig::from_lookup(lookup(&[("BEDLINK_WRITE_CHAR", "ffe9")])).is_err());
    }
}
