//! BLE GATT transport using BlueZ

use crate::transport::traits::{LinkError, LinkTransport};
use async_trait::async_trait;
use bluer::gatt::remote::Characteristic;
use bluer::{Adapter, AdapterEvent, Address, Device, Uuid};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tokio::time::timeout;
use tracing::{debug, info};

/// Default controller address
pub const DEFAULT_DEVICE_ADDRESS: [u8; 6] = [0xD0, 0x87, 0x18, 0xBA, 0x53, 0xBC];

/// Default write characteristic
pub const DEFAULT_WRITE_CHAR_UUID: Uuid = Uuid::from_u128(0x0000ffe9_0000_1000_8000_00805f9b34fb);

/// Poll period while waiting for service resolution
const SERVICES_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for the GATT transport
#[derive(Debug, Clone)]
pub struct GattConfig {
    /// Controller MAC address
    pub address: Address,
    /// Characteristic that accepts command frames
    pub write_char: Uuid,
    /// How long to scan when the adapter does not know the device yet
    pub discovery_timeout: Duration,
    /// How long to wait for GATT services after connecting
    pub services_timeout: Duration,
}

impl Default for GattConfig {
    fn default() -> Self {
        Self {
            address: Address::new(DEFAULT_DEVICE_ADDRESS),
            write_char: DEFAULT_WRITE_CHAR_UUID,
            discovery_timeout: Duration::from_secs(5),
            services_timeout: Duration::from_secs(3),
        }
    }
}

/// Handles kept while the session is up
struct GattSession {
    device: Device,
    characteristic: Characteristic,
}

/// Writes frames to a single characteristic on a BLE peripheral
pub struct GattTransport {
    config: GattConfig,
    adapter: OnceCell<Adapter>,
    session: RwLock<Option<GattSession>>,
}

impl GattTransport {
    pub fn new(config: GattConfig) -> Self {
        Self {
            config,
            adapter: OnceCell::new(),
            session: RwLock::new(None),
        }
    }

    /// Get the default adapter, powering it on the first time
    async fn adapter(&self) -> Result<&Adapter, LinkError> {
        self.adapter
            .get_or_try_init(|| async {
                let session = bluer::Session::new().await?;
                let adapter = session.default_adapter().await?;
                adapter.set_powered(true).await?;
                info!("[BLE] Using adapter {}", adapter.name());
                Ok::<_, LinkError>(adapter)
            })
            .await
    }

    /// Resolve the device, scanning for it if the adapter has not seen it
    async fn find_device(&self, adapter: &Adapter) -> Result<Device, LinkError> {
        let addr = self.config.address;

        if adapter.device_addresses().await?.contains(&addr) {
            return Ok(adapter.device(addr)?);
        }

        debug!("[BLE] {} unknown to adapter, scanning", addr);
        let discover = adapter.discover_devices().await?;
        tokio::pin!(discover);

        let found = timeout(self.config.discovery_timeout, async {
            while let Some(evt) = discover.next().await {
                if let AdapterEvent::DeviceAdded(seen) = evt {
                    if seen == addr {
                        return true;
                    }
                }
            }
            false
        })
        .await;

        match found {
            Ok(true) => Ok(adapter.device(addr)?),
            _ => Err(LinkError::DeviceNotFound(addr.to_string())),
        }
    }

    /// Locate the write characteristic once services are resolved
    async fn find_characteristic(&self, device: &Device) -> Result<Characteristic, LinkError> {
        let resolved = timeout(self.config.services_timeout, async {
            while !device.is_services_resolved().await? {
                tokio::time::sleep(SERVICES_POLL_INTERVAL).await;
            }
            Ok::<_, LinkError>(())
        })
        .await;

        match resolved {
            Ok(result) => result?,
            Err(_) => return Err(LinkError::Timeout("waiting for GATT services")),
        }

        for service in device.services().await? {
            for characteristic in service.characteristics().await? {
                if characteristic.uuid().await? == self.config.write_char {
                    return Ok(characteristic);
                }
            }
        }

        Err(LinkError::CharacteristicNotFound(
            self.config.write_char.to_string(),
        ))
    }
}

#[async_trait]
impl LinkTransport for GattTransport {
    async fn connect(&self) -> Result<(), LinkError> {
        let mut session = self.session.write().await;

        if let Some(ref s) = *session {
            if s.device.is_connected().await.unwrap_or(false) {
                return Ok(());
            }
        }
        *session = None;

        let adapter = self.adapter().await?;
        let device = self.find_device(adapter).await?;

        if !device.is_connected().await? {
            device.connect().await?;
        }

        let characteristic = self.find_characteristic(&device).await?;
        info!("[BLE] Connected to {}", self.config.address);

        *session = Some(GattSession {
            device,
            characteristic,
        });
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        match &*self.session.read().await {
            Some(s) => s.device.is_connected().await.unwrap_or(false),
            None => false,
        }
    }

    async fn write(&self, frame: &[u8]) -> Result<(), LinkError> {
        let session = self.session.read().await;
        let s = session.as_ref().ok_or(LinkError::NotConnected)?;
        s.characteristic.write(frame).await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), LinkError> {
        if let Some(s) = self.session.write().await.take() {
            s.device.disconnect().await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "BLE"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GattConfig::default();
        assert_eq!(config.address.to_string(), "D0:87:18:BA:53:BC");
        assert_eq!(
            config.write_char.to_string(),
            "0000ffe9-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(config.discovery_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_connect_phases_fit_link_timeout() {
        let gatt = GattConfig::default();
        let link = crate::link::LinkConfig::default();
        assert!(gatt.discovery_timeout + gatt.services_timeout < link.connect_timeout);
    }

    #[tokio::test]
    async fn test_write_without_session_fails() {
        let transport = GattTransport::new(GattConfig::default());
        assert!(!transport.is_connected().await);
        assert!(matches!(
            transport.write(&[0u8; 8]).await,
            Err(LinkError::NotConnected)
        ));
    }
}
