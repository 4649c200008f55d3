//! MQTT subscriber feeding the command dispatcher

use bytes::Bytes;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Configuration for the command bus
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Topic carrying bed commands
    pub topic: String,
    /// MQTT client identifier
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
    /// Wait after a broker error before polling again
    pub reconnect_delay: Duration,
    /// Capacity of the channel into the dispatcher
    pub channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 1883,
            topic: "home/bed/command".into(),
            client_id: "bed-bridge".into(),
            username: None,
            password: None,
            keep_alive: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(2),
            channel_capacity: 64,
        }
    }
}

impl BusConfig {
    fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            options.set_credentials(username, password);
        }
        options
    }
}

/// Subscribes to the command topic and forwards payloads in arrival order
pub struct MqttBus {
    config: BusConfig,
}

impl MqttBus {
    pub fn new(config: BusConfig) -> Self {
        Self { config }
    }

    /// Start the bus loop in the background
    pub fn spawn(self, tx: mpsc::Sender<Bytes>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(tx).await })
    }

    /// Poll the broker until the dispatcher side of `tx` is dropped
    pub async fn run(&self, tx: mpsc::Sender<Bytes>) {
        let (client, mut eventloop) = AsyncClient::new(self.config.mqtt_options(), 10);
        info!(
            "[BUS] Connecting to {}:{} as {}",
            self.config.host, self.config.port, self.config.client_id
        );

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("[BUS] Connected to broker");
                    // Subscriptions do not survive a clean-session reconnect
                    match client.subscribe(&self.config.topic, QoS::AtMostOnce).await {
                        Ok(()) => info!("[BUS] Subscribed to MQTT topic: {}", self.config.topic),
                        Err(e) => error!("[BUS] Subscribe failed: {}", e),
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    debug!("[BUS] Message on {}", publish.topic);
                    if tx.send(publish.payload).await.is_err() {
                        info!("[BUS] Dispatcher gone, stopping");
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("[BUS] Broker error: {}", e);
                    tokio::time::sleep(self.config.reconnect_delay).await;
                }
            }
        }
    }
}
