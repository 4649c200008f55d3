mod bus;
mod command;
mod config;
mod link;
mod transport;

use bus::MqttBus;
use command::{CommandDispatcher, ContinuousSupervisor};
use config::BridgeConfig;
use link::{LinkEvent, LinkManager, LivenessMonitor};
use std::sync::Arc;
use tokio::sync::mpsc;
use transport::GattTransport;

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = BridgeConfig::from_env()?;

    info!("Bed bridge starting");
    info!("  Controller: {} (char {})", config.gatt.address, config.gatt.write_char);
    info!("  Broker: {}:{} topic {}", config.bus.host, config.bus.port, config.bus.topic);

    let transport = Arc::new(GattTransport::new(config.gatt.clone()));
    let link = Arc::new(LinkManager::new(transport, config.link.clone()));

    // Log link state changes
    let mut link_events = link.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = link_events.recv().await {
            match event {
                LinkEvent::Connected => debug!("[MAIN] Link up"),
                LinkEvent::Disconnected { reason } => warn!("[MAIN] Link dropped: {}", reason),
                LinkEvent::ConnectFailed { reason } => debug!("[MAIN] Link connect failed: {}", reason),
            }
        }
    });

    link.connect().await;

    let supervisor = Arc::new(ContinuousSupervisor::new(
        link.clone(),
        config.supervisor.clone(),
    ));
    let _scan_handle = supervisor.clone().spawn();
    info!("Hold supervisor started");

    let _liveness_handle = LivenessMonitor::new(link.clone(), config.liveness_interval).spawn();
    info!("Liveness monitor started");

    let (bus_tx, bus_rx) = mpsc::channel(config.bus.channel_capacity);
    let _bus_handle = MqttBus::new(config.bus.clone()).spawn(bus_tx);

    let dispatcher = CommandDispatcher::new(link.clone(), supervisor.clone());

    tokio::select! {
        _ = dispatcher.run(bus_rx) => {
            error!("Command bus closed");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        }
    }

    supervisor.shutdown().await;
    link.disconnect().await;
    Ok(())
}
