// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// DSC keybus to MQTT bridge
//
//! # dsc-keybus-bridge
//!
//! Bridges a DSC PowerSeries security panel, read through a keybus decoding
//! engine, to an MQTT broker: panel state is published on retained topics and
//! arm/disarm commands received on a single command topic are written back
//! through the virtual keypad.
//!
//! The bridge runs as one cooperative loop. Each [`Bridge::tick`] keeps the
//! broker session alive, folds keybus traffic into the [`PanelStatus`] model,
//! handles at most one inbound command and publishes whatever changed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dsc_keybus_bridge::{
//!     Bridge, BridgeConfig, HostLink, MonotonicClock, RumqttTransport, SimulatedPanel,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig::builder()
//!         .broker("192.168.1.1", 1883)
//!         .access_code("1234")
//!         .partitions(2)
//!         .build();
//!
//!     let panel = SimulatedPanel::new(config.partitions, config.access_code.as_str(), 30);
//!     let mut bridge = Bridge::new(
//!         &config,
//!         RumqttTransport::default(),
//!         panel,
//!         HostLink::new(),
//!         MonotonicClock::new(),
//!     )?;
//!
//!     let mut ticker = tokio::time::interval(std::time::Duration::from_millis(1));
//!     loop {
//!         tokio::select! {
//!             _ = ticker.tick() => { bridge.tick().await; }
//!             _ = tokio::signal::ctrl_c() => break,
//!         }
//!     }
//!     bridge.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod command;
pub mod config;
pub mod devices;
pub mod discovery;
pub mod error;
pub mod keybus;
pub mod publisher;
pub mod status;
pub mod supervisor;
pub mod timer;
pub mod topics;
pub mod transport;

// Re-exports for convenience
pub use bridge::{Bridge, TickReport};
pub use command::{Action, CommandDispatcher, Dispatch, InboundCommand, WriteQueue};
pub use config::{BridgeConfig, BridgeConfigBuilder, DiscoveryConfig};
pub use devices::{ArmState, PartitionChanges, PartitionFlags, PartitionStatus, SystemStatus};
pub use discovery::DiscoveryPublisher;
pub use error::{BridgeError, Result};
pub use keybus::{Keybus, SimInput, SimulatedPanel};
pub use publisher::{PublishReport, StatusPublisher};
pub use status::PanelStatus;
pub use supervisor::{ConnectionPhase, ConnectionSupervisor, SupervisorTick};
pub use timer::{Clock, Countdown, ManualClock, MonotonicClock};
pub use topics::{OutboundMessage, Topics};
pub use transport::{
    ConnectRequest, HostLink, InboundMessage, LinkLayer, MqttTransport, Pump, RumqttTransport,
};
