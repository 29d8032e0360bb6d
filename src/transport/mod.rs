// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Broker and network collaborators

pub mod link;
pub mod mqtt;

use std::time::Duration;

use crate::error::Result;
use crate::topics::OutboundMessage;

pub use link::{HostLink, LinkLayer};
pub use mqtt::RumqttTransport;

/// Everything a transport needs for one connect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
    /// Published by the broker if the session drops without a clean disconnect
    pub last_will: OutboundMessage,
}

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self { topic: topic.into(), payload: payload.into() }
    }
}

/// Result of servicing the transport once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pump {
    /// Whether the broker session is still up
    pub connected: bool,
    /// At most one inbound message per pump
    pub message: Option<InboundMessage>,
}

/// MQTT client seen by the bridge.
///
/// Implementations must not block: `pump` returns immediately with whatever
/// traffic has already arrived.
#[allow(async_fn_in_trait)]
pub trait MqttTransport {
    /// One connect attempt. `Ok` means the broker accepted the session.
    async fn connect(&mut self, request: &ConnectRequest) -> Result<()>;

    fn is_connected(&self) -> bool;

    async fn subscribe(&mut self, topic: &str) -> Result<()>;

    /// `Ok` means the client accepted the message for delivery.
    async fn publish(&mut self, message: &OutboundMessage) -> Result<()>;

    /// Service keep-alive and inbound traffic.
    async fn pump(&mut self) -> Pump;

    async fn disconnect(&mut self) -> Result<()>;
}
