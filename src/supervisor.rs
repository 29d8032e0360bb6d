// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Broker session supervision and reconnect back-off

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::timer::Countdown;
use crate::topics::{OutboundMessage, Topics, PAYLOAD_OFFLINE, PAYLOAD_ONLINE};
use crate::transport::{ConnectRequest, InboundMessage, LinkLayer, MqttTransport};

/// Broker session state as seen by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connected,
}

/// What one supervisor pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorTick {
    pub connected: bool,
    /// The session was established during this pass
    pub newly_connected: bool,
    /// At most one message taken from the transport
    pub inbound: Option<InboundMessage>,
}

/// Keeps the broker session up.
///
/// Connect attempts are paced by a [`Countdown`] so that at most one attempt
/// happens per retry window; every failed attempt also reinitializes the
/// network link. Nothing here is fatal.
#[derive(Debug)]
pub struct ConnectionSupervisor {
    request: ConnectRequest,
    topics: Topics,
    retry_interval: u32,
    countdown: Countdown,
    phase: ConnectionPhase,
    announce_pending: bool,
    failed_attempts: u64,
}

impl ConnectionSupervisor {
    pub fn new(config: &BridgeConfig, topics: Topics) -> Self {
        Self {
            request: connect_request(config, &topics),
            topics,
            retry_interval: config.retry_interval_ms,
            countdown: Countdown::new(),
            phase: ConnectionPhase::Disconnected,
            announce_pending: false,
            failed_attempts: 0,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    pub fn request(&self) -> &ConnectRequest {
        &self.request
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// Step the back-off countdown with the current clock reading.
    pub fn advance_timer(&mut self, now_ms: u64) {
        self.countdown.advance(now_ms);
    }

    /// One supervision pass: connect if due, then pump the session once.
    pub async fn tick<T, L>(&mut self, transport: &mut T, link: &mut L) -> SupervisorTick
    where
        T: MqttTransport,
        L: LinkLayer,
    {
        let mut newly_connected = false;

        if self.phase == ConnectionPhase::Disconnected {
            if !self.countdown.is_elapsed() {
                return SupervisorTick::default();
            }
            if !self.try_connect(transport, link).await {
                return SupervisorTick::default();
            }
            newly_connected = true;
        }

        let pump = transport.pump().await;
        if !pump.connected {
            warn!("MQTT: broker session lost");
            self.phase = ConnectionPhase::Disconnected;
            return SupervisorTick::default();
        }

        if self.announce_pending {
            self.announce(transport).await;
        }

        SupervisorTick { connected: true, newly_connected, inbound: pump.message }
    }

    async fn try_connect<T, L>(&mut self, transport: &mut T, link: &mut L) -> bool
    where
        T: MqttTransport,
        L: LinkLayer,
    {
        debug!(
            "MQTT: connecting to {}:{} as {}",
            self.request.host, self.request.port, self.request.client_id
        );
        let result = match transport.connect(&self.request).await {
            Ok(()) => {
                let command = self.topics.command();
                match transport.subscribe(&command).await {
                    Ok(()) => {
                        info!("MQTT: subscribed to {command}");
                        Ok(())
                    }
                    Err(e) => {
                        if let Err(e) = transport.disconnect().await {
                            debug!("MQTT: disconnect after failed subscribe: {e}");
                        }
                        Err(e)
                    }
                }
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                if self.failed_attempts > 0 {
                    info!("MQTT: connected after {} failed attempts", self.failed_attempts);
                }
                self.failed_attempts = 0;
                self.phase = ConnectionPhase::Connected;
                self.announce_pending = true;
                true
            }
            Err(e) => {
                self.failed_attempts += 1;
                warn!(
                    "MQTT: connect attempt {} failed: {e}. Retrying in {} ticks",
                    self.failed_attempts, self.retry_interval
                );
                self.countdown.start(self.retry_interval);
                link.reinitialize();
                false
            }
        }
    }

    async fn announce<T: MqttTransport>(&mut self, transport: &mut T) {
        let online = OutboundMessage::retained(self.topics.available(), PAYLOAD_ONLINE);
        match transport.publish(&online).await {
            Ok(()) => {
                debug!("MQTT out: {} {}", online.topic, online.payload);
                self.announce_pending = false;
            }
            Err(e) => debug!("MQTT: online announcement deferred: {e}"),
        }
    }
}

/// Connect parameters for `config`, with the offline last will.
pub fn connect_request(config: &BridgeConfig, topics: &Topics) -> ConnectRequest {
    ConnectRequest {
        client_id: config.client_id.clone(),
        host: config.broker_host.clone(),
        port: config.broker_port,
        username: config.username.clone(),
        password: config.password.clone(),
        keep_alive: Duration::from_secs(config.keep_alive_secs),
        connect_timeout: Duration::from_millis(config.connect_timeout_ms),
        last_will: OutboundMessage::retained(topics.available(), PAYLOAD_OFFLINE),
    }
}
