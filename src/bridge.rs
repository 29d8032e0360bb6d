// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Cooperative main loop tying the components together

use tracing::{debug, info, warn};

use crate::command::{CommandDispatcher, Dispatch};
use crate::config::BridgeConfig;
use crate::discovery::DiscoveryPublisher;
use crate::error::Result;
use crate::keybus::Keybus;
use crate::publisher::{PublishReport, StatusPublisher};
use crate::status::PanelStatus;
use crate::supervisor::ConnectionSupervisor;
use crate::timer::Clock;
use crate::topics::{OutboundMessage, Topics, PAYLOAD_OFFLINE};
use crate::transport::{LinkLayer, MqttTransport};

/// What happened during one [`Bridge::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub connected: bool,
    pub newly_connected: bool,
    /// Outcome of the inbound command handled this tick, if any
    pub dispatch: Option<Dispatch>,
    /// Queued keypad writes issued this tick
    pub flushed: usize,
    pub publish: PublishReport,
}

/// The whole bridge: status model, components and collaborators.
///
/// Each [`Bridge::tick`] runs one pass in a fixed order: connection
/// supervision, keybus poll, inbound command, access-code prompt, queued
/// writes, status publish, pending discovery documents, back-off timer and
/// link upkeep. No step waits on the panel or the broker.
pub struct Bridge<T, K, L, C> {
    status: PanelStatus,
    supervisor: ConnectionSupervisor,
    publisher: StatusPublisher,
    dispatcher: CommandDispatcher,
    discovery: DiscoveryPublisher,
    command_topic: String,
    transport: T,
    keybus: K,
    link: L,
    clock: C,
}

impl<T, K, L, C> Bridge<T, K, L, C>
where
    T: MqttTransport,
    K: Keybus,
    L: LinkLayer,
    C: Clock,
{
    pub fn new(config: &BridgeConfig, transport: T, keybus: K, link: L, clock: C) -> Result<Self> {
        config.validate()?;
        let topics = Topics::new(config.topic_prefix.as_str());
        let mut status = PanelStatus::new();
        status.write_partition = config.default_partition;

        Ok(Self {
            status,
            supervisor: ConnectionSupervisor::new(config, topics.clone()),
            publisher: StatusPublisher::new(topics.clone(), config.partitions, config.zone_groups),
            dispatcher: CommandDispatcher::new(
                config.default_partition,
                config.partitions,
                config.access_code.as_str(),
                config.write_queue_capacity,
            ),
            discovery: DiscoveryPublisher::new(config, &topics)?,
            command_topic: topics.command(),
            transport,
            keybus,
            link,
            clock,
        })
    }

    pub fn status(&self) -> &PanelStatus {
        &self.status
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor {
        &self.supervisor
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn keybus(&self) -> &K {
        &self.keybus
    }

    pub fn keybus_mut(&mut self) -> &mut K {
        &mut self.keybus
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Run one pass of the main loop.
    pub async fn tick(&mut self) -> TickReport {
        let session = self.supervisor.tick(&mut self.transport, &mut self.link).await;
        let mut report = TickReport {
            connected: session.connected,
            newly_connected: session.newly_connected,
            ..Default::default()
        };
        if session.newly_connected {
            self.discovery.reset();
        }

        self.keybus.poll(&mut self.status);

        if let Some(message) = session.inbound {
            if message.topic == self.command_topic {
                report.dispatch =
                    Some(self.dispatcher.dispatch(&message.payload, &mut self.status, &mut self.keybus));
            } else {
                debug!("MQTT: ignoring message on {}", message.topic);
            }
        }

        if self.status.system.access_code_prompt {
            let partition = self.status.write_partition;
            match self.dispatcher.submit_access_code(partition, &mut self.status, &mut self.keybus) {
                Dispatch::Written | Dispatch::Queued => {
                    debug!("Access code sent for partition {partition}");
                    self.status.system.access_code_prompt = false;
                }
                _ => {}
            }
        }

        report.flushed = self.dispatcher.flush(&mut self.status, &mut self.keybus);

        // Every publish would fail while disconnected; the flags stay set either way.
        if session.connected {
            report.publish = self.publisher.publish_changes(&mut self.status, &mut self.transport).await;
            if self.discovery.has_pending() {
                self.discovery.publish_pending(&mut self.transport).await;
            }
        }

        self.supervisor.advance_timer(self.clock.now_ms());
        self.link.maintain();
        report
    }

    /// Announce `offline` and close the broker session.
    ///
    /// A clean disconnect does not trigger the last will, so the offline
    /// state is published explicitly first.
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.transport.is_connected() {
            return Ok(());
        }
        let offline = OutboundMessage::retained(self.publisher.topics().available(), PAYLOAD_OFFLINE);
        if let Err(e) = self.transport.publish(&offline).await {
            warn!("MQTT: failed to publish offline state: {e}");
        }
        self.transport.disconnect().await?;
        info!("MQTT: disconnected");
        Ok(())
    }
}
