// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Change flags -> MQTT state topics

use tracing::{debug, warn};

use crate::devices::flags::ChangeBank;
use crate::devices::{PartitionChanges, GROUP_SIZE, MAX_PGMS};
use crate::status::PanelStatus;
use crate::topics::{bool_payload, OutboundMessage, Topics, PAYLOAD_OFFLINE, PAYLOAD_ONLINE};
use crate::transport::MqttTransport;

/// Counts from one publish pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub published: usize,
    pub failed: usize,
}

/// Turns set change flags into MQTT publishes.
///
/// A flag is cleared only after its publish succeeded. Payloads depend only on
/// the current status, so a flag left set is simply derived and sent again on
/// the next pass.
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    topics: Topics,
    partitions: u8,
    zones: usize,
}

impl StatusPublisher {
    /// `partitions` and `zone_groups` limit the scan to the configured panel.
    pub fn new(topics: Topics, partitions: u8, zone_groups: u8) -> Self {
        Self {
            topics,
            partitions,
            zones: usize::from(zone_groups) * GROUP_SIZE,
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Publish every pending change in a fixed order: link, trouble,
    /// partitions, zones, PGM outputs.
    pub async fn publish_changes<T: MqttTransport>(
        &self,
        status: &mut PanelStatus,
        transport: &mut T,
    ) -> PublishReport {
        let mut report = PublishReport::default();

        if status.system.buffer_overflowed {
            warn!("Keybus buffer overflow, panel events were lost");
            status.system.buffer_overflowed = false;
        }

        if status.system.link_changed {
            let payload = if status.system.link_connected { PAYLOAD_ONLINE } else { PAYLOAD_OFFLINE };
            let msg = OutboundMessage::retained(self.topics.available(), payload);
            if send(transport, Some(msg), &mut report).await {
                status.system.link_changed = false;
            }
        }

        if status.system.trouble_changed {
            let msg = OutboundMessage::retained(self.topics.trouble(), bool_payload(status.system.trouble));
            if send(transport, Some(msg), &mut report).await {
                status.system.trouble_changed = false;
            }
        }

        for id in 1..=self.partitions {
            self.publish_partition(id, status, transport, &mut report).await;
        }

        if status.zones.is_pending() {
            let topics = &self.topics;
            publish_bank(transport, &mut status.zones, self.zones, |n| topics.zone(n), &mut report)
                .await;
        }

        if status.pgms.is_pending() {
            let topics = &self.topics;
            publish_bank(transport, &mut status.pgms, MAX_PGMS, |n| topics.pgm(n), &mut report)
                .await;
        }

        report
    }

    async fn publish_partition<T: MqttTransport>(
        &self,
        id: u8,
        status: &mut PanelStatus,
        transport: &mut T,
        report: &mut PublishReport,
    ) {
        let Some(partition) = status.partition_mut(id) else {
            return;
        };
        if partition.is_disabled() || partition.changes.is_empty() {
            return;
        }
        let state_topic = self.topics.partition(id);

        let armed_handled = partition.is_changed(PartitionChanges::ARMED);
        if armed_handled {
            let msg = partition
                .armed_state()
                .map(|s| OutboundMessage::retained(state_topic.as_str(), s.as_payload()));
            if send(transport, msg, report).await {
                partition.clear_changed(PartitionChanges::ARMED);
            }
        }

        if partition.is_changed(PartitionChanges::EXIT_DELAY) {
            let msg = partition
                .exit_delay_state()
                .map(|s| OutboundMessage::retained(state_topic.as_str(), s.as_payload()));
            if send(transport, msg, report).await {
                partition.clear_changed(PartitionChanges::EXIT_DELAY);
            }
        }

        if partition.is_changed(PartitionChanges::ALARM) {
            let msg = partition
                .alarm_state(armed_handled)
                .map(|s| OutboundMessage::retained(state_topic.as_str(), s.as_payload()));
            if send(transport, msg, report).await {
                partition.clear_changed(PartitionChanges::ALARM);
            }
        }

        if partition.is_changed(PartitionChanges::FIRE) {
            let msg = OutboundMessage::transient(self.topics.fire(id), bool_payload(partition.is_fire()));
            if send(transport, Some(msg), report).await {
                partition.clear_changed(PartitionChanges::FIRE);
            }
        }
    }
}

/// Publish `msg` if there is one. Returns whether the matching flag may be
/// cleared: the publish succeeded, or nothing had to be sent.
async fn send<T: MqttTransport>(
    transport: &mut T,
    msg: Option<OutboundMessage>,
    report: &mut PublishReport,
) -> bool {
    let Some(msg) = msg else {
        return true;
    };
    match transport.publish(&msg).await {
        Ok(()) => {
            debug!("MQTT out: {} {}", msg.topic, msg.payload);
            report.published += 1;
            true
        }
        Err(e) => {
            debug!("MQTT out failed: {} {}: {e}", msg.topic, msg.payload);
            report.failed += 1;
            false
        }
    }
}

/// Publish each changed entity below `limit`, clearing its flag right after
/// its own publish succeeds. The category stays pending unless every changed
/// entity went out, including any beyond `limit` that were never scanned.
async fn publish_bank<T, F, const N: usize>(
    transport: &mut T,
    bank: &mut ChangeBank<N>,
    limit: usize,
    topic: F,
    report: &mut PublishReport,
) where
    T: MqttTransport,
    F: Fn(u32) -> String,
{
    let changed: Vec<usize> = bank.changed().iter_set_in_range(0..limit).collect();
    let mut all_sent = true;

    for index in changed {
        let msg = OutboundMessage::retained(topic(index as u32 + 1), bool_payload(bank.state(index)));
        if send(transport, Some(msg), report).await {
            bank.clear_changed(index);
        } else {
            all_sent = false;
        }
    }

    if all_sent && !bank.changed().any_set_in_range(limit..N) {
        bank.clear_pending();
    }
}
