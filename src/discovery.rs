// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Home Assistant MQTT discovery documents

use serde::Serialize;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::devices::GROUP_SIZE;
use crate::error::Result;
use crate::topics::{OutboundMessage, Topics, PAYLOAD_ACTIVE, PAYLOAD_IDLE, PAYLOAD_OFFLINE, PAYLOAD_ONLINE};
use crate::transport::MqttTransport;

#[derive(Debug, Serialize)]
struct DeviceInfo<'a> {
    identifiers: [&'a str; 1],
    name: &'static str,
    manufacturer: &'static str,
    model: &'static str,
}

#[derive(Debug, Serialize)]
struct Availability<'a> {
    availability_topic: &'a str,
    payload_available: &'static str,
    payload_not_available: &'static str,
}

#[derive(Debug, Serialize)]
struct AlarmPanelDocument<'a> {
    name: String,
    unique_id: String,
    state_topic: String,
    command_topic: &'a str,
    payload_disarm: String,
    payload_arm_home: String,
    payload_arm_away: String,
    payload_arm_night: String,
    payload_trigger: String,
    supported_features: [&'static str; 4],
    code_arm_required: bool,
    code_disarm_required: bool,
    #[serde(flatten)]
    availability: Availability<'a>,
    device: &'a DeviceInfo<'a>,
}

#[derive(Debug, Serialize)]
struct BinarySensorDocument<'a> {
    name: String,
    unique_id: String,
    state_topic: String,
    payload_on: &'static str,
    payload_off: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_class: Option<&'static str>,
    #[serde(flatten)]
    availability: Availability<'a>,
    device: &'a DeviceInfo<'a>,
}

/// Build every discovery document for `config`, in publish order: partitions,
/// trouble, fire sensors, named zones, then PGM outputs.
///
/// Topics follow `<prefix>/<component>/<node_id>/<object>/config`; all
/// documents are retained.
pub fn discovery_documents(config: &BridgeConfig, topics: &Topics) -> Result<Vec<OutboundMessage>> {
    let node = config.discovery.node_id.as_str();
    let prefix = config.discovery.prefix.as_str();
    let available = topics.available();
    let command = topics.command();
    let device = DeviceInfo {
        identifiers: [node],
        name: "Security System",
        manufacturer: "DSC",
        model: "PowerSeries keybus",
    };
    let availability = || Availability {
        availability_topic: &available,
        payload_available: PAYLOAD_ONLINE,
        payload_not_available: PAYLOAD_OFFLINE,
    };
    let topic = |component: &str, object: &str| format!("{prefix}/{component}/{node}/{object}/config");

    let mut documents = Vec::new();

    for id in 1..=config.partitions {
        let doc = AlarmPanelDocument {
            name: format!("Partition {id}"),
            unique_id: format!("{node}_partition{id}"),
            state_topic: topics.partition(id),
            command_topic: &command,
            payload_disarm: format!("{id}D"),
            payload_arm_home: format!("{id}S"),
            payload_arm_away: format!("{id}A"),
            payload_arm_night: format!("{id}N"),
            payload_trigger: format!("{id}P"),
            supported_features: ["arm_home", "arm_away", "arm_night", "trigger"],
            code_arm_required: false,
            code_disarm_required: false,
            availability: availability(),
            device: &device,
        };
        documents.push(OutboundMessage::retained(
            topic("alarm_control_panel", &format!("partition{id}")),
            serde_json::to_string(&doc)?,
        ));
    }

    let mut sensor = |object: String, name: String, state_topic: String, class: Option<&'static str>| {
        let doc = BinarySensorDocument {
            name,
            unique_id: format!("{node}_{object}"),
            state_topic,
            payload_on: PAYLOAD_ACTIVE,
            payload_off: PAYLOAD_IDLE,
            device_class: class,
            availability: availability(),
            device: &device,
        };
        serde_json::to_string(&doc)
            .map(|payload| documents.push(OutboundMessage::retained(topic("binary_sensor", &object), payload)))
    };

    sensor("trouble".into(), "Trouble".into(), topics.trouble(), Some("problem"))?;
    for id in 1..=config.partitions {
        sensor(format!("fire{id}"), format!("Fire {id}"), topics.fire(id), Some("smoke"))?;
    }

    let zone_limit = u32::from(config.zone_groups) * GROUP_SIZE as u32;
    let mut zones: Vec<_> = config
        .zone_names
        .iter()
        .filter(|(zone, _)| (1..=zone_limit).contains(*zone))
        .collect();
    zones.sort_by_key(|(zone, _)| **zone);
    for (zone, name) in zones {
        sensor(format!("zone{zone}"), name.clone(), topics.zone(*zone), Some("opening"))?;
    }

    for pgm in 1..=u32::from(config.discovery.pgm_outputs) {
        sensor(format!("pgm{pgm}"), format!("PGM {pgm}"), topics.pgm(pgm), None)?;
    }

    Ok(documents)
}

/// Publishes discovery documents after each (re)connect.
///
/// Documents that fail to publish stay pending and are retried on the next
/// call to [`DiscoveryPublisher::publish_pending`].
#[derive(Debug, Clone, Default)]
pub struct DiscoveryPublisher {
    documents: Vec<OutboundMessage>,
    pending: Vec<OutboundMessage>,
}

impl DiscoveryPublisher {
    /// A publisher with nothing to announce when discovery is disabled.
    pub fn new(config: &BridgeConfig, topics: &Topics) -> Result<Self> {
        let documents = if config.discovery.enabled {
            discovery_documents(config, topics)?
        } else {
            Vec::new()
        };
        Ok(Self { documents, pending: Vec::new() })
    }

    pub fn documents(&self) -> &[OutboundMessage] {
        &self.documents
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Queue every document again; called when a broker session starts.
    pub fn reset(&mut self) {
        self.pending = self.documents.clone();
    }

    /// Try each pending document once. Returns how many were published.
    pub async fn publish_pending<T: MqttTransport>(&mut self, transport: &mut T) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let mut remaining = Vec::new();
        let mut published = 0;
        for document in std::mem::take(&mut self.pending) {
            match transport.publish(&document).await {
                Ok(()) => published += 1,
                Err(e) => {
                    debug!("MQTT: discovery document {} deferred: {e}", document.topic);
                    remaining.push(document);
                }
            }
        }
        self.pending = remaining;
        if self.pending.is_empty() {
            info!("Home Assistant discovery published ({} entities)", self.documents.len());
        }
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryConfig;

    fn config() -> BridgeConfig {
        BridgeConfig::builder()
            .partitions(2)
            .zone_groups(2)
            .zone_name(1, "Front Door")
            .zone_name(9, "Hall Motion")
            .zone_name(40, "Out of range")
            .discovery(DiscoveryConfig { enabled: true, pgm_outputs: 1, ..Default::default() })
            .build()
    }

    fn topics_of(docs: &[OutboundMessage]) -> Vec<&str> {
        docs.iter().map(|d| d.topic.as_str()).collect()
    }

    #[test]
    fn test_document_topics_and_order() {
        let docs = discovery_documents(&config(), &Topics::new("alarmsys")).unwrap();
        assert_eq!(
            topics_of(&docs),
            vec![
                "homeassistant/alarm_control_panel/alarmsys/partition1/config",
                "homeassistant/alarm_control_panel/alarmsys/partition2/config",
                "homeassistant/binary_sensor/alarmsys/trouble/config",
                "homeassistant/binary_sensor/alarmsys/fire1/config",
                "homeassistant/binary_sensor/alarmsys/fire2/config",
                "homeassistant/binary_sensor/alarmsys/zone1/config",
                "homeassistant/binary_sensor/alarmsys/zone9/config",
                "homeassistant/binary_sensor/alarmsys/pgm1/config",
            ]
        );
        assert!(docs.iter().all(|d| d.retain));
    }

    #[test]
    fn test_partition_document_commands() {
        let docs = discovery_documents(&config(), &Topics::new("alarmsys")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&docs[1].payload).unwrap();
        assert_eq!(doc["state_topic"], "alarmsys/get/partition2");
        assert_eq!(doc["command_topic"], "alarmsys/set");
        assert_eq!(doc["payload_arm_away"], "2A");
        assert_eq!(doc["payload_disarm"], "2D");
        assert_eq!(doc["availability_topic"], "alarmsys/get/available");
        assert_eq!(doc["device"]["identifiers"][0], "alarmsys");
    }

    #[test]
    fn test_zone_document_uses_configured_name() {
        let docs = discovery_documents(&config(), &Topics::new("alarmsys")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&docs[6].payload).unwrap();
        assert_eq!(doc["name"], "Hall Motion");
        assert_eq!(doc["state_topic"], "alarmsys/get/zone9");
        assert_eq!(doc["device_class"], "opening");
        assert_eq!(doc["unique_id"], "alarmsys_zone9");

        let pgm: serde_json::Value = serde_json::from_str(&docs[7].payload).unwrap();
        assert!(pgm.get("device_class").is_none());
    }

    #[test]
    fn test_disabled_discovery_has_no_documents() {
        let config = BridgeConfig::builder().build();
        let publisher = DiscoveryPublisher::new(&config, &Topics::new("alarmsys")).unwrap();
        assert!(publisher.documents().is_empty());
    }
}
