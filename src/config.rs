// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Bridge configuration

use std::collections::HashMap;

use crate::devices::{MAX_PARTITIONS, MAX_PGMS, MAX_ZONE_GROUPS};
use crate::error::{BridgeError, Result};

/// Home Assistant MQTT discovery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub enabled: bool,
    /// Discovery topic prefix (default: homeassistant)
    pub prefix: String,
    /// Node id used in discovery topics and unique ids
    pub node_id: String,
    /// PGM outputs 1..=N announced as binary sensors
    pub pgm_outputs: u8,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            prefix: "homeassistant".to_string(),
            node_id: "alarmsys".to_string(),
            pgm_outputs: 0,
        }
    }
}

/// Configuration for the keybus-to-MQTT bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// MQTT client identity
    pub client_id: String,
    /// Broker host name or address
    pub broker_host: String,
    /// Broker TCP port (default: 1883)
    pub broker_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// MQTT keep-alive in seconds (default: 60)
    pub keep_alive_secs: u64,
    /// How long a single connect attempt may wait for CONNACK
    pub connect_timeout_ms: u64,
    /// Prefix for every topic (default: alarmsys)
    pub topic_prefix: String,
    /// Access code written to disarm or when the panel prompts for one
    pub access_code: String,
    /// Partition used when a command has no partition prefix
    pub default_partition: u8,
    /// Number of active partitions (1-8)
    pub partitions: u8,
    /// Number of active zone groups, 8 zones each (1-8)
    pub zone_groups: u8,
    /// Panel writes that may wait for the keybus to become write-ready
    pub write_queue_capacity: usize,
    /// Broker reconnect back-off, in clock ticks (milliseconds)
    pub retry_interval_ms: u32,
    pub discovery: DiscoveryConfig,
    /// Friendly zone names, keyed by 1-based zone number
    pub zone_names: HashMap<u32, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            client_id: "alarmsys".to_string(),
            broker_host: "192.168.1.1".to_string(),
            broker_port: 1883,
            username: None,
            password: None,
            keep_alive_secs: 60,
            connect_timeout_ms: 5000,
            topic_prefix: "alarmsys".to_string(),
            access_code: String::new(),
            default_partition: 1,
            partitions: 1,
            zone_groups: MAX_ZONE_GROUPS as u8,
            write_queue_capacity: 4,
            retry_interval_ms: 2000,
            discovery: DiscoveryConfig::default(),
            zone_names: HashMap::new(),
        }
    }
}

impl BridgeConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Check ranges that the rest of the bridge relies on.
    pub fn validate(&self) -> Result<()> {
        let max_partitions = MAX_PARTITIONS as u8;
        if !(1..=max_partitions).contains(&self.partitions) {
            return Err(BridgeError::InvalidConfig {
                details: format!("partitions must be 1-{max_partitions}, got {}", self.partitions),
            });
        }
        if !(1..=self.partitions).contains(&self.default_partition) {
            return Err(BridgeError::InvalidPartition {
                id: self.default_partition,
                max: self.partitions,
            });
        }
        if !(1..=MAX_ZONE_GROUPS as u8).contains(&self.zone_groups) {
            return Err(BridgeError::InvalidConfig {
                details: format!("zone_groups must be 1-{MAX_ZONE_GROUPS}, got {}", self.zone_groups),
            });
        }
        if self.topic_prefix.is_empty() || self.topic_prefix.contains(['#', '+']) {
            return Err(BridgeError::InvalidConfig {
                details: format!("invalid topic prefix: {:?}", self.topic_prefix),
            });
        }
        if usize::from(self.discovery.pgm_outputs) > MAX_PGMS {
            return Err(BridgeError::InvalidConfig {
                details: format!("discovery.pgm_outputs must be 0-{MAX_PGMS}"),
            });
        }
        if self.write_queue_capacity == 0 {
            return Err(BridgeError::InvalidConfig {
                details: "write_queue_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Friendly name for a zone, falling back to "Zone N".
    pub fn zone_label(&self, zone: u32) -> String {
        self.zone_names
            .get(&zone)
            .cloned()
            .unwrap_or_else(|| format!("Zone {zone}"))
    }
}

/// Builder for BridgeConfig.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = id.into();
        self
    }

    pub fn broker(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.broker_host = host.into();
        self.config.broker_port = port;
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.config.keep_alive_secs = secs;
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.topic_prefix = prefix.into();
        self
    }

    pub fn access_code(mut self, code: impl Into<String>) -> Self {
        self.config.access_code = code.into();
        self
    }

    pub fn default_partition(mut self, partition: u8) -> Self {
        self.config.default_partition = partition;
        self
    }

    pub fn partitions(mut self, count: u8) -> Self {
        self.config.partitions = count;
        self
    }

    pub fn zone_groups(mut self, groups: u8) -> Self {
        self.config.zone_groups = groups;
        self
    }

    pub fn write_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.write_queue_capacity = capacity;
        self
    }

    pub fn retry_interval_ms(mut self, ms: u32) -> Self {
        self.config.retry_interval_ms = ms;
        self
    }

    pub fn discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.config.discovery = discovery;
        self
    }

    pub fn zone_name(mut self, zone: u32, name: impl Into<String>) -> Self {
        self.config.zone_names.insert(zone, name.into());
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}
