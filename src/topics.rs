// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// MQTT topic scheme and outbound messages

pub const PAYLOAD_ONLINE: &str = "online";
pub const PAYLOAD_OFFLINE: &str = "offline";
pub const PAYLOAD_ACTIVE: &str = "1";
pub const PAYLOAD_IDLE: &str = "0";

/// A single message to publish. Built and consumed within one publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

impl OutboundMessage {
    pub fn retained(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self { topic: topic.into(), payload: payload.into(), retain: true }
    }

    pub fn transient(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self { topic: topic.into(), payload: payload.into(), retain: false }
    }
}

/// `"1"` / `"0"` for a boolean state.
pub fn bool_payload(active: bool) -> &'static str {
    if active { PAYLOAD_ACTIVE } else { PAYLOAD_IDLE }
}

/// Topic names derived from the configured prefix.
///
/// Entity numbers passed in are 1-based and rendered in plain decimal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
}

impl Topics {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn available(&self) -> String {
        format!("{}/get/available", self.prefix)
    }

    pub fn trouble(&self) -> String {
        format!("{}/get/trouble", self.prefix)
    }

    pub fn partition(&self, partition: u8) -> String {
        format!("{}/get/partition{partition}", self.prefix)
    }

    pub fn fire(&self, partition: u8) -> String {
        format!("{}/get/fire{partition}", self.prefix)
    }

    pub fn zone(&self, zone: u32) -> String {
        format!("{}/get/zone{zone}", self.prefix)
    }

    pub fn pgm(&self, pgm: u32) -> String {
        format!("{}/get/pgm{pgm}", self.prefix)
    }

    /// The single subscribed command topic.
    pub fn command(&self) -> String {
        format!("{}/set", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_scheme() {
        let topics = Topics::new("alarmsys");
        assert_eq!(topics.available(), "alarmsys/get/available");
        assert_eq!(topics.trouble(), "alarmsys/get/trouble");
        assert_eq!(topics.partition(1), "alarmsys/get/partition1");
        assert_eq!(topics.fire(8), "alarmsys/get/fire8");
        assert_eq!(topics.zone(9), "alarmsys/get/zone9");
        assert_eq!(topics.zone(64), "alarmsys/get/zone64");
        assert_eq!(topics.pgm(14), "alarmsys/get/pgm14");
        assert_eq!(topics.command(), "alarmsys/set");
    }

    #[test]
    fn test_custom_prefix() {
        let topics = Topics::new("home/dsc");
        assert_eq!(topics.zone(1), "home/dsc/get/zone1");
        assert_eq!(topics.command(), "home/dsc/set");
    }

    #[test]
    fn test_message_constructors() {
        let msg = OutboundMessage::retained("a/b", "1");
        assert!(msg.retain);
        let msg = OutboundMessage::transient("a/b", bool_payload(false));
        assert!(!msg.retain);
        assert_eq!(msg.payload, "0");
    }
}
