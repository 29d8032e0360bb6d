// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Error types

/// All errors that can occur in the dsc-keybus-bridge library.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Broker refused connection: {code:?}")]
    ConnectionRefused { code: rumqttc::ConnectReturnCode },

    #[error("Connection timeout after {timeout_ms} ms")]
    ConnectionTimeout { timeout_ms: u64 },

    #[error("Not connected to broker")]
    NotConnected,

    #[error("Broker connection lost: {reason}")]
    ConnectionLost { reason: String },

    #[error("Invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("Invalid partition: {id} (max: {max})")]
    InvalidPartition { id: u8, max: u8 },

    #[error("Channel closed")]
    ChannelClosed,

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Whether this error is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::Client(_)
                | BridgeError::ConnectionRefused { .. }
                | BridgeError::ConnectionTimeout { .. }
                | BridgeError::NotConnected
                | BridgeError::ConnectionLost { .. }
                | BridgeError::ChannelClosed
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_retryable() {
        assert!(BridgeError::NotConnected.is_retryable());
        assert!(BridgeError::ConnectionTimeout { timeout_ms: 5000 }.is_retryable());
        assert!(BridgeError::ChannelClosed.is_retryable());
    }

    #[test]
    fn test_config_errors_are_not_retryable() {
        let err = BridgeError::InvalidConfig { details: "partitions must be 1-8".into() };
        assert!(!err.is_retryable());
        assert!(!BridgeError::InvalidPartition { id: 9, max: 8 }.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = BridgeError::InvalidPartition { id: 9, max: 8 };
        assert_eq!(err.to_string(), "Invalid partition: 9 (max: 8)");
    }
}
