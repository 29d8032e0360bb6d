// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// rumqttc-backed MQTT transport

use std::collections::VecDeque;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, LastWill, MqttOptions,
    Outgoing, Packet, QoS,
};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::{ConnectRequest, InboundMessage, MqttTransport, Pump};
use crate::error::{BridgeError, Result};
use crate::topics::OutboundMessage;

/// Grace period for the event loop to flush a DISCONNECT.
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// What the event loop task reports back to the transport.
#[derive(Debug)]
enum LinkEvent {
    ConnAck(ConnectReturnCode),
    Refused(ConnectReturnCode),
    Message(InboundMessage),
    Closed(String),
}

/// [`MqttTransport`] on top of `rumqttc::AsyncClient`.
///
/// Each connect attempt builds a fresh client and spawns a task that drives its
/// event loop, forwarding CONNACKs, publishes and connection loss over a
/// channel. The task stops at the first connection error instead of letting
/// rumqttc reconnect on its own, so reconnect pacing stays with the caller.
pub struct RumqttTransport {
    client: Option<AsyncClient>,
    events: Option<mpsc::Receiver<LinkEvent>>,
    task: Option<JoinHandle<()>>,
    inbox: VecDeque<InboundMessage>,
    connected: bool,
    capacity: usize,
}

impl Default for RumqttTransport {
    fn default() -> Self {
        Self::new(64)
    }
}

impl RumqttTransport {
    /// `capacity` bounds both the client request queue and the event channel.
    pub fn new(capacity: usize) -> Self {
        Self {
            client: None,
            events: None,
            task: None,
            inbox: VecDeque::new(),
            connected: false,
            capacity: capacity.max(1),
        }
    }

    fn teardown(&mut self) {
        self.connected = false;
        self.client = None;
        self.events = None;
        self.inbox.clear();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn client(&self) -> Result<&AsyncClient> {
        match (&self.client, self.connected) {
            (Some(client), true) => Ok(client),
            _ => Err(BridgeError::NotConnected),
        }
    }
}

impl Drop for RumqttTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn mqtt_options(request: &ConnectRequest) -> MqttOptions {
    let mut options = MqttOptions::new(&request.client_id, &request.host, request.port);
    options.set_keep_alive(request.keep_alive);
    if let (Some(username), Some(password)) = (&request.username, &request.password) {
        options.set_credentials(username.clone(), password.clone());
    }
    let will = &request.last_will;
    options.set_last_will(LastWill::new(
        will.topic.clone(),
        will.payload.clone(),
        QoS::AtMostOnce,
        will.retain,
    ));
    options
}

async fn drive_event_loop(mut eventloop: EventLoop, tx: mpsc::Sender<LinkEvent>) {
    loop {
        let event = match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => LinkEvent::ConnAck(ack.code),
            Ok(Event::Incoming(Packet::Publish(publish))) => LinkEvent::Message(InboundMessage {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            }),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                let _ = tx.send(LinkEvent::Closed("client disconnected".to_string())).await;
                return;
            }
            Ok(_) => continue,
            Err(ConnectionError::ConnectionRefused(code)) => {
                let _ = tx.send(LinkEvent::Refused(code)).await;
                return;
            }
            Err(e) => {
                let _ = tx.send(LinkEvent::Closed(e.to_string())).await;
                return;
            }
        };
        if tx.send(event).await.is_err() {
            return;
        }
    }
}

impl MqttTransport for RumqttTransport {
    async fn connect(&mut self, request: &ConnectRequest) -> Result<()> {
        self.teardown();

        let (client, eventloop) = AsyncClient::new(mqtt_options(request), self.capacity);
        let (tx, mut rx) = mpsc::channel(self.capacity);
        let task = tokio::spawn(drive_event_loop(eventloop, tx));

        debug!("MQTT: connecting to {}:{} as {}", request.host, request.port, request.client_id);
        let outcome = timeout(request.connect_timeout, async {
            loop {
                match rx.recv().await {
                    Some(LinkEvent::ConnAck(ConnectReturnCode::Success)) => return Ok(()),
                    Some(LinkEvent::ConnAck(code)) | Some(LinkEvent::Refused(code)) => {
                        return Err(BridgeError::ConnectionRefused { code });
                    }
                    Some(LinkEvent::Closed(reason)) => {
                        return Err(BridgeError::ConnectionLost { reason });
                    }
                    Some(LinkEvent::Message(_)) => continue,
                    None => return Err(BridgeError::ChannelClosed),
                }
            }
        })
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(BridgeError::ConnectionTimeout {
                timeout_ms: request.connect_timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(()) => {
                self.client = Some(client);
                self.events = Some(rx);
                self.task = Some(task);
                self.connected = true;
                info!("MQTT: connected to {}:{}", request.host, request.port);
                Ok(())
            }
            Err(e) => {
                task.abort();
                Err(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.client()?.try_subscribe(topic, QoS::AtMostOnce)?;
        Ok(())
    }

    async fn publish(&mut self, message: &OutboundMessage) -> Result<()> {
        self.client()?.try_publish(
            message.topic.as_str(),
            QoS::AtMostOnce,
            message.retain,
            message.payload.as_bytes().to_vec(),
        )?;
        Ok(())
    }

    async fn pump(&mut self) -> Pump {
        // Let the event loop task run before looking at its output.
        tokio::task::yield_now().await;

        if let Some(events) = self.events.as_mut() {
            loop {
                match events.try_recv() {
                    Ok(LinkEvent::Message(msg)) => self.inbox.push_back(msg),
                    Ok(LinkEvent::ConnAck(_)) => {}
                    Ok(LinkEvent::Refused(code)) => {
                        warn!("MQTT: broker refused session: {code:?}");
                        self.teardown();
                        break;
                    }
                    Ok(LinkEvent::Closed(reason)) => {
                        warn!("MQTT: connection lost: {reason}");
                        self.teardown();
                        break;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        warn!("MQTT: event loop stopped");
                        self.teardown();
                        break;
                    }
                }
            }
        }

        Pump {
            connected: self.connected,
            message: if self.connected { self.inbox.pop_front() } else { None },
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        let result = match self.client() {
            Ok(client) => client.disconnect().await.map_err(BridgeError::from),
            Err(_) => Ok(()),
        };
        if let Some(task) = self.task.as_mut() {
            if timeout(DISCONNECT_GRACE, task).await.is_err() {
                debug!("MQTT: event loop did not stop within {DISCONNECT_GRACE:?}");
            }
        }
        self.task = None;
        self.teardown();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ConnectRequest {
        ConnectRequest {
            client_id: "alarmsys".to_string(),
            host: "127.0.0.1".to_string(),
            port: 1883,
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_millis(100),
            last_will: OutboundMessage::retained("alarmsys/get/available", "offline"),
        }
    }

    #[test]
    fn test_mqtt_options_carry_identity_and_will() {
        let options = mqtt_options(&request());
        assert_eq!(options.client_id(), "alarmsys");
        assert_eq!(options.broker_address(), ("127.0.0.1".to_string(), 1883));
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
        assert_eq!(options.credentials(), Some(("user".to_string(), "pass".to_string())));

        let will = options.last_will().expect("last will set");
        assert_eq!(will.topic, "alarmsys/get/available");
        assert_eq!(&will.message[..], b"offline");
        assert!(will.retain);
        assert_eq!(will.qos, QoS::AtMostOnce);
    }

    #[tokio::test]
    async fn test_publish_requires_connection() {
        let mut transport = RumqttTransport::new(8);
        let msg = OutboundMessage::retained("alarmsys/get/trouble", "1");
        assert!(matches!(transport.publish(&msg).await, Err(BridgeError::NotConnected)));
        assert!(matches!(transport.subscribe("alarmsys/set").await, Err(BridgeError::NotConnected)));
    }

    #[tokio::test]
    async fn test_pump_when_disconnected() {
        let mut transport = RumqttTransport::new(8);
        let pump = transport.pump().await;
        assert!(!pump.connected);
        assert!(pump.message.is_none());
        assert!(transport.disconnect().await.is_ok());
    }
}
