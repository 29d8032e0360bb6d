// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// MQTT command payloads -> virtual keypad writes

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::devices::{PartitionChanges, PartitionStatus};
use crate::keybus::{keys, Keybus};
use crate::status::PanelStatus;

/// Payload bytes shown in the inbound log line.
const LOGGED_PAYLOAD_BYTES: usize = 3;

/// Actions accepted on the command topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ArmStay,
    ArmAway,
    ArmNight,
    Disarm,
    SilenceTrouble,
    Panic,
}

impl Action {
    /// Parse the single action character of a command payload.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'S' => Some(Self::ArmStay),
            b'A' => Some(Self::ArmAway),
            b'N' => Some(Self::ArmNight),
            b'D' => Some(Self::Disarm),
            b'T' => Some(Self::SilenceTrouble),
            b'P' => Some(Self::Panic),
            _ => None,
        }
    }

    /// Keypad key for single-key actions. Disarm sends the access code.
    pub fn key(&self) -> Option<char> {
        match self {
            Self::ArmStay => Some(keys::ARM_STAY),
            Self::ArmAway => Some(keys::ARM_AWAY),
            Self::ArmNight => Some(keys::ARM_NIGHT),
            Self::SilenceTrouble => Some(keys::SILENCE_TROUBLE),
            Self::Panic => Some(keys::PANIC),
            Self::Disarm => None,
        }
    }

    /// Whether the partition's current state allows this action.
    pub fn permitted(&self, partition: &PartitionStatus) -> bool {
        match self {
            Self::Panic => true,
            Self::Disarm => {
                partition.is_exit_delay() || partition.is_entry_delay() || partition.is_armed()
            }
            Self::ArmStay | Self::ArmAway | Self::ArmNight | Self::SilenceTrouble => {
                partition.is_ready() && !partition.is_armed() && !partition.is_exit_delay()
            }
        }
    }
}

/// A parsed command: which partition, which action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundCommand {
    /// 1-based partition
    pub partition: u8,
    pub action: Action,
}

impl InboundCommand {
    /// Parse `[1-8]<action>`. Without a leading partition digit the first byte
    /// is the action and `default_partition` applies. Only the first two bytes
    /// are ever inspected.
    pub fn parse(payload: &[u8], default_partition: u8) -> Option<Self> {
        let (partition, code) = match payload {
            [digit @ b'1'..=b'8', rest @ ..] => (digit - b'0', rest.first()?),
            [code, ..] => (default_partition, code),
            [] => return None,
        };
        Some(Self { partition, action: Action::from_code(*code)? })
    }
}

/// One virtual keypad write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelWrite {
    pub partition: u8,
    pub keys: String,
    /// Command behind the write, re-checked before a queued write goes out.
    /// `None` for unconditional writes such as an access-code prompt reply.
    pub action: Option<Action>,
}

/// Writes waiting for the keybus to become write-ready.
#[derive(Debug, Clone)]
pub struct WriteQueue {
    queue: VecDeque<PanelWrite>,
    capacity: usize,
}

impl WriteQueue {
    pub fn new(capacity: usize) -> Self {
        Self { queue: VecDeque::with_capacity(capacity), capacity: capacity.max(1) }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Append a write. Returns false when the queue is full.
    pub fn push_back(&mut self, write: PanelWrite) -> bool {
        if self.queue.len() >= self.capacity {
            return false;
        }
        self.queue.push_back(write);
        true
    }

    /// Put a write at the head, evicting the newest entry if full.
    pub fn push_front(&mut self, write: PanelWrite) {
        if self.queue.len() >= self.capacity
            && let Some(dropped) = self.queue.pop_back()
        {
            warn!("Write queue full, dropping keys for partition {}", dropped.partition);
        }
        self.queue.push_front(write);
    }

    pub fn pop(&mut self) -> Option<PanelWrite> {
        self.queue.pop_front()
    }
}

/// Outcome of handling one command payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Written to the keybus right away
    Written,
    /// Waiting for the keybus to become write-ready
    Queued,
    /// Write queue full, command dropped
    Busy,
    /// Partition not ready; its armed state will be re-published instead
    NotReady,
    /// Partition state does not allow the action
    PreconditionFailed,
    /// Unparseable payload or unknown action
    Invalid,
    /// Partition outside the configured range
    UnknownPartition,
}

/// Validates commands against panel state and turns them into keypad writes.
///
/// Nothing here waits for the keybus: writes that cannot go out immediately
/// are queued and drained by [`CommandDispatcher::flush`] on later ticks.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    default_partition: u8,
    partitions: u8,
    access_code: String,
    queue: WriteQueue,
}

impl CommandDispatcher {
    pub fn new(
        default_partition: u8,
        partitions: u8,
        access_code: impl Into<String>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            default_partition,
            partitions,
            access_code: access_code.into(),
            queue: WriteQueue::new(queue_capacity),
        }
    }

    pub fn queue(&self) -> &WriteQueue {
        &self.queue
    }

    /// Handle one payload received on the command topic.
    pub fn dispatch<K: Keybus>(
        &mut self,
        payload: &[u8],
        status: &mut PanelStatus,
        keybus: &mut K,
    ) -> Dispatch {
        let shown = &payload[..payload.len().min(LOGGED_PAYLOAD_BYTES)];
        debug!("MQTT in: {}", String::from_utf8_lossy(shown));

        let Some(command) = InboundCommand::parse(payload, self.default_partition) else {
            debug!("Ignoring unrecognized command");
            return Dispatch::Invalid;
        };
        let id = command.partition;
        let action = command.action;

        if action == Action::Panic {
            info!("Panic on partition {id}");
            let write = PanelWrite { partition: id, keys: keys::PANIC.to_string(), action: Some(action) };
            return self.submit(write, true, status, keybus);
        }

        if id > self.partitions {
            debug!("Ignoring command for unconfigured partition {id}");
            return Dispatch::UnknownPartition;
        }
        let Some(partition) = status.partition_mut(id) else {
            return Dispatch::UnknownPartition;
        };

        if action != Action::Disarm && !partition.is_ready() {
            debug!("Partition {id} not ready for {action:?}, re-publishing its state");
            partition.mark_changed(PartitionChanges::ARMED);
            return Dispatch::NotReady;
        }
        if !action.permitted(partition) {
            debug!("Partition {id} state does not allow {action:?}");
            return Dispatch::PreconditionFailed;
        }

        let sequence = match action.key() {
            Some(key) => key.to_string(),
            None if self.access_code.is_empty() => {
                warn!("Disarm requested but no access code is configured");
                return Dispatch::PreconditionFailed;
            }
            None => self.access_code.clone(),
        };

        info!("Command {action:?} for partition {id}");
        let write = PanelWrite { partition: id, keys: sequence, action: Some(action) };
        self.submit(write, false, status, keybus)
    }

    /// Queue the access code for `partition`, for when the panel prompts.
    pub fn submit_access_code<K: Keybus>(
        &mut self,
        partition: u8,
        status: &mut PanelStatus,
        keybus: &mut K,
    ) -> Dispatch {
        if self.access_code.is_empty() {
            warn!("Panel requested an access code but none is configured");
            return Dispatch::PreconditionFailed;
        }
        let write = PanelWrite { partition, keys: self.access_code.clone(), action: None };
        self.submit(write, false, status, keybus)
    }

    /// Issue queued writes while the keybus accepts them. A write whose
    /// partition no longer allows its action is dropped. Returns how many
    /// were written.
    pub fn flush<K: Keybus>(&mut self, status: &mut PanelStatus, keybus: &mut K) -> usize {
        let mut written = 0;
        while keybus.write_ready() {
            let Some(write) = self.queue.pop() else {
                break;
            };
            if let Some(action) = write.action
                && !status.partition(write.partition).is_some_and(|p| action.permitted(p))
            {
                debug!("Dropping queued {action:?} for partition {}, state changed", write.partition);
                continue;
            }
            issue(write, status, keybus);
            written += 1;
        }
        written
    }

    fn submit<K: Keybus>(
        &mut self,
        write: PanelWrite,
        urgent: bool,
        status: &mut PanelStatus,
        keybus: &mut K,
    ) -> Dispatch {
        if self.queue.is_empty() && keybus.write_ready() {
            issue(write, status, keybus);
            return Dispatch::Written;
        }
        if urgent {
            self.queue.push_front(write);
            Dispatch::Queued
        } else if self.queue.push_back(write) {
            Dispatch::Queued
        } else {
            warn!("Panel busy, dropping command");
            Dispatch::Busy
        }
    }
}

fn issue<K: Keybus>(write: PanelWrite, status: &mut PanelStatus, keybus: &mut K) {
    status.write_partition = write.partition;
    keybus.write(write.partition, &write.keys);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::PartitionFlags;

    #[derive(Default)]
    struct FakeKeybus {
        busy: bool,
        writes: Vec<(u8, String)>,
    }

    impl Keybus for FakeKeybus {
        fn poll(&mut self, _status: &mut PanelStatus) {}
        fn write_ready(&self) -> bool {
            !self.busy
        }
        fn write(&mut self, partition: u8, keys: &str) {
            self.writes.push((partition, keys.to_string()));
        }
    }

    fn dispatcher() -> CommandDispatcher {
        CommandDispatcher::new(1, 8, "1234", 2)
    }

    fn status_with(id: u8, flags: PartitionFlags) -> PanelStatus {
        let mut status = PanelStatus::new();
        let p = status.partition_mut(id).expect("partition");
        p.update(flags);
        p.changes = PartitionChanges::empty();
        status
    }

    #[test]
    fn test_parse_with_partition_prefix() {
        let cmd = InboundCommand::parse(b"2A", 1).unwrap();
        assert_eq!(cmd, InboundCommand { partition: 2, action: Action::ArmAway });
    }

    #[test]
    fn test_parse_default_partition() {
        let cmd = InboundCommand::parse(b"S", 3).unwrap();
        assert_eq!(cmd, InboundCommand { partition: 3, action: Action::ArmStay });
        let cmd = InboundCommand::parse(b"P", 1).unwrap();
        assert_eq!(cmd.action, Action::Panic);
    }

    #[test]
    fn test_parse_out_of_range_digit_is_action() {
        assert!(InboundCommand::parse(b"9A", 1).is_none());
        assert!(InboundCommand::parse(b"0D", 1).is_none());
    }

    #[test]
    fn test_parse_rejects_short_and_unknown() {
        assert!(InboundCommand::parse(b"", 1).is_none());
        assert!(InboundCommand::parse(b"1", 1).is_none());
        assert!(InboundCommand::parse(b"X", 1).is_none());
        assert!(InboundCommand::parse(b"a", 1).is_none());
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let cmd = InboundCommand::parse(b"4Dxyz", 1).unwrap();
        assert_eq!(cmd, InboundCommand { partition: 4, action: Action::Disarm });
    }

    #[test]
    fn test_arm_away_on_partition_two() {
        let mut status = status_with(2, PartitionFlags::READY);
        let mut keybus = FakeKeybus::default();

        let result = dispatcher().dispatch(b"2A", &mut status, &mut keybus);
        assert_eq!(result, Dispatch::Written);
        assert_eq!(keybus.writes, vec![(2, "w".to_string())]);
        assert_eq!(status.write_partition, 2);
    }

    #[test]
    fn test_arm_refused_during_exit_delay() {
        let mut status = status_with(2, PartitionFlags::READY | PartitionFlags::EXIT_DELAY);
        let mut keybus = FakeKeybus::default();

        let result = dispatcher().dispatch(b"2A", &mut status, &mut keybus);
        assert_eq!(result, Dispatch::PreconditionFailed);
        assert!(keybus.writes.is_empty());
    }

    #[test]
    fn test_arm_refused_when_already_armed() {
        for payload in [&b"2A"[..], &b"2S"[..], &b"2N"[..]] {
            let mut status = status_with(
                2,
                PartitionFlags::READY | PartitionFlags::ARMED | PartitionFlags::ARMED_STAY,
            );
            let mut keybus = FakeKeybus::default();

            let result = dispatcher().dispatch(payload, &mut status, &mut keybus);
            assert_eq!(result, Dispatch::PreconditionFailed);
            assert!(keybus.writes.is_empty());
        }
    }

    #[test]
    fn test_silence_trouble_refused_while_armed() {
        let mut status = status_with(
            1,
            PartitionFlags::READY | PartitionFlags::ARMED | PartitionFlags::ARMED_AWAY,
        );
        let mut keybus = FakeKeybus::default();

        assert_eq!(dispatcher().dispatch(b"1T", &mut status, &mut keybus), Dispatch::PreconditionFailed);
        assert!(keybus.writes.is_empty());
    }

    #[test]
    fn test_arm_keys() {
        for (payload, key) in [(&b"S"[..], "s"), (&b"N"[..], "n"), (&b"T"[..], "#")] {
            let mut status = status_with(1, PartitionFlags::READY);
            let mut keybus = FakeKeybus::default();
            dispatcher().dispatch(payload, &mut status, &mut keybus);
            assert_eq!(keybus.writes, vec![(1, key.to_string())]);
        }
    }

    #[test]
    fn test_disarm_requires_armed_state() {
        let mut status = status_with(1, PartitionFlags::READY);
        let mut keybus = FakeKeybus::default();

        let result = dispatcher().dispatch(b"1D", &mut status, &mut keybus);
        assert_eq!(result, Dispatch::PreconditionFailed);
        assert!(keybus.writes.is_empty());
    }

    #[test]
    fn test_disarm_writes_access_code_even_when_not_ready() {
        let mut status = status_with(1, PartitionFlags::ARMED | PartitionFlags::ARMED_AWAY);
        let mut keybus = FakeKeybus::default();

        let result = dispatcher().dispatch(b"1D", &mut status, &mut keybus);
        assert_eq!(result, Dispatch::Written);
        assert_eq!(keybus.writes, vec![(1, "1234".to_string())]);

        let mut status = status_with(1, PartitionFlags::ENTRY_DELAY);
        let mut keybus = FakeKeybus::default();
        assert_eq!(dispatcher().dispatch(b"D", &mut status, &mut keybus), Dispatch::Written);
    }

    #[test]
    fn test_not_ready_forces_armed_republish() {
        let mut status = status_with(1, PartitionFlags::empty());
        let mut keybus = FakeKeybus::default();

        let result = dispatcher().dispatch(b"1A", &mut status, &mut keybus);
        assert_eq!(result, Dispatch::NotReady);
        assert!(keybus.writes.is_empty());
        let p = status.partition(1).unwrap();
        assert!(p.is_changed(PartitionChanges::ARMED));
        assert!(!p.is_changed(PartitionChanges::EXIT_DELAY));
    }

    #[test]
    fn test_panic_skips_ready_guard() {
        let mut status = status_with(1, PartitionFlags::ARMED | PartitionFlags::ARMED_AWAY);
        let mut keybus = FakeKeybus::default();

        let result = dispatcher().dispatch(b"P", &mut status, &mut keybus);
        assert_eq!(result, Dispatch::Written);
        assert_eq!(keybus.writes, vec![(1, "p".to_string())]);
    }

    #[test]
    fn test_unconfigured_partition_ignored() {
        let mut dispatcher = CommandDispatcher::new(1, 2, "1234", 2);
        let mut status = status_with(5, PartitionFlags::READY);
        let mut keybus = FakeKeybus::default();

        assert_eq!(dispatcher.dispatch(b"5A", &mut status, &mut keybus), Dispatch::UnknownPartition);
        assert!(keybus.writes.is_empty());
    }

    #[test]
    fn test_busy_keybus_queues_then_flushes() {
        let mut dispatcher = dispatcher();
        let mut status = status_with(1, PartitionFlags::READY);
        let mut keybus = FakeKeybus { busy: true, ..Default::default() };

        assert_eq!(dispatcher.dispatch(b"1S", &mut status, &mut keybus), Dispatch::Queued);
        assert!(keybus.writes.is_empty());
        assert_eq!(dispatcher.flush(&mut status, &mut keybus), 0);

        keybus.busy = false;
        assert_eq!(dispatcher.flush(&mut status, &mut keybus), 1);
        assert_eq!(keybus.writes, vec![(1, "s".to_string())]);
        assert!(dispatcher.queue().is_empty());
    }

    #[test]
    fn test_full_queue_reports_busy_and_panic_jumps_queue() {
        let mut dispatcher = dispatcher();
        let mut status = status_with(1, PartitionFlags::READY);
        let mut keybus = FakeKeybus { busy: true, ..Default::default() };

        assert_eq!(dispatcher.dispatch(b"1S", &mut status, &mut keybus), Dispatch::Queued);
        assert_eq!(dispatcher.dispatch(b"1T", &mut status, &mut keybus), Dispatch::Queued);
        assert_eq!(dispatcher.dispatch(b"1A", &mut status, &mut keybus), Dispatch::Busy);
        assert_eq!(dispatcher.dispatch(b"1P", &mut status, &mut keybus), Dispatch::Queued);

        keybus.busy = false;
        dispatcher.flush(&mut status, &mut keybus);
        assert_eq!(keybus.writes, vec![(1, "p".to_string()), (1, "s".to_string())]);
    }

    #[test]
    fn test_queued_arm_dropped_once_partition_armed() {
        let mut dispatcher = dispatcher();
        let mut status = status_with(1, PartitionFlags::READY);
        let mut keybus = FakeKeybus { busy: true, ..Default::default() };

        assert_eq!(dispatcher.dispatch(b"1A", &mut status, &mut keybus), Dispatch::Queued);
        status
            .partition_mut(1)
            .unwrap()
            .update(PartitionFlags::ARMED | PartitionFlags::ARMED_STAY);

        keybus.busy = false;
        assert_eq!(dispatcher.flush(&mut status, &mut keybus), 0);
        assert!(keybus.writes.is_empty());
        assert!(dispatcher.queue().is_empty());
    }

    #[test]
    fn test_queued_disarm_dropped_once_partition_disarmed() {
        let mut dispatcher = dispatcher();
        let mut status = status_with(1, PartitionFlags::ARMED | PartitionFlags::ARMED_AWAY);
        let mut keybus = FakeKeybus { busy: true, ..Default::default() };

        assert_eq!(dispatcher.dispatch(b"1D", &mut status, &mut keybus), Dispatch::Queued);
        assert_eq!(dispatcher.dispatch(b"1P", &mut status, &mut keybus), Dispatch::Queued);
        status.partition_mut(1).unwrap().update(PartitionFlags::READY);

        keybus.busy = false;
        assert_eq!(dispatcher.flush(&mut status, &mut keybus), 1);
        assert_eq!(keybus.writes, vec![(1, "p".to_string())]);
    }

    #[test]
    fn test_panic_forwarded_to_unconfigured_partition() {
        let mut dispatcher = CommandDispatcher::new(1, 1, "1234", 4);
        let mut status = PanelStatus::new();
        let mut keybus = FakeKeybus::default();

        assert_eq!(dispatcher.dispatch(b"2P", &mut status, &mut keybus), Dispatch::Written);
        assert_eq!(keybus.writes, vec![(2, "p".to_string())]);
        assert_eq!(status.write_partition, 2);
    }

    #[test]
    fn test_access_code_prompt_write() {
        let mut dispatcher = dispatcher();
        let mut status = PanelStatus::new();
        let mut keybus = FakeKeybus::default();

        assert_eq!(dispatcher.submit_access_code(3, &mut status, &mut keybus), Dispatch::Written);
        assert_eq!(keybus.writes, vec![(3, "1234".to_string())]);
        assert_eq!(status.write_partition, 3);
    }
}
