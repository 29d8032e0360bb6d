// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Partition status and MQTT state derivation

use bitflags::bitflags;

/// Partitions supported by the keybus.
pub const MAX_PARTITIONS: usize = 8;

bitflags! {
    /// Partition status as decoded from the keybus.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PartitionFlags: u16 {
        /// Ready to arm (no open zones, no trouble preventing arming)
        const READY          = 1 << 0;
        /// Armed in any mode
        const ARMED          = 1 << 1;
        /// Armed stay (interior zones bypassed)
        const ARMED_STAY     = 1 << 2;
        /// Armed away
        const ARMED_AWAY     = 1 << 3;
        /// Armed without entry delay
        const NO_ENTRY_DELAY = 1 << 4;
        /// Exit delay running
        const EXIT_DELAY     = 1 << 5;
        /// Entry delay running
        const ENTRY_DELAY    = 1 << 6;
        /// Alarm tripped
        const ALARM          = 1 << 7;
        /// Fire alarm
        const FIRE           = 1 << 8;
        /// Installer programming or not provisioned
        const DISABLED       = 1 << 9;
    }
}

bitflags! {
    /// Observable axes of a partition that are published independently.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PartitionChanges: u8 {
        const ARMED      = 1 << 0;
        const EXIT_DELAY = 1 << 1;
        const ALARM      = 1 << 2;
        const FIRE       = 1 << 3;
    }
}

impl PartitionChanges {
    /// Axes whose inputs differ between `old` and `new`.
    pub fn between(old: PartitionFlags, new: PartitionFlags) -> Self {
        let diff = old ^ new;
        let mut changes = Self::empty();
        if diff.intersects(
            PartitionFlags::ARMED
                | PartitionFlags::ARMED_STAY
                | PartitionFlags::ARMED_AWAY
                | PartitionFlags::NO_ENTRY_DELAY,
        ) {
            changes |= Self::ARMED;
        }
        if diff.contains(PartitionFlags::EXIT_DELAY) {
            changes |= Self::EXIT_DELAY;
        }
        if diff.contains(PartitionFlags::ALARM) {
            changes |= Self::ALARM;
        }
        if diff.contains(PartitionFlags::FIRE) {
            changes |= Self::FIRE;
        }
        changes
    }
}

/// Alarm-panel state as understood by Home Assistant's MQTT alarm panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmState {
    Disarmed,
    ArmedHome,
    ArmedAway,
    ArmedNight,
    Pending,
    Triggered,
}

impl ArmState {
    pub fn as_payload(&self) -> &'static str {
        match self {
            Self::Disarmed => "disarmed",
            Self::ArmedHome => "armed_home",
            Self::ArmedAway => "armed_away",
            Self::ArmedNight => "armed_night",
            Self::Pending => "pending",
            Self::Triggered => "triggered",
        }
    }
}

/// A single alarm partition.
#[derive(Debug, Clone)]
pub struct PartitionStatus {
    /// 1-based partition number
    pub id: u8,
    pub status: PartitionFlags,
    pub changes: PartitionChanges,
}

impl PartitionStatus {
    pub fn new(id: u8) -> Self {
        Self {
            id,
            status: PartitionFlags::empty(),
            changes: PartitionChanges::empty(),
        }
    }

    /// Replace the status. Axes whose inputs changed are marked for
    /// publication; returns those axes.
    pub fn update(&mut self, new_status: PartitionFlags) -> PartitionChanges {
        let changed = PartitionChanges::between(self.status, new_status);
        self.status = new_status;
        self.changes |= changed;
        changed
    }

    /// Set or clear a single status flag, tracking changes.
    pub fn set_flag(&mut self, flag: PartitionFlags, value: bool) -> PartitionChanges {
        let mut next = self.status;
        next.set(flag, value);
        self.update(next)
    }

    pub fn mark_changed(&mut self, axis: PartitionChanges) {
        self.changes |= axis;
    }

    pub fn clear_changed(&mut self, axis: PartitionChanges) {
        self.changes.remove(axis);
    }

    pub fn is_changed(&self, axis: PartitionChanges) -> bool {
        self.changes.contains(axis)
    }

    // Convenience accessors
    pub fn is_ready(&self) -> bool { self.status.contains(PartitionFlags::READY) }
    pub fn is_armed(&self) -> bool { self.status.contains(PartitionFlags::ARMED) }
    pub fn is_armed_stay(&self) -> bool { self.status.contains(PartitionFlags::ARMED_STAY) }
    pub fn is_armed_away(&self) -> bool { self.status.contains(PartitionFlags::ARMED_AWAY) }
    pub fn is_no_entry_delay(&self) -> bool { self.status.contains(PartitionFlags::NO_ENTRY_DELAY) }
    pub fn is_exit_delay(&self) -> bool { self.status.contains(PartitionFlags::EXIT_DELAY) }
    pub fn is_entry_delay(&self) -> bool { self.status.contains(PartitionFlags::ENTRY_DELAY) }
    pub fn is_alarm(&self) -> bool { self.status.contains(PartitionFlags::ALARM) }
    pub fn is_fire(&self) -> bool { self.status.contains(PartitionFlags::FIRE) }
    pub fn is_disabled(&self) -> bool { self.status.contains(PartitionFlags::DISABLED) }

    /// State to publish for the armed axis. `None` means nothing needs to be
    /// sent (armed in a mode with no payload of its own).
    pub fn armed_state(&self) -> Option<ArmState> {
        if self.is_armed_away() && self.is_no_entry_delay() {
            Some(ArmState::ArmedNight)
        } else if self.is_armed_away() {
            Some(ArmState::ArmedAway)
        } else if self.is_armed_stay() && self.is_no_entry_delay() {
            Some(ArmState::ArmedNight)
        } else if self.is_armed_stay() {
            Some(ArmState::ArmedHome)
        } else if self.is_armed() {
            None
        } else {
            Some(ArmState::Disarmed)
        }
    }

    /// State to publish for the exit-delay axis.
    pub fn exit_delay_state(&self) -> Option<ArmState> {
        if self.is_exit_delay() {
            Some(ArmState::Pending)
        } else if !self.is_armed() {
            Some(ArmState::Disarmed)
        } else {
            None
        }
    }

    /// State to publish for the alarm axis. When the armed axis was already
    /// handled in the same pass, a cleared alarm sends nothing so the armed
    /// state is not overwritten.
    pub fn alarm_state(&self, armed_handled: bool) -> Option<ArmState> {
        if self.is_alarm() {
            Some(ArmState::Triggered)
        } else if !armed_handled {
            Some(ArmState::Disarmed)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition(flags: PartitionFlags) -> PartitionStatus {
        let mut p = PartitionStatus::new(1);
        p.status = flags;
        p
    }

    #[test]
    fn test_away_with_no_entry_delay_is_night() {
        let p = partition(
            PartitionFlags::ARMED | PartitionFlags::ARMED_AWAY | PartitionFlags::NO_ENTRY_DELAY,
        );
        assert_eq!(p.armed_state(), Some(ArmState::ArmedNight));
    }

    #[test]
    fn test_away_precedes_stay() {
        let p = partition(
            PartitionFlags::ARMED | PartitionFlags::ARMED_AWAY | PartitionFlags::ARMED_STAY,
        );
        assert_eq!(p.armed_state(), Some(ArmState::ArmedAway));
    }

    #[test]
    fn test_stay_states() {
        let p = partition(PartitionFlags::ARMED | PartitionFlags::ARMED_STAY);
        assert_eq!(p.armed_state(), Some(ArmState::ArmedHome));

        let p = partition(
            PartitionFlags::ARMED | PartitionFlags::ARMED_STAY | PartitionFlags::NO_ENTRY_DELAY,
        );
        assert_eq!(p.armed_state(), Some(ArmState::ArmedNight));
    }

    #[test]
    fn test_armed_without_mode_sends_nothing() {
        let p = partition(PartitionFlags::ARMED);
        assert_eq!(p.armed_state(), None);
        assert_eq!(partition(PartitionFlags::READY).armed_state(), Some(ArmState::Disarmed));
    }

    #[test]
    fn test_exit_delay_states() {
        assert_eq!(
            partition(PartitionFlags::EXIT_DELAY).exit_delay_state(),
            Some(ArmState::Pending)
        );
        assert_eq!(partition(PartitionFlags::empty()).exit_delay_state(), Some(ArmState::Disarmed));
        assert_eq!(partition(PartitionFlags::ARMED).exit_delay_state(), None);
    }

    #[test]
    fn test_alarm_states() {
        let p = partition(PartitionFlags::ALARM);
        assert_eq!(p.alarm_state(true), Some(ArmState::Triggered));
        let p = partition(PartitionFlags::empty());
        assert_eq!(p.alarm_state(false), Some(ArmState::Disarmed));
        assert_eq!(p.alarm_state(true), None);
    }

    #[test]
    fn test_update_marks_axes() {
        let mut p = PartitionStatus::new(2);
        let changed = p.update(PartitionFlags::READY);
        assert!(changed.is_empty());

        let changed = p.update(PartitionFlags::EXIT_DELAY);
        assert_eq!(changed, PartitionChanges::EXIT_DELAY);

        let changed = p.update(PartitionFlags::ARMED | PartitionFlags::ARMED_AWAY);
        assert_eq!(changed, PartitionChanges::ARMED | PartitionChanges::EXIT_DELAY);
        assert!(p.is_changed(PartitionChanges::ARMED));

        p.clear_changed(PartitionChanges::ARMED);
        assert!(!p.is_changed(PartitionChanges::ARMED));
        assert!(p.is_changed(PartitionChanges::EXIT_DELAY));
    }

    #[test]
    fn test_payload_strings() {
        assert_eq!(ArmState::ArmedHome.as_payload(), "armed_home");
        assert_eq!(ArmState::Triggered.as_payload(), "triggered");
    }
}
