// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// In-memory panel that answers virtual keypad writes

use std::collections::VecDeque;

use tracing::{debug, info};

use super::{keys, Keybus};
use crate::devices::{PartitionFlags, MAX_PARTITIONS};
use crate::status::PanelStatus;

/// Panel events injected into a [`SimulatedPanel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimInput {
    Zone { zone: u32, open: bool },
    Pgm { pgm: u32, active: bool },
    Trouble(bool),
    Fire { partition: u8, active: bool },
    Link(bool),
    /// The panel asks the keypad for an access code
    AccessCodePrompt,
    /// Installer programming on/off for a partition
    Programming { partition: u8, active: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArmMode {
    Stay,
    Away,
    Night,
}

impl ArmMode {
    fn flags(self) -> PartitionFlags {
        match self {
            Self::Stay => PartitionFlags::ARMED | PartitionFlags::ARMED_STAY,
            Self::Away => PartitionFlags::ARMED | PartitionFlags::ARMED_AWAY,
            Self::Night => {
                PartitionFlags::ARMED | PartitionFlags::ARMED_STAY | PartitionFlags::NO_ENTRY_DELAY
            }
        }
    }
}

const ARMING_FLAGS: PartitionFlags = PartitionFlags::ARMED
    .union(PartitionFlags::ARMED_STAY)
    .union(PartitionFlags::ARMED_AWAY)
    .union(PartitionFlags::NO_ENTRY_DELAY)
    .union(PartitionFlags::EXIT_DELAY)
    .union(PartitionFlags::ENTRY_DELAY)
    .union(PartitionFlags::ALARM);

/// A software panel implementing [`Keybus`].
///
/// Writes are applied on the next poll, and the panel is not write-ready
/// until then. Arming keys start an exit delay that completes after
/// `exit_delay_polls` polls, the access code disarms, `#` clears trouble and
/// `p` trips the alarm. All zones belong to every partition.
#[derive(Debug)]
pub struct SimulatedPanel {
    partitions: u8,
    access_code: String,
    exit_delay_polls: u32,
    inputs: VecDeque<SimInput>,
    writes: VecDeque<(u8, String)>,
    exit_timers: [Option<(u32, ArmMode)>; MAX_PARTITIONS],
    started: bool,
    written: Vec<(u8, String)>,
}

impl SimulatedPanel {
    pub fn new(partitions: u8, access_code: impl Into<String>, exit_delay_polls: u32) -> Self {
        Self {
            partitions: partitions.clamp(1, MAX_PARTITIONS as u8),
            access_code: access_code.into(),
            exit_delay_polls,
            inputs: VecDeque::new(),
            writes: VecDeque::new(),
            exit_timers: [None; MAX_PARTITIONS],
            started: false,
            written: Vec::new(),
        }
    }

    /// Queue a panel event for the next poll.
    pub fn inject(&mut self, input: SimInput) {
        self.inputs.push_back(input);
    }

    /// Every write received so far, as (partition, keys).
    pub fn written(&self) -> &[(u8, String)] {
        &self.written
    }

    fn any_zone_open(status: &PanelStatus) -> bool {
        (0..status.zones.capacity()).any(|i| status.zones.state(i))
    }

    fn refresh_ready(&self, status: &mut PanelStatus) {
        let zones_open = Self::any_zone_open(status);
        for id in 1..=self.partitions {
            if let Some(p) = status.partition_mut(id) {
                let idle = !p.status.intersects(ARMING_FLAGS | PartitionFlags::DISABLED);
                p.set_flag(PartitionFlags::READY, idle && !zones_open);
            }
        }
    }

    fn apply_input(&mut self, input: SimInput, status: &mut PanelStatus) {
        match input {
            SimInput::Zone { zone, open } => {
                status.set_zone_open(zone, open);
            }
            SimInput::Pgm { pgm, active } => {
                status.set_pgm_active(pgm, active);
            }
            SimInput::Trouble(active) => {
                status.system.set_trouble(active);
            }
            SimInput::Fire { partition, active } => {
                if let Some(p) = status.partition_mut(partition) {
                    p.set_flag(PartitionFlags::FIRE, active);
                }
            }
            SimInput::Link(connected) => {
                status.system.set_link_connected(connected);
            }
            SimInput::AccessCodePrompt => {
                status.system.access_code_prompt = true;
            }
            SimInput::Programming { partition, active } => {
                if let Some(p) = status.partition_mut(partition) {
                    p.set_flag(PartitionFlags::DISABLED, active);
                }
            }
        }
    }

    fn apply_write(&mut self, partition: u8, keys: &str, status: &mut PanelStatus) {
        let Some(p) = status.partition_mut(partition) else {
            return;
        };
        let index = usize::from(partition) - 1;

        let mode = match keys.chars().next() {
            Some(keys::ARM_STAY) if keys.len() == 1 => Some(ArmMode::Stay),
            Some(keys::ARM_AWAY) if keys.len() == 1 => Some(ArmMode::Away),
            Some(keys::ARM_NIGHT) if keys.len() == 1 => Some(ArmMode::Night),
            _ => None,
        };

        if let Some(mode) = mode {
            if p.is_ready() && !p.is_armed() && !p.is_exit_delay() {
                debug!("Simulated panel: partition {partition} exit delay ({mode:?})");
                p.update((p.status - PartitionFlags::READY) | PartitionFlags::EXIT_DELAY);
                self.exit_timers[index] = Some((self.exit_delay_polls, mode));
            }
        } else if keys == self.access_code && !keys.is_empty() {
            debug!("Simulated panel: partition {partition} disarmed");
            p.update(p.status - ARMING_FLAGS);
            self.exit_timers[index] = None;
            status.system.access_code_prompt = false;
        } else if keys.len() == 1 && keys.starts_with(keys::SILENCE_TROUBLE) {
            status.system.set_trouble(false);
        } else if keys.len() == 1 && keys.starts_with(keys::PANIC) {
            info!("Simulated panel: panic on partition {partition}");
            p.set_flag(PartitionFlags::ALARM, true);
        } else {
            debug!("Simulated panel: ignoring keys on partition {partition}");
        }
    }

    fn run_exit_timers(&mut self, status: &mut PanelStatus) {
        for (index, timer) in self.exit_timers.iter_mut().enumerate() {
            let Some((remaining, mode)) = timer.as_mut() else {
                continue;
            };
            if *remaining > 0 {
                *remaining -= 1;
                continue;
            }
            let mode = *mode;
            *timer = None;
            if let Some(p) = status.partition_mut(index as u8 + 1) {
                p.update((p.status - PartitionFlags::EXIT_DELAY) | mode.flags());
            }
        }
    }
}

impl Keybus for SimulatedPanel {
    fn poll(&mut self, status: &mut PanelStatus) {
        if !self.started {
            self.started = true;
            status.system.set_link_connected(true);
        }

        while let Some(input) = self.inputs.pop_front() {
            self.apply_input(input, status);
        }
        while let Some((partition, keys)) = self.writes.pop_front() {
            self.apply_write(partition, &keys, status);
        }
        self.run_exit_timers(status);
        self.refresh_ready(status);
    }

    fn write_ready(&self) -> bool {
        self.writes.is_empty()
    }

    fn write(&mut self, partition: u8, keys: &str) {
        self.written.push((partition, keys.to_string()));
        self.writes.push_back((partition, keys.to_string()));
    }
}
