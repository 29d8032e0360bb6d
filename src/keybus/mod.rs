// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Keybus decoding collaborator

pub mod simulated;

use crate::status::PanelStatus;

pub use simulated::{SimInput, SimulatedPanel};

/// Virtual keypad keys understood by the keybus interface.
pub mod keys {
    pub const ARM_STAY: char = 's';
    pub const ARM_AWAY: char = 'w';
    pub const ARM_NIGHT: char = 'n';
    pub const SILENCE_TROUBLE: char = '#';
    pub const PANIC: char = 'p';
}

/// The keybus decoding engine.
///
/// It owns protocol timing and buffering; the bridge only asks it to fold
/// decoded traffic into the status model and to send virtual keypad keys.
pub trait Keybus {
    /// Fold any buffered keybus traffic into `status`, setting change flags
    /// for whatever changed.
    fn poll(&mut self, status: &mut PanelStatus);

    /// Whether a write can be accepted right now.
    fn write_ready(&self) -> bool;

    /// Send `keys` through the virtual keypad, addressed to `partition`
    /// (1-based).
    fn write(&mut self, partition: u8, keys: &str);
}
