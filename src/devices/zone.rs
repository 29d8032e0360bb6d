// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Zone open/closed status

use super::flags::{ChangeBank, GROUP_SIZE};

/// Zones supported by the keybus (8 groups of 8).
pub const MAX_ZONES: usize = 64;

/// Zone groups reported by the keybus.
pub const MAX_ZONE_GROUPS: usize = MAX_ZONES / GROUP_SIZE;

/// Open/closed state and change flags for zones 1-64 (stored 0-based).
pub type ZoneBank = ChangeBank<MAX_ZONES>;

/// 0-based storage index for `bit` of zone group `group`.
pub fn zone_index(group: usize, bit: usize) -> usize {
    group * GROUP_SIZE + bit
}

/// 1-based zone number as used on the wire and in topics.
pub fn zone_number(index: usize) -> u32 {
    index as u32 + 1
}
