// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Shared panel status model

use crate::devices::{PartitionStatus, PgmBank, SystemStatus, ZoneBank, MAX_PARTITIONS};

/// The panel status model.
///
/// One value is owned by the bridge and lent to each component per tick: the
/// keybus collaborator sets state and change flags, the publisher clears change
/// flags after publishing, and the command dispatcher sets the write target.
#[derive(Debug, Clone)]
pub struct PanelStatus {
    pub system: SystemStatus,
    partitions: [PartitionStatus; MAX_PARTITIONS],
    pub zones: ZoneBank,
    pub pgms: PgmBank,
    /// 1-based partition that virtual keypad writes are addressed to
    pub write_partition: u8,
}

impl Default for PanelStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelStatus {
    pub fn new() -> Self {
        Self {
            system: SystemStatus::default(),
            partitions: std::array::from_fn(|i| PartitionStatus::new(i as u8 + 1)),
            zones: ZoneBank::new(),
            pgms: PgmBank::new(),
            write_partition: 1,
        }
    }

    /// Partition by 1-based id.
    pub fn partition(&self, id: u8) -> Option<&PartitionStatus> {
        let index = usize::from(id).checked_sub(1)?;
        self.partitions.get(index)
    }

    /// Mutable partition by 1-based id.
    pub fn partition_mut(&mut self, id: u8) -> Option<&mut PartitionStatus> {
        let index = usize::from(id).checked_sub(1)?;
        self.partitions.get_mut(index)
    }

    pub fn partitions(&self) -> &[PartitionStatus] {
        &self.partitions
    }

    /// Record a zone (1-based) as open or closed.
    pub fn set_zone_open(&mut self, zone: u32, open: bool) -> bool {
        match (zone as usize).checked_sub(1) {
            Some(index) => self.zones.update(index, open),
            None => false,
        }
    }

    /// Record a PGM output (1-based) as active or idle.
    pub fn set_pgm_active(&mut self, pgm: u32, active: bool) -> bool {
        match (pgm as usize).checked_sub(1) {
            Some(index) => self.pgms.update(index, active),
            None => false,
        }
    }

    /// Whether any change flag is still waiting to be published.
    pub fn has_pending_changes(&self) -> bool {
        self.system.has_changes()
            || self.partitions.iter().any(|p| !p.changes.is_empty())
            || self.zones.is_pending()
            || self.pgms.is_pending()
    }
}
