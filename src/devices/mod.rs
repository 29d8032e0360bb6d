// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Panel status model

pub mod flags;
pub mod zone;
pub mod partition;
pub mod output;
pub mod system;

pub use flags::{ChangeBank, FlagBank, GROUP_SIZE};
pub use zone::{ZoneBank, MAX_ZONES, MAX_ZONE_GROUPS};
pub use partition::{ArmState, PartitionChanges, PartitionFlags, PartitionStatus, MAX_PARTITIONS};
pub use output::{PgmBank, MAX_PGMS};
pub use system::SystemStatus;
