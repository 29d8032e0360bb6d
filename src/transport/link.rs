// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Network link layer

use tracing::{debug, info};

/// The network stack under the MQTT transport.
pub trait LinkLayer {
    /// Bring the network stack back up from scratch after a failed connect.
    fn reinitialize(&mut self);

    /// Periodic upkeep (lease renewal and the like), called once per tick.
    fn maintain(&mut self) {}
}

/// Link layer for a hosted OS, where the kernel owns DHCP and TCP upkeep.
///
/// Reinitialization is recorded and logged; the transport builds a fresh
/// socket on every connect attempt anyway.
#[derive(Debug, Default)]
pub struct HostLink {
    reinit_count: u64,
}

impl HostLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reinit_count(&self) -> u64 {
        self.reinit_count
    }
}

impl LinkLayer for HostLink {
    fn reinitialize(&mut self) {
        self.reinit_count += 1;
        if self.reinit_count == 1 || self.reinit_count % 100 == 0 {
            info!("Network link reinitialized ({} times)", self.reinit_count);
        } else {
            debug!("Network link reinitialized ({} times)", self.reinit_count);
        }
    }
}
