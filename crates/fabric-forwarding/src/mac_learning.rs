//! Logs each source MAC address the first time any switch reports it.

use dashmap::DashSet;
use fabric_types::{Dpid, MacAddress};
use tracing::info;

use crate::events::FabricEvent;
use crate::listener::{Command, MessageListener};
use crate::topology::dpid::switch_label;

/// Concurrent set of source MAC addresses seen in packet-ins.
#[derive(Debug, Default)]
pub struct MacLearningLog {
    seen: DashSet<MacAddress>,
}

impl MacLearningLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `mac`; true and one info line the first time it is seen.
    pub fn observe(&self, switch: Dpid, mac: MacAddress) -> bool {
        let first = self.seen.insert(mac);
        if first {
            info!(mac = %mac, switch = %switch_label(switch), "MAC address seen");
        }
        first
    }

    pub fn contains(&self, mac: &MacAddress) -> bool {
        self.seen.contains(mac)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl MessageListener for MacLearningLog {
    fn name(&self) -> &'static str {
        "mac-learning"
    }

    fn receive(&self, event: &FabricEvent) -> Command {
        if let FabricEvent::PacketIn(pi) = event {
            self.observe(pi.switch, pi.frame.dl_src);
        }
        Command::Continue
    }
}
