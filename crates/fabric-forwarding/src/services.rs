//! Controller services the application consumes.
//!
//! Switch connections, topology discovery, device tracking and path
//! computation belong to the hosting controller. The application only sees
//! them through these traits, injected as `Arc<dyn _>` at construction so
//! tests can substitute in-memory doubles.

use fabric_types::{Dpid, MacAddress, PortNo, VlanId, Wildcards};
use std::sync::Arc;

use crate::error::SwitchIoError;
use crate::events::LinkUpdate;
use crate::flow::FlowRuleDescriptor;
use crate::forwarding::{Device, Route};
use crate::stats::StatsRequest;

/// Identifier of an L2 domain (cluster) computed by topology discovery.
pub type ClusterId = u64;

/// OpenFlow transaction id.
pub type Xid = u32;

/// Read-only view of the current topology.
pub trait TopologyView: Send + Sync {
    /// L2 domain the switch belongs to, if the switch is part of the topology.
    fn l2_domain_id(&self, switch: Dpid) -> Option<ClusterId>;

    /// False when broadcasts entering on this port must be dropped to keep
    /// the flood tree loop free.
    fn is_incoming_broadcast_allowed(&self, switch: Dpid, port: PortNo) -> bool;

    /// Link and switch updates of the most recent topology computation.
    fn last_link_updates(&self) -> Vec<LinkUpdate>;
}

/// Known end hosts and where they attach to the fabric.
pub trait DeviceLocationIndex: Send + Sync {
    /// Looks a device up by MAC address and VLAN.
    ///
    /// Implementations return attachment points sorted by cluster id.
    fn find_device(&self, mac: MacAddress, vlan: Option<VlanId>) -> Option<Device>;
}

/// Path computation between two attachment points.
pub trait RouteResolver: Send + Sync {
    fn route(&self, src: Dpid, src_port: PortNo, dst: Dpid, dst_port: PortNo) -> Option<Route>;
}

/// A connected switch.
pub trait SwitchHandle: Send + Sync {
    fn dpid(&self) -> Dpid;

    /// Allocates the next transaction id on this connection.
    fn next_transaction_id(&self) -> Xid;

    /// Writes one flow-modification message.
    fn send_flow_mod(&self, rule: &FlowRuleDescriptor) -> Result<(), SwitchIoError>;

    /// Writes one statistics request carrying `xid`.
    fn send_stats_request(&self, xid: Xid, request: &StatsRequest) -> Result<(), SwitchIoError>;

    /// Wildcards the switch can match in its fast path.
    fn fast_wildcards(&self) -> Wildcards;

    /// Physical ports currently up.
    fn enabled_ports(&self) -> Vec<PortNo>;
}

/// Lookup of connected switches by datapath id.
pub trait SwitchRegistry: Send + Sync {
    fn switch(&self, dpid: Dpid) -> Option<Arc<dyn SwitchHandle>>;
}
