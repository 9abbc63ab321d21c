//! In-memory controller services for integration tests.
//!
//! `MockSwitch` records every message written to it and keeps a simulated
//! flow table, so tests can read back what a switch would hold.

#![allow(dead_code)]

use fabric_forwarding::error::SwitchIoError;
use fabric_forwarding::events::LinkUpdate;
use fabric_forwarding::flow::FlowRuleDescriptor;
use fabric_forwarding::forwarding::{AttachmentPoint, Device, Hop, Route};
use fabric_forwarding::services::{
    ClusterId, DeviceLocationIndex, RouteResolver, SwitchHandle, SwitchRegistry, TopologyView, Xid,
};
use fabric_forwarding::stats::StatsRequest;
use fabric_types::{ethertype, BufferId, Dpid, MacAddress, PortNo, VlanId, Wildcards};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// A connected switch that records flow-mods and statistics requests.
pub struct MockSwitch {
    dpid: Dpid,
    next_xid: AtomicU32,
    fast_wildcards: Wildcards,
    ports: Vec<PortNo>,
    fail_writes: AtomicBool,
    flow_mods: Mutex<Vec<FlowRuleDescriptor>>,
    stats_requests: Mutex<Vec<(Xid, StatsRequest)>>,
}

impl MockSwitch {
    pub fn new(dpid: Dpid) -> Self {
        Self {
            dpid,
            next_xid: AtomicU32::new(1),
            fast_wildcards: Wildcards::ALL,
            ports: Vec::new(),
            fail_writes: AtomicBool::new(false),
            flow_mods: Mutex::new(Vec::new()),
            stats_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_xid_start(self, xid: Xid) -> Self {
        self.next_xid.store(xid, Ordering::SeqCst);
        self
    }

    pub fn with_ports(mut self, ports: &[u16]) -> Self {
        self.ports = ports.iter().copied().map(PortNo::new).collect();
        self
    }

    pub fn with_fast_wildcards(mut self, wildcards: Wildcards) -> Self {
        self.fast_wildcards = wildcards;
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every flow-mod written, in order.
    pub fn flow_mods(&self) -> Vec<FlowRuleDescriptor> {
        self.flow_mods.lock().clone()
    }

    /// Entries the switch would hold: rules keyed by match and priority, a
    /// later rule replacing an earlier one.
    pub fn flow_table(&self) -> Vec<FlowRuleDescriptor> {
        let mut table: Vec<FlowRuleDescriptor> = Vec::new();
        for rule in self.flow_mods.lock().iter() {
            table.retain(|r| !(r.flow_match == rule.flow_match && r.priority == rule.priority));
            table.push(rule.clone());
        }
        table
    }

    pub fn stats_requests(&self) -> Vec<(Xid, StatsRequest)> {
        self.stats_requests.lock().clone()
    }

    fn check_write(&self) -> Result<(), SwitchIoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SwitchIoError::WriteFailed {
                dpid: self.dpid,
                reason: "connection reset".to_string(),
            });
        }
        Ok(())
    }
}

impl SwitchHandle for MockSwitch {
    fn dpid(&self) -> Dpid {
        self.dpid
    }

    fn next_transaction_id(&self) -> Xid {
        self.next_xid.fetch_add(1, Ordering::SeqCst)
    }

    fn send_flow_mod(&self, rule: &FlowRuleDescriptor) -> Result<(), SwitchIoError> {
        self.check_write()?;
        self.flow_mods.lock().push(rule.clone());
        Ok(())
    }

    fn send_stats_request(&self, xid: Xid, request: &StatsRequest) -> Result<(), SwitchIoError> {
        self.check_write()?;
        self.stats_requests.lock().push((xid, request.clone()));
        Ok(())
    }

    fn fast_wildcards(&self) -> Wildcards {
        self.fast_wildcards
    }

    fn enabled_ports(&self) -> Vec<PortNo> {
        self.ports.clone()
    }
}

#[derive(Default)]
pub struct MockRegistry {
    switches: Mutex<HashMap<Dpid, Arc<MockSwitch>>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, switch: MockSwitch) -> Arc<MockSwitch> {
        let switch = Arc::new(switch);
        self.switches.lock().insert(switch.dpid, switch.clone());
        switch
    }

    pub fn remove(&self, dpid: Dpid) {
        self.switches.lock().remove(&dpid);
    }
}

impl SwitchRegistry for MockRegistry {
    fn switch(&self, dpid: Dpid) -> Option<Arc<dyn SwitchHandle>> {
        self.switches
            .lock()
            .get(&dpid)
            .map(|s| s.clone() as Arc<dyn SwitchHandle>)
    }
}

#[derive(Default)]
pub struct MockTopology {
    clusters: Mutex<HashMap<Dpid, ClusterId>>,
    blocked: Mutex<HashSet<(Dpid, PortNo)>>,
    last_updates: Mutex<Vec<LinkUpdate>>,
}

impl MockTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cluster(&self, dpid: Dpid, cluster: ClusterId) {
        self.clusters.lock().insert(dpid, cluster);
    }

    pub fn block_broadcast(&self, dpid: Dpid, port: u16) {
        self.blocked.lock().insert((dpid, PortNo::new(port)));
    }

    pub fn set_last_updates(&self, updates: Vec<LinkUpdate>) {
        *self.last_updates.lock() = updates;
    }
}

impl TopologyView for MockTopology {
    fn l2_domain_id(&self, switch: Dpid) -> Option<ClusterId> {
        self.clusters.lock().get(&switch).copied()
    }

    fn is_incoming_broadcast_allowed(&self, switch: Dpid, port: PortNo) -> bool {
        !self.blocked.lock().contains(&(switch, port))
    }

    fn last_link_updates(&self) -> Vec<LinkUpdate> {
        self.last_updates.lock().clone()
    }
}

#[derive(Default)]
pub struct MockDevices {
    devices: Mutex<HashMap<MacAddress, Device>>,
}

impl MockDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, mac: MacAddress, attachment_points: Vec<AttachmentPoint>) {
        self.devices
            .lock()
            .insert(mac, Device::new(mac, None, attachment_points));
    }
}

impl DeviceLocationIndex for MockDevices {
    fn find_device(&self, mac: MacAddress, _vlan: Option<VlanId>) -> Option<Device> {
        self.devices.lock().get(&mac).cloned()
    }
}

type RouteKey = (Dpid, PortNo, Dpid, PortNo);

#[derive(Default)]
pub struct MockRoutes {
    routes: Mutex<HashMap<RouteKey, Route>>,
    calls: Mutex<Vec<RouteKey>>,
}

impl MockRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, src: AttachmentPoint, dst: AttachmentPoint, route: Route) {
        self.routes
            .lock()
            .insert((src.switch, src.port, dst.switch, dst.port), route);
    }

    pub fn calls(&self) -> Vec<RouteKey> {
        self.calls.lock().clone()
    }
}

impl RouteResolver for MockRoutes {
    fn route(&self, src: Dpid, src_port: PortNo, dst: Dpid, dst_port: PortNo) -> Option<Route> {
        let key = (src, src_port, dst, dst_port);
        self.calls.lock().push(key);
        self.routes.lock().get(&key).cloned()
    }
}

pub fn mac(last: u8) -> MacAddress {
    MacAddress::new([0x00, 0x00, 0x00, 0x00, 0x00, last])
}

pub fn ap(switch: Dpid, port: u16, cluster: ClusterId) -> AttachmentPoint {
    AttachmentPoint::new(switch, PortNo::new(port), cluster)
}

pub fn hop(switch: Dpid, in_port: u16, out_port: u16) -> Hop {
    Hop::new(switch, PortNo::new(in_port), PortNo::new(out_port))
}

pub fn buffer(id: u32) -> BufferId {
    BufferId::new(id)
}

/// An IPv4/UDP frame 10.0.0.<src> -> 10.0.0.<dst>, 5000 -> 53.
pub fn udp_frame(dst: MacAddress, src: MacAddress) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(dst.as_bytes());
    frame.extend_from_slice(src.as_bytes());
    frame.extend_from_slice(&ethertype::IPV4.to_be_bytes());
    let mut ip = vec![0u8; 20];
    ip[0] = 0x45;
    ip[9] = 17;
    ip[12..16].copy_from_slice(&[10, 0, 0, src.as_bytes()[5]]);
    ip[16..20].copy_from_slice(&[10, 0, 0, dst.as_bytes()[5]]);
    frame.extend_from_slice(&ip);
    frame.extend_from_slice(&5000u16.to_be_bytes());
    frame.extend_from_slice(&53u16.to_be_bytes());
    frame.extend_from_slice(&[0u8; 4]);
    frame
}

/// A broadcast ARP request from `src`.
pub fn arp_broadcast(src: MacAddress) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(MacAddress::BROADCAST.as_bytes());
    frame.extend_from_slice(src.as_bytes());
    frame.extend_from_slice(&ethertype::ARP.to_be_bytes());
    let mut arp = vec![0u8; 28];
    arp[0..2].copy_from_slice(&1u16.to_be_bytes());
    arp[2..4].copy_from_slice(&ethertype::IPV4.to_be_bytes());
    arp[4] = 6;
    arp[5] = 4;
    arp[6..8].copy_from_slice(&1u16.to_be_bytes());
    arp[8..14].copy_from_slice(src.as_bytes());
    arp[14..18].copy_from_slice(&[10, 0, 0, src.as_bytes()[5]]);
    arp[24..28].copy_from_slice(&[10, 0, 0, 254]);
    frame.extend_from_slice(&arp);
    frame
}
