//! Forwarding decision types.

use fabric_types::{Dpid, MacAddress, PortNo, VlanId, Wildcards};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::services::ClusterId;

/// A route that cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("hop on switch {switch} leaves through its ingress port {port}")]
    HairpinHop { switch: Dpid, port: PortNo },

    #[error("route has no hops")]
    Empty,
}

/// One switch traversal of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hop {
    pub switch: Dpid,
    pub in_port: PortNo,
    pub out_port: PortNo,
}

impl Hop {
    pub fn new(switch: Dpid, in_port: PortNo, out_port: PortNo) -> Self {
        Self {
            switch,
            in_port,
            out_port,
        }
    }
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}->{}]", self.switch, self.in_port, self.out_port)
    }
}

/// Ordered hops from the source attachment point to the destination one.
///
/// Never contains a hop that sends traffic back out of its ingress port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Route {
    hops: Vec<Hop>,
}

impl Route {
    pub fn new(hops: Vec<Hop>) -> Result<Self, RouteError> {
        if hops.is_empty() {
            return Err(RouteError::Empty);
        }
        if let Some(hop) = hops.iter().find(|h| h.in_port == h.out_port) {
            return Err(RouteError::HairpinHop {
                switch: hop.switch,
                port: hop.in_port,
            });
        }
        Ok(Self { hops })
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// First hop, on the ingress switch.
    pub fn first(&self) -> &Hop {
        &self.hops[0]
    }

    /// The return path: hops in reverse order with ports swapped.
    pub fn reversed(&self) -> Self {
        let hops = self
            .hops
            .iter()
            .rev()
            .map(|h| Hop::new(h.switch, h.out_port, h.in_port))
            .collect();
        Self { hops }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, hop) in self.hops.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", hop)?;
        }
        Ok(())
    }
}

/// Where a device attaches to the fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentPoint {
    pub switch: Dpid,
    pub port: PortNo,
    pub cluster: ClusterId,
}

impl AttachmentPoint {
    pub fn new(switch: Dpid, port: PortNo, cluster: ClusterId) -> Self {
        Self {
            switch,
            port,
            cluster,
        }
    }

    /// Same switch and port, whatever the cluster.
    pub fn same_port(&self, other: &AttachmentPoint) -> bool {
        self.switch == other.switch && self.port == other.port
    }
}

/// An end host known to the device index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub mac: MacAddress,
    pub vlan: Option<VlanId>,
    attachment_points: Vec<AttachmentPoint>,
}

impl Device {
    /// Attachment points are sorted by cluster; only the first one listed
    /// for each cluster is kept.
    pub fn new(
        mac: MacAddress,
        vlan: Option<VlanId>,
        mut attachment_points: Vec<AttachmentPoint>,
    ) -> Self {
        attachment_points.sort_by_key(|ap| ap.cluster);
        attachment_points.dedup_by_key(|ap| ap.cluster);
        Self {
            mac,
            vlan,
            attachment_points,
        }
    }

    /// Attachment points, ascending by cluster id, one per cluster.
    pub fn attachment_points(&self) -> &[AttachmentPoint] {
        &self.attachment_points
    }
}

/// Directive an upstream application attaches to a packet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoutingAction {
    None,
    Drop,
    Forward,
    ForwardOrFlood,
    Multicast,
    /// A directive this application does not know how to carry out.
    Unknown(String),
}

impl RoutingAction {
    pub fn name(&self) -> &str {
        match self {
            Self::None => "NONE",
            Self::Drop => "DROP",
            Self::Forward => "FORWARD",
            Self::ForwardOrFlood => "FORWARD_OR_FLOOD",
            Self::Multicast => "MULTICAST",
            Self::Unknown(name) => name,
        }
    }
}

impl FromStr for RoutingAction {
    type Err = std::convert::Infallible;

    /// Never fails; unrecognized names become [`RoutingAction::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "NONE" => Self::None,
            "DROP" => Self::Drop,
            "FORWARD" => Self::Forward,
            "FORWARD_OR_FLOOD" => Self::ForwardOrFlood,
            "MULTICAST" => Self::Multicast,
            _ => Self::Unknown(s.to_string()),
        })
    }
}

impl fmt::Display for RoutingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decision attached to a packet before it reaches the forwarding engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub action: RoutingAction,
    /// Wildcards to install instead of the derived L2-only set.
    pub wildcards: Option<Wildcards>,
}

impl RoutingDecision {
    pub fn new(action: RoutingAction) -> Self {
        Self {
            action,
            wildcards: None,
        }
    }

    pub fn with_wildcards(mut self, wildcards: Wildcards) -> Self {
        self.wildcards = Some(wildcards);
        self
    }
}

/// Outcome of one forwarding decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing installed.
    NoOp,
    /// A flood rule was submitted with these outputs. Empty when the switch
    /// had no other port to flood to.
    Flood { outputs: Vec<PortNo> },
    /// The ingress port may not flood; the packet is dropped silently.
    FloodBlocked,
    /// A drop rule was submitted.
    Drop,
    /// Routes installed in both directions, with the wildcards used.
    InstallRoutes(Vec<(Route, Wildcards)>),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::NoOp => "NOOP",
            Action::Flood { .. } => "FLOOD",
            Action::FloodBlocked => "FLOOD_BLOCKED",
            Action::Drop => "DROP",
            Action::InstallRoutes(_) => "INSTALL_ROUTES",
        }
    }
}
