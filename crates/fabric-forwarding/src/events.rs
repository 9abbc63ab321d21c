//! Inbound events delivered by the controller's message dispatch path.

use fabric_types::{BufferId, Dpid, EthernetFrame, FlowMatch, ParseError, PortNo};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::forwarding::RoutingDecision;
use crate::services::Xid;
use crate::stats::{StatsBody, StatsKind};

/// A packet a switch sent to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIn {
    pub switch: Dpid,
    pub in_port: PortNo,
    pub buffer_id: BufferId,
    pub payload: Vec<u8>,
    pub frame: EthernetFrame,
    /// Directive attached by an upstream application (firewall, VIP, ...).
    pub decision: Option<RoutingDecision>,
}

impl PacketIn {
    /// Builds the event, parsing the headers of `payload`.
    pub fn new(
        switch: Dpid,
        in_port: PortNo,
        buffer_id: BufferId,
        payload: Vec<u8>,
    ) -> Result<Self, ParseError> {
        let frame = EthernetFrame::parse(&payload)?;
        Ok(Self {
            switch,
            in_port,
            buffer_id,
            payload,
            frame,
            decision: None,
        })
    }

    pub fn with_decision(mut self, decision: RoutingDecision) -> Self {
        self.decision = Some(decision);
        self
    }

    /// Exact match on the packet's headers and ingress port.
    pub fn flow_match(&self) -> FlowMatch {
        FlowMatch::from_packet(&self.frame, self.in_port)
    }
}

/// One part of a statistics reply.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReply {
    pub switch: Dpid,
    pub xid: Xid,
    /// Further parts of the same reply follow.
    pub more: bool,
    pub body: StatsBody,
}

impl StatsReply {
    pub fn kind(&self) -> StatsKind {
        self.body.kind()
    }
}

/// Kind of change reported by link discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateOperation {
    LinkUpdated,
    LinkRemoved,
    SwitchUpdated,
    SwitchRemoved,
    PortUp,
    PortDown,
}

impl fmt::Display for UpdateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpdateOperation::LinkUpdated => "LINK_UPDATED",
            UpdateOperation::LinkRemoved => "LINK_REMOVED",
            UpdateOperation::SwitchUpdated => "SWITCH_UPDATED",
            UpdateOperation::SwitchRemoved => "SWITCH_REMOVED",
            UpdateOperation::PortUp => "PORT_UP",
            UpdateOperation::PortDown => "PORT_DOWN",
        };
        f.write_str(s)
    }
}

/// A single link-discovery update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkUpdate {
    pub operation: UpdateOperation,
    pub src: Dpid,
    pub src_port: Option<PortNo>,
    pub dst: Option<Dpid>,
    pub dst_port: Option<PortNo>,
}

impl LinkUpdate {
    pub fn switch(operation: UpdateOperation, dpid: Dpid) -> Self {
        Self {
            operation,
            src: dpid,
            src_port: None,
            dst: None,
            dst_port: None,
        }
    }

    pub fn link(
        operation: UpdateOperation,
        src: Dpid,
        src_port: PortNo,
        dst: Dpid,
        dst_port: PortNo,
    ) -> Self {
        Self {
            operation,
            src,
            src_port: Some(src_port),
            dst: Some(dst),
            dst_port: Some(dst_port),
        }
    }
}

/// Everything the dispatcher hands to listeners.
#[derive(Debug, Clone)]
pub enum FabricEvent {
    PacketIn(PacketIn),
    StatsReply(StatsReply),
    /// Topology was recomputed. An empty update list means the listener
    /// should ask [`TopologyView::last_link_updates`](crate::services::TopologyView::last_link_updates).
    TopologyChanged { updates: Vec<LinkUpdate> },
}

impl FabricEvent {
    /// Switch the event originated from, if any.
    pub fn switch(&self) -> Option<Dpid> {
        match self {
            FabricEvent::PacketIn(pi) => Some(pi.switch),
            FabricEvent::StatsReply(reply) => Some(reply.switch),
            FabricEvent::TopologyChanged { .. } => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FabricEvent::PacketIn(_) => "PACKET_IN",
            FabricEvent::StatsReply(_) => "STATS_REPLY",
            FabricEvent::TopologyChanged { .. } => "TOPOLOGY_CHANGED",
        }
    }
}
