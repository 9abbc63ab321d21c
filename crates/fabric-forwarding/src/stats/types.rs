//! Statistics request and reply types (OpenFlow 1.0 shapes).

use fabric_types::{FlowMatch, PortNo};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::flow::AppCookie;

/// `table_id` selecting every flow table.
pub const ALL_TABLES: u8 = 0xff;

/// Kind of statistics being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatsKind {
    Port,
    Flow,
    Aggregate,
    Table,
}

impl fmt::Display for StatsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatsKind::Port => "PORT",
            StatsKind::Flow => "FLOW",
            StatsKind::Aggregate => "AGGREGATE",
            StatsKind::Table => "TABLE",
        };
        f.write_str(s)
    }
}

/// Body of a statistics request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsRequest {
    Port {
        port_no: PortNo,
    },
    Flow {
        flow_match: FlowMatch,
        table_id: u8,
        out_port: PortNo,
    },
    Aggregate {
        flow_match: FlowMatch,
        table_id: u8,
        out_port: PortNo,
    },
    Table,
}

impl StatsRequest {
    /// The broadest request of `kind`: every port, or every flow in every
    /// table regardless of output port.
    pub fn for_kind(kind: StatsKind) -> Self {
        match kind {
            StatsKind::Port => StatsRequest::Port {
                port_no: PortNo::ALL,
            },
            StatsKind::Flow => StatsRequest::Flow {
                flow_match: FlowMatch::match_all(),
                table_id: ALL_TABLES,
                out_port: PortNo::NONE,
            },
            StatsKind::Aggregate => StatsRequest::Aggregate {
                flow_match: FlowMatch::match_all(),
                table_id: ALL_TABLES,
                out_port: PortNo::NONE,
            },
            StatsKind::Table => StatsRequest::Table,
        }
    }

    pub fn kind(&self) -> StatsKind {
        match self {
            StatsRequest::Port { .. } => StatsKind::Port,
            StatsRequest::Flow { .. } => StatsKind::Flow,
            StatsRequest::Aggregate { .. } => StatsKind::Aggregate,
            StatsRequest::Table => StatsKind::Table,
        }
    }
}

/// Counters of one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStats {
    pub port_no: PortNo,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_frame_err: u64,
    pub rx_over_err: u64,
    pub rx_crc_err: u64,
    pub collisions: u64,
}

impl PortStats {
    /// All counters zero.
    pub fn new(port_no: PortNo) -> Self {
        Self {
            port_no,
            rx_packets: 0,
            tx_packets: 0,
            rx_bytes: 0,
            tx_bytes: 0,
            rx_dropped: 0,
            tx_dropped: 0,
            rx_errors: 0,
            tx_errors: 0,
            rx_frame_err: 0,
            rx_over_err: 0,
            rx_crc_err: 0,
            collisions: 0,
        }
    }
}

/// Counters of one flow entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStats {
    pub table_id: u8,
    pub flow_match: FlowMatch,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub priority: u16,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub cookie: AppCookie,
    pub packet_count: u64,
    pub byte_count: u64,
    pub actions: Vec<PortNo>,
}

/// Totals over a set of flows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub packet_count: u64,
    pub byte_count: u64,
    pub flow_count: u32,
}

/// Counters of one flow table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub table_id: u8,
    pub name: String,
    pub wildcards: u32,
    pub max_entries: u32,
    pub active_count: u32,
    pub lookup_count: u64,
    pub matched_count: u64,
}

/// Decoded body of a statistics reply, or of all its parts merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsBody {
    Port(Vec<PortStats>),
    Flow(Vec<FlowStats>),
    Aggregate(AggregateStats),
    Table(Vec<TableStats>),
}

impl StatsBody {
    pub fn kind(&self) -> StatsKind {
        match self {
            StatsBody::Port(_) => StatsKind::Port,
            StatsBody::Flow(_) => StatsKind::Flow,
            StatsBody::Aggregate(_) => StatsKind::Aggregate,
            StatsBody::Table(_) => StatsKind::Table,
        }
    }

    fn empty(kind: StatsKind) -> Self {
        match kind {
            StatsKind::Port => StatsBody::Port(Vec::new()),
            StatsKind::Flow => StatsBody::Flow(Vec::new()),
            StatsKind::Aggregate => StatsBody::Aggregate(AggregateStats::default()),
            StatsKind::Table => StatsBody::Table(Vec::new()),
        }
    }

    /// Concatenates the parts of a multipart reply in arrival order.
    /// Aggregate parts are summed, saturating at the counter maximum.
    ///
    /// Returns the kind of the first part that is not `expected`.
    pub(crate) fn merge(expected: StatsKind, parts: Vec<StatsBody>) -> Result<Self, StatsKind> {
        let mut merged = Self::empty(expected);
        for part in parts {
            match (&mut merged, part) {
                (StatsBody::Port(acc), StatsBody::Port(more)) => acc.extend(more),
                (StatsBody::Flow(acc), StatsBody::Flow(more)) => acc.extend(more),
                (StatsBody::Table(acc), StatsBody::Table(more)) => acc.extend(more),
                (StatsBody::Aggregate(acc), StatsBody::Aggregate(more)) => {
                    acc.packet_count = acc.packet_count.saturating_add(more.packet_count);
                    acc.byte_count = acc.byte_count.saturating_add(more.byte_count);
                    acc.flow_count = acc.flow_count.saturating_add(more.flow_count);
                }
                (_, other) => return Err(other.kind()),
            }
        }
        Ok(merged)
    }

    pub fn into_port_stats(self) -> Option<Vec<PortStats>> {
        match self {
            StatsBody::Port(ports) => Some(ports),
            _ => None,
        }
    }
}
