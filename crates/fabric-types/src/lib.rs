//! Common types for the OpenFlow fabric control plane.
//!
//! This crate provides type-safe representations of the primitives shared by
//! the forwarding and statistics applications:
//!
//! - [`Dpid`]: 64-bit datapath identifier of a switch
//! - [`PortNo`]: OpenFlow 1.0 port number, including the reserved ports
//! - [`BufferId`]: switch-side packet buffer reference
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers
//! - [`EthernetFrame`]: parsed L2/L3/L4 header fields of a packet-in payload
//! - [`FlowMatch`] / [`Wildcards`]: the OpenFlow 1.0 match structure

mod ethernet;
mod mac;
mod ofmatch;
mod switch;
mod vlan;

pub use ethernet::{ethertype, ip_proto, EthernetFrame, NetworkHeader, TransportHeader};
pub use mac::MacAddress;
pub use ofmatch::{FlowMatch, Wildcards};
pub use switch::{BufferId, Dpid, PortNo};
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid datapath id: {0}")]
    InvalidDpid(String),

    #[error("invalid VLAN ID: {0} (must be 0-4095)")]
    InvalidVlanId(u16),

    #[error("truncated {header} header: need {needed} bytes, have {available}")]
    Truncated {
        header: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("invalid IPv4 header length: {0} words (minimum 5)")]
    InvalidIpv4HeaderLength(u8),
}
