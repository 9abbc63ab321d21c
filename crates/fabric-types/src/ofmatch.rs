//! OpenFlow 1.0 flow match and wildcard bits.

use crate::{EthernetFrame, MacAddress, NetworkHeader, PortNo, TransportHeader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::ops::{BitAnd, BitOr, Not};

/// OpenFlow 1.0 `ofp_flow_wildcards` bit set.
///
/// A set bit means the corresponding match field is ignored. The network
/// address fields use 6-bit prefix-length counters instead of single bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wildcards(u32);

impl Wildcards {
    pub const NONE: Wildcards = Wildcards(0);
    pub const IN_PORT: Wildcards = Wildcards(1 << 0);
    pub const DL_VLAN: Wildcards = Wildcards(1 << 1);
    pub const DL_SRC: Wildcards = Wildcards(1 << 2);
    pub const DL_DST: Wildcards = Wildcards(1 << 3);
    pub const DL_TYPE: Wildcards = Wildcards(1 << 4);
    pub const NW_PROTO: Wildcards = Wildcards(1 << 5);
    pub const TP_SRC: Wildcards = Wildcards(1 << 6);
    pub const TP_DST: Wildcards = Wildcards(1 << 7);
    pub const NW_SRC_SHIFT: u32 = 8;
    pub const NW_SRC_MASK: Wildcards = Wildcards(0x3f << Self::NW_SRC_SHIFT);
    pub const NW_SRC_ALL: Wildcards = Wildcards(32 << Self::NW_SRC_SHIFT);
    pub const NW_DST_SHIFT: u32 = 14;
    pub const NW_DST_MASK: Wildcards = Wildcards(0x3f << Self::NW_DST_SHIFT);
    pub const NW_DST_ALL: Wildcards = Wildcards(32 << Self::NW_DST_SHIFT);
    pub const DL_VLAN_PCP: Wildcards = Wildcards(1 << 20);
    pub const NW_TOS: Wildcards = Wildcards(1 << 21);
    pub const ALL: Wildcards = Wildcards((1 << 22) - 1);

    /// Fields an L2 forwarding rule must keep exact.
    const L2_SIGNIFICANT: Wildcards = Wildcards(
        Self::IN_PORT.0
            | Self::DL_VLAN.0
            | Self::DL_SRC.0
            | Self::DL_DST.0
            | Self::NW_SRC_MASK.0
            | Self::NW_DST_MASK.0,
    );

    pub const fn from_bits(bits: u32) -> Self {
        Wildcards(bits & Self::ALL.0)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// True when every bit of `other` is also set in `self`.
    pub const fn contains(&self, other: Wildcards) -> bool {
        self.0 & other.0 == other.0
    }

    /// Derives the wildcard hint for an L2 forwarding rule from a switch's
    /// advertised fast-path wildcards: ingress port, VLAN, both MAC addresses
    /// and both network addresses stay significant.
    pub const fn l2_only(fast_wildcards: Wildcards) -> Self {
        Wildcards(fast_wildcards.0 & !Self::L2_SIGNIFICANT.0)
    }

    /// Number of wildcarded low-order bits of the IPv4 source (0..=32).
    pub const fn nw_src_wildcard_bits(&self) -> u32 {
        let n = (self.0 & Self::NW_SRC_MASK.0) >> Self::NW_SRC_SHIFT;
        if n > 32 {
            32
        } else {
            n
        }
    }

    /// Number of wildcarded low-order bits of the IPv4 destination (0..=32).
    pub const fn nw_dst_wildcard_bits(&self) -> u32 {
        let n = (self.0 & Self::NW_DST_MASK.0) >> Self::NW_DST_SHIFT;
        if n > 32 {
            32
        } else {
            n
        }
    }

    /// Swaps every source-side bit with its destination-side counterpart.
    pub const fn reversed(&self) -> Self {
        let bits = self.0;
        let mut out = bits
            & !(Self::DL_SRC.0
                | Self::DL_DST.0
                | Self::TP_SRC.0
                | Self::TP_DST.0
                | Self::NW_SRC_MASK.0
                | Self::NW_DST_MASK.0);
        if bits & Self::DL_SRC.0 != 0 {
            out |= Self::DL_DST.0;
        }
        if bits & Self::DL_DST.0 != 0 {
            out |= Self::DL_SRC.0;
        }
        if bits & Self::TP_SRC.0 != 0 {
            out |= Self::TP_DST.0;
        }
        if bits & Self::TP_DST.0 != 0 {
            out |= Self::TP_SRC.0;
        }
        let src = (bits & Self::NW_SRC_MASK.0) >> Self::NW_SRC_SHIFT;
        let dst = (bits & Self::NW_DST_MASK.0) >> Self::NW_DST_SHIFT;
        out |= dst << Self::NW_SRC_SHIFT;
        out |= src << Self::NW_DST_SHIFT;
        Wildcards(out)
    }
}

impl BitOr for Wildcards {
    type Output = Wildcards;

    fn bitor(self, rhs: Self) -> Self::Output {
        Wildcards(self.0 | rhs.0)
    }
}

impl BitAnd for Wildcards {
    type Output = Wildcards;

    fn bitand(self, rhs: Self) -> Self::Output {
        Wildcards(self.0 & rhs.0)
    }
}

impl Not for Wildcards {
    type Output = Wildcards;

    fn not(self) -> Self::Output {
        Wildcards(!self.0 & Self::ALL.0)
    }
}

impl fmt::Display for Wildcards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06x}", self.0)
    }
}

/// OpenFlow 1.0 twelve-tuple match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowMatch {
    pub wildcards: Wildcards,
    pub in_port: PortNo,
    pub dl_src: MacAddress,
    pub dl_dst: MacAddress,
    /// VLAN id, or [`FlowMatch::VLAN_NONE`] for untagged frames.
    pub dl_vlan: u16,
    pub dl_vlan_pcp: u8,
    pub dl_type: u16,
    pub nw_tos: u8,
    pub nw_proto: u8,
    pub nw_src: Ipv4Addr,
    pub nw_dst: Ipv4Addr,
    pub tp_src: u16,
    pub tp_dst: u16,
}

impl FlowMatch {
    /// `dl_vlan` value of an untagged frame.
    pub const VLAN_NONE: u16 = 0xffff;

    /// A match that accepts every packet.
    pub fn match_all() -> Self {
        FlowMatch {
            wildcards: Wildcards::ALL,
            ..Self::empty()
        }
    }

    fn empty() -> Self {
        FlowMatch {
            wildcards: Wildcards::NONE,
            in_port: PortNo::NONE,
            dl_src: MacAddress::ZERO,
            dl_dst: MacAddress::ZERO,
            dl_vlan: Self::VLAN_NONE,
            dl_vlan_pcp: 0,
            dl_type: 0,
            nw_tos: 0,
            nw_proto: 0,
            nw_src: Ipv4Addr::UNSPECIFIED,
            nw_dst: Ipv4Addr::UNSPECIFIED,
            tp_src: 0,
            tp_dst: 0,
        }
    }

    /// Exact match on every header field of `frame` received on `in_port`.
    ///
    /// ARP frames put the opcode in `nw_proto` and the sender/target protocol
    /// addresses in `nw_src`/`nw_dst`; ICMP puts type/code in `tp_src`/`tp_dst`.
    pub fn from_packet(frame: &EthernetFrame, in_port: PortNo) -> Self {
        let mut m = FlowMatch {
            in_port,
            dl_src: frame.dl_src,
            dl_dst: frame.dl_dst,
            dl_vlan: frame.vlan.map_or(Self::VLAN_NONE, |v| v.as_u16()),
            dl_vlan_pcp: frame.vlan_pcp,
            dl_type: frame.ethertype,
            ..Self::empty()
        };

        match frame.network {
            NetworkHeader::Ipv4 {
                src,
                dst,
                proto,
                tos,
                transport,
            } => {
                m.nw_src = src;
                m.nw_dst = dst;
                m.nw_proto = proto;
                m.nw_tos = tos;
                let (tp_src, tp_dst) = match transport {
                    TransportHeader::Tcp { src_port, dst_port }
                    | TransportHeader::Udp { src_port, dst_port } => (src_port, dst_port),
                    TransportHeader::Icmp { icmp_type, code } => {
                        (icmp_type as u16, code as u16)
                    }
                    TransportHeader::None => (0, 0),
                };
                m.tp_src = tp_src;
                m.tp_dst = tp_dst;
            }
            NetworkHeader::Arp {
                opcode,
                sender,
                target,
            } => {
                m.nw_proto = (opcode & 0xff) as u8;
                m.nw_src = sender;
                m.nw_dst = target;
            }
            NetworkHeader::Other => {}
        }
        m
    }

    pub fn with_in_port(mut self, in_port: PortNo) -> Self {
        self.in_port = in_port;
        self
    }

    pub fn with_wildcards(mut self, wildcards: Wildcards) -> Self {
        self.wildcards = wildcards;
        self
    }

    /// The match of the return direction: source and destination fields
    /// (and their wildcard bits) swapped. `in_port` is left as is.
    pub fn reversed(&self) -> Self {
        FlowMatch {
            wildcards: self.wildcards.reversed(),
            dl_src: self.dl_dst,
            dl_dst: self.dl_src,
            nw_src: self.nw_dst,
            nw_dst: self.nw_src,
            tp_src: self.tp_dst,
            tp_dst: self.tp_src,
            ..*self
        }
    }
}

impl fmt::Display for FlowMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = self.wildcards;
        let mut fields: Vec<String> = Vec::new();
        if !w.contains(Wildcards::IN_PORT) {
            fields.push(format!("in_port={}", self.in_port));
        }
        if !w.contains(Wildcards::DL_DST) {
            fields.push(format!("dl_dst={}", self.dl_dst));
        }
        if !w.contains(Wildcards::DL_SRC) {
            fields.push(format!("dl_src={}", self.dl_src));
        }
        if !w.contains(Wildcards::DL_TYPE) {
            fields.push(format!("dl_type=0x{:04x}", self.dl_type));
        }
        if !w.contains(Wildcards::DL_VLAN) {
            fields.push(format!("dl_vlan=0x{:04x}", self.dl_vlan));
        }
        if w.nw_dst_wildcard_bits() < 32 {
            fields.push(format!(
                "nw_dst={}/{}",
                self.nw_dst,
                32 - w.nw_dst_wildcard_bits()
            ));
        }
        if w.nw_src_wildcard_bits() < 32 {
            fields.push(format!(
                "nw_src={}/{}",
                self.nw_src,
                32 - w.nw_src_wildcard_bits()
            ));
        }
        if !w.contains(Wildcards::NW_PROTO) {
            fields.push(format!("nw_proto={}", self.nw_proto));
        }
        if !w.contains(Wildcards::TP_DST) {
            fields.push(format!("tp_dst={}", self.tp_dst));
        }
        if !w.contains(Wildcards::TP_SRC) {
            fields.push(format!("tp_src={}", self.tp_src));
        }
        write!(f, "FlowMatch[{}]", fields.join(","))
    }
}
