//! Ethernet frame header parsing for packet-in payloads.
//!
//! Only the header fields an OpenFlow 1.0 match can express are decoded:
//! the Ethernet addresses, an optional 802.1Q tag, and the IPv4 / ARP / TCP /
//! UDP / ICMP fields behind it. Anything else is kept opaque.

use crate::{MacAddress, ParseError, VlanId};
use byteorder::{BigEndian, ByteOrder};
use std::net::Ipv4Addr;

/// Well-known ethertype values.
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const VLAN: u16 = 0x8100;
    pub const IPV6: u16 = 0x86dd;
    pub const LLDP: u16 = 0x88cc;
}

/// IP protocol numbers the match understands.
pub mod ip_proto {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
}

const ETH_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const IPV4_MIN_HEADER_LEN: usize = 20;
const ARP_IPV4_LEN: usize = 28;

/// Transport header fields relevant to matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportHeader {
    Tcp { src_port: u16, dst_port: u16 },
    Udp { src_port: u16, dst_port: u16 },
    Icmp { icmp_type: u8, code: u8 },
    /// Non-first fragment or a protocol without port fields.
    None,
}

/// Network header fields relevant to matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkHeader {
    Ipv4 {
        src: Ipv4Addr,
        dst: Ipv4Addr,
        proto: u8,
        /// DSCP bits (upper six bits of the TOS byte).
        tos: u8,
        transport: TransportHeader,
    },
    Arp {
        opcode: u16,
        sender: Ipv4Addr,
        target: Ipv4Addr,
    },
    Other,
}

/// Parsed header view of a raw Ethernet frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    pub dl_dst: MacAddress,
    pub dl_src: MacAddress,
    pub vlan: Option<VlanId>,
    pub vlan_pcp: u8,
    /// Ethertype after any 802.1Q tag.
    pub ethertype: u16,
    pub network: NetworkHeader,
}

impl EthernetFrame {
    /// Parses the headers of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Truncated`] when a header announced by the
    /// preceding one does not fit in `data`.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        require(data, ETH_HEADER_LEN, "ethernet")?;

        let dl_dst = MacAddress::new(mac_at(data, 0));
        let dl_src = MacAddress::new(mac_at(data, 6));
        let mut ethertype = BigEndian::read_u16(&data[12..14]);
        let mut offset = ETH_HEADER_LEN;
        let mut vlan = None;
        let mut vlan_pcp = 0;

        if ethertype == ethertype::VLAN {
            require(data, ETH_HEADER_LEN + VLAN_TAG_LEN, "802.1q")?;
            let tci = BigEndian::read_u16(&data[14..16]);
            vlan = Some(VlanId::from_tci(tci));
            vlan_pcp = (tci >> 13) as u8;
            ethertype = BigEndian::read_u16(&data[16..18]);
            offset += VLAN_TAG_LEN;
        }

        let network = match ethertype {
            ethertype::IPV4 => parse_ipv4(&data[offset..])?,
            ethertype::ARP => parse_arp(&data[offset..])?,
            _ => NetworkHeader::Other,
        };

        Ok(Self {
            dl_dst,
            dl_src,
            vlan,
            vlan_pcp,
            ethertype,
            network,
        })
    }

    /// Destination is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        self.dl_dst.is_broadcast()
    }

    /// Destination has the group bit set. Broadcast counts as multicast.
    pub fn is_multicast(&self) -> bool {
        self.dl_dst.is_multicast()
    }
}

fn require(data: &[u8], needed: usize, header: &'static str) -> Result<(), ParseError> {
    if data.len() < needed {
        return Err(ParseError::Truncated {
            header,
            needed,
            available: data.len(),
        });
    }
    Ok(())
}

fn mac_at(data: &[u8], at: usize) -> [u8; 6] {
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&data[at..at + 6]);
    mac
}

fn ipv4_at(data: &[u8], at: usize) -> Ipv4Addr {
    Ipv4Addr::from(BigEndian::read_u32(&data[at..at + 4]))
}

fn parse_ipv4(data: &[u8]) -> Result<NetworkHeader, ParseError> {
    require(data, IPV4_MIN_HEADER_LEN, "ipv4")?;

    let ihl = data[0] & 0x0f;
    let header_len = (ihl as usize) * 4;
    if header_len < IPV4_MIN_HEADER_LEN {
        return Err(ParseError::InvalidIpv4HeaderLength(ihl));
    }
    require(data, header_len, "ipv4")?;

    let tos = data[1] & 0xfc;
    let fragment_offset = BigEndian::read_u16(&data[6..8]) & 0x1fff;
    let proto = data[9];
    let src = ipv4_at(data, 12);
    let dst = ipv4_at(data, 16);

    let transport = if fragment_offset != 0 {
        TransportHeader::None
    } else {
        parse_transport(proto, &data[header_len..])?
    };

    Ok(NetworkHeader::Ipv4 {
        src,
        dst,
        proto,
        tos,
        transport,
    })
}

fn parse_transport(proto: u8, data: &[u8]) -> Result<TransportHeader, ParseError> {
    match proto {
        ip_proto::TCP => {
            require(data, 4, "tcp")?;
            Ok(TransportHeader::Tcp {
                src_port: BigEndian::read_u16(&data[0..2]),
                dst_port: BigEndian::read_u16(&data[2..4]),
            })
        }
        ip_proto::UDP => {
            require(data, 4, "udp")?;
            Ok(TransportHeader::Udp {
                src_port: BigEndian::read_u16(&data[0..2]),
                dst_port: BigEndian::read_u16(&data[2..4]),
            })
        }
        ip_proto::ICMP => {
            require(data, 2, "icmp")?;
            Ok(TransportHeader::Icmp {
                icmp_type: data[0],
                code: data[1],
            })
        }
        _ => Ok(TransportHeader::None),
    }
}

fn parse_arp(data: &[u8]) -> Result<NetworkHeader, ParseError> {
    require(data, ARP_IPV4_LEN, "arp")?;
    Ok(NetworkHeader::Arp {
        opcode: BigEndian::read_u16(&data[6..8]),
        sender: ipv4_at(data, 14),
        target: ipv4_at(data, 24),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn eth_header(dst: [u8; 6], src: [u8; 6], ethertype: u16) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&dst);
        frame.extend_from_slice(&src);
        frame.extend_from_slice(&ethertype.to_be_bytes());
        frame
    }

    pub(crate) fn ipv4_tcp_frame() -> Vec<u8> {
        let mut frame = eth_header(
            [0x00, 0x00, 0x00, 0x00, 0x00, 0x02],
            [0x00, 0x00, 0x00, 0x00, 0x00, 0x01],
            ethertype::IPV4,
        );
        let mut ip = vec![0u8; 20];
        ip[0] = 0x45;
        ip[1] = 0xb8; // DSCP 46, ECN 0
        ip[9] = ip_proto::TCP;
        ip[12..16].copy_from_slice(&[10, 0, 0, 1]);
        ip[16..20].copy_from_slice(&[10, 0, 0, 2]);
        frame.extend_from_slice(&ip);
        frame.extend_from_slice(&40000u16.to_be_bytes());
        frame.extend_from_slice(&80u16.to_be_bytes());
        frame.extend_from_slice(&[0u8; 16]);
        frame
    }

    #[test]
    fn test_parse_ipv4_tcp() {
        let frame = EthernetFrame::parse(&ipv4_tcp_frame()).unwrap();
        assert_eq!(frame.dl_src.to_u64(), 1);
        assert_eq!(frame.dl_dst.to_u64(), 2);
        assert_eq!(frame.vlan, None);
        assert_eq!(frame.ethertype, ethertype::IPV4);
        assert_eq!(
            frame.network,
            NetworkHeader::Ipv4 {
                src: Ipv4Addr::new(10, 0, 0, 1),
                dst: Ipv4Addr::new(10, 0, 0, 2),
                proto: ip_proto::TCP,
                tos: 0xb8,
                transport: TransportHeader::Tcp {
                    src_port: 40000,
                    dst_port: 80
                },
            }
        );
    }

    #[test]
    fn test_parse_vlan_tagged_arp() {
        let mut frame = eth_header([0xff; 6], [0, 0, 0, 0, 0, 9], ethertype::VLAN);
        frame.extend_from_slice(&((3u16 << 13) | 42).to_be_bytes());
        frame.extend_from_slice(&ethertype::ARP.to_be_bytes());
        let mut arp = vec![0u8; 28];
        arp[6..8].copy_from_slice(&1u16.to_be_bytes());
        arp[14..18].copy_from_slice(&[192, 168, 0, 9]);
        arp[24..28].copy_from_slice(&[192, 168, 0, 1]);
        frame.extend_from_slice(&arp);

        let parsed = EthernetFrame::parse(&frame).unwrap();
        assert!(parsed.is_broadcast());
        assert!(parsed.is_multicast());
        assert_eq!(parsed.vlan, Some(VlanId::new(42).unwrap()));
        assert_eq!(parsed.vlan_pcp, 3);
        assert_eq!(
            parsed.network,
            NetworkHeader::Arp {
                opcode: 1,
                sender: Ipv4Addr::new(192, 168, 0, 9),
                target: Ipv4Addr::new(192, 168, 0, 1),
            }
        );
    }

    #[test]
    fn test_non_first_fragment_has_no_ports() {
        let mut frame = ipv4_tcp_frame();
        // fragment offset = 1 (in 8-byte units)
        frame[14 + 6] = 0x00;
        frame[14 + 7] = 0x01;
        let parsed = EthernetFrame::parse(&frame).unwrap();
        match parsed.network {
            NetworkHeader::Ipv4 { transport, .. } => assert_eq!(transport, TransportHeader::None),
            other => panic!("unexpected network header {:?}", other),
        }
    }

    #[test]
    fn test_truncated_frames() {
        assert_eq!(
            EthernetFrame::parse(&[0u8; 10]),
            Err(ParseError::Truncated {
                header: "ethernet",
                needed: 14,
                available: 10
            })
        );

        let mut frame = eth_header([0; 6], [0; 6], ethertype::IPV4);
        frame.extend_from_slice(&[0x45, 0, 0]);
        assert!(matches!(
            EthernetFrame::parse(&frame),
            Err(ParseError::Truncated { header: "ipv4", .. })
        ));
    }

    #[test]
    fn test_short_ipv4_header_length_rejected() {
        let mut frame = ipv4_tcp_frame();
        frame[14] = 0x44;
        assert_eq!(
            EthernetFrame::parse(&frame),
            Err(ParseError::InvalidIpv4HeaderLength(4))
        );

        frame[14] = 0x40;
        assert_eq!(
            EthernetFrame::parse(&frame),
            Err(ParseError::InvalidIpv4HeaderLength(0))
        );
    }

    #[test]
    fn test_unknown_ethertype_is_opaque() {
        let frame = eth_header([0x01, 0x80, 0xc2, 0, 0, 0x0e], [0, 0, 0, 0, 0, 1], ethertype::LLDP);
        let parsed = EthernetFrame::parse(&frame).unwrap();
        assert_eq!(parsed.network, NetworkHeader::Other);
        assert!(parsed.is_multicast());
        assert!(!parsed.is_broadcast());
    }
}
