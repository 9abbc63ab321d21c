//! Switch-level identifiers: datapath id, port number and buffer id.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 64-bit OpenFlow datapath identifier.
///
/// Displayed in the colon-separated hex form controllers print
/// (`00:65:00:25:61:37:e6:00`); parsed from that form or from a plain decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dpid(u64);

impl Dpid {
    pub const fn new(raw: u64) -> Self {
        Dpid(raw)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Dpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for Dpid {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.contains(':') {
            return s
                .parse::<u64>()
                .map(Dpid)
                .map_err(|_| ParseError::InvalidDpid(s.to_string()));
        }

        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 8 {
            return Err(ParseError::InvalidDpid(s.to_string()));
        }
        let mut raw = 0u64;
        for part in parts {
            let byte =
                u8::from_str_radix(part, 16).map_err(|_| ParseError::InvalidDpid(s.to_string()))?;
            raw = (raw << 8) | byte as u64;
        }
        Ok(Dpid(raw))
    }
}

impl From<u64> for Dpid {
    fn from(raw: u64) -> Self {
        Dpid(raw)
    }
}

/// OpenFlow 1.0 port number.
///
/// Values up to [`PortNo::MAX`] are physical ports; the top of the range is
/// reserved for virtual ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortNo(u16);

impl PortNo {
    /// Highest physical port number.
    pub const MAX: PortNo = PortNo(0xff00);
    /// Send the packet out the input port.
    pub const IN_PORT: PortNo = PortNo(0xfff8);
    pub const TABLE: PortNo = PortNo(0xfff9);
    pub const NORMAL: PortNo = PortNo(0xfffa);
    /// All physical ports except input port and those blocked by spanning tree.
    pub const FLOOD: PortNo = PortNo(0xfffb);
    /// All physical ports except input port.
    pub const ALL: PortNo = PortNo(0xfffc);
    pub const CONTROLLER: PortNo = PortNo(0xfffd);
    pub const LOCAL: PortNo = PortNo(0xfffe);
    /// Not associated with a physical port.
    pub const NONE: PortNo = PortNo(0xffff);

    pub const fn new(raw: u16) -> Self {
        PortNo(raw)
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    pub const fn is_physical(&self) -> bool {
        self.0 <= Self::MAX.0
    }
}

impl fmt::Display for PortNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PortNo::IN_PORT => f.write_str("IN_PORT"),
            PortNo::TABLE => f.write_str("TABLE"),
            PortNo::NORMAL => f.write_str("NORMAL"),
            PortNo::FLOOD => f.write_str("FLOOD"),
            PortNo::ALL => f.write_str("ALL"),
            PortNo::CONTROLLER => f.write_str("CONTROLLER"),
            PortNo::LOCAL => f.write_str("LOCAL"),
            PortNo::NONE => f.write_str("NONE"),
            PortNo(n) => write!(f, "{}", n),
        }
    }
}

impl From<u16> for PortNo {
    fn from(raw: u16) -> Self {
        PortNo(raw)
    }
}

/// Reference to a packet buffered on the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BufferId(u32);

impl BufferId {
    /// The packet is not buffered on the switch.
    pub const NONE: BufferId = BufferId(0xffff_ffff);

    pub const fn new(raw: u32) -> Self {
        BufferId(raw)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    pub const fn is_none(&self) -> bool {
        self.0 == Self::NONE.0
    }
}

impl Default for BufferId {
    fn default() -> Self {
        BufferId::NONE
    }
}
