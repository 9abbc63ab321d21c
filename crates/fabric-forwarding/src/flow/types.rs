//! Flow rule types.

use fabric_types::{BufferId, FlowMatch, PortNo};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application id of the forwarding application.
pub const FORWARDING_APP_ID: u16 = 2;

/// OpenFlow 1.0 default flow priority.
pub const DEFAULT_PRIORITY: u16 = 0x8000;

/// 64-bit flow cookie tagging the application that owns a rule.
///
/// Layout: application id in the top 12 bits, user data in the low 32 bits.
/// The bits in between are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppCookie(u64);

impl AppCookie {
    const APP_ID_BITS: u32 = 12;
    const APP_ID_SHIFT: u32 = 64 - Self::APP_ID_BITS;
    pub const MAX_APP_ID: u16 = (1 << Self::APP_ID_BITS) - 1;

    pub const fn new(app_id: u16, user: u32) -> Self {
        let app = (app_id & Self::MAX_APP_ID) as u64;
        AppCookie((app << Self::APP_ID_SHIFT) | user as u64)
    }

    pub const fn from_raw(raw: u64) -> Self {
        AppCookie(raw)
    }

    pub const fn app_id(&self) -> u16 {
        (self.0 >> Self::APP_ID_SHIFT) as u16
    }

    pub const fn user(&self) -> u32 {
        self.0 as u32
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AppCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Immutable description of one flow rule, built per decision and sent once
/// as an OFPFC_ADD flow-mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRuleDescriptor {
    pub flow_match: FlowMatch,
    /// Output ports, in order. Empty means drop.
    pub actions: Vec<PortNo>,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub priority: u16,
    pub cookie: AppCookie,
    pub buffer_id: BufferId,
}

impl FlowRuleDescriptor {
    /// A rule for `flow_match` with no actions, no timeouts, default
    /// priority and no buffered packet.
    pub fn new(flow_match: FlowMatch, cookie: AppCookie) -> Self {
        Self {
            flow_match,
            actions: Vec::new(),
            idle_timeout: 0,
            hard_timeout: 0,
            priority: DEFAULT_PRIORITY,
            cookie,
            buffer_id: BufferId::NONE,
        }
    }

    pub fn with_actions(mut self, actions: Vec<PortNo>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_output(self, port: PortNo) -> Self {
        self.with_actions(vec![port])
    }

    pub fn with_timeouts(mut self, idle: u16, hard: u16) -> Self {
        self.idle_timeout = idle;
        self.hard_timeout = hard;
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_buffer_id(mut self, buffer_id: BufferId) -> Self {
        self.buffer_id = buffer_id;
        self
    }

    pub fn is_drop(&self) -> bool {
        self.actions.is_empty()
    }
}
