//! Fabric forwarding - reactive forwarding and port statistics for an
//! OpenFlow fat-tree fabric.
//!
//! Runs inside an SDN controller. Switch connections, topology discovery,
//! device tracking and path computation stay with the controller and are
//! reached through the traits in [`services`].
//!
//! # Architecture
//!
//! ```text
//!                        ┌──> [MacLearningLog]
//! [switch] ──> [EventDispatcher] ──> [ForwardingEngine] ──> [FlowRuleInstaller] ──> [switch]
//!                        ├──> [StatsCorrelator] <── query() ── [TopologyMonitor]
//!                        └──> [TopologyMonitor]
//! ```
//!
//! # Key Components
//!
//! - [`forwarding::ForwardingEngine`]: flood, drop, or route decision per packet-in
//! - [`flow::FlowRuleInstaller`]: one flow-mod per rule, never retried
//! - [`stats::StatsCorrelator`]: matches statistics replies to requests by
//!   `(switch, xid)`
//! - [`topology::TopologyMonitor`]: re-queries port counters of updated switches
//! - [`listener::EventDispatcher`]: ordered listener chain

pub mod config;
pub mod error;
pub mod events;
pub mod flow;
pub mod forwarding;
pub mod listener;
pub mod mac_learning;
pub mod services;
pub mod stats;
pub mod topology;

pub use config::FabricConfig;
pub use error::{FabricError, Result, SwitchIoError};
pub use events::{FabricEvent, LinkUpdate, PacketIn, StatsReply, UpdateOperation};
pub use flow::{FlowRuleDescriptor, FlowRuleInstaller};
pub use forwarding::{Action, FanOutTable, ForwardingEngine};
pub use listener::{Command, EventDispatcher, MessageListener};
pub use mac_learning::MacLearningLog;
pub use stats::{StatsCorrelator, StatsError, StatsKind};
pub use topology::{PodIndex, TopologyMonitor};
