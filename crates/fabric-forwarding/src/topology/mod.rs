//! Fabric layout and topology-change handling.
//!
//! - [`dpid`]: datapath ids and names of the fabric switches
//! - [`PodIndex`]: pod and tier membership
//! - [`TopologyMonitor`]: re-queries port counters when a switch comes up

pub mod dpid;
mod monitor;
mod pods;

pub use monitor::{SwitchPortReport, TopologyMonitor};
pub use pods::{PodIndex, Tier, CORE_POD};
