//! Reactive forwarding.
//!
//! For every packet-in the [`ForwardingEngine`] either obeys the routing
//! decision attached upstream, floods (broadcast, multicast, unknown or
//! unreachable destination), or installs the route between the two devices
//! in both directions. Flooding follows the static [`FanOutTable`] where it
//! has an entry for the ingress port.

mod engine;
mod flood_table;
mod types;

pub use engine::{merge_join_by_cluster, merge_join_with, ForwardingEngine};
pub use flood_table::{FanOutEntry, FanOutTable};
pub use types::{
    Action, AttachmentPoint, Device, Hop, Route, RouteError, RoutingAction, RoutingDecision,
};
