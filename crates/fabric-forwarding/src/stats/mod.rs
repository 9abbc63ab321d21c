//! Switch statistics collection.
//!
//! A statistics query is an asynchronous request/reply exchange correlated by
//! transaction id. [`StatsCorrelator::query`] registers the request, sends it,
//! and waits on a single-use completion slot until the dispatch path hands the
//! matching reply to [`StatsCorrelator::on_stats_reply`] or the deadline
//! elapses.
//!
//! # Correlation
//!
//! Pending requests are keyed by `(switch, xid)`, so overlapping queries to
//! different switches, or several to the same switch, never observe each
//! other's replies. A reply that matches nothing pending is stale: it is
//! counted and dropped.

mod correlator;
mod types;

pub use correlator::{CorrelatorStats, ReplyDisposition, StatsCorrelator, StatsError};
pub use types::{
    AggregateStats, FlowStats, PortStats, StatsBody, StatsKind, StatsRequest, TableStats,
    ALL_TABLES,
};
