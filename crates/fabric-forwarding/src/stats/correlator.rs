//! Correlates statistics requests with their asynchronous replies.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fabric_types::Dpid;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

use super::types::{PortStats, StatsBody, StatsKind, StatsRequest};
use crate::error::SwitchIoError;
use crate::events::{FabricEvent, StatsReply};
use crate::listener::{Command, MessageListener};
use crate::services::{SwitchRegistry, Xid};

/// Error type for statistics queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    #[error("switch {0} is not connected")]
    SwitchNotFound(Dpid),

    #[error("no {kind} statistics reply from switch {switch} (xid {xid}) within {after:?}")]
    Timeout {
        switch: Dpid,
        xid: Xid,
        kind: StatsKind,
        after: Duration,
    },

    #[error("failed to send statistics request: {0}")]
    Io(#[from] SwitchIoError),

    #[error("switch {switch} answered a {expected} request with {got} statistics")]
    UnexpectedReply {
        switch: Dpid,
        expected: StatsKind,
        got: StatsKind,
    },

    #[error("request to switch {switch} (xid {xid}) was abandoned before a reply arrived")]
    Abandoned { switch: Dpid, xid: Xid },
}

/// What [`StatsCorrelator::on_stats_reply`] did with a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDisposition {
    /// Final part; the waiting query was completed.
    Completed,
    /// A "more follows" part was stored.
    Partial,
    /// Nothing pending under this `(switch, xid)`; dropped.
    Stale,
}

/// Snapshot of correlator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelatorStats {
    pub issued: u64,
    pub completed: u64,
    pub timed_out: u64,
    pub send_failures: u64,
    pub unexpected_replies: u64,
    pub stale_replies: u64,
}

#[derive(Debug, Default)]
struct Counters {
    issued: AtomicU64,
    completed: AtomicU64,
    timed_out: AtomicU64,
    send_failures: AtomicU64,
    unexpected_replies: AtomicU64,
    stale_replies: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RequestKey {
    switch: Dpid,
    xid: Xid,
}

struct PendingStatsRequest {
    /// Distinguishes this request from a later one that reuses the key.
    id: u64,
    kind: StatsKind,
    issued_at: Instant,
    parts: Vec<StatsBody>,
    slot: oneshot::Sender<Result<StatsBody, StatsError>>,
}

/// Removes a pending entry when its query finishes, times out or is dropped.
struct PendingGuard<'a> {
    pending: &'a DashMap<RequestKey, PendingStatsRequest>,
    key: RequestKey,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let id = self.id;
        self.pending.remove_if(&self.key, |_, req| req.id == id);
    }
}

/// Issues statistics requests and matches replies to them.
///
/// # Lifecycle
///
/// ```text
/// query()            on_stats_reply()            deadline
///   │ register (switch, xid)   │                       │
///   │ send request             │ more=true: store part │
///   │ await slot  ◄────────────┤ more=false: complete  │
///   │                          │                       │
///   └─ Ok(body) / Err(..) ◄────┴───────────────────────┘ Err(Timeout)
/// ```
///
/// `query` must not be awaited on the task that feeds `on_stats_reply`,
/// otherwise the reply can never be delivered. Spawn it instead.
pub struct StatsCorrelator {
    switches: Arc<dyn SwitchRegistry>,
    reply_timeout: Duration,
    pending: DashMap<RequestKey, PendingStatsRequest>,
    next_id: AtomicU64,
    counters: Counters,
}

impl StatsCorrelator {
    pub fn new(switches: Arc<dyn SwitchRegistry>, reply_timeout: Duration) -> Self {
        Self {
            switches,
            reply_timeout,
            pending: DashMap::new(),
            next_id: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    /// Requests `kind` statistics from `switch` and waits for the reply.
    ///
    /// The pending entry is registered before the request is written, so a
    /// reply that races ahead of this task is still matched. Whatever the
    /// outcome, including the returned future being dropped, the entry is
    /// gone when this returns.
    #[instrument(skip_all, fields(switch = %switch, kind = %kind))]
    pub async fn query(&self, switch: Dpid, kind: StatsKind) -> Result<StatsBody, StatsError> {
        let handle = self
            .switches
            .switch(switch)
            .ok_or(StatsError::SwitchNotFound(switch))?;

        let xid = handle.next_transaction_id();
        let key = RequestKey { switch, xid };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        let previous = self.pending.insert(
            key,
            PendingStatsRequest {
                id,
                kind,
                issued_at: Instant::now(),
                parts: Vec::new(),
                slot: tx,
            },
        );
        if previous.is_some() {
            warn!(xid, "transaction id reused while a request was outstanding");
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            key,
            id,
        };
        self.counters.issued.fetch_add(1, Ordering::Relaxed);

        let request = StatsRequest::for_kind(kind);
        if let Err(e) = handle.send_stats_request(xid, &request) {
            self.counters.send_failures.fetch_add(1, Ordering::Relaxed);
            error!(xid, error = %e, "failed to send statistics request");
            return Err(StatsError::Io(e));
        }
        debug!(xid, "statistics request sent");

        match tokio::time::timeout(self.reply_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(StatsError::Abandoned { switch, xid }),
            Err(_) => {
                self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
                warn!(xid, after = ?self.reply_timeout, "statistics reply timed out");
                Err(StatsError::Timeout {
                    switch,
                    xid,
                    kind,
                    after: self.reply_timeout,
                })
            }
        }
    }

    /// Port counters of every port of `switch`.
    pub async fn query_port_stats(&self, switch: Dpid) -> Result<Vec<PortStats>, StatsError> {
        let body = self.query(switch, StatsKind::Port).await?;
        let got = body.kind();
        body.into_port_stats().ok_or(StatsError::UnexpectedReply {
            switch,
            expected: StatsKind::Port,
            got,
        })
    }

    /// Hands a reply from the dispatch path to the waiting query.
    ///
    /// Never blocks. A reply whose `(switch, xid)` is not pending leaves all
    /// pending requests untouched.
    pub fn on_stats_reply(&self, reply: &StatsReply) -> ReplyDisposition {
        let key = RequestKey {
            switch: reply.switch,
            xid: reply.xid,
        };

        let mut entry = match self.pending.entry(key) {
            Entry::Occupied(entry) => entry,
            Entry::Vacant(_) => {
                self.counters.stale_replies.fetch_add(1, Ordering::Relaxed);
                debug!(
                    switch = %reply.switch,
                    xid = reply.xid,
                    kind = %reply.kind(),
                    "discarding stale statistics reply"
                );
                return ReplyDisposition::Stale;
            }
        };

        if reply.more {
            entry.get_mut().parts.push(reply.body.clone());
            return ReplyDisposition::Partial;
        }

        let mut pending = entry.remove();
        pending.parts.push(reply.body.clone());

        let expected = pending.kind;
        let result = StatsBody::merge(expected, pending.parts).map_err(|got| {
            self.counters
                .unexpected_replies
                .fetch_add(1, Ordering::Relaxed);
            warn!(switch = %reply.switch, xid = reply.xid, %expected, %got, "unexpected statistics reply");
            StatsError::UnexpectedReply {
                switch: reply.switch,
                expected,
                got,
            }
        });

        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        debug!(
            switch = %reply.switch,
            xid = reply.xid,
            elapsed = ?pending.issued_at.elapsed(),
            "statistics reply matched"
        );
        if pending.slot.send(result).is_err() {
            debug!(switch = %reply.switch, xid = reply.xid, "query went away before its reply");
        }
        ReplyDisposition::Completed
    }

    /// Number of requests waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> CorrelatorStats {
        let c = &self.counters;
        CorrelatorStats {
            issued: c.issued.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            timed_out: c.timed_out.load(Ordering::Relaxed),
            send_failures: c.send_failures.load(Ordering::Relaxed),
            unexpected_replies: c.unexpected_replies.load(Ordering::Relaxed),
            stale_replies: c.stale_replies.load(Ordering::Relaxed),
        }
    }
}

impl MessageListener for StatsCorrelator {
    fn name(&self) -> &'static str {
        "stats-correlator"
    }

    fn receive(&self, event: &FabricEvent) -> Command {
        match event {
            // Replies belong to this listener alone.
            FabricEvent::StatsReply(reply) => {
                self.on_stats_reply(reply);
                Command::Stop
            }
            _ => Command::Continue,
        }
    }
}
