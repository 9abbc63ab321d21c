//! Re-collects port counters of switches that topology discovery reports as
//! updated.

use chrono::{DateTime, Utc};
use fabric_types::Dpid;
use itertools::Itertools;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::dpid::switch_label;
use super::pods::{PodIndex, Tier};
use crate::config::StatsConfig;
use crate::events::{FabricEvent, LinkUpdate, UpdateOperation};
use crate::listener::{Command, MessageListener};
use crate::services::TopologyView;
use crate::stats::{PortStats, StatsCorrelator, StatsError};

/// Port counters of one switch, collected after a topology change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchPortReport {
    pub switch: Dpid,
    pub name: String,
    pub pod: Option<u8>,
    pub tier: Option<Tier>,
    pub ports: Vec<PortStats>,
    pub collected_at: DateTime<Utc>,
}

impl SwitchPortReport {
    pub fn rx_bytes(&self) -> u64 {
        self.ports.iter().map(|p| p.rx_bytes).sum()
    }

    pub fn tx_bytes(&self) -> u64 {
        self.ports.iter().map(|p| p.tx_bytes).sum()
    }
}

/// Watches topology changes and queries port statistics of updated switches.
///
/// Queries run on spawned tasks so the dispatch path that delivers the
/// replies is never blocked by them. Nothing else is mutated.
pub struct TopologyMonitor {
    topology: Arc<dyn TopologyView>,
    correlator: Arc<StatsCorrelator>,
    pods: Arc<PodIndex>,
    enabled: bool,
}

impl TopologyMonitor {
    pub fn new(
        topology: Arc<dyn TopologyView>,
        correlator: Arc<StatsCorrelator>,
        pods: Arc<PodIndex>,
        config: &StatsConfig,
    ) -> Self {
        Self {
            topology,
            correlator,
            pods,
            enabled: config.query_on_switch_update,
        }
    }

    /// Fabric switches reported as updated, each once, in report order.
    pub fn switches_to_query(&self, updates: &[LinkUpdate]) -> Vec<Dpid> {
        updates
            .iter()
            .filter(|u| u.operation == UpdateOperation::SwitchUpdated)
            .map(|u| u.src)
            .unique()
            .filter(|dpid| {
                let known = self.pods.contains(*dpid);
                if !known {
                    warn!(switch = %dpid, "updated switch is not part of the fabric, skipping");
                }
                known
            })
            .collect()
    }

    /// Spawns one port statistics query per updated switch.
    ///
    /// An empty `updates` slice means the notification carried no details;
    /// the topology's last link updates are used instead. Returns the spawned
    /// tasks; dropping them does not cancel the queries.
    pub fn on_topology_changed(
        &self,
        updates: &[LinkUpdate],
    ) -> Vec<JoinHandle<Option<SwitchPortReport>>> {
        if !self.enabled {
            return Vec::new();
        }

        let last;
        let updates = if updates.is_empty() {
            last = self.topology.last_link_updates();
            last.as_slice()
        } else {
            updates
        };

        let switches = self.switches_to_query(updates);
        if switches.is_empty() {
            return Vec::new();
        }

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "no async runtime, cannot query port statistics");
                return Vec::new();
            }
        };

        debug!(count = switches.len(), "querying port statistics of updated switches");
        switches
            .into_iter()
            .map(|dpid| {
                let correlator = Arc::clone(&self.correlator);
                let pods = Arc::clone(&self.pods);
                runtime.spawn(async move {
                    match collect_port_report(&correlator, &pods, dpid).await {
                        Ok(report) => Some(report),
                        Err(e) => {
                            warn!(switch = %switch_label(dpid), error = %e, "port statistics query failed");
                            None
                        }
                    }
                })
            })
            .collect()
    }

    /// Queries and reports the port counters of one switch.
    pub async fn collect(&self, dpid: Dpid) -> Result<SwitchPortReport, StatsError> {
        collect_port_report(&self.correlator, &self.pods, dpid).await
    }
}

impl MessageListener for TopologyMonitor {
    fn name(&self) -> &'static str {
        "topology-monitor"
    }

    fn receive(&self, event: &FabricEvent) -> Command {
        if let FabricEvent::TopologyChanged { updates } = event {
            let spawned = self.on_topology_changed(updates);
            if !spawned.is_empty() {
                debug!(queries = spawned.len(), "port statistics queries spawned");
            }
        }
        Command::Continue
    }
}

async fn collect_port_report(
    correlator: &StatsCorrelator,
    pods: &PodIndex,
    dpid: Dpid,
) -> Result<SwitchPortReport, StatsError> {
    let ports = correlator.query_port_stats(dpid).await?;
    let report = SwitchPortReport {
        switch: dpid,
        name: switch_label(dpid),
        pod: pods.pod_of(dpid),
        tier: pods.tier_of(dpid),
        ports,
        collected_at: Utc::now(),
    };
    info!(
        switch = %report.name,
        pod = ?report.pod,
        ports = report.ports.len(),
        rx_bytes = report.rx_bytes(),
        tx_bytes = report.tx_bytes(),
        "port statistics collected"
    );
    Ok(report)
}
