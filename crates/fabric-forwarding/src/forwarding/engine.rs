//! Packet-in handling: flood, drop, or install routes in both directions.

use fabric_types::{BufferId, FlowMatch, PortNo, Wildcards};
use itertools::{EitherOrBoth, Itertools};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

use super::flood_table::FanOutTable;
use super::types::{Action, AttachmentPoint, Route, RoutingAction, RoutingDecision};
use crate::config::FabricConfig;
use crate::events::{FabricEvent, PacketIn};
use crate::flow::{AppCookie, FlowRuleDescriptor, FlowRuleInstaller};
use crate::listener::{Command, MessageListener};
use crate::services::{DeviceLocationIndex, RouteResolver, SwitchRegistry, TopologyView};
use crate::topology::dpid::switch_label;

/// Pairs of source and destination attachment points that share a cluster.
///
/// Both slices must be sorted by cluster id with at most one entry per
/// cluster, as [`Device`](super::Device) keeps them. Runs in O(m+n): on a
/// mismatch the side with the smaller cluster advances, on a match both do.
pub fn merge_join_by_cluster(
    src: &[AttachmentPoint],
    dst: &[AttachmentPoint],
) -> Vec<(AttachmentPoint, AttachmentPoint)> {
    merge_join_with(src, dst, |s, d| s.cluster.cmp(&d.cluster))
}

/// [`merge_join_by_cluster`] with the ordering supplied by the caller.
///
/// `cmp` is called at most once per step and every step advances at least
/// one side, so it runs at most `src.len() + dst.len()` times.
pub fn merge_join_with<F>(
    src: &[AttachmentPoint],
    dst: &[AttachmentPoint],
    cmp: F,
) -> Vec<(AttachmentPoint, AttachmentPoint)>
where
    F: FnMut(&&AttachmentPoint, &&AttachmentPoint) -> Ordering,
{
    src.iter()
        .merge_join_by(dst.iter(), cmp)
        .filter_map(|pair| match pair {
            EitherOrBoth::Both(s, d) => Some((*s, *d)),
            _ => None,
        })
        .collect()
}

/// Decides what happens to each packet-in and programs the switches.
///
/// `decide` never awaits. Flow-mods are written through the installer and
/// failures there are logged without affecting the returned action.
pub struct ForwardingEngine {
    idle_timeout: u16,
    hard_timeout: u16,
    drop_idle_timeout: u16,
    priority: u16,
    cookie: AppCookie,
    use_fan_out_table: bool,
    topology: Arc<dyn TopologyView>,
    devices: Arc<dyn DeviceLocationIndex>,
    routing: Arc<dyn RouteResolver>,
    switches: Arc<dyn SwitchRegistry>,
    installer: Arc<FlowRuleInstaller>,
    fan_out: Arc<FanOutTable>,
}

impl ForwardingEngine {
    pub fn new(
        config: &FabricConfig,
        topology: Arc<dyn TopologyView>,
        devices: Arc<dyn DeviceLocationIndex>,
        routing: Arc<dyn RouteResolver>,
        switches: Arc<dyn SwitchRegistry>,
        installer: Arc<FlowRuleInstaller>,
        fan_out: Arc<FanOutTable>,
    ) -> Self {
        let fwd = &config.forwarding;
        Self {
            idle_timeout: fwd.idle_timeout,
            hard_timeout: fwd.hard_timeout,
            drop_idle_timeout: fwd.drop_idle_timeout,
            priority: fwd.priority,
            cookie: AppCookie::new(fwd.app_id, 0),
            use_fan_out_table: config.flood.use_fan_out_table,
            topology,
            devices,
            routing,
            switches,
            installer,
            fan_out,
        }
    }

    /// Cookie stamped on every rule this engine writes.
    pub fn cookie(&self) -> AppCookie {
        self.cookie
    }

    pub fn decide(&self, pi: &PacketIn) -> Action {
        if let Some(decision) = &pi.decision {
            return self.obey(pi, decision);
        }

        trace!(switch = %switch_label(pi.switch), in_port = %pi.in_port, "no decision attached, forwarding");
        if pi.frame.is_broadcast() || pi.frame.is_multicast() {
            self.flood(pi)
        } else {
            self.forward(pi)
        }
    }

    fn obey(&self, pi: &PacketIn, decision: &RoutingDecision) -> Action {
        match &decision.action {
            RoutingAction::None => Action::NoOp,
            RoutingAction::Forward | RoutingAction::ForwardOrFlood => self.forward(pi),
            // Multicast is flooded like broadcast.
            RoutingAction::Multicast => self.flood(pi),
            RoutingAction::Drop => self.drop_flow(pi, decision),
            RoutingAction::Unknown(name) => {
                error!(
                    switch = %switch_label(pi.switch),
                    in_port = %pi.in_port,
                    directive = %name,
                    "unexpected routing decision for packet-in"
                );
                Action::NoOp
            }
        }
    }

    fn drop_flow(&self, pi: &PacketIn, decision: &RoutingDecision) -> Action {
        let Some(switch) = self.switches.switch(pi.switch) else {
            warn!(switch = %switch_label(pi.switch), "switch gone, drop rule not written");
            return Action::NoOp;
        };

        let mut flow_match = pi.flow_match();
        if let Some(wildcards) = decision.wildcards {
            flow_match = flow_match.with_wildcards(wildcards);
        }
        let rule = FlowRuleDescriptor::new(flow_match, self.cookie)
            .with_timeouts(self.drop_idle_timeout, 0)
            .with_priority(self.priority);

        debug!(switch = %switch_label(pi.switch), %flow_match, "installing drop rule");
        let _ = self.installer.install(switch.as_ref(), &rule);
        Action::Drop
    }

    fn flood(&self, pi: &PacketIn) -> Action {
        if !self
            .topology
            .is_incoming_broadcast_allowed(pi.switch, pi.in_port)
        {
            trace!(
                switch = %switch_label(pi.switch),
                in_port = %pi.in_port,
                "dropping broadcast from a blocked port"
            );
            return Action::FloodBlocked;
        }

        let Some(switch) = self.switches.switch(pi.switch) else {
            warn!(switch = %switch_label(pi.switch), "switch gone, flood rule not written");
            return Action::NoOp;
        };

        let outputs = match self.fan_out_for(pi) {
            Some(ports) => ports.to_vec(),
            None => switch
                .enabled_ports()
                .into_iter()
                .filter(|p| p.is_physical() && *p != pi.in_port)
                .collect(),
        };
        if outputs.is_empty() {
            debug!(switch = %switch_label(pi.switch), in_port = %pi.in_port, "no port to flood to");
            return Action::Flood { outputs };
        }

        let rule = FlowRuleDescriptor::new(pi.flow_match(), self.cookie)
            .with_actions(outputs.clone())
            .with_priority(self.priority)
            .with_buffer_id(pi.buffer_id);
        let _ = self.installer.install(switch.as_ref(), &rule);
        Action::Flood { outputs }
    }

    fn fan_out_for(&self, pi: &PacketIn) -> Option<&[PortNo]> {
        if !self.use_fan_out_table {
            return None;
        }
        self.fan_out.lookup(pi.switch, pi.in_port)
    }

    fn forward(&self, pi: &PacketIn) -> Action {
        let frame = &pi.frame;
        let Some(dst) = self.devices.find_device(frame.dl_dst, frame.vlan) else {
            trace!(dst = %frame.dl_dst, "destination unknown, flooding");
            return self.flood(pi);
        };
        let Some(src) = self.devices.find_device(frame.dl_src, frame.vlan) else {
            debug!(src = %frame.dl_src, "no device entry found for source");
            return Action::NoOp;
        };
        let Some(src_cluster) = self.topology.l2_domain_id(pi.switch) else {
            debug!(
                switch = %switch_label(pi.switch),
                in_port = %pi.in_port,
                "no L2 domain found for source switch"
            );
            return Action::NoOp;
        };

        match dst
            .attachment_points()
            .iter()
            .find(|ap| ap.cluster == src_cluster)
        {
            None => {
                trace!(dst = %dst.mac, "destination not attached in the source cluster, flooding");
                return self.flood(pi);
            }
            Some(ap) if ap.switch == pi.switch && ap.port == pi.in_port => {
                trace!(
                    switch = %switch_label(pi.switch),
                    in_port = %pi.in_port,
                    "source and destination share a switch port"
                );
                return Action::NoOp;
            }
            Some(_) => {}
        }

        let Some(wildcards) = self.wildcard_hint(pi) else {
            warn!(switch = %switch_label(pi.switch), "ingress switch gone, routes not installed");
            return Action::NoOp;
        };
        let flow_match = pi.flow_match();

        let mut installed = Vec::new();
        for (s, d) in merge_join_by_cluster(src.attachment_points(), dst.attachment_points()) {
            if s.same_port(&d) {
                continue;
            }
            let Some(route) = self.routing.route(s.switch, s.port, d.switch, d.port) else {
                debug!(src = %s.switch, dst = %d.switch, cluster = s.cluster, "no route");
                continue;
            };
            trace!(%flow_match, %route, "pushing route");

            let buffer_id = if route.first().switch == pi.switch {
                pi.buffer_id
            } else {
                BufferId::NONE
            };
            self.push_route(&route, flow_match, wildcards, buffer_id);

            let back = route.reversed();
            let back_wildcards = wildcards.reversed();
            self.push_route(&back, flow_match.reversed(), back_wildcards, BufferId::NONE);

            installed.push((route, wildcards));
            installed.push((back, back_wildcards));
        }

        if installed.is_empty() {
            Action::NoOp
        } else {
            Action::InstallRoutes(installed)
        }
    }

    /// Wildcards of installed route matches: the decision's if it carries
    /// any, else the ingress switch's fast wildcards reduced to L2 only.
    fn wildcard_hint(&self, pi: &PacketIn) -> Option<Wildcards> {
        if let Some(wildcards) = pi.decision.as_ref().and_then(|d| d.wildcards) {
            return Some(wildcards);
        }
        self.switches
            .switch(pi.switch)
            .map(|sw| Wildcards::l2_only(sw.fast_wildcards()))
    }

    /// Writes one rule per hop, last hop first, so traffic released at the
    /// first hop never reaches a switch that has no rule yet. `buffer_id`
    /// goes with the first hop only.
    fn push_route(
        &self,
        route: &Route,
        flow_match: FlowMatch,
        wildcards: Wildcards,
        buffer_id: BufferId,
    ) {
        for (i, hop) in route.hops().iter().enumerate().rev() {
            let Some(switch) = self.switches.switch(hop.switch) else {
                warn!(switch = %switch_label(hop.switch), "switch on route is gone, skipping hop");
                continue;
            };
            let rule = FlowRuleDescriptor::new(
                flow_match
                    .with_in_port(hop.in_port)
                    .with_wildcards(wildcards),
                self.cookie,
            )
            .with_output(hop.out_port)
            .with_timeouts(self.idle_timeout, self.hard_timeout)
            .with_priority(self.priority)
            .with_buffer_id(if i == 0 { buffer_id } else { BufferId::NONE });

            let _ = self.installer.install(switch.as_ref(), &rule);
        }
    }
}

impl MessageListener for ForwardingEngine {
    fn name(&self) -> &'static str {
        "forwarding"
    }

    fn receive(&self, event: &FabricEvent) -> Command {
        if let FabricEvent::PacketIn(pi) = event {
            let action = self.decide(pi);
            debug!(
                switch = %switch_label(pi.switch),
                in_port = %pi.in_port,
                action = action.name(),
                "packet-in handled"
            );
        }
        Command::Continue
    }
}
