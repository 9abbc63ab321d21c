//! Static partition of the fabric into pods and tiers.

use fabric_types::Dpid;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::dpid::*;

/// Layer of the fat tree a switch sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Core,
    Aggregation,
    TopOfRack,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Core => "core",
            Tier::Aggregation => "aggregation",
            Tier::TopOfRack => "top-of-rack",
        };
        f.write_str(s)
    }
}

/// Pod number of the core layer in [`PodIndex::members`].
pub const CORE_POD: u8 = 0;

/// Pod and tier membership of every fabric switch. Built once, read only.
///
/// Named pools: `core`, `pod1`..`pod4` (aggregation and top-of-rack switches
/// of one pod), `tors`, `aggs`. Pod number 0 is the core.
#[derive(Debug, Clone)]
pub struct PodIndex {
    core: Vec<Dpid>,
    pods: Vec<Vec<Dpid>>,
    tors: Vec<Dpid>,
    aggs: Vec<Dpid>,
    membership: HashMap<Dpid, (u8, Tier)>,
}

impl PodIndex {
    /// The fat-tree fabric: four core switches and four pods of two
    /// aggregation and two top-of-rack switches each.
    pub fn fat_tree() -> Self {
        let core = vec![SWITCH_301, SWITCH_302, SWITCH_303, SWITCH_304];
        let pods = vec![
            vec![SWITCH_101, SWITCH_102, SWITCH_201, SWITCH_202],
            vec![SWITCH_103, SWITCH_104, SWITCH_203, SWITCH_204],
            vec![SWITCH_105, SWITCH_106, SWITCH_205, SWITCH_206],
            vec![SWITCH_107, SWITCH_108, SWITCH_207, SWITCH_208],
        ];
        let tors = vec![
            SWITCH_101, SWITCH_102, SWITCH_103, SWITCH_104, SWITCH_105, SWITCH_106, SWITCH_107,
            SWITCH_108,
        ];
        // Listed in cabling order, 207 ahead of 205.
        let aggs = vec![
            SWITCH_201, SWITCH_202, SWITCH_203, SWITCH_204, SWITCH_207, SWITCH_205, SWITCH_206,
            SWITCH_208,
        ];
        Self::new(core, pods, tors, aggs)
    }

    /// Builds an index from explicit pools. `pods[0]` is pod 1.
    pub fn new(core: Vec<Dpid>, pods: Vec<Vec<Dpid>>, tors: Vec<Dpid>, aggs: Vec<Dpid>) -> Self {
        let mut membership = HashMap::new();
        for dpid in &core {
            membership.insert(*dpid, (CORE_POD, Tier::Core));
        }
        for (i, members) in pods.iter().enumerate() {
            let pod = (i + 1) as u8;
            for dpid in members {
                let tier = if aggs.contains(dpid) {
                    Tier::Aggregation
                } else {
                    Tier::TopOfRack
                };
                membership.insert(*dpid, (pod, tier));
            }
        }
        Self {
            core,
            pods,
            tors,
            aggs,
            membership,
        }
    }

    /// Pod number of `dpid`; [`CORE_POD`] for core switches.
    pub fn pod_of(&self, dpid: Dpid) -> Option<u8> {
        self.membership.get(&dpid).map(|(pod, _)| *pod)
    }

    pub fn tier_of(&self, dpid: Dpid) -> Option<Tier> {
        self.membership.get(&dpid).map(|(_, tier)| *tier)
    }

    pub fn contains(&self, dpid: Dpid) -> bool {
        self.membership.contains_key(&dpid)
    }

    /// Members of pod `pod`, in table order. Pod 0 is the core.
    pub fn members(&self, pod: u8) -> Option<&[Dpid]> {
        if pod == CORE_POD {
            return Some(&self.core);
        }
        self.pods.get(pod as usize - 1).map(Vec::as_slice)
    }

    /// A named pool: `core`, `pod1`..`pod4`, `tors` or `aggs`.
    pub fn pool(&self, name: &str) -> Option<&[Dpid]> {
        match name {
            "core" => Some(&self.core),
            "tors" => Some(&self.tors),
            "aggs" => Some(&self.aggs),
            _ => name
                .strip_prefix("pod")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| *n != CORE_POD)
                .and_then(|n| self.members(n)),
        }
    }

    pub fn core(&self) -> &[Dpid] {
        &self.core
    }

    pub fn tors(&self) -> &[Dpid] {
        &self.tors
    }

    pub fn aggs(&self) -> &[Dpid] {
        &self.aggs
    }

    /// Pod numbers including the core, ascending.
    pub fn pod_numbers(&self) -> impl Iterator<Item = u8> {
        0..=(self.pods.len() as u8)
    }
}

impl Default for PodIndex {
    fn default() -> Self {
        Self::fat_tree()
    }
}
