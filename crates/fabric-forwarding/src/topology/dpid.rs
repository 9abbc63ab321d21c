//! Datapath ids of the fat-tree fabric and their operator-facing names.
//!
//! Switch numbers follow the rack labels: 1xx top-of-rack, 2xx aggregation,
//! 3xx core.

use fabric_types::Dpid;
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const SWITCH_101: Dpid = Dpid::new(28429133192619520);
pub const SWITCH_102: Dpid = Dpid::new(28710608169330176);
pub const SWITCH_103: Dpid = Dpid::new(28992083146040832);
pub const SWITCH_104: Dpid = Dpid::new(29273558122751488);
pub const SWITCH_105: Dpid = Dpid::new(29555033099526400);
pub const SWITCH_106: Dpid = Dpid::new(29836508076237056);
pub const SWITCH_107: Dpid = Dpid::new(30117983052947712);
pub const SWITCH_108: Dpid = Dpid::new(30399458029658368);
pub const SWITCH_201: Dpid = Dpid::new(56576630863685120);
pub const SWITCH_202: Dpid = Dpid::new(56858105840395776);
pub const SWITCH_203: Dpid = Dpid::new(57139580817106432);
pub const SWITCH_204: Dpid = Dpid::new(57421055793817088);
pub const SWITCH_205: Dpid = Dpid::new(57702530770592000);
pub const SWITCH_206: Dpid = Dpid::new(57984005747302656);
pub const SWITCH_207: Dpid = Dpid::new(58265480724013312);
pub const SWITCH_208: Dpid = Dpid::new(58546955700723968);
pub const SWITCH_301: Dpid = Dpid::new(84724128534750720);
pub const SWITCH_302: Dpid = Dpid::new(85005603511461376);
pub const SWITCH_303: Dpid = Dpid::new(85287078488236288);
pub const SWITCH_304: Dpid = Dpid::new(85568553464946944);

/// Every fabric switch with its rack number.
pub const FABRIC_SWITCHES: [(u16, Dpid); 20] = [
    (101, SWITCH_101),
    (102, SWITCH_102),
    (103, SWITCH_103),
    (104, SWITCH_104),
    (105, SWITCH_105),
    (106, SWITCH_106),
    (107, SWITCH_107),
    (108, SWITCH_108),
    (201, SWITCH_201),
    (202, SWITCH_202),
    (203, SWITCH_203),
    (204, SWITCH_204),
    (205, SWITCH_205),
    (206, SWITCH_206),
    (207, SWITCH_207),
    (208, SWITCH_208),
    (301, SWITCH_301),
    (302, SWITCH_302),
    (303, SWITCH_303),
    (304, SWITCH_304),
];

static SWITCH_NAMES: Lazy<HashMap<Dpid, String>> = Lazy::new(|| {
    FABRIC_SWITCHES
        .iter()
        .map(|(number, dpid)| (*dpid, format!("Switch# {}", number)))
        .collect()
});

/// Operator-facing name ("Switch# 101") of a fabric switch.
pub fn switch_name(dpid: Dpid) -> Option<&'static str> {
    SWITCH_NAMES.get(&dpid).map(String::as_str)
}

/// Name of `dpid` if known, its colon-hex form otherwise. For log fields.
pub fn switch_label(dpid: Dpid) -> String {
    switch_name(dpid)
        .map(str::to_string)
        .unwrap_or_else(|| dpid.to_string())
}

/// Datapath id of rack number `number` (e.g. 101).
pub fn switch_by_number(number: u16) -> Option<Dpid> {
    FABRIC_SWITCHES
        .iter()
        .find(|(n, _)| *n == number)
        .map(|(_, dpid)| *dpid)
}
