//! Per-ingress flood fan-out of the fat-tree fabric.
//!
//! A broadcast entering a listed (switch, port) leaves only through the
//! listed ports instead of every other port. The entries mirror the physical
//! cabling and are kept as deployed, including the ones that look
//! asymmetric: switch 202 carries the pod-4 aggregation entries for ports
//! 53, 54 and 56, and switch 208 has none.

use fabric_types::{Dpid, PortNo};
use serde::Serialize;
use std::collections::HashMap;

use crate::topology::dpid::*;

const FAT_TREE_FAN_OUT: &[(Dpid, u16, &[u16])] = &[
    // top of rack
    (SWITCH_101, 26, &[27, 28]),
    (SWITCH_101, 28, &[27, 26]),
    (SWITCH_101, 27, &[26, 28]),
    (SWITCH_101, 25, &[26, 28]),
    (SWITCH_102, 30, &[31, 32]),
    (SWITCH_102, 32, &[30, 31]),
    (SWITCH_102, 29, &[30, 32]),
    (SWITCH_102, 31, &[30, 32]),
    (SWITCH_103, 34, &[36, 35]),
    (SWITCH_103, 36, &[34, 35]),
    (SWITCH_103, 35, &[34, 36]),
    (SWITCH_103, 33, &[34, 36]),
    (SWITCH_104, 38, &[39, 40]),
    (SWITCH_104, 40, &[39, 38]),
    (SWITCH_104, 37, &[38, 40]),
    (SWITCH_104, 39, &[38, 40]),
    (SWITCH_105, 26, &[27, 28]),
    (SWITCH_105, 28, &[27, 26]),
    (SWITCH_105, 27, &[26, 28]),
    (SWITCH_105, 25, &[26, 28]),
    (SWITCH_106, 30, &[32, 31]),
    (SWITCH_106, 32, &[30, 31]),
    (SWITCH_106, 29, &[30, 32]),
    (SWITCH_106, 31, &[30, 32]),
    (SWITCH_107, 34, &[35, 36]),
    (SWITCH_107, 36, &[35, 34]),
    (SWITCH_107, 35, &[34, 36]),
    (SWITCH_107, 33, &[34, 36]),
    (SWITCH_108, 38, &[40, 39]),
    (SWITCH_108, 40, &[38, 39]),
    (SWITCH_108, 39, &[38, 40]),
    (SWITCH_108, 37, &[38, 40]),
    // aggregation
    (SWITCH_201, 43, &[42, 41]),
    (SWITCH_201, 42, &[43, 41]),
    (SWITCH_201, 44, &[43, 41]),
    (SWITCH_202, 45, &[46, 47]),
    (SWITCH_202, 46, &[47, 45]),
    (SWITCH_202, 48, &[47, 45]),
    (SWITCH_203, 51, &[52, 49]),
    (SWITCH_203, 50, &[51, 49]),
    (SWITCH_203, 52, &[51, 49]),
    (SWITCH_204, 53, &[56, 55]),
    (SWITCH_204, 54, &[55, 53]),
    (SWITCH_204, 56, &[55, 53]),
    (SWITCH_205, 43, &[44, 41]),
    (SWITCH_205, 44, &[43, 41]),
    (SWITCH_205, 42, &[43, 41]),
    (SWITCH_206, 45, &[47, 48]),
    (SWITCH_206, 46, &[47, 45]),
    (SWITCH_206, 48, &[47, 45]),
    (SWITCH_207, 51, &[50, 49]),
    (SWITCH_207, 52, &[51, 49]),
    (SWITCH_207, 50, &[51, 49]),
    (SWITCH_202, 53, &[55, 56]),
    (SWITCH_202, 54, &[55, 53]),
    (SWITCH_202, 56, &[55, 53]),
    // core
    (SWITCH_301, 58, &[57, 60, 59]),
    (SWITCH_301, 57, &[58, 60, 59]),
    (SWITCH_302, 64, &[62, 61, 63]),
    (SWITCH_302, 63, &[62, 64, 61]),
    (SWITCH_303, 59, &[57, 58, 60]),
    (SWITCH_303, 60, &[57, 58, 59]),
    (SWITCH_304, 63, &[62, 61, 64]),
    (SWITCH_304, 62, &[63, 61, 64]),
];

/// One row of the table, as dumped by `fabricctl fan-out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanOutEntry {
    pub switch: Dpid,
    pub name: String,
    pub in_port: PortNo,
    pub outputs: Vec<PortNo>,
}

/// Static (switch, ingress port) to ordered output ports lookup.
#[derive(Debug, Clone, Default)]
pub struct FanOutTable {
    entries: HashMap<(Dpid, PortNo), Vec<PortNo>>,
}

impl FanOutTable {
    /// The table of the deployed fat-tree fabric.
    pub fn fat_tree() -> Self {
        Self::from_entries(FAT_TREE_FAN_OUT.iter().map(|(dpid, in_port, outputs)| {
            (
                *dpid,
                PortNo::new(*in_port),
                outputs.iter().copied().map(PortNo::new).collect(),
            )
        }))
    }

    /// An empty table; every flood falls back to all enabled ports.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table from rows. A later row for the same key replaces an
    /// earlier one.
    pub fn from_entries(rows: impl IntoIterator<Item = (Dpid, PortNo, Vec<PortNo>)>) -> Self {
        let entries = rows
            .into_iter()
            .map(|(dpid, in_port, outputs)| ((dpid, in_port), outputs))
            .collect();
        Self { entries }
    }

    /// Output ports for a broadcast entering `switch` on `in_port`.
    pub fn lookup(&self, switch: Dpid, in_port: PortNo) -> Option<&[PortNo]> {
        self.entries.get(&(switch, in_port)).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All rows sorted by switch and ingress port.
    pub fn entries(&self) -> Vec<FanOutEntry> {
        let mut rows: Vec<FanOutEntry> = self
            .entries
            .iter()
            .map(|((dpid, in_port), outputs)| FanOutEntry {
                switch: *dpid,
                name: switch_label(*dpid),
                in_port: *in_port,
                outputs: outputs.clone(),
            })
            .collect();
        rows.sort_by_key(|row| (row.switch, row.in_port));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ports(raw: &[u16]) -> Vec<PortNo> {
        raw.iter().copied().map(PortNo::new).collect()
    }

    #[test]
    fn test_fat_tree_has_every_row() {
        let table = FanOutTable::fat_tree();
        assert_eq!(table.len(), 64);
        assert_eq!(table.entries().len(), 64);
    }

    #[test]
    fn test_lookup_keeps_output_order() {
        let table = FanOutTable::fat_tree();
        assert_eq!(
            table.lookup(SWITCH_101, PortNo::new(26)).unwrap(),
            ports(&[27, 28]).as_slice()
        );
        assert_eq!(
            table.lookup(SWITCH_101, PortNo::new(28)).unwrap(),
            ports(&[27, 26]).as_slice()
        );
        assert_eq!(
            table.lookup(SWITCH_302, PortNo::new(63)).unwrap(),
            ports(&[62, 64, 61]).as_slice()
        );
        assert!(table.lookup(SWITCH_101, PortNo::new(1)).is_none());
    }

    #[test]
    fn test_asymmetric_rows_are_preserved() {
        let table = FanOutTable::fat_tree();
        assert_eq!(
            table.lookup(SWITCH_202, PortNo::new(53)).unwrap(),
            ports(&[55, 56]).as_slice()
        );
        assert_eq!(
            table.lookup(SWITCH_202, PortNo::new(46)).unwrap(),
            ports(&[47, 45]).as_slice()
        );
        for port in [53, 54, 56] {
            assert!(table.lookup(SWITCH_208, PortNo::new(port)).is_none());
        }
        // 201 lists port 42 as an ingress, 205 lists 44.
        assert_eq!(
            table.lookup(SWITCH_205, PortNo::new(43)).unwrap(),
            ports(&[44, 41]).as_slice()
        );
    }

    #[test]
    fn test_entries_are_sorted_and_named() {
        let table = FanOutTable::fat_tree();
        let rows = table.entries();
        assert_eq!(rows[0].switch, SWITCH_101);
        assert_eq!(rows[0].in_port, PortNo::new(25));
        assert_eq!(rows[0].name, "Switch# 101");
        assert!(rows.windows(2).all(|w| (w[0].switch, w[0].in_port) < (w[1].switch, w[1].in_port)));
    }

    #[test]
    fn test_empty_table() {
        let table = FanOutTable::empty();
        assert!(table.is_empty());
        assert!(table.lookup(SWITCH_101, PortNo::new(26)).is_none());
    }
}
