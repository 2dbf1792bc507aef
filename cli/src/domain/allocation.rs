//! Lowest-free port selection.

use std::collections::BTreeSet;

/// Inclusive range of ports handed out to applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub base: u16,
    pub max: u16,
}

/// Smallest port in `range` not present in `used`, or `None` when the range is
/// exhausted.
#[must_use]
pub fn lowest_free_port(used: &BTreeSet<u16>, range: PortRange) -> Option<u16> {
    (range.base..=range.max).find(|port| !used.contains(port))
}
