//! Half-open time interval arithmetic.
//!
//! Every quiet hour occupies `[start, end)`: a window ending at 10:00 and
//! another starting at 10:00 do not share an instant.

use crate::types::Timestamp;

/// Whether `[s1, e1)` and `[s2, e2)` share at least one instant.
pub fn ranges_overlap(s1: Timestamp, e1: Timestamp, s2: Timestamp, e2: Timestamp) -> bool {
    s1 < e2 && s2 < e1
}

/// Closed range `[from, to]` used for due-window scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl ScanRange {
    pub fn contains(&self, at: Timestamp) -> bool {
        self.from <= at && at <= self.to
    }
}
