// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Table usage statistics for profiling and diagnostics.

/// Cumulative statistics about memory table usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TableStats {
    /// Total number of insertions, including overwrites.
    pub inserts: u64,
    /// Insertions that replaced a live entry.
    pub overwrites: u64,
    /// Successful removals.
    pub removals: u64,
    /// High-water mark of simultaneously live entries.
    pub peak_live: usize,
}

impl TableStats {
    /// Records an insertion; `replaced` is true when a live entry was displaced.
    pub(crate) fn record_insert(&mut self, replaced: bool, live: usize) {
        self.inserts += 1;
        if replaced {
            self.overwrites += 1;
        }
        if live > self.peak_live {
            self.peak_live = live;
        }
    }

    pub(crate) fn record_removal(&mut self) {
        self.removals += 1;
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Table: {} inserts ({} overwrites), {} removals, peak {} live",
            self.inserts, self.overwrites, self.removals, self.peak_live,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let s = TableStats::default();
        assert_eq!(s.inserts, 0);
        assert_eq!(s.peak_live, 0);
    }

    #[test]
    fn test_peak_tracking() {
        let mut s = TableStats::default();
        s.record_insert(false, 1);
        s.record_insert(false, 2);
        s.record_removal();
        s.record_insert(true, 1);
        assert_eq!(s.peak_live, 2);
        assert_eq!(s.overwrites, 1);
        assert_eq!(s.inserts, 3);
    }

    #[test]
    fn test_summary() {
        let mut s = TableStats::default();
        s.record_insert(false, 1);
        s.record_removal();
        let summary = s.summary();
        assert!(summary.contains("1 inserts"));
        assert!(summary.contains("1 removals"));
    }
}
