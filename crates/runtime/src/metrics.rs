// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Replay profiling metrics.
//!
//! [`RunMetrics`] collects the wall time between the start and end
//! barriers, instruction counts, per-segment timings and, when profiling is
//! enabled, a per-op trace.

use std::time::Duration;

/// Timing for one executed device op.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OpMetrics {
    /// Position of the op in the transcript.
    pub index: usize,
    /// Canonical opcode name.
    pub opcode: &'static str,
    pub duration: Duration,
}

/// Timing for one closed segment.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SegmentMetrics {
    pub label: String,
    pub duration: Duration,
    /// Device ops executed between the segment markers.
    pub device_ops: usize,
}

/// Aggregate metrics for one replay.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunMetrics {
    /// Wall time between the start and end barriers.
    pub elapsed: Duration,
    pub instructions: usize,
    pub device_ops: usize,
    pub frees: usize,
    /// `device_to_host` transfers compared against their recorded value.
    pub verified_transfers: usize,
    pub segments: Vec<SegmentMetrics>,
    /// Per-op timings; empty unless profiling is enabled.
    pub op_trace: Vec<OpMetrics>,
    sequence: Vec<&'static str>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_instruction(&mut self) {
        self.instructions += 1;
    }

    pub(crate) fn record_op(&mut self, index: usize, opcode: &'static str, duration: Option<Duration>) {
        self.device_ops += 1;
        self.sequence.push(opcode);
        if let Some(duration) = duration {
            self.op_trace.push(OpMetrics {
                index,
                opcode,
                duration,
            });
        }
    }

    pub(crate) fn record_free(&mut self) {
        self.frees += 1;
    }

    pub(crate) fn record_verified(&mut self) {
        self.verified_transfers += 1;
    }

    pub(crate) fn record_segment(&mut self, label: String, duration: Duration, device_ops: usize) {
        self.segments.push(SegmentMetrics {
            label,
            duration,
            device_ops,
        });
    }

    pub(crate) fn finalise(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    /// Executed opcode names, in execution order.
    pub fn op_sequence(&self) -> &[&'static str] {
        &self.sequence
    }

    /// Total time spent inside traced ops.
    pub fn traced_duration(&self) -> Duration {
        self.op_trace.iter().map(|m| m.duration).sum()
    }

    /// The `n` slowest traced ops, slowest first.
    pub fn slowest_ops(&self, n: usize) -> Vec<&OpMetrics> {
        let mut ops: Vec<&OpMetrics> = self.op_trace.iter().collect();
        ops.sort_by(|a, b| b.duration.cmp(&a.duration).then(a.index.cmp(&b.index)));
        ops.truncate(n);
        ops
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Replay: {:.3}ms elapsed, {} instructions ({} device ops, {} frees, {} verified), {} segments",
            self.elapsed.as_secs_f64() * 1000.0,
            self.instructions,
            self.device_ops,
            self.frees,
            self.verified_transfers,
            self.segments.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let m = RunMetrics::new();
        assert!(m.op_sequence().is_empty());
        assert_eq!(m.traced_duration(), Duration::ZERO);
    }

    #[test]
    fn test_record_ops() {
        let mut m = RunMetrics::new();
        m.record_op(0, "zeros", None);
        m.record_op(1, "abs", Some(Duration::from_millis(3)));
        m.record_op(2, "ntt", Some(Duration::from_millis(9)));
        m.record_free();
        assert_eq!(m.op_sequence(), &["zeros", "abs", "ntt"]);
        assert_eq!(m.op_trace.len(), 2);
        assert_eq!(m.traced_duration(), Duration::from_millis(12));
        assert_eq!(m.slowest_ops(1)[0].opcode, "ntt");
        assert_eq!(m.frees, 1);
    }

    #[test]
    fn test_summary_format() {
        let mut m = RunMetrics::new();
        m.record_instruction();
        m.record_op(0, "abs", None);
        m.record_verified();
        m.record_segment("enc".into(), Duration::from_millis(1), 1);
        m.finalise(Duration::from_millis(2));
        let s = m.summary();
        assert!(s.starts_with("Replay: 2.000ms"));
        assert!(s.contains("1 device ops"));
        assert!(s.contains("1 verified"));
        assert!(s.contains("1 segments"));
    }
}
