// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `transcript-rt inspect` command: display a transcript without running it.

use std::path::PathBuf;

use runtime::OpCode;
use transcript_ir::{Instruction, Transcript};

use super::truncate;

pub async fn execute(path: PathBuf, full: bool) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║          transcript-rt · Transcript Inspector       ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let transcript = Transcript::from_file(&path)
        .map_err(|e| anyhow::anyhow!("failed to load transcript '{}': {e}", path.display()))?;

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", transcript.summary());
    println!();

    if full {
        println!("{transcript}");
        return Ok(());
    }

    // ── Segments ───────────────────────────────────────────────
    let labels: Vec<&str> = transcript
        .iter()
        .filter_map(|i| match i {
            Instruction::SegmentStart { label } => Some(label.as_str()),
            _ => None,
        })
        .collect();
    if !labels.is_empty() {
        println!("  Segments:");
        for label in labels {
            println!("   {}", truncate(label, 60));
        }
        println!();
    }

    // ── Opcode Histogram ───────────────────────────────────────
    let histogram = transcript.opcode_histogram();
    let total = transcript.device_op_count().max(1);
    println!("  {:<28} {:>8} {:>8}", "Op", "Count", "Share");
    println!("  {}", "-".repeat(46));
    let mut rows: Vec<_> = histogram.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let mut any_in_place = false;
    for (name, count) in rows {
        let in_place = OpCode::from_name(name).is_some_and(OpCode::is_in_place);
        any_in_place |= in_place;
        println!(
            "  {:<28} {:>8} {:>7.1}%{}",
            truncate(name, 28),
            count,
            count as f64 * 100.0 / total as f64,
            if in_place { " *" } else { "" },
        );
    }
    if any_in_place {
        println!("  * mutates its first argument in place");
    }
    println!();

    Ok(())
}
