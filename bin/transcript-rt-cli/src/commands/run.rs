// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `transcript-rt run` command: replay a transcript on the CPU backend.
//!
//! ```text
//! load config → decode transcript → Interpreter::run × repeat → report
//! ```

use std::path::PathBuf;
use std::time::Duration;

use runtime::{Interpreter, RunReport, RuntimeConfig};
use transcript_ir::Transcript;

use super::truncate;

/// Flags accepted by `run`.
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub verify: bool,
    pub threads: Option<usize>,
    pub repeat: usize,
    pub preflight: bool,
    pub report: Option<PathBuf>,
}

pub async fn execute(path: PathBuf, options: RunOptions) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           transcript-rt · Replay Runner             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Configuration ──────────────────────────────────────────
    let config = resolve_config(&options)?;
    let repeat = options.repeat.max(1);

    println!("  Config:");
    println!("   Transcript: {}", path.display());
    println!("   Verify:     {}", config.verify);
    println!("   Preflight:  {}", config.preflight);
    println!("   Threads:    {}", config.resolve_threads());
    println!("   Repeat:     {repeat}");
    println!();

    // ── Decode ─────────────────────────────────────────────────
    println!("  [1/2] Decoding transcript...");
    let transcript = Transcript::from_file(&path)
        .map_err(|e| anyhow::anyhow!("failed to load transcript '{}': {e}", path.display()))?;
    println!("        {}", transcript.summary());
    println!();

    // ── Replay ─────────────────────────────────────────────────
    println!("  [2/2] Replaying...");
    let interpreter = Interpreter::cpu(config);
    let mut elapsed = Vec::with_capacity(repeat);
    let mut last = None;
    for i in 0..repeat {
        let report = interpreter.run(&transcript)?;
        tracing::info!("run {}/{repeat}: {}", i + 1, report.metrics.summary());
        elapsed.push(report.metrics.elapsed);
        last = Some(report);
    }
    println!();

    if let Some(report) = &last {
        print_results(report, &elapsed);
        if let Some(out) = &options.report {
            let json = serde_json::to_string_pretty(report)?;
            std::fs::write(out, json)
                .map_err(|e| anyhow::anyhow!("cannot write report '{}': {e}", out.display()))?;
            println!("  Report written to {}", out.display());
            println!();
        }
    }

    Ok(())
}

/// Starts from the config file when one is given and lets CLI flags override it.
fn resolve_config(options: &RunOptions) -> anyhow::Result<RuntimeConfig> {
    let mut config = match &options.config {
        Some(path) => RuntimeConfig::from_file(path)?,
        None => RuntimeConfig::default(),
    };
    config.verify |= options.verify;
    config.preflight |= options.preflight;
    if options.threads.is_some() {
        config.num_threads = options.threads;
    }
    Ok(config)
}

fn print_results(report: &RunReport, elapsed: &[Duration]) {
    let m = &report.metrics;
    println!("  Metrics:");
    println!("   {}", m.summary());
    println!("   {}", report.table.summary());
    println!("   Live at exit: {} names", report.live_names.len());

    if elapsed.len() > 1 {
        let ms: Vec<f64> = elapsed.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        let min = ms.iter().copied().fold(f64::INFINITY, f64::min);
        let max = ms.iter().copied().fold(0.0, f64::max);
        let mean = ms.iter().sum::<f64>() / ms.len() as f64;
        println!(
            "   Over {} runs: min {min:.3}ms, mean {mean:.3}ms, max {max:.3}ms",
            ms.len()
        );
    }
    println!();

    if !m.segments.is_empty() {
        println!("  {:<32} {:>8} {:>12}", "Segment", "Ops", "Time");
        println!("  {}", "-".repeat(54));
        for s in &m.segments {
            println!(
                "  {:<32} {:>8} {:>10.3}ms",
                truncate(&s.label, 32),
                s.device_ops,
                s.duration.as_secs_f64() * 1000.0,
            );
        }
        println!();
    }

    let slowest = m.slowest_ops(5);
    if !slowest.is_empty() {
        println!("  Slowest ops:");
        for op in slowest {
            println!(
                "   #{:<6} {:<24} {:>10.3}ms",
                op.index,
                op.opcode,
                op.duration.as_secs_f64() * 1000.0,
            );
        }
        println!();
    }
}
