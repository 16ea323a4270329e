// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The transcript interpreter.
//!
//! ```text
//!            SegmentStart(label)
//!   Idle ──────────────────────────▶ InSegment(label)
//!    ▲                                    │
//!    └──────────── SegmentEnd ────────────┘
//! ```
//!
//! Every instruction runs in transcript order on the calling thread. The
//! first fatal error ends the run; nothing after it executes and nothing
//! before it is rolled back. Segment markers only drive logging and
//! per-segment timing and are never validated for balance.

use std::collections::BTreeSet;
use std::time::Instant;

use memory_table::{MemoryTable, TableStats};
use transcript_ir::{Argument, ArgumentTag, DeviceOp, Instruction, Transcript};

use crate::dispatch::dispatch;
use crate::marshal::resolve_all;
use crate::opcode::OpCode;
use crate::{Backend, CpuBackend, RunMetrics, RuntimeConfig, RuntimeError};

/// The outcome of a successful replay.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunReport {
    pub metrics: RunMetrics,
    /// Memory-table counters at the end of the run.
    pub table: TableStats,
    /// Names still live when the run ended.
    pub live_names: BTreeSet<String>,
}

/// A segment that has been opened but not yet closed.
struct OpenSegment {
    label: String,
    started: Instant,
    device_ops_at_start: usize,
}

/// Replays transcripts against a [`Backend`].
///
/// # Example
/// ```no_run
/// use runtime::{Interpreter, RuntimeConfig};
/// use std::path::Path;
/// use transcript_ir::Transcript;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transcript = Transcript::from_file(Path::new("keygen.json"))?;
/// let config = RuntimeConfig { verify: true, ..Default::default() };
/// let report = Interpreter::cpu(config).run(&transcript)?;
/// println!("{}", report.metrics.summary());
/// # Ok(())
/// # }
/// ```
pub struct Interpreter<B: Backend> {
    backend: B,
    config: RuntimeConfig,
}

impl Interpreter<CpuBackend> {
    /// Creates an interpreter over the CPU reference backend, sized by the
    /// config's thread count.
    pub fn cpu(config: RuntimeConfig) -> Self {
        let backend = CpuBackend::new(config.resolve_threads());
        Self::new(backend, config)
    }
}

impl<B: Backend> Interpreter<B> {
    pub fn new(backend: B, config: RuntimeConfig) -> Self {
        tracing::info!(
            "interpreter created on backend '{}' (verify={}, preflight={})",
            backend.name(),
            config.verify,
            config.preflight,
        );
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Replays `transcript` with a fresh memory table.
    pub fn run(&self, transcript: &Transcript) -> Result<RunReport, RuntimeError> {
        let mut table = MemoryTable::new();
        self.run_with_table(transcript, &mut table)
    }

    /// Replays `transcript` against a caller-owned memory table.
    ///
    /// On failure the table holds exactly the state reached before the
    /// failing instruction.
    pub fn run_with_table(
        &self,
        transcript: &Transcript,
        table: &mut MemoryTable<B::Tensor>,
    ) -> Result<RunReport, RuntimeError> {
        if self.config.preflight {
            transcript.check_liveness()?;
            tracing::debug!("preflight liveness check passed");
        }

        tracing::info!("{}", transcript.summary());
        let mut metrics = RunMetrics::new();
        let mut segments: Vec<OpenSegment> = Vec::new();

        self.backend.synchronize();
        let start = Instant::now();

        for (index, instruction) in transcript.iter().enumerate() {
            metrics.record_instruction();
            match instruction {
                Instruction::SegmentStart { label } => {
                    tracing::info!("segment start: {label}");
                    segments.push(OpenSegment {
                        label: label.clone(),
                        started: Instant::now(),
                        device_ops_at_start: metrics.device_ops,
                    });
                }
                Instruction::SegmentEnd => match segments.pop() {
                    Some(segment) => {
                        let duration = segment.started.elapsed();
                        let ops = metrics.device_ops - segment.device_ops_at_start;
                        tracing::info!(
                            "segment end: {} ({ops} ops, {:.3}ms)",
                            segment.label,
                            duration.as_secs_f64() * 1000.0,
                        );
                        metrics.record_segment(segment.label, duration, ops);
                    }
                    None => tracing::warn!("segment end at instruction {index} with no open segment"),
                },
                Instruction::FreeDeviceTensor { name } => {
                    tracing::debug!("[{index}] free {name}");
                    table
                        .remove(name)
                        .map_err(|e| RuntimeError::from(e).at(index))?;
                    metrics.record_free();
                }
                Instruction::DeviceOp(op) => self
                    .execute(index, op, table, &mut metrics)
                    .map_err(|e| e.at(index))?,
            }
        }

        self.backend.synchronize();
        metrics.finalise(start.elapsed());

        for segment in &segments {
            tracing::warn!("segment '{}' was never closed", segment.label);
        }
        tracing::info!("{}", metrics.summary());
        tracing::info!("{}", table.stats().summary());

        Ok(RunReport {
            metrics,
            table: table.stats().clone(),
            live_names: table.live_names(),
        })
    }

    // ── Device ops ─────────────────────────────────────────────────

    fn execute(
        &self,
        index: usize,
        op: &DeviceOp,
        table: &mut MemoryTable<B::Tensor>,
        metrics: &mut RunMetrics,
    ) -> Result<(), RuntimeError> {
        let opcode =
            OpCode::from_name(&op.name).ok_or_else(|| RuntimeError::UnknownOperation(op.name.clone()))?;
        tracing::debug!("[{index}] {opcode} ({} args)", op.args.len());
        let started = self.config.enable_profiling.then(Instant::now);

        match opcode {
            OpCode::HostToDevice => self.host_to_device(op, table)?,
            OpCode::DeviceToHost => self.device_to_host(index, op, table, metrics)?,
            _ => {
                let args = resolve_all(&op.name, &op.args, table).map_err(|e| e.at(index))?;
                let result = dispatch(&self.backend, opcode, &args)?;
                register(op, result, table)?;
            }
        }

        metrics.record_op(index, opcode.as_str(), started.map(|s| s.elapsed()));
        Ok(())
    }

    fn host_to_device(&self, op: &DeviceOp, table: &mut MemoryTable<B::Tensor>) -> Result<(), RuntimeError> {
        let host = match op.args.as_slice() {
            [Argument::HostTensor(h)] => &h.tensor,
            _ => {
                return Err(RuntimeError::invalid(
                    &op.name,
                    "expected a single host tensor argument",
                ))
            }
        };
        let dtype = output_ref(op)?.dtype;
        let tensor = self
            .backend
            .host_to_device(host, dtype)
            .map_err(|source| RuntimeError::Backend {
                op: op.name.clone(),
                source,
            })?;
        register(op, tensor, table)
    }

    fn device_to_host(
        &self,
        index: usize,
        op: &DeviceOp,
        table: &MemoryTable<B::Tensor>,
        metrics: &mut RunMetrics,
    ) -> Result<(), RuntimeError> {
        let name = match op.args.as_slice() {
            [Argument::DeviceTensor(r)] => &r.name,
            [Argument::HostTensor(_)] => {
                return Err(RuntimeError::UnsupportedArgument {
                    op: op.name.clone(),
                    tag: ArgumentTag::HostTensor,
                })
            }
            _ => {
                return Err(RuntimeError::invalid(
                    &op.name,
                    "expected a single device tensor argument",
                ))
            }
        };
        let tensor = table.lookup(name).map_err(|e| RuntimeError::from(e).at(index))?;
        let host = self
            .backend
            .device_to_host(tensor)
            .map_err(|source| RuntimeError::Backend {
                op: op.name.clone(),
                source,
            })?;

        if self.config.verify {
            let expected = match &op.out {
                Argument::HostTensor(h) => &h.tensor,
                _ => {
                    return Err(RuntimeError::invalid(
                        &op.name,
                        "output does not carry an expected host tensor",
                    ))
                }
            };
            if let Some(detail) = host.first_mismatch(expected) {
                return Err(RuntimeError::VerificationMismatch {
                    index,
                    name: name.clone(),
                    detail,
                });
            }
            metrics.record_verified();
            tracing::debug!("[{index}] verified '{name}'");
        }
        Ok(())
    }
}

fn output_ref(op: &DeviceOp) -> Result<&transcript_ir::DeviceTensorRef, RuntimeError> {
    op.out_ref()
        .ok_or_else(|| RuntimeError::invalid(&op.name, "output is not a device tensor reference"))
}

/// Binds the op's output name to `value`.
fn register<T>(op: &DeviceOp, value: T, table: &mut MemoryTable<T>) -> Result<(), RuntimeError> {
    let out = output_ref(op)?;
    if table.insert(out.name.clone(), value).is_some() {
        tracing::debug!("'{}' rebound by {}", out.name, op.name);
    }
    Ok(())
}

impl<B: Backend + std::fmt::Debug> std::fmt::Debug for Interpreter<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("backend", &self.backend)
            .field("config", &self.config)
            .finish()
    }
}
