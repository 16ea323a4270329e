// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The replay engine for execution transcripts.
//!
//! The runtime takes:
//! - A decoded [`Transcript`](transcript_ir::Transcript) from `transcript-ir`.
//! - A [`Backend`] exposing the device operations the transcript names.
//! - A `MemoryTable` from `memory-table` binding symbolic names to live
//!   device tensors.
//!
//! And executes the transcript instruction by instruction: arguments are
//! marshalled against the table, the op is dispatched through the closed
//! [`OpCode`] table, and the result is bound to the op's output name.
//!
//! # Key Components
//! - [`Interpreter`]: the instruction loop, barriers, timing and verification.
//! - [`Backend`] / [`CpuBackend`]: the capability surface and its reference
//!   implementation on `tensor-core` kernels.
//! - [`OpCode`]: the opcode table.
//! - [`marshal`]: argument resolution.
//! - [`RunMetrics`]: per-run counters and timings.
//!
//! # Threading
//! Instructions run strictly in order on the calling thread. The CPU backend
//! spreads independent NTT lanes over `num_threads` scoped threads.

mod backend;
mod config;
mod cpu_backend;
mod dispatch;
mod error;
mod interpreter;
pub mod marshal;
mod metrics;
mod opcode;

pub use backend::{Backend, BackendError, NttArgs, Operand};
pub use config::RuntimeConfig;
pub use cpu_backend::CpuBackend;
pub use dispatch::dispatch;
pub use error::{ErrorKind, RuntimeError};
pub use interpreter::{Interpreter, RunReport};
pub use marshal::CallArg;
pub use metrics::{OpMetrics, RunMetrics, SegmentMetrics};
pub use opcode::{OpCode, OperandForm};
