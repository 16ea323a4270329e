// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # transcript-ir
//!
//! The data model and wire codec for execution transcripts.
//!
//! A transcript is a flat, ordered recording of backend calls made by a
//! high-level program. Replaying it against a backend reproduces the
//! computation without the program that produced it.
//!
//! # Key Components
//! - [`Transcript`]: the ordered instruction list, with summary helpers and
//!   a static liveness pre-check.
//! - [`Instruction`]: segment markers, device ops and tensor frees.
//! - [`Argument`]: the closed set of device-op argument kinds.
//! - [`codec`]: typed encode/decode of the tagged JSON document.
//! - [`wire`]: the generic `__type__`-tagged value layer underneath.
//!
//! # Wire Format
//! A transcript file is pretty-printed JSON in which every domain value is
//! an object carrying a `"__type__"` discriminator. Host tensors travel as
//! base64-armored NPY containers.
//!
//! # Example
//! ```no_run
//! use std::path::Path;
//! use transcript_ir::Transcript;
//!
//! let transcript = Transcript::from_file(Path::new("keygen.json")).unwrap();
//! println!("{}", transcript.summary());
//! transcript.check_liveness().unwrap();
//! ```

mod argument;
pub mod codec;
mod error;
mod instruction;
mod printer;
mod transcript;
pub mod wire;

pub use argument::{Argument, ArgumentTag, DeviceTensorRef, HostTensorArg, OpaqueValue, TensorFlavor};
pub use error::CodecError;
pub use instruction::{DeviceOp, Instruction, InstructionTag};
pub use transcript::{LivenessViolation, Transcript};
pub use wire::WireValue;
