// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor types and reference kernels for transcript replay.
//!
//! This crate provides:
//! - [`HostTensor`]: an owned, contiguous host buffer with NPY (de)serialization.
//! - [`DeviceTensor`]: a shared, strided handle to (host-simulated) device memory.
//! - [`Shape`]: runtime shape descriptors with axis normalization and broadcasting.
//! - [`DType`]: supported element data types (int32, int64, float64).
//! - [`ops`]: modular arithmetic, NTT/INTT, gather/decomposition kernels and
//!   zero-copy layout operations.
//!
//! # Design Goals
//! - Views share storage; only explicit copies allocate.
//! - Kernels never hold a read and a write lock at once, so outputs may alias inputs.
//! - Clean error types via `thiserror`.

mod device;
mod dtype;
mod error;
mod host;
mod npy;
pub mod ops;
mod shape;

pub use device::{DeviceTensor, Layout};
pub use dtype::DType;
pub use error::TensorError;
pub use host::{cast_widened, float_to_widened, widened_to_float, HostTensor};
pub use ops::{Operand, SliceIndex};
pub use shape::Shape;
