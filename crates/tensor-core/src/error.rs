// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor operations.

use crate::Shape;

/// Errors that can occur during tensor operations.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer size does not match the expected size for the given shape and dtype.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The requested data type is not supported for this operation.
    #[error("unsupported dtype {dtype} for operation {op}")]
    UnsupportedDType {
        op: &'static str,
        dtype: crate::DType,
    },

    /// A dtype name could not be mapped to a supported element type.
    #[error("unknown dtype name '{0}'")]
    UnknownDType(String),

    /// An axis argument is outside `-rank..rank`.
    #[error("axis {axis} out of range for rank {rank} in {op}")]
    AxisOutOfRange {
        op: &'static str,
        axis: i64,
        rank: usize,
    },

    /// An argument value is invalid for the operation (negative padding,
    /// non-positive modulus, bad slice step, ...).
    #[error("invalid argument for {op}: {detail}")]
    InvalidArgument { op: &'static str, detail: String },

    /// The requested behaviour exists in the operation signature but is not implemented.
    #[error("{op}: {detail} is not implemented")]
    NotImplemented { op: &'static str, detail: String },

    /// An NPY container could not be parsed or produced.
    #[error("malformed npy container: {0}")]
    Npy(String),
}
