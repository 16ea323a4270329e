// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reference kernels over [`DeviceTensor`].
//!
//! Compute kernels write into a caller-provided output tensor. View kernels
//! return a new tensor object sharing storage with their input, except
//! [`reshape`], which rewrites the input's layout in place.

mod compute_op;
mod modular_op;
mod ntt_op;
mod view_op;

pub use compute_op::{abs, apply_g_decomp, pad_single_axis, permute, set_const_val, take_along_axis};
pub use modular_op::{axis_modsum, modmul_axis_sum, modneg, modop, ModularOp};
pub use ntt_op::{intt, ntt, NttTables};
pub use view_op::{
    contiguous, expand, flatten, get_slice, moveaxis, new_reference, reshape, squeeze, unsqueeze,
    SliceIndex,
};

use crate::device::Layout;
use crate::{DeviceTensor, Shape, TensorError};

/// A modular-op operand: a tensor or a scalar constant.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Tensor(&'a DeviceTensor),
    Scalar(i64),
}

/// Gathers `t`'s values broadcast to `target` (right-aligned, size-1 axes stretch).
pub(crate) fn broadcast_values(
    op: &'static str,
    t: &DeviceTensor,
    target: &Shape,
) -> Result<Vec<i64>, TensorError> {
    let layout = t.layout();
    if layout.dims() == target.dims() {
        return Ok(t.values());
    }
    let mismatch = || TensorError::ShapeMismatch {
        op,
        lhs: layout.shape(),
        rhs: target.clone(),
    };
    let rank = target.rank();
    if layout.rank() > rank {
        return Err(mismatch());
    }
    let lead = rank - layout.rank();
    let mut strides = vec![0usize; rank];
    for (i, &dim) in target.dims().iter().enumerate().skip(lead) {
        let src = i - lead;
        strides[i] = match layout.dims()[src] {
            d if d == dim => layout.strides()[src],
            1 => 0,
            _ => return Err(mismatch()),
        };
    }
    let view = t.view(Layout::new(target.dims().to_vec(), strides, layout.offset()));
    Ok(view.values())
}

pub(crate) fn require_integer(op: &'static str, t: &DeviceTensor) -> Result<(), TensorError> {
    if t.dtype().is_integer() {
        Ok(())
    } else {
        Err(TensorError::UnsupportedDType {
            op,
            dtype: t.dtype(),
        })
    }
}
