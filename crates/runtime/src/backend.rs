// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The backend capability surface.
//!
//! A [`Backend`] owns device memory and exposes one typed method per device
//! operation a transcript can name. The interpreter never touches tensor
//! contents itself; it resolves arguments, calls one of these methods and
//! stores the returned handle under the op's output name.
//!
//! Compute methods write into the caller's `out` tensor and return it, so
//! the handle registered for the output is the very object the recorder
//! passed in. View methods return a new handle that may share storage with
//! their input. `reshape` and `set_const_val` mutate their input in place.

use std::fmt;

use tensor_core::ops::{ModularOp, SliceIndex};
use tensor_core::{DType, HostTensor, Shape, TensorError};

/// Errors raised by backend methods.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// A kernel rejected its inputs.
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// The backend does not implement the requested variant of an operation.
    #[error("'{op}' is not supported by this backend: {detail}")]
    Unsupported { op: &'static str, detail: String },
}

/// A modular-op operand as seen by a backend.
#[derive(Debug)]
pub enum Operand<'a, T> {
    Tensor(&'a T),
    Const(i64),
}

impl<T> Clone for Operand<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Operand<'_, T> {}

/// Tables for a forward or inverse NTT call.
#[derive(Debug)]
pub struct NttArgs<'a, T> {
    pub perm: &'a T,
    /// Swap pairs of `perm`; recorded for backends that permute in place.
    pub perm_pairs: Option<&'a T>,
    pub p: &'a T,
    /// Twiddle factors, or inverse twiddles for the inverse transform.
    pub twiddles: &'a T,
    pub skip_perm: bool,
}

/// A device that can execute every operation a transcript may name.
pub trait Backend {
    /// Device tensor handle. Cloning yields another claim on the same tensor.
    type Tensor: Clone + fmt::Debug;

    fn name(&self) -> &str;

    /// Blocks until all submitted work has finished.
    fn synchronize(&self);

    // ── Transfers and allocation ────────────────────────────────────

    fn host_to_device(&self, host: &HostTensor, dtype: DType) -> Result<Self::Tensor, BackendError>;
    fn device_to_host(&self, tensor: &Self::Tensor) -> Result<HostTensor, BackendError>;
    fn empty(&self, shape: &Shape, dtype: DType) -> Result<Self::Tensor, BackendError>;
    fn zeros(&self, shape: &Shape, dtype: DType) -> Result<Self::Tensor, BackendError>;

    // ── Modular arithmetic ──────────────────────────────────────────

    fn modop(
        &self,
        op: ModularOp,
        a: &Self::Tensor,
        b: Operand<'_, Self::Tensor>,
        p: Operand<'_, Self::Tensor>,
        out: &Self::Tensor,
    ) -> Result<Self::Tensor, BackendError>;

    fn modneg(
        &self,
        a: &Self::Tensor,
        p: Operand<'_, Self::Tensor>,
        out: &Self::Tensor,
    ) -> Result<Self::Tensor, BackendError>;

    fn axis_modsum(
        &self,
        a: &Self::Tensor,
        axis: i64,
        p: &Self::Tensor,
        out: &Self::Tensor,
    ) -> Result<Self::Tensor, BackendError>;

    fn modmul_axis_sum(
        &self,
        a: &Self::Tensor,
        b: &Self::Tensor,
        p: &Self::Tensor,
        axis: i64,
        out: &Self::Tensor,
    ) -> Result<Self::Tensor, BackendError>;

    /// Forward NTT. With `tile` set, a trailing size-1 axis of `a` is first
    /// expanded to 2.
    fn ntt(
        &self,
        a: &Self::Tensor,
        tables: NttArgs<'_, Self::Tensor>,
        out: &Self::Tensor,
        tile: bool,
    ) -> Result<Self::Tensor, BackendError>;

    fn intt(
        &self,
        a: &Self::Tensor,
        tables: NttArgs<'_, Self::Tensor>,
        m_inv: &Self::Tensor,
        out: &Self::Tensor,
    ) -> Result<Self::Tensor, BackendError>;

    // ── Element-wise and gather ─────────────────────────────────────

    fn take_along_axis(
        &self,
        a: &Self::Tensor,
        indices: &Self::Tensor,
        axis: i64,
        out: &Self::Tensor,
    ) -> Result<Self::Tensor, BackendError>;

    fn apply_g_decomp(
        &self,
        a: &Self::Tensor,
        g_exp: i64,
        base_bits: i64,
        out: &Self::Tensor,
    ) -> Result<Self::Tensor, BackendError>;

    fn abs(&self, a: &Self::Tensor, out: &Self::Tensor) -> Result<Self::Tensor, BackendError>;

    fn permute(
        &self,
        a: &Self::Tensor,
        perms: &Self::Tensor,
        elementwise_axis: i64,
        perm_axis: i64,
        out: &Self::Tensor,
    ) -> Result<Self::Tensor, BackendError>;

    fn set_const_val(&self, a: &Self::Tensor, value: i64) -> Result<(), BackendError>;

    fn pad_single_axis(
        &self,
        a: &Self::Tensor,
        pad: i64,
        axis: i64,
        out: &Self::Tensor,
    ) -> Result<Self::Tensor, BackendError>;

    // ── Layout ──────────────────────────────────────────────────────

    fn moveaxis(&self, a: &Self::Tensor, source: i64, destination: i64) -> Result<Self::Tensor, BackendError>;
    fn expand(&self, a: &Self::Tensor, repeat: i64, axis: i64) -> Result<Self::Tensor, BackendError>;
    fn contiguous(&self, a: &Self::Tensor) -> Result<Self::Tensor, BackendError>;
    fn get_slice(&self, a: &Self::Tensor, index: &[SliceIndex]) -> Result<Self::Tensor, BackendError>;
    fn new_reference(&self, a: &Self::Tensor) -> Result<Self::Tensor, BackendError>;
    fn flatten(&self, a: &Self::Tensor, start: i64, end: i64) -> Result<Self::Tensor, BackendError>;
    fn squeeze(&self, a: &Self::Tensor, axis: i64) -> Result<Self::Tensor, BackendError>;
    fn unsqueeze(&self, a: &Self::Tensor, axis: i64) -> Result<Self::Tensor, BackendError>;
    fn reshape(&self, a: &Self::Tensor, shape: &[i64]) -> Result<(), BackendError>;
}
