// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reference backend running the `tensor-core` kernels on the host CPU.

use tensor_core::ops::{self, ModularOp, NttTables, SliceIndex};
use tensor_core::{DType, DeviceTensor, HostTensor, Shape};

use crate::backend::{Backend, BackendError, NttArgs, Operand};

/// Host-memory backend. NTT lanes are spread over `num_threads` scoped
/// threads; every other kernel runs on the calling thread.
#[derive(Debug, Clone)]
pub struct CpuBackend {
    num_threads: usize,
}

impl CpuBackend {
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads: num_threads.max(1),
        }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new(1)
    }
}

fn operand<'a>(o: Operand<'a, DeviceTensor>) -> ops::Operand<'a> {
    match o {
        Operand::Tensor(t) => ops::Operand::Tensor(t),
        Operand::Const(v) => ops::Operand::Scalar(v),
    }
}

fn check_skip_perm(op: &'static str, skip_perm: bool) -> Result<(), BackendError> {
    if skip_perm {
        return Err(BackendError::Unsupported {
            op,
            detail: "skip_perm is not implemented".into(),
        });
    }
    Ok(())
}

impl Backend for CpuBackend {
    type Tensor = DeviceTensor;

    fn name(&self) -> &str {
        "cpu"
    }

    fn synchronize(&self) {
        // Kernels complete before returning.
    }

    fn host_to_device(&self, host: &HostTensor, dtype: DType) -> Result<DeviceTensor, BackendError> {
        Ok(DeviceTensor::from_host(host, dtype))
    }

    fn device_to_host(&self, tensor: &DeviceTensor) -> Result<HostTensor, BackendError> {
        Ok(tensor.to_host()?)
    }

    fn empty(&self, shape: &Shape, dtype: DType) -> Result<DeviceTensor, BackendError> {
        Ok(DeviceTensor::zeros(shape, dtype))
    }

    fn zeros(&self, shape: &Shape, dtype: DType) -> Result<DeviceTensor, BackendError> {
        Ok(DeviceTensor::zeros(shape, dtype))
    }

    fn modop(
        &self,
        op: ModularOp,
        a: &DeviceTensor,
        b: Operand<'_, DeviceTensor>,
        p: Operand<'_, DeviceTensor>,
        out: &DeviceTensor,
    ) -> Result<DeviceTensor, BackendError> {
        ops::modop(op, a, operand(b), operand(p), out)?;
        Ok(out.clone())
    }

    fn modneg(
        &self,
        a: &DeviceTensor,
        p: Operand<'_, DeviceTensor>,
        out: &DeviceTensor,
    ) -> Result<DeviceTensor, BackendError> {
        ops::modneg(a, operand(p), out)?;
        Ok(out.clone())
    }

    fn axis_modsum(
        &self,
        a: &DeviceTensor,
        axis: i64,
        p: &DeviceTensor,
        out: &DeviceTensor,
    ) -> Result<DeviceTensor, BackendError> {
        ops::axis_modsum(a, axis, p, out)?;
        Ok(out.clone())
    }

    fn modmul_axis_sum(
        &self,
        a: &DeviceTensor,
        b: &DeviceTensor,
        p: &DeviceTensor,
        axis: i64,
        out: &DeviceTensor,
    ) -> Result<DeviceTensor, BackendError> {
        ops::modmul_axis_sum(a, b, p, axis, out)?;
        Ok(out.clone())
    }

    fn ntt(
        &self,
        a: &DeviceTensor,
        tables: NttArgs<'_, DeviceTensor>,
        out: &DeviceTensor,
        tile: bool,
    ) -> Result<DeviceTensor, BackendError> {
        check_skip_perm("ntt", tables.skip_perm)?;
        let input = if tile { ops::expand(a, 2, -1)? } else { a.clone() };
        let kernel_tables = NttTables {
            p: tables.p,
            perm: tables.perm,
            twiddles: tables.twiddles,
        };
        ops::ntt(&input, kernel_tables, out, self.num_threads)?;
        Ok(out.clone())
    }

    fn intt(
        &self,
        a: &DeviceTensor,
        tables: NttArgs<'_, DeviceTensor>,
        m_inv: &DeviceTensor,
        out: &DeviceTensor,
    ) -> Result<DeviceTensor, BackendError> {
        check_skip_perm("intt", tables.skip_perm)?;
        let kernel_tables = NttTables {
            p: tables.p,
            perm: tables.perm,
            twiddles: tables.twiddles,
        };
        ops::intt(a, kernel_tables, m_inv, out, self.num_threads)?;
        Ok(out.clone())
    }

    fn take_along_axis(
        &self,
        a: &DeviceTensor,
        indices: &DeviceTensor,
        axis: i64,
        out: &DeviceTensor,
    ) -> Result<DeviceTensor, BackendError> {
        ops::take_along_axis(a, indices, axis, out)?;
        Ok(out.clone())
    }

    fn apply_g_decomp(
        &self,
        a: &DeviceTensor,
        g_exp: i64,
        base_bits: i64,
        out: &DeviceTensor,
    ) -> Result<DeviceTensor, BackendError> {
        ops::apply_g_decomp(a, g_exp, base_bits, out)?;
        Ok(out.clone())
    }

    fn abs(&self, a: &DeviceTensor, out: &DeviceTensor) -> Result<DeviceTensor, BackendError> {
        ops::abs(a, out)?;
        Ok(out.clone())
    }

    fn permute(
        &self,
        a: &DeviceTensor,
        perms: &DeviceTensor,
        elementwise_axis: i64,
        perm_axis: i64,
        out: &DeviceTensor,
    ) -> Result<DeviceTensor, BackendError> {
        ops::permute(a, perms, elementwise_axis, perm_axis, out)?;
        Ok(out.clone())
    }

    fn set_const_val(&self, a: &DeviceTensor, value: i64) -> Result<(), BackendError> {
        ops::set_const_val(a, value);
        Ok(())
    }

    fn pad_single_axis(
        &self,
        a: &DeviceTensor,
        pad: i64,
        axis: i64,
        out: &DeviceTensor,
    ) -> Result<DeviceTensor, BackendError> {
        ops::pad_single_axis(a, pad, axis, out)?;
        Ok(out.clone())
    }

    fn moveaxis(&self, a: &DeviceTensor, source: i64, destination: i64) -> Result<DeviceTensor, BackendError> {
        Ok(ops::moveaxis(a, source, destination)?)
    }

    fn expand(&self, a: &DeviceTensor, repeat: i64, axis: i64) -> Result<DeviceTensor, BackendError> {
        Ok(ops::expand(a, repeat, axis)?)
    }

    fn contiguous(&self, a: &DeviceTensor) -> Result<DeviceTensor, BackendError> {
        Ok(ops::contiguous(a))
    }

    fn get_slice(&self, a: &DeviceTensor, index: &[SliceIndex]) -> Result<DeviceTensor, BackendError> {
        Ok(ops::get_slice(a, index)?)
    }

    fn new_reference(&self, a: &DeviceTensor) -> Result<DeviceTensor, BackendError> {
        Ok(ops::new_reference(a))
    }

    fn flatten(&self, a: &DeviceTensor, start: i64, end: i64) -> Result<DeviceTensor, BackendError> {
        Ok(ops::flatten(a, start, end)?)
    }

    fn squeeze(&self, a: &DeviceTensor, axis: i64) -> Result<DeviceTensor, BackendError> {
        Ok(ops::squeeze(a, axis)?)
    }

    fn unsqueeze(&self, a: &DeviceTensor, axis: i64) -> Result<DeviceTensor, BackendError> {
        Ok(ops::unsqueeze(a, axis)?)
    }

    fn reshape(&self, a: &DeviceTensor, shape: &[i64]) -> Result<(), BackendError> {
        Ok(ops::reshape(a, shape)?)
    }
}
