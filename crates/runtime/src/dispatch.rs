// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Typed dispatch of resolved arguments to backend methods.
//!
//! Each opcode reads its positional signature through an [`ArgReader`],
//! which fails with [`RuntimeError::InvalidArguments`] on a missing,
//! surplus or wrongly-kinded argument.

use tensor_core::ops::SliceIndex;
use tensor_core::{DType, Shape};

use crate::backend::{Backend, NttArgs, Operand};
use crate::marshal::CallArg;
use crate::opcode::OpCode;
use crate::RuntimeError;

struct ArgReader<'a, T> {
    op: OpCode,
    args: &'a [CallArg<T>],
    pos: usize,
}

impl<'a, T> ArgReader<'a, T> {
    fn new(op: OpCode, args: &'a [CallArg<T>]) -> Self {
        Self { op, args, pos: 0 }
    }

    fn invalid(&self, detail: impl Into<String>) -> RuntimeError {
        RuntimeError::invalid(self.op.as_str(), detail)
    }

    fn next(&mut self, what: &str) -> Result<&'a CallArg<T>, RuntimeError> {
        let arg = self.args.get(self.pos).ok_or_else(|| {
            self.invalid(format!("missing argument {} ({what})", self.pos))
        })?;
        self.pos += 1;
        Ok(arg)
    }

    fn wrong(&self, what: &str, expected: &str, found: &CallArg<T>) -> RuntimeError {
        self.invalid(format!(
            "argument {} ({what}) must be {expected}, found {}",
            self.pos - 1,
            found.kind()
        ))
    }

    fn tensor(&mut self, what: &str) -> Result<&'a T, RuntimeError> {
        match self.next(what)? {
            CallArg::Tensor(t) => Ok(t),
            other => Err(self.wrong(what, "a tensor", other)),
        }
    }

    fn optional_tensor(&mut self, what: &str) -> Result<Option<&'a T>, RuntimeError> {
        match self.next(what)? {
            CallArg::Tensor(t) => Ok(Some(t)),
            CallArg::Null => Ok(None),
            other => Err(self.wrong(what, "a tensor or none", other)),
        }
    }

    fn int(&mut self, what: &str) -> Result<i64, RuntimeError> {
        match self.next(what)? {
            CallArg::Int(v) => Ok(*v),
            other => Err(self.wrong(what, "an int", other)),
        }
    }

    /// An int that may be absent or `None`.
    fn int_or(&mut self, what: &str, default: i64) -> Result<i64, RuntimeError> {
        if self.pos >= self.args.len() {
            return Ok(default);
        }
        match self.next(what)? {
            CallArg::Int(v) => Ok(*v),
            CallArg::Null => Ok(default),
            other => Err(self.wrong(what, "an int or none", other)),
        }
    }

    fn flag(&mut self, what: &str) -> Result<bool, RuntimeError> {
        Ok(self.int(what)? != 0)
    }

    fn operand(&mut self, tensor: bool, what: &str) -> Result<Operand<'a, T>, RuntimeError> {
        if tensor {
            self.tensor(what).map(Operand::Tensor)
        } else {
            self.int(what).map(Operand::Const)
        }
    }

    fn ints(&mut self, what: &str) -> Result<Vec<i64>, RuntimeError> {
        match self.next(what)? {
            CallArg::Int(v) => Ok(vec![*v]),
            CallArg::Tuple(items) => items
                .iter()
                .map(|item| match item {
                    CallArg::Int(v) => Ok(*v),
                    other => Err(self.wrong(what, "a tuple of ints", other)),
                })
                .collect(),
            other => Err(self.wrong(what, "a tuple of ints", other)),
        }
    }

    fn shape(&mut self, what: &str) -> Result<Shape, RuntimeError> {
        let dims = self.ints(what)?;
        dims.iter()
            .map(|&d| usize::try_from(d).map_err(|_| self.invalid(format!("negative dimension {d} in {what}"))))
            .collect::<Result<Vec<_>, _>>()
            .map(Shape::new)
    }

    fn dtype(&mut self, what: &str) -> Result<DType, RuntimeError> {
        match self.next(what)? {
            CallArg::TypeTag(name) => name
                .parse()
                .map_err(|e| self.invalid(format!("{what}: {e}"))),
            other => Err(self.wrong(what, "a tensor type", other)),
        }
    }

    fn slice_index(&mut self, what: &str) -> Result<Vec<SliceIndex>, RuntimeError> {
        let arg = self.next(what)?;
        let items = match arg {
            CallArg::Tuple(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        items
            .iter()
            .map(|item| match item {
                CallArg::Int(v) => Ok(SliceIndex::Index(*v)),
                CallArg::Slice { start, stop, step } => Ok(SliceIndex::Range {
                    start: *start,
                    stop: *stop,
                    step: *step,
                }),
                CallArg::Ellipsis => Ok(SliceIndex::Ellipsis),
                CallArg::Null => Ok(SliceIndex::NewAxis),
                other => Err(self.wrong(what, "an index expression", other)),
            })
            .collect()
    }

    fn finish(self) -> Result<(), RuntimeError> {
        if self.pos < self.args.len() {
            return Err(self.invalid(format!(
                "expected {} arguments, got {}",
                self.pos,
                self.args.len()
            )));
        }
        Ok(())
    }
}

/// Invokes `op` on `backend` with resolved `args` and returns the handle to
/// register as the op's output. In-place ops return their first argument.
pub fn dispatch<B: Backend>(
    backend: &B,
    op: OpCode,
    args: &[CallArg<B::Tensor>],
) -> Result<B::Tensor, RuntimeError> {
    let mut r = ArgReader::new(op, args);
    let backend_err = |source| RuntimeError::Backend {
        op: op.as_str().to_string(),
        source,
    };

    let result = match op {
        OpCode::HostToDevice | OpCode::DeviceToHost => {
            return Err(r.invalid("transfers are not dispatched through the op table"));
        }
        OpCode::Empty | OpCode::Zeros => {
            let shape = r.shape("shape")?;
            let dtype = r.dtype("dtype")?;
            r.finish()?;
            if op == OpCode::Empty {
                backend.empty(&shape, dtype)
            } else {
                backend.zeros(&shape, dtype)
            }
        }
        OpCode::ModOp(kind, form) => {
            let (b_tensor, p_tensor) = form.tensors();
            let a = r.tensor("a")?;
            let b = r.operand(b_tensor, "b")?;
            let p = r.operand(p_tensor, "p")?;
            let out = r.tensor("out")?;
            r.finish()?;
            backend.modop(kind, a, b, p, out)
        }
        OpCode::ModNeg { tensor_p } => {
            let a = r.tensor("a")?;
            let p = r.operand(tensor_p, "p")?;
            let out = r.tensor("out")?;
            r.finish()?;
            backend.modneg(a, p, out)
        }
        OpCode::AxisModSum => {
            let a = r.tensor("a")?;
            let axis = r.int("axis")?;
            let p = r.tensor("p")?;
            let out = r.tensor("out")?;
            r.finish()?;
            backend.axis_modsum(a, axis, p, out)
        }
        OpCode::Ntt => {
            let a = r.tensor("a")?;
            let perm = r.tensor("perm")?;
            let perm_pairs = r.optional_tensor("perm_pairs")?;
            let p = r.tensor("p")?;
            let twiddles = r.tensor("twiddles")?;
            let out = r.tensor("out")?;
            let tile = r.flag("tile")?;
            let skip_perm = r.flag("skip_perm")?;
            r.finish()?;
            let tables = NttArgs {
                perm,
                perm_pairs,
                p,
                twiddles,
                skip_perm,
            };
            backend.ntt(a, tables, out, tile)
        }
        OpCode::Intt => {
            let a = r.tensor("a")?;
            let perm = r.tensor("perm")?;
            let perm_pairs = r.optional_tensor("perm_pairs")?;
            let p = r.tensor("p")?;
            let twiddles = r.tensor("inv_twiddles")?;
            let m_inv = r.tensor("m_inv")?;
            let out = r.tensor("out")?;
            let skip_perm = r.flag("skip_perm")?;
            r.finish()?;
            let tables = NttArgs {
                perm,
                perm_pairs,
                p,
                twiddles,
                skip_perm,
            };
            backend.intt(a, tables, m_inv, out)
        }
        OpCode::ModMulAxisSum => {
            let a = r.tensor("a")?;
            let b = r.tensor("b")?;
            let p = r.tensor("p")?;
            let axis = r.int("axis")?;
            let out = r.tensor("out")?;
            r.finish()?;
            backend.modmul_axis_sum(a, b, p, axis, out)
        }
        OpCode::TakeAlongAxis => {
            let a = r.tensor("a")?;
            let indices = r.tensor("indices")?;
            let axis = r.int("axis")?;
            let out = r.tensor("out")?;
            r.finish()?;
            backend.take_along_axis(a, indices, axis, out)
        }
        OpCode::ApplyGDecomp => {
            let a = r.tensor("a")?;
            let g_exp = r.int("g_exp")?;
            let base_bits = r.int("base_bits")?;
            let out = r.tensor("out")?;
            r.finish()?;
            backend.apply_g_decomp(a, g_exp, base_bits, out)
        }
        OpCode::Abs => {
            let a = r.tensor("a")?;
            let out = r.tensor("out")?;
            r.finish()?;
            backend.abs(a, out)
        }
        OpCode::Permute => {
            let a = r.tensor("a")?;
            let perms = r.tensor("perms")?;
            let elementwise_axis = r.int("elementwise_axis")?;
            let perm_axis = r.int("perm_axis")?;
            let out = r.tensor("out")?;
            r.finish()?;
            backend.permute(a, perms, elementwise_axis, perm_axis, out)
        }
        OpCode::SetConstVal => {
            let a = r.tensor("a")?;
            let value = r.int("value")?;
            r.finish()?;
            backend.set_const_val(a, value).map(|()| a.clone())
        }
        OpCode::MoveAxis => {
            let a = r.tensor("a")?;
            let source = r.int("source")?;
            let destination = r.int("destination")?;
            r.finish()?;
            backend.moveaxis(a, source, destination)
        }
        OpCode::PadSingleAxis => {
            let a = r.tensor("a")?;
            let pad = r.int("pad")?;
            let axis = r.int("axis")?;
            let out = r.tensor("out")?;
            r.finish()?;
            backend.pad_single_axis(a, pad, axis, out)
        }
        OpCode::Expand => {
            let a = r.tensor("a")?;
            let repeat = r.int("repeat")?;
            let axis = r.int("axis")?;
            r.finish()?;
            backend.expand(a, repeat, axis)
        }
        OpCode::Contiguous => {
            let a = r.tensor("a")?;
            r.finish()?;
            backend.contiguous(a)
        }
        OpCode::GetSlice => {
            let a = r.tensor("a")?;
            let index = r.slice_index("index")?;
            r.finish()?;
            backend.get_slice(a, &index)
        }
        OpCode::NewReference => {
            let a = r.tensor("a")?;
            r.finish()?;
            backend.new_reference(a)
        }
        OpCode::Flatten => {
            let a = r.tensor("a")?;
            let start = r.int_or("start", 0)?;
            let end = r.int_or("end", -1)?;
            r.finish()?;
            backend.flatten(a, start, end)
        }
        OpCode::Squeeze => {
            let a = r.tensor("a")?;
            let axis = r.int("axis")?;
            r.finish()?;
            backend.squeeze(a, axis)
        }
        OpCode::Unsqueeze => {
            let a = r.tensor("a")?;
            let axis = r.int("axis")?;
            r.finish()?;
            backend.unsqueeze(a, axis)
        }
        OpCode::Reshape => {
            let a = r.tensor("a")?;
            let shape = r.ints("shape")?;
            r.finish()?;
            backend.reshape(a, &shape).map(|()| a.clone())
        }
    };
    result.map_err(backend_err)
}
