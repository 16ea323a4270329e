// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The closed set of device operations a transcript may name.

use std::fmt;

use tensor_core::ops::ModularOp;

/// Which operands of a two-operand modular op are tensors (`t`) or
/// constants (`c`), in `b`, `p` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandForm {
    /// `_ttt`: tensor `b`, tensor `p`.
    TensorTensor,
    /// `_ttc`: tensor `b`, constant `p`.
    TensorConst,
    /// `_tct`: constant `b`, tensor `p`.
    ConstTensor,
    /// `_tcc`: constant `b`, constant `p`.
    ConstConst,
}

impl OperandForm {
    fn suffix(self) -> &'static str {
        match self {
            Self::TensorTensor => "ttt",
            Self::TensorConst => "ttc",
            Self::ConstTensor => "tct",
            Self::ConstConst => "tcc",
        }
    }

    /// `(b is a tensor, p is a tensor)`.
    pub fn tensors(self) -> (bool, bool) {
        match self {
            Self::TensorTensor => (true, true),
            Self::TensorConst => (true, false),
            Self::ConstTensor => (false, true),
            Self::ConstConst => (false, false),
        }
    }
}

/// A device operation.
///
/// Transfers are listed here so the opcode table is complete, but the
/// interpreter handles them before generic dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    HostToDevice,
    DeviceToHost,
    Empty,
    Zeros,
    ModOp(ModularOp, OperandForm),
    /// `modneg_tt` (tensor `p`) or `modneg_tc` (constant `p`).
    ModNeg { tensor_p: bool },
    AxisModSum,
    Ntt,
    Intt,
    ModMulAxisSum,
    TakeAlongAxis,
    ApplyGDecomp,
    Abs,
    Permute,
    SetConstVal,
    MoveAxis,
    PadSingleAxis,
    Expand,
    Contiguous,
    GetSlice,
    NewReference,
    Flatten,
    Squeeze,
    Unsqueeze,
    Reshape,
}

const FORMS: [OperandForm; 4] = [
    OperandForm::TensorTensor,
    OperandForm::TensorConst,
    OperandForm::ConstTensor,
    OperandForm::ConstConst,
];

impl OpCode {
    /// Every opcode, in table order.
    pub fn all() -> Vec<OpCode> {
        let mut all = vec![Self::HostToDevice, Self::DeviceToHost, Self::Empty, Self::Zeros];
        for op in [ModularOp::Mul, ModularOp::Sum] {
            all.extend(FORMS.iter().map(|&form| Self::ModOp(op, form)));
        }
        all.extend([
            Self::ModNeg { tensor_p: true },
            Self::ModNeg { tensor_p: false },
            Self::AxisModSum,
            Self::Ntt,
            Self::Intt,
            Self::ModMulAxisSum,
            Self::TakeAlongAxis,
            Self::ApplyGDecomp,
            Self::Abs,
            Self::Permute,
            Self::SetConstVal,
            Self::MoveAxis,
            Self::PadSingleAxis,
            Self::Expand,
            Self::Contiguous,
            Self::GetSlice,
            Self::NewReference,
            Self::Flatten,
            Self::Squeeze,
            Self::Unsqueeze,
            Self::Reshape,
        ]);
        all
    }

    /// Looks up a transcript op name. A single leading underscore is ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix('_').unwrap_or(name);
        Some(match name {
            "host_to_device" => Self::HostToDevice,
            "device_to_host" => Self::DeviceToHost,
            "empty" => Self::Empty,
            "zeros" => Self::Zeros,
            "modneg_tt" => Self::ModNeg { tensor_p: true },
            "modneg_tc" => Self::ModNeg { tensor_p: false },
            "axis_modsum" => Self::AxisModSum,
            "ntt" => Self::Ntt,
            "intt" => Self::Intt,
            "modmul_axis_sum" => Self::ModMulAxisSum,
            "take_along_axis" => Self::TakeAlongAxis,
            "apply_g_decomp" => Self::ApplyGDecomp,
            "abs" => Self::Abs,
            "permute" => Self::Permute,
            "set_const_val" => Self::SetConstVal,
            "moveaxis" => Self::MoveAxis,
            "pad_single_axis" => Self::PadSingleAxis,
            "expand" => Self::Expand,
            "contiguous" => Self::Contiguous,
            "get_slice" => Self::GetSlice,
            "new_reference" => Self::NewReference,
            "flatten" => Self::Flatten,
            "squeeze" => Self::Squeeze,
            "unsqueeze" => Self::Unsqueeze,
            "reshape" => Self::Reshape,
            other => return Self::parse_modop(other),
        })
    }

    fn parse_modop(name: &str) -> Option<Self> {
        let (op, suffix) = name.split_once('_')?;
        let op = match op {
            "modmul" => ModularOp::Mul,
            "modsum" => ModularOp::Sum,
            _ => return None,
        };
        let form = FORMS.into_iter().find(|f| f.suffix() == suffix)?;
        Some(Self::ModOp(op, form))
    }

    /// Canonical name, without a leading underscore.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostToDevice => "host_to_device",
            Self::DeviceToHost => "device_to_host",
            Self::Empty => "empty",
            Self::Zeros => "zeros",
            Self::ModOp(ModularOp::Mul, form) => match form {
                OperandForm::TensorTensor => "modmul_ttt",
                OperandForm::TensorConst => "modmul_ttc",
                OperandForm::ConstTensor => "modmul_tct",
                OperandForm::ConstConst => "modmul_tcc",
            },
            Self::ModOp(ModularOp::Sum, form) => match form {
                OperandForm::TensorTensor => "modsum_ttt",
                OperandForm::TensorConst => "modsum_ttc",
                OperandForm::ConstTensor => "modsum_tct",
                OperandForm::ConstConst => "modsum_tcc",
            },
            Self::ModNeg { tensor_p: true } => "modneg_tt",
            Self::ModNeg { tensor_p: false } => "modneg_tc",
            Self::AxisModSum => "axis_modsum",
            Self::Ntt => "ntt",
            Self::Intt => "intt",
            Self::ModMulAxisSum => "modmul_axis_sum",
            Self::TakeAlongAxis => "take_along_axis",
            Self::ApplyGDecomp => "apply_g_decomp",
            Self::Abs => "abs",
            Self::Permute => "permute",
            Self::SetConstVal => "set_const_val",
            Self::MoveAxis => "moveaxis",
            Self::PadSingleAxis => "pad_single_axis",
            Self::Expand => "expand",
            Self::Contiguous => "contiguous",
            Self::GetSlice => "get_slice",
            Self::NewReference => "new_reference",
            Self::Flatten => "flatten",
            Self::Squeeze => "squeeze",
            Self::Unsqueeze => "unsqueeze",
            Self::Reshape => "reshape",
        }
    }

    /// `true` for ops that mutate their first argument and return nothing.
    pub fn is_in_place(self) -> bool {
        matches!(self, Self::Reshape | Self::SetConstVal)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
