// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Argument marshalling: transcript [`Argument`]s to backend call values.

use memory_table::MemoryTable;
use transcript_ir::{Argument, ArgumentTag};

use crate::RuntimeError;

/// A resolved argument, ready to hand to a backend method.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg<T> {
    /// A live tensor handle taken from the memory table.
    Tensor(T),
    /// An ordered tuple of resolved arguments.
    Tuple(Vec<CallArg<T>>),
    Int(i64),
    Null,
    /// Opaque element-type tag, passed through untouched.
    TypeTag(String),
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    /// "All remaining axes".
    Ellipsis,
}

impl<T> CallArg<T> {
    /// Short description of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tensor(_) => "tensor",
            Self::Tuple(_) => "tuple",
            Self::Int(_) => "int",
            Self::Null => "none",
            Self::TypeTag(_) => "type tag",
            Self::Slice { .. } => "slice",
            Self::Ellipsis => "ellipsis",
        }
    }
}

/// Resolves one argument of op `op` against the memory table.
///
/// Device references are looked up by name and cloned, so the call holds its
/// own claim on the tensor. Host tensors are never valid device-op arguments,
/// and values the decoder kept opaque cannot be passed to a backend.
pub fn resolve<T: Clone>(
    op: &str,
    argument: &Argument,
    table: &MemoryTable<T>,
) -> Result<CallArg<T>, RuntimeError> {
    Ok(match argument {
        Argument::DeviceTensor(r) => CallArg::Tensor(table.lookup(&r.name)?.clone()),
        Argument::HostTensor(_) => {
            return Err(RuntimeError::UnsupportedArgument {
                op: op.to_string(),
                tag: ArgumentTag::HostTensor,
            })
        }
        Argument::Shape(items) => CallArg::Tuple(
            items
                .iter()
                .map(|item| resolve(op, item, table))
                .collect::<Result<_, _>>()?,
        ),
        Argument::Int(v) => CallArg::Int(*v),
        Argument::None => CallArg::Null,
        Argument::TensorType(name) => CallArg::TypeTag(name.clone()),
        Argument::Slice { start, stop, step } => CallArg::Slice {
            start: *start,
            stop: *stop,
            step: *step,
        },
        Argument::Ellipsis => CallArg::Ellipsis,
        Argument::Opaque(o) => {
            return Err(RuntimeError::invalid(
                op,
                format!("cannot interpret value of type '{}'", o.type_name()),
            ))
        }
    })
}

/// Resolves every argument of an op, in order.
pub fn resolve_all<T: Clone>(
    op: &str,
    arguments: &[Argument],
    table: &MemoryTable<T>,
) -> Result<Vec<CallArg<T>>, RuntimeError> {
    arguments.iter().map(|a| resolve(op, a, table)).collect()
}
