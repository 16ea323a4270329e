// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Transcript instructions.

use std::fmt;

use crate::{Argument, DeviceTensorRef};

/// The kind of an [`Instruction`], as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstructionTag {
    DeviceOp,
    SegmentStart,
    SegmentEnd,
    FreeDeviceTensor,
}

impl InstructionTag {
    pub const ALL: [InstructionTag; 4] = [
        Self::DeviceOp,
        Self::SegmentStart,
        Self::SegmentEnd,
        Self::FreeDeviceTensor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceOp => "DEVICE_OP",
            Self::SegmentStart => "SEGMENT_START",
            Self::SegmentEnd => "SEGMENT_END",
            Self::FreeDeviceTensor => "FREE_DEVICE_TENSOR",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for InstructionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named backend call with positional arguments and one declared output.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceOp {
    /// Backend operation name, e.g. `"_modmul_ttc"` or `"host_to_device"`.
    pub name: String,
    pub args: Vec<Argument>,
    /// A device tensor reference naming the result, or for
    /// `device_to_host`, the expected host value.
    pub out: Argument,
}

impl DeviceOp {
    pub fn new(name: impl Into<String>, args: Vec<Argument>, out: Argument) -> Self {
        Self {
            name: name.into(),
            args,
            out,
        }
    }

    /// The output reference, if `out` is one.
    pub fn out_ref(&self) -> Option<&DeviceTensorRef> {
        self.out.as_device_ref()
    }
}

/// One step of a transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Diagnostic marker opening a labelled region. Never validated for nesting.
    SegmentStart { label: String },
    /// Diagnostic marker closing the innermost region.
    SegmentEnd,
    DeviceOp(DeviceOp),
    /// Releases a symbolic name from the memory table.
    FreeDeviceTensor { name: String },
}

impl Instruction {
    pub fn tag(&self) -> InstructionTag {
        match self {
            Self::SegmentStart { .. } => InstructionTag::SegmentStart,
            Self::SegmentEnd => InstructionTag::SegmentEnd,
            Self::DeviceOp(_) => InstructionTag::DeviceOp,
            Self::FreeDeviceTensor { .. } => InstructionTag::FreeDeviceTensor,
        }
    }

    pub fn segment_start(label: impl Into<String>) -> Self {
        Self::SegmentStart {
            label: label.into(),
        }
    }

    pub fn free(name: impl Into<String>) -> Self {
        Self::FreeDeviceTensor { name: name.into() }
    }

    pub fn op(name: impl Into<String>, args: Vec<Argument>, out: Argument) -> Self {
        Self::DeviceOp(DeviceOp::new(name, args, out))
    }
}
