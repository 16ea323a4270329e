// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element data types.

use std::fmt;
use std::str::FromStr;

use crate::TensorError;

/// Enumerates the element types a tensor can hold.
///
/// Device storage widens every element to 64 bits; the dtype decides how the
/// bits are interpreted and how results are narrowed on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit IEEE 754 floating point.
    Float64,
}

impl DType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::Int32 => 4,
            DType::Int64 | DType::Float64 => 8,
        }
    }

    /// Returns the canonical short name (`int64`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Float64 => "float64",
        }
    }

    /// Returns the fully-qualified name used in device tensor references.
    pub fn qualified_name(self) -> String {
        format!("torch.{}", self.as_str())
    }

    /// Returns the NPY `descr` string for this dtype.
    pub fn npy_descr(self) -> &'static str {
        match self {
            DType::Int32 => "<i4",
            DType::Int64 => "<i8",
            DType::Float64 => "<f8",
        }
    }

    /// Parses an NPY `descr` string.
    pub fn from_npy_descr(descr: &str) -> Result<Self, TensorError> {
        match descr {
            "<i4" | "=i4" => Ok(DType::Int32),
            "<i8" | "=i8" => Ok(DType::Int64),
            "<f8" | "=f8" => Ok(DType::Float64),
            other => Err(TensorError::Npy(format!("unsupported descr '{other}'"))),
        }
    }

    /// Returns `true` for integer element types.
    pub fn is_integer(self) -> bool {
        matches!(self, DType::Int32 | DType::Int64)
    }

    /// Narrows a widened integer to this dtype's range (two's complement wrap).
    pub fn wrap(self, value: i64) -> i64 {
        match self {
            DType::Int32 => value as i32 as i64,
            _ => value,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `int64`, `torch.int64`, and the aliases `int`, `long`, `double`.
impl FromStr for DType {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("torch.").unwrap_or(s);
        match name {
            "int32" | "int" => Ok(DType::Int32),
            "int64" | "long" => Ok(DType::Int64),
            "float64" | "double" => Ok(DType::Float64),
            _ => Err(TensorError::UnknownDType(s.to_string())),
        }
    }
}
