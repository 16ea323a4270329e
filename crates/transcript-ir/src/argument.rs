// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device-op arguments.
//!
//! An [`Argument`] is a closed tagged union: every variant the recorder can
//! emit has a case here, so consumers match exhaustively and the compiler
//! flags any variant a new consumer forgets. Values the decoder cannot
//! interpret travel as [`Argument::Opaque`] and only fail when executed.

use std::fmt;

use tensor_core::{DType, HostTensor};

use crate::WireValue;

/// The kind of an [`Argument`], as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArgumentTag {
    HostTensor,
    DeviceTensor,
    Shape,
    Int,
    None,
    TensorType,
    Slice,
    Ellipsis,
}

impl ArgumentTag {
    /// Every tag, in wire order.
    pub const ALL: [ArgumentTag; 8] = [
        Self::HostTensor,
        Self::DeviceTensor,
        Self::Shape,
        Self::Int,
        Self::None,
        Self::TensorType,
        Self::Slice,
        Self::Ellipsis,
    ];

    /// The wire name (`"DEVICE_TENSOR"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostTensor => "HOST_TENSOR",
            Self::DeviceTensor => "DEVICE_TENSOR",
            Self::Shape => "SHAPE",
            Self::Int => "INT",
            Self::None => "NONE",
            Self::TensorType => "TENSOR_TYPE",
            Self::Slice => "SLICE",
            Self::Ellipsis => "ELLIPSIS",
        }
    }

    /// Parses a wire name; `None` for anything outside the known set.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for ArgumentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a device-resident tensor by symbolic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceTensorRef {
    pub dtype: DType,
    pub name: String,
}

impl DeviceTensorRef {
    pub fn new(name: impl Into<String>, dtype: DType) -> Self {
        Self {
            dtype,
            name: name.into(),
        }
    }
}

/// Host representation a [`HostTensorArg`] was recorded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorFlavor {
    Numpy,
    Torch,
}

impl TensorFlavor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Numpy => "numpy",
            Self::Torch => "torch",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "numpy" => Some(Self::Numpy),
            "torch" => Some(Self::Torch),
            _ => None,
        }
    }
}

/// Host tensor embedded in a transcript, together with its flavor.
#[derive(Debug, Clone, PartialEq)]
pub struct HostTensorArg {
    pub flavor: TensorFlavor,
    pub tensor: HostTensor,
}

impl HostTensorArg {
    pub fn numpy(tensor: HostTensor) -> Self {
        Self {
            flavor: TensorFlavor::Numpy,
            tensor,
        }
    }
}

/// An argument value kept as raw wire data.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueValue {
    /// Declared argument kind; `None` for a bare tuple entry.
    pub tag: Option<ArgumentTag>,
    pub value: WireValue,
}

impl OpaqueValue {
    /// The wire discriminator of the value, or `"untyped"`.
    pub fn type_name(&self) -> &str {
        match &self.value {
            WireValue::Record { type_name, .. } => type_name,
            _ => "untyped",
        }
    }
}

/// A single device-op argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// A live tensor in the memory table.
    DeviceTensor(DeviceTensorRef),
    /// Host data embedded in the transcript.
    HostTensor(HostTensorArg),
    /// Ordered tuple of nested arguments.
    Shape(Vec<Argument>),
    Int(i64),
    None,
    /// Opaque element-type tag (`"int64"`, `"torch.float64"`, ...).
    TensorType(String),
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    Ellipsis,
    /// A value with an unrecognised discriminator, or a tuple entry that is
    /// not an argument record.
    Opaque(OpaqueValue),
}

impl Argument {
    /// Convenience constructor for a device tensor reference.
    pub fn device(name: impl Into<String>, dtype: DType) -> Self {
        Self::DeviceTensor(DeviceTensorRef::new(name, dtype))
    }

    /// Convenience constructor for a tuple of integers.
    pub fn shape(dims: &[i64]) -> Self {
        Self::Shape(dims.iter().map(|&d| Self::Int(d)).collect())
    }

    /// The wire tag; `None` only for a bare opaque tuple entry.
    pub fn tag(&self) -> Option<ArgumentTag> {
        Some(match self {
            Self::DeviceTensor(_) => ArgumentTag::DeviceTensor,
            Self::HostTensor(_) => ArgumentTag::HostTensor,
            Self::Shape(_) => ArgumentTag::Shape,
            Self::Int(_) => ArgumentTag::Int,
            Self::None => ArgumentTag::None,
            Self::TensorType(_) => ArgumentTag::TensorType,
            Self::Slice { .. } => ArgumentTag::Slice,
            Self::Ellipsis => ArgumentTag::Ellipsis,
            Self::Opaque(o) => return o.tag,
        })
    }

    /// The referenced tensor, if this is a device tensor reference.
    pub fn as_device_ref(&self) -> Option<&DeviceTensorRef> {
        match self {
            Self::DeviceTensor(r) => Some(r),
            _ => None,
        }
    }

    /// Every device tensor name this argument reads, including nested tuples.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::DeviceTensor(r) => out.push(&r.name),
            Self::Shape(items) => items.iter().for_each(|a| a.collect_names(out)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names_roundtrip() {
        for tag in ArgumentTag::ALL {
            assert_eq!(ArgumentTag::from_wire(tag.as_str()), Some(tag));
        }
        assert_eq!(ArgumentTag::from_wire("COMPLEX"), None);
        assert_eq!(ArgumentTag::from_wire("int"), None);
    }

    #[test]
    fn test_referenced_names_nested() {
        let arg = Argument::Shape(vec![
            Argument::device("a", DType::Int64),
            Argument::Int(3),
            Argument::Shape(vec![Argument::device("b", DType::Int32)]),
        ]);
        assert_eq!(arg.referenced_names(), vec!["a", "b"]);
        assert_eq!(arg.tag(), Some(ArgumentTag::Shape));
    }

    #[test]
    fn test_flavor() {
        assert_eq!(TensorFlavor::from_wire("torch"), Some(TensorFlavor::Torch));
        assert_eq!(TensorFlavor::from_wire("pickle"), None);
        assert_eq!(TensorFlavor::Numpy.as_str(), "numpy");
    }

    #[test]
    fn test_opaque_tag_and_type_name() {
        let record = Argument::Opaque(OpaqueValue {
            tag: Some(ArgumentTag::Int),
            value: WireValue::Record {
                type_name: "SomeFutureType".into(),
                fields: Default::default(),
            },
        });
        assert_eq!(record.tag(), Some(ArgumentTag::Int));
        let bare = OpaqueValue {
            tag: None,
            value: WireValue::Str("x".into()),
        };
        assert_eq!(bare.type_name(), "untyped");
        assert_eq!(Argument::Opaque(bare).tag(), None);
        match record {
            Argument::Opaque(o) => assert_eq!(o.type_name(), "SomeFutureType"),
            _ => unreachable!(),
        }
    }
}
