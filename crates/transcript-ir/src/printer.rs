// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Human-readable transcript listing.
//!
//! ```text
//! ======================================================================
//!   Number of operations: 2
//! ======================================================================
//! i=0 instruction name: _modneg_tc
//!     args:
//!       (0) DeviceTensor: inf_name[a] dtype[torch.int64]
//!       (1) 17
//!     out:
//!       DeviceTensor: inf_name[b] dtype[torch.int64]
//! ======================================================================
//! i=1 Free Device Tensor: inf_name[a]
//! ======================================================================
//! Number of operations: 2
//! ```

use std::fmt;

use crate::{Argument, DeviceOp, Instruction, Transcript};

const RULE: &str = "======================================================================";

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceTensor(r) => write!(
                f,
                "DeviceTensor: inf_name[{}] dtype[{}]",
                r.name,
                r.dtype.qualified_name()
            ),
            Self::HostTensor(h) => write!(
                f,
                "HostTensor: shape{} dtype[{}]",
                h.tensor.shape(),
                h.tensor.dtype()
            ),
            Self::Shape(items) => {
                f.write_str("Shape: {")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
            Self::Int(v) => write!(f, "{v}"),
            Self::None => f.write_str("None"),
            Self::TensorType(name) => f.write_str(name),
            Self::Slice { start, stop, step } => write!(
                f,
                "slice({}:{}:{})",
                bound(*start),
                bound(*stop),
                bound(*step)
            ),
            Self::Ellipsis => f.write_str("..."),
            Self::Opaque(o) => write!(f, "Opaque: {}", o.type_name()),
        }
    }
}

fn bound(v: Option<i64>) -> String {
    v.map_or_else(|| "None".to_string(), |v| v.to_string())
}

impl fmt::Display for DeviceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "instruction name: {}", self.name)?;
        writeln!(f, "    args:")?;
        for (i, arg) in self.args.iter().enumerate() {
            writeln!(f, "      ({i}) {arg}")?;
        }
        writeln!(f, "    out:")?;
        write!(f, "      {}", self.out)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceOp(op) => write!(f, "{op}"),
            Self::FreeDeviceTensor { name } => write!(f, "Free Device Tensor: inf_name[{name}]"),
            Self::SegmentStart { label } => write!(f, "Segment Start: {label}"),
            Self::SegmentEnd => f.write_str("Segment End"),
        }
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "  Number of operations: {}", self.len())?;
        writeln!(f, "{RULE}")?;
        for (i, instruction) in self.iter().enumerate() {
            writeln!(f, "i={i} {instruction}")?;
            writeln!(f, "{RULE}")?;
        }
        write!(f, "Number of operations: {}", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HostTensorArg;
    use tensor_core::{DType, HostTensor, Shape};

    #[test]
    fn test_argument_forms() {
        assert_eq!(Argument::Int(-3).to_string(), "-3");
        assert_eq!(Argument::None.to_string(), "None");
        assert_eq!(Argument::Ellipsis.to_string(), "...");
        assert_eq!(
            Argument::Slice { start: Some(1), stop: None, step: Some(2) }.to_string(),
            "slice(1:None:2)"
        );
        assert_eq!(Argument::shape(&[2, 3]).to_string(), "Shape: {2, 3}");
        assert_eq!(
            Argument::device("x", DType::Int32).to_string(),
            "DeviceTensor: inf_name[x] dtype[torch.int32]"
        );
    }

    #[test]
    fn test_host_tensor_form() {
        let host = HostTensor::zeros(Shape::new(vec![2, 2]), DType::Float64);
        let arg = Argument::HostTensor(HostTensorArg::numpy(host));
        assert_eq!(arg.to_string(), "HostTensor: shape[2, 2] dtype[float64]");
    }

    #[test]
    fn test_listing() {
        let t = Transcript::new(vec![
            Instruction::segment_start("enc"),
            Instruction::op(
                "abs",
                vec![Argument::device("a", DType::Int64)],
                Argument::device("b", DType::Int64),
            ),
            Instruction::free("a"),
            Instruction::SegmentEnd,
        ]);
        let text = t.to_string();
        assert!(text.starts_with(RULE));
        assert!(text.contains("i=0 Segment Start: enc"));
        assert!(text.contains("i=1 instruction name: abs\n    args:\n      (0) DeviceTensor: inf_name[a]"));
        assert!(text.contains("i=2 Free Device Tensor: inf_name[a]"));
        assert!(text.contains("i=3 Segment End"));
        assert!(text.ends_with("Number of operations: 4"));
    }
}
