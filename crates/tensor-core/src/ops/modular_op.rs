// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise and reducing modular arithmetic.

use super::{broadcast_values, require_integer, Operand};
use crate::{DeviceTensor, Shape, TensorError};

/// The binary combination applied before reduction modulo `p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModularOp {
    /// `(a * b) mod p`
    Mul,
    /// `(a + b) mod p`
    Sum,
}

impl ModularOp {
    fn name(self) -> &'static str {
        match self {
            ModularOp::Mul => "modmul",
            ModularOp::Sum => "modsum",
        }
    }

    fn combine(self, a: i64, b: i64) -> i128 {
        match self {
            ModularOp::Mul => a as i128 * b as i128,
            ModularOp::Sum => a as i128 + b as i128,
        }
    }
}

/// Reduces a wide value into `[0, p)`.
pub(crate) fn reduce(value: i128, p: i64) -> i64 {
    let p = p as i128;
    let rem = value % p;
    (if rem < 0 { rem + p } else { rem }) as i64
}

/// Computes `out = (a OP b) mod p` element-wise.
///
/// `a` and a tensor `b` broadcast to `out`'s shape. A tensor `p` must be
/// one-dimensional with the size of `out`'s last axis (one modulus per
/// column). Products are formed in 128-bit precision and negative remainders
/// are shifted into `[0, p)`.
///
/// # Errors
/// [`TensorError::ShapeMismatch`] for non-broadcastable operands,
/// [`TensorError::InvalidArgument`] for a non-positive modulus, and
/// [`TensorError::UnsupportedDType`] for floating-point tensors.
pub fn modop(
    op: ModularOp,
    a: &DeviceTensor,
    b: Operand<'_>,
    p: Operand<'_>,
    out: &DeviceTensor,
) -> Result<(), TensorError> {
    let name = op.name();
    require_integer(name, a)?;
    require_integer(name, out)?;
    let shape = out.shape();
    let total = shape.num_elements();

    let a_vals = broadcast_values(name, a, &shape)?;
    let b_vals = operand_values(name, b, &shape, false)?;
    let p_vals = operand_values(name, p, &shape, true)?;

    let mut result = Vec::with_capacity(total);
    for i in 0..total {
        let p = modulus_at(name, &p_vals, i)?;
        result.push(reduce(op.combine(a_vals[i], at(&b_vals, i)), p));
    }
    out.write_values(&result)
}

/// Computes `out = (-a) mod p` element-wise.
///
/// A tensor `p` is read element by element and must have exactly the shape
/// of `a` and `out`; no broadcasting applies.
pub fn modneg(a: &DeviceTensor, p: Operand<'_>, out: &DeviceTensor) -> Result<(), TensorError> {
    const OP: &str = "modneg";
    require_integer(OP, a)?;
    require_integer(OP, out)?;
    let shape = out.shape();
    if a.shape() != shape {
        return Err(TensorError::ShapeMismatch {
            op: OP,
            lhs: a.shape(),
            rhs: shape,
        });
    }
    let p_vals = match p {
        Operand::Scalar(v) => Values::Scalar(v),
        Operand::Tensor(t) => {
            require_integer(OP, t)?;
            if t.shape() != shape {
                return Err(TensorError::ShapeMismatch {
                    op: OP,
                    lhs: t.shape(),
                    rhs: shape,
                });
            }
            Values::Elements(t.values())
        }
    };
    let a_vals = a.values();
    let mut result = Vec::with_capacity(a_vals.len());
    for (i, &v) in a_vals.iter().enumerate() {
        let p = modulus_at(OP, &p_vals, i)?;
        result.push(reduce(-(v as i128), p));
    }
    out.write_values(&result)
}

/// Sums `a` along `axis` modulo the per-column moduli `p` (shape `[k]`,
/// where `k` is `a`'s last dimension). `out` has `a`'s shape with `axis`
/// removed; the reduced axis may not be the last one.
pub fn axis_modsum(
    a: &DeviceTensor,
    axis: i64,
    p: &DeviceTensor,
    out: &DeviceTensor,
) -> Result<(), TensorError> {
    const OP: &str = "axis_modsum";
    require_integer(OP, a)?;
    let shape = a.shape();
    let values = a.values();
    reduce_axis(OP, &shape, &values, axis, p, out)
}

/// Computes `sum_axis((a * b) mod p) mod p`.
///
/// `a` and `b` broadcast against each other; `p` and `out` follow the rules
/// of [`axis_modsum`] applied to the broadcast product.
pub fn modmul_axis_sum(
    a: &DeviceTensor,
    b: &DeviceTensor,
    p: &DeviceTensor,
    axis: i64,
    out: &DeviceTensor,
) -> Result<(), TensorError> {
    const OP: &str = "modmul_axis_sum";
    require_integer(OP, a)?;
    require_integer(OP, b)?;
    let shape = a.shape().broadcast(&b.shape(), OP)?;
    let a_vals = broadcast_values(OP, a, &shape)?;
    let b_vals = broadcast_values(OP, b, &shape)?;
    let moduli = column_moduli(OP, p, &shape)?;
    let k = moduli.len();
    let products: Vec<i64> = a_vals
        .iter()
        .zip(&b_vals)
        .enumerate()
        .map(|(i, (&x, &y))| reduce(x as i128 * y as i128, moduli[i % k]))
        .collect();
    reduce_axis(OP, &shape, &products, axis, p, out)
}

fn reduce_axis(
    op: &'static str,
    shape: &Shape,
    values: &[i64],
    axis: i64,
    p: &DeviceTensor,
    out: &DeviceTensor,
) -> Result<(), TensorError> {
    let axis = shape.normalize_axis(op, axis)?;
    if axis + 1 == shape.rank() {
        return Err(TensorError::InvalidArgument {
            op,
            detail: "cannot reduce along the modulus axis".into(),
        });
    }
    let moduli = column_moduli(op, p, shape)?;
    let k = moduli.len();

    let dims = shape.dims();
    let mut reduced_dims = dims.to_vec();
    reduced_dims.remove(axis);
    let reduced = Shape::new(reduced_dims);
    if out.shape() != reduced {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: reduced,
            rhs: out.shape(),
        });
    }

    let outer: usize = dims[..axis].iter().product();
    let span = dims[axis];
    let inner: usize = dims[axis + 1..].iter().product();
    let mut result = vec![0i64; outer * inner];
    for o in 0..outer {
        for i in 0..inner {
            let p = moduli[i % k];
            let mut acc: i128 = 0;
            for s in 0..span {
                acc += values[(o * span + s) * inner + i] as i128;
            }
            result[o * inner + i] = reduce(acc, p);
        }
    }
    out.write_values(&result)
}

/// Reads a `[k]` modulus tensor whose size matches the last axis of `shape`.
fn column_moduli(op: &'static str, p: &DeviceTensor, shape: &Shape) -> Result<Vec<i64>, TensorError> {
    let last = shape.dims().last().copied().unwrap_or(1);
    let p_shape = p.shape();
    if p_shape.rank() != 1 || p_shape.dims()[0] != last {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: p_shape,
            rhs: Shape::vector(last),
        });
    }
    let moduli = p.values();
    if let Some(bad) = moduli.iter().find(|&&m| m <= 0) {
        return Err(TensorError::InvalidArgument {
            op,
            detail: format!("modulus must be positive, got {bad}"),
        });
    }
    Ok(moduli)
}

enum Values {
    Scalar(i64),
    Elements(Vec<i64>),
}

fn at(values: &Values, i: usize) -> i64 {
    match values {
        Values::Scalar(v) => *v,
        Values::Elements(v) => v[i],
    }
}

fn operand_values(
    op: &'static str,
    operand: Operand<'_>,
    shape: &Shape,
    is_modulus: bool,
) -> Result<Values, TensorError> {
    match operand {
        Operand::Scalar(v) => Ok(Values::Scalar(v)),
        Operand::Tensor(t) if is_modulus => {
            let moduli = column_moduli(op, t, shape)?;
            let k = moduli.len().max(1);
            let total = shape.num_elements();
            Ok(Values::Elements((0..total).map(|i| moduli[i % k]).collect()))
        }
        Operand::Tensor(t) => {
            require_integer(op, t)?;
            Ok(Values::Elements(broadcast_values(op, t, shape)?))
        }
    }
}

fn modulus_at(op: &'static str, values: &Values, i: usize) -> Result<i64, TensorError> {
    let p = at(values, i);
    if p <= 0 {
        return Err(TensorError::InvalidArgument {
            op,
            detail: format!("modulus must be positive, got {p}"),
        });
    }
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    fn tensor(dims: Vec<usize>, values: &[i64]) -> DeviceTensor {
        DeviceTensor::from_i64(&Shape::new(dims), values).unwrap()
    }

    #[test]
    fn test_modmul_ttt_broadcasts_b() {
        let a = tensor(vec![2, 2], &[3, 4, 5, 6]);
        let b = tensor(vec![2], &[10, 10]);
        let p = tensor(vec![2], &[7, 11]);
        let out = DeviceTensor::zeros(&Shape::new(vec![2, 2]), DType::Int64);
        modop(ModularOp::Mul, &a, Operand::Tensor(&b), Operand::Tensor(&p), &out).unwrap();
        assert_eq!(out.values(), vec![30 % 7, 40 % 11, 50 % 7, 60 % 11]);
    }

    #[test]
    fn test_modsum_tcc() {
        let a = tensor(vec![3], &[1, 5, 6]);
        let out = DeviceTensor::zeros(&Shape::vector(3), DType::Int64);
        modop(ModularOp::Sum, &a, Operand::Scalar(3), Operand::Scalar(7), &out).unwrap();
        assert_eq!(out.values(), vec![4, 1, 2]);
    }

    #[test]
    fn test_negative_remainder_is_shifted() {
        let a = tensor(vec![2], &[-3, -14]);
        let out = DeviceTensor::zeros(&Shape::vector(2), DType::Int64);
        modop(ModularOp::Sum, &a, Operand::Scalar(0), Operand::Scalar(7), &out).unwrap();
        assert_eq!(out.values(), vec![4, 0]);
    }

    #[test]
    fn test_wide_product_does_not_overflow() {
        let big = (1i64 << 61) - 1;
        let a = tensor(vec![1], &[big - 1]);
        let out = DeviceTensor::zeros(&Shape::vector(1), DType::Int64);
        modop(ModularOp::Mul, &a, Operand::Scalar(big - 1), Operand::Scalar(big), &out).unwrap();
        // (-1)^2 mod p
        assert_eq!(out.values(), vec![1]);
    }

    #[test]
    fn test_output_may_alias_input() {
        let a = tensor(vec![2], &[5, 6]);
        let out = a.clone();
        modop(ModularOp::Mul, &a, Operand::Scalar(2), Operand::Scalar(7), &out).unwrap();
        assert_eq!(a.values(), vec![3, 5]);
    }

    #[test]
    fn test_modulus_shape_checked() {
        let a = tensor(vec![2, 2], &[1, 2, 3, 4]);
        let p = tensor(vec![3], &[7, 7, 7]);
        let out = DeviceTensor::zeros(&Shape::new(vec![2, 2]), DType::Int64);
        let err = modop(ModularOp::Sum, &a, Operand::Scalar(1), Operand::Tensor(&p), &out).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_zero_modulus_rejected() {
        let a = tensor(vec![1], &[1]);
        let out = DeviceTensor::zeros(&Shape::vector(1), DType::Int64);
        let err = modop(ModularOp::Mul, &a, Operand::Scalar(1), Operand::Scalar(0), &out).unwrap_err();
        assert!(matches!(err, TensorError::InvalidArgument { .. }));
    }

    #[test]
    fn test_float_rejected() {
        let a = DeviceTensor::zeros(&Shape::vector(1), DType::Float64);
        let out = DeviceTensor::zeros(&Shape::vector(1), DType::Float64);
        let err = modop(ModularOp::Mul, &a, Operand::Scalar(1), Operand::Scalar(3), &out).unwrap_err();
        assert!(matches!(err, TensorError::UnsupportedDType { .. }));
    }

    #[test]
    fn test_modneg() {
        let a = tensor(vec![3], &[0, 1, 6]);
        let out = DeviceTensor::zeros(&Shape::vector(3), DType::Int64);
        modneg(&a, Operand::Scalar(7), &out).unwrap();
        assert_eq!(out.values(), vec![0, 6, 1]);
    }

    #[test]
    fn test_modneg_elementwise_modulus_tensor() {
        let a = tensor(vec![2, 2], &[1, 2, 3, 4]);
        let p = tensor(vec![2, 2], &[7, 7, 5, 5]);
        let out = DeviceTensor::zeros(&Shape::new(vec![2, 2]), DType::Int64);
        modneg(&a, Operand::Tensor(&p), &out).unwrap();
        assert_eq!(out.values(), vec![6, 5, 2, 1]);
    }

    #[test]
    fn test_modneg_modulus_tensor_does_not_broadcast() {
        let a = tensor(vec![2, 2], &[1, 2, 3, 4]);
        let p = tensor(vec![2], &[7, 5]);
        let out = DeviceTensor::zeros(&Shape::new(vec![2, 2]), DType::Int64);
        let err = modneg(&a, Operand::Tensor(&p), &out).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { .. }));

        let p = tensor(vec![2, 2], &[7, 0, 5, 5]);
        let err = modneg(&a, Operand::Tensor(&p), &out).unwrap_err();
        assert!(matches!(err, TensorError::InvalidArgument { .. }));
    }

    #[test]
    fn test_axis_modsum() {
        // [m=2, s=3, k=2]
        let a = tensor(vec![2, 3, 2], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        let p = tensor(vec![2], &[5, 7]);
        let out = DeviceTensor::zeros(&Shape::new(vec![2, 2]), DType::Int64);
        axis_modsum(&a, 1, &p, &out).unwrap();
        assert_eq!(out.values(), vec![9 % 5, 12 % 7, 27 % 5, 30 % 7]);
    }

    #[test]
    fn test_axis_modsum_rejects_last_axis() {
        let a = tensor(vec![2, 2], &[1, 2, 3, 4]);
        let p = tensor(vec![2], &[5, 7]);
        let out = DeviceTensor::zeros(&Shape::vector(2), DType::Int64);
        assert!(axis_modsum(&a, -1, &p, &out).is_err());
    }

    #[test]
    fn test_modmul_axis_sum() {
        let a = tensor(vec![2, 1], &[2, 3]);
        let b = tensor(vec![2, 1], &[4, 5]);
        let p = tensor(vec![1], &[7]);
        let out = DeviceTensor::zeros(&Shape::vector(1), DType::Int64);
        modmul_axis_sum(&a, &b, &p, 0, &out).unwrap();
        assert_eq!(out.values(), vec![(8 + 15) % 7]);
    }
}
