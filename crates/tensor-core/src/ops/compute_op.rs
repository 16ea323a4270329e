// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Gather, decomposition, padding and other non-modular compute kernels.

use super::{broadcast_values, require_integer};
use crate::host::{float_to_widened, widened_to_float};
use crate::{DType, DeviceTensor, Shape, TensorError};

/// `out = |a|`, with `a` broadcast to `out`'s shape.
pub fn abs(a: &DeviceTensor, out: &DeviceTensor) -> Result<(), TensorError> {
    let values = broadcast_values("abs", a, &out.shape())?;
    let result: Vec<i64> = match a.dtype() {
        DType::Float64 => values
            .into_iter()
            .map(|v| float_to_widened(widened_to_float(v).abs()))
            .collect(),
        _ => values.into_iter().map(i64::wrapping_abs).collect(),
    };
    out.write_converted(&result, a.dtype())
}

/// Sets every element of `a` to `value` in place.
pub fn set_const_val(a: &DeviceTensor, value: i64) {
    match a.dtype() {
        DType::Float64 => a.fill(float_to_widened(value as f64)),
        _ => a.fill(value),
    }
}

/// Gathers `a` along `axis` at `indices`.
///
/// `indices` has `a`'s rank; every axis except `axis` must match `a`.
/// Negative indices count from the end. `out` has `indices`' shape.
pub fn take_along_axis(
    a: &DeviceTensor,
    indices: &DeviceTensor,
    axis: i64,
    out: &DeviceTensor,
) -> Result<(), TensorError> {
    const OP: &str = "take_along_axis";
    require_integer(OP, indices)?;
    let a_shape = a.shape();
    let idx_shape = indices.shape();
    let axis = a_shape.normalize_axis(OP, axis)?;
    let compatible = idx_shape.rank() == a_shape.rank()
        && a_shape
            .dims()
            .iter()
            .zip(idx_shape.dims())
            .enumerate()
            .all(|(i, (x, y))| i == axis || x == y);
    if !compatible || out.shape() != idx_shape {
        return Err(TensorError::ShapeMismatch {
            op: OP,
            lhs: a_shape,
            rhs: idx_shape,
        });
    }

    let source = a.values();
    let src_strides = a_shape.strides();
    let idx_strides = idx_shape.strides();
    let span = a_shape.dims()[axis] as i64;
    let mut result = Vec::with_capacity(idx_shape.num_elements());
    for (flat, raw) in indices.values().into_iter().enumerate() {
        let idx = if raw < 0 { raw + span } else { raw };
        if idx < 0 || idx >= span {
            return Err(TensorError::InvalidArgument {
                op: OP,
                detail: format!("index {raw} out of bounds for axis of size {span}"),
            });
        }
        let mut offset = 0;
        let mut rem = flat;
        for (d, &stride) in idx_strides.iter().enumerate() {
            let coord = rem / stride;
            rem %= stride;
            let coord = if d == axis { idx as usize } else { coord };
            offset += coord * src_strides[d];
        }
        result.push(source[offset]);
    }
    out.write_converted(&result, a.dtype())
}

/// Splits each element of `a` into `g_exp` digits of `base_bits` bits.
///
/// `out` has shape `a.shape + [g_exp]`, and digit `level` is
/// `(v >> (level * base_bits)) & (2^base_bits - 1)`.
pub fn apply_g_decomp(
    a: &DeviceTensor,
    g_exp: i64,
    base_bits: i64,
    out: &DeviceTensor,
) -> Result<(), TensorError> {
    const OP: &str = "apply_g_decomp";
    require_integer(OP, a)?;
    if g_exp <= 0 || !(1..63).contains(&base_bits) {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: format!("g_exp={g_exp} base_bits={base_bits}"),
        });
    }
    let mut dims = a.shape().dims().to_vec();
    dims.push(g_exp as usize);
    let expected = Shape::new(dims);
    if out.shape() != expected {
        return Err(TensorError::ShapeMismatch {
            op: OP,
            lhs: expected,
            rhs: out.shape(),
        });
    }
    let mask = (1i64 << base_bits) - 1;
    let mut result = Vec::with_capacity(expected.num_elements());
    for v in a.values() {
        for level in 0..g_exp {
            let shift = (level * base_bits).min(63) as u32;
            result.push((v >> shift) & mask);
        }
    }
    out.write_values(&result)
}

/// Permutes `a` along `perm_axis`, independently for each index along
/// `elementwise_axis`: `out[.., i, .., j, ..] = a[.., i, .., perms[i, j], ..]`.
pub fn permute(
    a: &DeviceTensor,
    perms: &DeviceTensor,
    elementwise_axis: i64,
    perm_axis: i64,
    out: &DeviceTensor,
) -> Result<(), TensorError> {
    const OP: &str = "permute";
    require_integer(OP, perms)?;
    let shape = a.shape();
    let ew = shape.normalize_axis(OP, elementwise_axis)?;
    let pa = shape.normalize_axis(OP, perm_axis)?;
    if ew == pa {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: "elementwise and permutation axes must differ".into(),
        });
    }
    let (l, m) = (shape.dims()[ew], shape.dims()[pa]);
    if perms.shape() != Shape::new(vec![l, m]) || out.shape() != shape {
        return Err(TensorError::ShapeMismatch {
            op: OP,
            lhs: shape,
            rhs: perms.shape(),
        });
    }
    let table = perms.values();
    if let Some(bad) = table.iter().find(|&&v| v < 0 || v as usize >= m) {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: format!("permutation index {bad} out of range for length {m}"),
        });
    }

    let source = a.values();
    let strides = shape.strides();
    let mut result = Vec::with_capacity(source.len());
    for flat in 0..source.len() {
        let i = (flat / strides[ew]) % l;
        let j = (flat / strides[pa]) % m;
        let src_j = table[i * m + j] as usize;
        result.push(source[flat - j * strides[pa] + src_j * strides[pa]]);
    }
    out.write_values(&result)
}

/// Copies `a` into `out` and appends `pad` zeros along `axis`.
pub fn pad_single_axis(
    a: &DeviceTensor,
    pad: i64,
    axis: i64,
    out: &DeviceTensor,
) -> Result<(), TensorError> {
    const OP: &str = "pad_single_axis";
    if pad < 0 {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: format!("pad must be non-negative, got {pad}"),
        });
    }
    let shape = a.shape();
    let axis = shape.normalize_axis(OP, axis)?;
    let mut dims = shape.dims().to_vec();
    dims[axis] += pad as usize;
    let expected = Shape::new(dims);
    if out.shape() != expected {
        return Err(TensorError::ShapeMismatch {
            op: OP,
            lhs: expected,
            rhs: out.shape(),
        });
    }

    let source = a.values();
    let outer: usize = shape.dims()[..axis].iter().product();
    let inner: usize = shape.dims()[axis + 1..].iter().product();
    let old_span = shape.dims()[axis];
    let new_span = expected.dims()[axis];
    let mut result = vec![0i64; expected.num_elements()];
    for o in 0..outer {
        let src = o * old_span * inner;
        let dst = o * new_span * inner;
        result[dst..dst + old_span * inner].copy_from_slice(&source[src..src + old_span * inner]);
    }
    // zero bits are 0.0 for float64 as well
    out.write_converted(&result, a.dtype())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(dims: Vec<usize>, values: &[i64]) -> DeviceTensor {
        DeviceTensor::from_i64(&Shape::new(dims), values).unwrap()
    }

    #[test]
    fn test_abs_int_and_float() {
        let a = t(vec![3], &[-2, 0, 5]);
        let out = DeviceTensor::zeros(&Shape::vector(3), DType::Int64);
        abs(&a, &out).unwrap();
        assert_eq!(out.values(), vec![2, 0, 5]);

        let host = crate::HostTensor::from_f64(Shape::vector(2), &[-1.5, 2.0]).unwrap();
        let f = DeviceTensor::from_host(&host, DType::Float64);
        let fout = DeviceTensor::zeros(&Shape::vector(2), DType::Float64);
        abs(&f, &fout).unwrap();
        assert_eq!(fout.to_host().unwrap().to_f64_vec(), vec![1.5, 2.0]);
    }

    #[test]
    fn test_set_const_val() {
        let a = t(vec![2, 2], &[1, 2, 3, 4]);
        set_const_val(&a, 7);
        assert_eq!(a.values(), vec![7; 4]);
    }

    #[test]
    fn test_take_along_axis_negative_indices() {
        let a = t(vec![2, 3], &[10, 11, 12, 20, 21, 22]);
        let idx = t(vec![2, 2], &[2, 0, -1, 1]);
        let out = DeviceTensor::zeros(&Shape::new(vec![2, 2]), DType::Int64);
        take_along_axis(&a, &idx, 1, &out).unwrap();
        assert_eq!(out.values(), vec![12, 10, 22, 21]);
    }

    #[test]
    fn test_take_along_axis_out_of_bounds() {
        let a = t(vec![3], &[1, 2, 3]);
        let idx = t(vec![1], &[3]);
        let out = DeviceTensor::zeros(&Shape::vector(1), DType::Int64);
        assert!(take_along_axis(&a, &idx, 0, &out).is_err());
    }

    #[test]
    fn test_g_decomp() {
        let a = t(vec![2], &[0b1101, 0b0110]);
        let out = DeviceTensor::zeros(&Shape::new(vec![2, 2]), DType::Int64);
        apply_g_decomp(&a, 2, 2, &out).unwrap();
        assert_eq!(out.values(), vec![0b01, 0b11, 0b10, 0b01]);
    }

    #[test]
    fn test_g_decomp_shape_checked() {
        let a = t(vec![2], &[1, 2]);
        let out = DeviceTensor::zeros(&Shape::vector(2), DType::Int64);
        assert!(apply_g_decomp(&a, 2, 4, &out).is_err());
    }

    #[test]
    fn test_permute_rows() {
        // [l=2, m=3, k=1]
        let a = t(vec![2, 3, 1], &[0, 1, 2, 10, 11, 12]);
        let perms = t(vec![2, 3], &[2, 1, 0, 1, 2, 0]);
        let out = DeviceTensor::zeros(&a.shape(), DType::Int64);
        permute(&a, &perms, 0, 1, &out).unwrap();
        assert_eq!(out.values(), vec![2, 1, 0, 11, 12, 10]);
    }

    #[test]
    fn test_pad_single_axis() {
        let a = t(vec![2, 2], &[1, 2, 3, 4]);
        let out = DeviceTensor::zeros(&Shape::new(vec![2, 3]), DType::Int64);
        pad_single_axis(&a, 1, -1, &out).unwrap();
        assert_eq!(out.values(), vec![1, 2, 0, 3, 4, 0]);

        let rows = DeviceTensor::zeros(&Shape::new(vec![3, 2]), DType::Int64);
        pad_single_axis(&a, 1, 0, &rows).unwrap();
        assert_eq!(rows.values(), vec![1, 2, 3, 4, 0, 0]);
    }

    #[test]
    fn test_pad_rejects_negative() {
        let a = t(vec![2], &[1, 2]);
        assert!(pad_single_axis(&a, -1, 0, &a).is_err());
    }
}
