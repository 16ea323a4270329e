// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Zero-copy layout operations.

use crate::device::Layout;
use crate::shape::normalize_axis;
use crate::{DeviceTensor, TensorError};

/// One entry of a [`get_slice`] index expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceIndex {
    /// Select a single position and drop the axis. Negative counts from the end.
    Index(i64),
    /// Python-style `start:stop:step` range; `None` takes the default.
    Range {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    /// Stands for as many full ranges as needed to cover the remaining axes.
    Ellipsis,
    /// Inserts a new axis of size 1.
    NewAxis,
}

/// Broadcasts a size-1 axis to `repeat` entries by giving it stride 0.
pub fn expand(a: &DeviceTensor, repeat: i64, axis: i64) -> Result<DeviceTensor, TensorError> {
    const OP: &str = "expand";
    let layout = a.layout();
    let axis = normalize_axis(OP, axis, layout.rank())?;
    if layout.dims()[axis] != 1 {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: format!("axis {axis} has size {}, expected 1", layout.dims()[axis]),
        });
    }
    if repeat <= 0 {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: format!("repeat must be positive, got {repeat}"),
        });
    }
    let mut dims = layout.dims().to_vec();
    let mut strides = layout.strides().to_vec();
    dims[axis] = repeat as usize;
    strides[axis] = 0;
    Ok(a.view(Layout::new(dims, strides, layout.offset())))
}

/// Removes a size-1 axis.
pub fn squeeze(a: &DeviceTensor, axis: i64) -> Result<DeviceTensor, TensorError> {
    const OP: &str = "squeeze";
    let layout = a.layout();
    let axis = normalize_axis(OP, axis, layout.rank())?;
    if layout.dims()[axis] != 1 {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: format!("axis {axis} has size {}, expected 1", layout.dims()[axis]),
        });
    }
    let mut dims = layout.dims().to_vec();
    let mut strides = layout.strides().to_vec();
    dims.remove(axis);
    strides.remove(axis);
    Ok(a.view(Layout::new(dims, strides, layout.offset())))
}

/// Inserts a size-1 axis at `axis` (`-rank-1..=rank`).
pub fn unsqueeze(a: &DeviceTensor, axis: i64) -> Result<DeviceTensor, TensorError> {
    let layout = a.layout();
    let axis = normalize_axis("unsqueeze", axis, layout.rank() + 1)?;
    let mut dims = layout.dims().to_vec();
    let mut strides = layout.strides().to_vec();
    dims.insert(axis, 1);
    strides.insert(axis, 0);
    Ok(a.view(Layout::new(dims, strides, layout.offset())))
}

/// Moves axis `source` to position `destination`, keeping the other axes in order.
pub fn moveaxis(a: &DeviceTensor, source: i64, destination: i64) -> Result<DeviceTensor, TensorError> {
    const OP: &str = "moveaxis";
    let layout = a.layout();
    let rank = layout.rank();
    let src = normalize_axis(OP, source, rank)?;
    let dst = normalize_axis(OP, destination, rank)?;
    let mut order: Vec<usize> = (0..rank).filter(|&i| i != src).collect();
    order.insert(dst, src);
    let dims = order.iter().map(|&i| layout.dims()[i]).collect();
    let strides = order.iter().map(|&i| layout.strides()[i]).collect();
    Ok(a.view(Layout::new(dims, strides, layout.offset())))
}

/// Reinterprets `a` with `new_shape` in place. One entry may be `-1`.
///
/// The tensor must be contiguous; every handle to the same tensor object
/// observes the new shape.
pub fn reshape(a: &DeviceTensor, new_shape: &[i64]) -> Result<(), TensorError> {
    const OP: &str = "reshape";
    let layout = a.layout();
    if !layout.is_contiguous() {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: "tensor is not contiguous".into(),
        });
    }
    let dims = resolve_shape(OP, new_shape, layout.num_elements())?;
    let strides = crate::Shape::new(dims.clone()).strides();
    a.set_layout(Layout::new(dims, strides, layout.offset()));
    Ok(())
}

fn resolve_shape(op: &'static str, spec: &[i64], total: usize) -> Result<Vec<usize>, TensorError> {
    let inferred: Vec<usize> = spec
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == -1)
        .map(|(i, _)| i)
        .collect();
    if inferred.len() > 1 || spec.iter().any(|&d| d < -1) {
        return Err(TensorError::InvalidArgument {
            op,
            detail: format!("invalid target shape {spec:?}"),
        });
    }
    let known: usize = spec.iter().filter(|&&d| d >= 0).map(|&d| d as usize).product();
    let mut dims: Vec<usize> = spec.iter().map(|&d| d.max(0) as usize).collect();
    if let Some(&i) = inferred.first() {
        if known == 0 || total % known != 0 {
            return Err(TensorError::InvalidArgument {
                op,
                detail: format!("cannot infer dimension of {spec:?} for {total} elements"),
            });
        }
        dims[i] = total / known;
    }
    if dims.iter().product::<usize>() != total {
        return Err(TensorError::InvalidArgument {
            op,
            detail: format!("shape {spec:?} does not hold {total} elements"),
        });
    }
    Ok(dims)
}

/// Merges axes `start..=end` into one. Copies when the input is not contiguous.
pub fn flatten(a: &DeviceTensor, start: i64, end: i64) -> Result<DeviceTensor, TensorError> {
    const OP: &str = "flatten";
    let source = if a.layout().is_contiguous() {
        a.clone()
    } else {
        a.to_contiguous()
    };
    let layout = source.layout();
    if layout.rank() == 0 {
        return Ok(source.view(Layout::new(vec![1], vec![1], layout.offset())));
    }
    let s = normalize_axis(OP, start, layout.rank())?;
    let e = normalize_axis(OP, end, layout.rank())?;
    if s > e {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: format!("start axis {s} is after end axis {e}"),
        });
    }
    let mut dims = layout.dims()[..s].to_vec();
    dims.push(layout.dims()[s..=e].iter().product());
    dims.extend_from_slice(&layout.dims()[e + 1..]);
    let strides = crate::Shape::new(dims.clone()).strides();
    Ok(source.view(Layout::new(dims, strides, layout.offset())))
}

/// Returns `a` itself when contiguous, otherwise a dense copy.
pub fn contiguous(a: &DeviceTensor) -> DeviceTensor {
    if a.layout().is_contiguous() {
        a.clone()
    } else {
        a.to_contiguous()
    }
}

/// A distinct tensor object sharing `a`'s storage and current layout.
pub fn new_reference(a: &DeviceTensor) -> DeviceTensor {
    a.view(a.layout())
}

/// Applies a basic-indexing expression and returns the resulting view.
pub fn get_slice(a: &DeviceTensor, index: &[SliceIndex]) -> Result<DeviceTensor, TensorError> {
    const OP: &str = "get_slice";
    let layout = a.layout();
    let rank = layout.rank();
    let consumed = index
        .iter()
        .filter(|i| matches!(i, SliceIndex::Index(_) | SliceIndex::Range { .. }))
        .count();
    let ellipses = index.iter().filter(|i| matches!(i, SliceIndex::Ellipsis)).count();
    if consumed > rank || ellipses > 1 {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: format!("index of length {} does not fit rank {rank}", index.len()),
        });
    }

    let full = SliceIndex::Range {
        start: None,
        stop: None,
        step: None,
    };
    let mut expanded = Vec::with_capacity(index.len() + rank);
    for entry in index {
        if let SliceIndex::Ellipsis = entry {
            expanded.extend(std::iter::repeat(full).take(rank - consumed));
        } else {
            expanded.push(*entry);
        }
    }
    if ellipses == 0 {
        expanded.extend(std::iter::repeat(full).take(rank - consumed));
    }

    let mut dims = Vec::new();
    let mut strides = Vec::new();
    let mut offset = layout.offset();
    let mut axis = 0;
    for entry in expanded {
        match entry {
            SliceIndex::NewAxis => {
                dims.push(1);
                strides.push(0);
            }
            SliceIndex::Index(i) => {
                let span = layout.dims()[axis] as i64;
                let pos = if i < 0 { i + span } else { i };
                if pos < 0 || pos >= span {
                    return Err(TensorError::InvalidArgument {
                        op: OP,
                        detail: format!("index {i} out of bounds for axis {axis} of size {span}"),
                    });
                }
                offset += pos as usize * layout.strides()[axis];
                axis += 1;
            }
            SliceIndex::Range { start, stop, step } => {
                let span = layout.dims()[axis] as i64;
                let step = step.unwrap_or(1);
                if step <= 0 {
                    return Err(TensorError::InvalidArgument {
                        op: OP,
                        detail: format!("slice step must be positive, got {step}"),
                    });
                }
                let clamp = |v: i64| {
                    let v = if v < 0 { v + span } else { v };
                    v.clamp(0, span)
                };
                let begin = start.map_or(0, clamp);
                let end = stop.map_or(span, clamp);
                let len = if end > begin {
                    ((end - begin + step - 1) / step) as usize
                } else {
                    0
                };
                if len > 0 {
                    offset += begin as usize * layout.strides()[axis];
                }
                dims.push(len);
                strides.push(layout.strides()[axis] * step as usize);
                axis += 1;
            }
            SliceIndex::Ellipsis => {}
        }
    }
    Ok(a.view(Layout::new(dims, strides, offset)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;

    fn arange(dims: Vec<usize>) -> DeviceTensor {
        let n: usize = dims.iter().product();
        DeviceTensor::from_i64(&Shape::new(dims), &(0..n as i64).collect::<Vec<_>>()).unwrap()
    }

    fn range(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> SliceIndex {
        SliceIndex::Range { start, stop, step }
    }

    #[test]
    fn test_expand_is_a_view() {
        let a = arange(vec![2, 1]);
        let e = expand(&a, 3, -1).unwrap();
        assert_eq!(e.shape().dims(), &[2, 3]);
        assert_eq!(e.values(), vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(a.shape().dims(), &[2, 1]);
        assert!(e.shares_storage(&a));
    }

    #[test]
    fn test_expand_requires_unit_axis() {
        let a = arange(vec![2, 2]);
        assert!(expand(&a, 3, 1).is_err());
    }

    #[test]
    fn test_squeeze_unsqueeze() {
        let a = arange(vec![3, 1, 2]);
        let s = squeeze(&a, 1).unwrap();
        assert_eq!(s.shape().dims(), &[3, 2]);
        let u = unsqueeze(&s, -1).unwrap();
        assert_eq!(u.shape().dims(), &[3, 2, 1]);
        assert_eq!(u.values(), a.values());
        assert!(squeeze(&a, 0).is_err());
    }

    #[test]
    fn test_moveaxis() {
        let a = arange(vec![2, 3]);
        let m = moveaxis(&a, 0, -1).unwrap();
        assert_eq!(m.shape().dims(), &[3, 2]);
        assert_eq!(m.values(), vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_reshape_in_place() {
        let a = arange(vec![2, 3]);
        let alias = a.clone();
        reshape(&a, &[3, -1]).unwrap();
        assert_eq!(alias.shape().dims(), &[3, 2]);
        assert!(reshape(&a, &[4, 2]).is_err());
        assert!(reshape(&a, &[-1, -1]).is_err());
    }

    #[test]
    fn test_reshape_rejects_strided() {
        let a = arange(vec![2, 3]);
        let m = moveaxis(&a, 0, 1).unwrap();
        assert!(reshape(&m, &[6]).is_err());
    }

    #[test]
    fn test_flatten_copies_strided_input() {
        let a = arange(vec![2, 3]);
        let m = moveaxis(&a, 0, 1).unwrap();
        let f = flatten(&m, 0, -1).unwrap();
        assert_eq!(f.values(), vec![0, 3, 1, 4, 2, 5]);
        assert!(!f.shares_storage(&a));
        let g = flatten(&a, 0, 1).unwrap();
        assert!(g.shares_storage(&a));
    }

    #[test]
    fn test_new_reference_shares_storage() {
        let a = arange(vec![2]);
        let r = new_reference(&a);
        assert!(r.shares_storage(&a));
        assert!(!r.same_object(&a));
    }

    #[test]
    fn test_contiguous_returns_same_object_when_dense() {
        let a = arange(vec![2, 2]);
        assert!(contiguous(&a).same_object(&a));
        let t = moveaxis(&a, 0, 1).unwrap();
        assert!(!contiguous(&t).shares_storage(&a));
    }

    #[test]
    fn test_get_slice_basic() {
        let a = arange(vec![2, 3, 4]);
        let v = get_slice(&a, &[SliceIndex::Index(1), range(Some(0), Some(2), None), range(Some(1), None, None)]).unwrap();
        assert_eq!(v.shape().dims(), &[2, 3]);
        assert_eq!(v.values(), vec![13, 14, 15, 17, 18, 19]);
    }

    #[test]
    fn test_get_slice_ellipsis_and_negative() {
        let a = arange(vec![2, 3, 4]);
        let v = get_slice(&a, &[SliceIndex::Ellipsis, SliceIndex::Index(-1)]).unwrap();
        assert_eq!(v.shape().dims(), &[2, 3]);
        assert_eq!(v.values(), vec![3, 7, 11, 15, 19, 23]);
    }

    #[test]
    fn test_get_slice_step_and_newaxis() {
        let a = arange(vec![6]);
        let v = get_slice(&a, &[SliceIndex::NewAxis, range(None, None, Some(2))]).unwrap();
        assert_eq!(v.shape().dims(), &[1, 3]);
        assert_eq!(v.values(), vec![0, 2, 4]);
    }

    #[test]
    fn test_get_slice_errors() {
        let a = arange(vec![2]);
        assert!(get_slice(&a, &[SliceIndex::Index(2)]).is_err());
        assert!(get_slice(&a, &[range(None, None, Some(0))]).is_err());
        assert!(get_slice(&a, &[SliceIndex::Index(0), SliceIndex::Index(0)]).is_err());
    }

    #[test]
    fn test_get_slice_empty_range() {
        let a = arange(vec![4]);
        let v = get_slice(&a, &[range(Some(3), Some(1), None)]).unwrap();
        assert_eq!(v.shape().dims(), &[0]);
        assert!(v.values().is_empty());
    }
}
