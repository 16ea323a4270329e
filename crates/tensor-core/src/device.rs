// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Strided, shared device tensors.
//!
//! A [`DeviceTensor`] is a cheap handle: cloning it yields another claim on
//! the same tensor object (same storage, same layout cell). Views created by
//! [`DeviceTensor::view`] share storage but own a separate layout, and
//! in-place metadata changes ([`DeviceTensor::set_layout`]) are visible
//! through every clone of the handle.
//!
//! Kernels never hold a storage lock across a read and a write: they gather
//! inputs with [`DeviceTensor::values`], compute, and then scatter with
//! [`DeviceTensor::write_values`]. An output that aliases an input therefore
//! behaves like an out-of-place computation followed by a copy.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::host::cast_widened;
use crate::{DType, HostTensor, Shape, TensorError};

/// Dimensions, element strides and starting offset of a tensor view.
///
/// A stride of 0 marks a broadcast axis: every index along it maps to the
/// same storage element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    dims: Vec<usize>,
    strides: Vec<usize>,
    offset: usize,
}

impl Layout {
    /// Row-major layout starting at offset 0.
    pub fn contiguous(dims: Vec<usize>) -> Self {
        let strides = Shape::new(dims.clone()).strides();
        Self {
            dims,
            strides,
            offset: 0,
        }
    }

    /// Builds an arbitrary layout. The caller guarantees it stays within storage.
    pub fn new(dims: Vec<usize>, strides: Vec<usize>, offset: usize) -> Self {
        debug_assert_eq!(dims.len(), strides.len());
        Self {
            dims,
            strides,
            offset,
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.dims.clone())
    }

    /// `true` when elements are laid out densely in row-major order.
    pub fn is_contiguous(&self) -> bool {
        let dense = Shape::new(self.dims.clone()).strides();
        self.dims
            .iter()
            .zip(self.strides.iter().zip(&dense))
            .all(|(&d, (&s, &c))| d <= 1 || s == c)
    }

    /// Storage positions of every element, in logical row-major order.
    pub fn storage_indices(&self) -> Vec<usize> {
        let total = self.num_elements();
        let mut out = Vec::with_capacity(total);
        if total == 0 {
            return out;
        }
        let rank = self.rank();
        let mut index = vec![0usize; rank];
        let mut pos = self.offset;
        for _ in 0..total {
            out.push(pos);
            // odometer increment, last axis fastest
            for axis in (0..rank).rev() {
                index[axis] += 1;
                pos += self.strides[axis];
                if index[axis] < self.dims[axis] {
                    break;
                }
                pos -= self.strides[axis] * index[axis];
                index[axis] = 0;
            }
        }
        out
    }
}

/// Shared handle to a tensor stored in (host-simulated) device memory.
#[derive(Clone)]
pub struct DeviceTensor {
    dtype: DType,
    layout: Arc<RwLock<Layout>>,
    storage: Arc<RwLock<Vec<i64>>>,
}

impl DeviceTensor {
    /// Allocates a zero-filled contiguous tensor.
    pub fn zeros(shape: &Shape, dtype: DType) -> Self {
        Self::from_parts(
            dtype,
            Layout::contiguous(shape.dims().to_vec()),
            vec![0; shape.num_elements()],
        )
    }

    /// Builds a contiguous tensor from widened elements.
    pub fn from_widened(shape: &Shape, dtype: DType, values: Vec<i64>) -> Result<Self, TensorError> {
        if values.len() != shape.num_elements() {
            return Err(TensorError::BufferSizeMismatch {
                expected: shape.size_bytes(dtype),
                actual: values.len() * dtype.size_bytes(),
            });
        }
        let values = values.into_iter().map(|v| wrap(dtype, v)).collect();
        Ok(Self::from_parts(
            dtype,
            Layout::contiguous(shape.dims().to_vec()),
            values,
        ))
    }

    /// Convenience constructor for `int64` tensors.
    pub fn from_i64(shape: &Shape, values: &[i64]) -> Result<Self, TensorError> {
        Self::from_widened(shape, DType::Int64, values.to_vec())
    }

    /// Uploads a host tensor, converting its elements to `dtype`.
    pub fn from_host(host: &HostTensor, dtype: DType) -> Self {
        Self::from_parts(
            dtype,
            Layout::contiguous(host.shape().dims().to_vec()),
            host.widened_as(dtype),
        )
    }

    fn from_parts(dtype: DType, layout: Layout, storage: Vec<i64>) -> Self {
        Self {
            dtype,
            layout: Arc::new(RwLock::new(layout)),
            storage: Arc::new(RwLock::new(storage)),
        }
    }

    /// Downloads the logical contents into a contiguous host tensor.
    pub fn to_host(&self) -> Result<HostTensor, TensorError> {
        HostTensor::from_widened(self.shape(), self.dtype, &self.values())
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Snapshot of the current layout.
    pub fn layout(&self) -> Layout {
        self.layout
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn shape(&self) -> Shape {
        self.layout().shape()
    }

    pub fn rank(&self) -> usize {
        self.layout().rank()
    }

    pub fn num_elements(&self) -> usize {
        self.layout().num_elements()
    }

    /// Widened elements in logical row-major order.
    pub fn values(&self) -> Vec<i64> {
        let indices = self.layout().storage_indices();
        let storage = self.storage.read().unwrap_or_else(PoisonError::into_inner);
        indices.into_iter().map(|i| storage[i]).collect()
    }

    /// Writes widened elements in logical row-major order, narrowing to this
    /// tensor's dtype.
    pub fn write_values(&self, values: &[i64]) -> Result<(), TensorError> {
        let indices = self.layout().storage_indices();
        if indices.len() != values.len() {
            return Err(TensorError::BufferSizeMismatch {
                expected: indices.len() * self.dtype.size_bytes(),
                actual: values.len() * self.dtype.size_bytes(),
            });
        }
        let mut storage = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        for (i, &v) in indices.into_iter().zip(values) {
            storage[i] = wrap(self.dtype, v);
        }
        Ok(())
    }

    /// Writes values held in another dtype, converting element by element.
    pub fn write_converted(&self, values: &[i64], from: DType) -> Result<(), TensorError> {
        let converted: Vec<i64> = values
            .iter()
            .map(|&v| cast_widened(v, from, self.dtype))
            .collect();
        self.write_values(&converted)
    }

    /// Sets every element of the view to `value` (already widened for this dtype).
    pub fn fill(&self, value: i64) {
        let indices = self.layout().storage_indices();
        let mut storage = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        for i in indices {
            storage[i] = wrap(self.dtype, value);
        }
    }

    /// Creates a new tensor object over the same storage with its own layout.
    pub fn view(&self, layout: Layout) -> DeviceTensor {
        Self {
            dtype: self.dtype,
            layout: Arc::new(RwLock::new(layout)),
            storage: Arc::clone(&self.storage),
        }
    }

    /// Replaces this tensor object's layout. Every clone of the handle sees it.
    pub fn set_layout(&self, layout: Layout) {
        *self.layout.write().unwrap_or_else(PoisonError::into_inner) = layout;
    }

    /// Copies the logical contents into fresh contiguous storage.
    pub fn to_contiguous(&self) -> DeviceTensor {
        let values = self.values();
        Self::from_parts(self.dtype, Layout::contiguous(self.layout().dims.clone()), values)
    }

    /// `true` if both handles address the same storage buffer.
    pub fn shares_storage(&self, other: &DeviceTensor) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// `true` if both handles are the same tensor object (storage and layout).
    pub fn same_object(&self, other: &DeviceTensor) -> bool {
        Arc::ptr_eq(&self.layout, &other.layout) && self.shares_storage(other)
    }
}

fn wrap(dtype: DType, value: i64) -> i64 {
    if dtype.is_integer() {
        dtype.wrap(value)
    } else {
        value
    }
}

impl fmt::Debug for DeviceTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = self.layout();
        f.debug_struct("DeviceTensor")
            .field("dtype", &self.dtype)
            .field("dims", &layout.dims)
            .field("strides", &layout.strides)
            .field("offset", &layout.offset)
            .finish()
    }
}
