// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host-resident tensors.
//!
//! A [`HostTensor`] is an owned, contiguous, little-endian buffer plus its
//! shape and dtype. It is what transcripts embed for host-to-device uploads
//! and for the expected values of device-to-host transfers.
//!
//! # Widened elements
//! Kernels and device storage work on *widened* elements: every value is an
//! `i64`, and `float64` values are carried as their IEEE bit pattern. The
//! conversion helpers here are the only place that knows about that encoding.

use crate::{npy, DType, Shape, TensorError};

/// An owned, n-dimensional tensor stored in contiguous host memory.
#[derive(Debug, Clone, PartialEq)]
pub struct HostTensor {
    shape: Shape,
    dtype: DType,
    data: Vec<u8>,
}

impl HostTensor {
    /// Creates a new tensor filled with zeros.
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let size = shape.size_bytes(dtype);
        Self {
            shape,
            dtype,
            data: vec![0u8; size],
        }
    }

    /// Creates a tensor from raw little-endian bytes.
    ///
    /// Returns an error if the buffer size does not match `shape.size_bytes(dtype)`.
    pub fn from_bytes(shape: Shape, dtype: DType, data: Vec<u8>) -> Result<Self, TensorError> {
        let expected = shape.size_bytes(dtype);
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, dtype, data })
    }

    /// Creates an `int64` tensor.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{HostTensor, Shape};
    /// let t = HostTensor::from_i64(Shape::vector(3), &[1, 2, 3]).unwrap();
    /// assert_eq!(t.to_i64_vec(), vec![1, 2, 3]);
    /// ```
    pub fn from_i64(shape: Shape, values: &[i64]) -> Result<Self, TensorError> {
        Self::from_widened(shape, DType::Int64, values)
    }

    /// Creates an `int32` tensor.
    pub fn from_i32(shape: Shape, values: &[i32]) -> Result<Self, TensorError> {
        let widened: Vec<i64> = values.iter().map(|&v| v as i64).collect();
        Self::from_widened(shape, DType::Int32, &widened)
    }

    /// Creates a `float64` tensor.
    pub fn from_f64(shape: Shape, values: &[f64]) -> Result<Self, TensorError> {
        let widened: Vec<i64> = values.iter().map(|&v| float_to_widened(v)).collect();
        Self::from_widened(shape, DType::Float64, &widened)
    }

    /// Creates a tensor from widened elements interpreted as `dtype`.
    pub fn from_widened(shape: Shape, dtype: DType, values: &[i64]) -> Result<Self, TensorError> {
        if values.len() != shape.num_elements() {
            return Err(TensorError::BufferSizeMismatch {
                expected: shape.size_bytes(dtype),
                actual: values.len() * dtype.size_bytes(),
            });
        }
        let mut data = Vec::with_capacity(shape.size_bytes(dtype));
        for &v in values {
            match dtype {
                DType::Int32 => data.extend_from_slice(&(v as i32).to_le_bytes()),
                DType::Int64 | DType::Float64 => data.extend_from_slice(&v.to_le_bytes()),
            }
        }
        Ok(Self { shape, dtype, data })
    }

    /// Decodes an NPY container.
    pub fn from_npy(bytes: &[u8]) -> Result<Self, TensorError> {
        npy::decode(bytes)
    }

    /// Encodes this tensor as an NPY v1.0 container.
    pub fn to_npy(&self) -> Vec<u8> {
        npy::encode(self)
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the raw byte slice backing this tensor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of elements.
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Returns the elements in widened form.
    pub fn widened(&self) -> Vec<i64> {
        match self.dtype {
            DType::Int32 => self
                .data
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i64)
                .collect(),
            DType::Int64 | DType::Float64 => self
                .data
                .chunks_exact(8)
                .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        }
    }

    /// Returns the elements converted to `target` in widened form.
    pub fn widened_as(&self, target: DType) -> Vec<i64> {
        self.widened()
            .into_iter()
            .map(|v| cast_widened(v, self.dtype, target))
            .collect()
    }

    /// Returns the elements as `i64` values (floats truncate toward zero).
    pub fn to_i64_vec(&self) -> Vec<i64> {
        self.widened_as(DType::Int64)
    }

    /// Returns the elements as `f64` values.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.widened_as(DType::Float64)
            .into_iter()
            .map(widened_to_float)
            .collect()
    }

    /// Compares element values with `expected`.
    ///
    /// Returns `None` when the shapes match and every element compares
    /// equal, otherwise a description of the first difference. Integer and
    /// float tensors compare by value, so `int32` and `int64` tensors with the
    /// same numbers are equal.
    pub fn first_mismatch(&self, expected: &HostTensor) -> Option<String> {
        if self.shape != expected.shape {
            return Some(format!(
                "shape {} does not match expected {}",
                self.shape, expected.shape
            ));
        }
        let floats = self.dtype == DType::Float64 || expected.dtype == DType::Float64;
        if floats {
            let actual = self.to_f64_vec();
            let wanted = expected.to_f64_vec();
            let found = actual.iter().zip(&wanted).position(|(a, b)| a != b);
            return found.map(|i| {
                format!("element {i}: got {}, expected {}", actual[i], wanted[i])
            });
        }
        let actual = self.widened();
        let wanted = expected.widened();
        actual
            .iter()
            .zip(&wanted)
            .position(|(a, b)| a != b)
            .map(|i| format!("element {i}: got {}, expected {}", actual[i], wanted[i]))
    }
}

/// Converts a widened element from one dtype to another.
pub fn cast_widened(value: i64, from: DType, to: DType) -> i64 {
    match (from, to) {
        (DType::Float64, DType::Float64) => value,
        (DType::Float64, int) => int.wrap(widened_to_float(value) as i64),
        (_, DType::Float64) => float_to_widened(value as f64),
        (_, int) => int.wrap(value),
    }
}

/// Encodes an `f64` as a widened element.
pub fn float_to_widened(value: f64) -> i64 {
    value.to_bits() as i64
}

/// Decodes a widened element holding an `f64`.
pub fn widened_to_float(value: i64) -> f64 {
    f64::from_bits(value as u64)
}
