// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type and view abstractions.

use crate::{DType, Shape, TensorError};

/// Typed element buffer backing a [`Tensor`].
#[derive(Debug, Clone, PartialEq)]
enum Storage {
    F32(Vec<f32>),
    I64(Vec<i64>),
}

impl Storage {
    fn dtype(&self) -> DType {
        match self {
            Storage::F32(_) => DType::F32,
            Storage::I64(_) => DType::I64,
        }
    }

    fn len(&self) -> usize {
        match self {
            Storage::F32(v) => v.len(),
            Storage::I64(v) => v.len(),
        }
    }
}

/// An owned, n-dimensional tensor stored in contiguous memory.
///
/// `Tensor` is the primary data carrier in the inference pipeline.
/// It owns its data buffer and exposes immutable views via [`TensorView`].
///
/// # Memory Layout
/// Data is stored in row-major (C) order in a typed buffer. Typed access is
/// provided via [`as_f32_slice`](Tensor::as_f32_slice) and
/// [`as_i64_slice`](Tensor::as_i64_slice).
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    storage: Storage,
}

impl Tensor {
    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let t = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
    /// assert_eq!(t.size_bytes(), 24); // 2 * 3 * 4 bytes
    /// ```
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let n = shape.num_elements();
        let storage = match dtype {
            DType::F32 => Storage::F32(vec![0.0; n]),
            DType::I64 => Storage::I64(vec![0; n]),
        };
        Self { shape, storage }
    }

    /// Creates an `F32` tensor with every element set to `value`.
    pub fn full(shape: Shape, value: f32) -> Self {
        let n = shape.num_elements();
        Self {
            shape,
            storage: Storage::F32(vec![value; n]),
        }
    }

    /// Creates a tensor from little-endian encoded bytes.
    ///
    /// Returns an error if the buffer size does not match `shape.size_bytes(dtype)`.
    pub fn from_bytes(shape: Shape, dtype: DType, data: &[u8]) -> Result<Self, TensorError> {
        let expected = shape.size_bytes(dtype);
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let storage = match dtype {
            DType::F32 => Storage::F32(
                data.chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
            DType::I64 => Storage::I64(
                data.chunks_exact(8)
                    .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                    .collect(),
            ),
        };
        Ok(Self { shape, storage })
    }

    /// Creates a tensor from a slice of `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.as_f32_slice(), &[1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        Self::from_vec(shape, values.to_vec())
    }

    /// Creates an `F32` tensor that takes ownership of `values` without copying.
    pub fn from_vec(shape: Shape, values: Vec<f32>) -> Result<Self, TensorError> {
        check_len(&shape, values.len(), DType::F32)?;
        Ok(Self {
            shape,
            storage: Storage::F32(values),
        })
    }

    /// Creates an `I64` tensor, typically a batch of token ids.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let ids = Tensor::from_i64(Shape::matrix(1, 3), &[4, 8, 15]).unwrap();
    /// assert_eq!(ids.dtype(), DType::I64);
    /// ```
    pub fn from_i64(shape: Shape, values: &[i64]) -> Result<Self, TensorError> {
        check_len(&shape, values.len(), DType::I64)?;
        Ok(Self {
            shape,
            storage: Storage::I64(values.to_vec()),
        })
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Returns an immutable view over this tensor's data.
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            shape: &self.shape,
            storage: &self.storage,
        }
    }

    /// Returns the number of elements.
    pub fn num_elements(&self) -> usize {
        self.storage.len()
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.storage.len() * self.dtype().size_bytes()
    }

    /// Reinterprets the tensor under a new shape with the same element count.
    ///
    /// The buffer is moved, not copied.
    ///
    /// # Errors
    /// Returns [`TensorError::InvalidReshape`] if the element counts differ.
    pub fn reshape(self, shape: Shape) -> Result<Tensor, TensorError> {
        if shape.num_elements() != self.shape.num_elements() {
            return Err(TensorError::InvalidReshape {
                from: self.shape,
                to: shape,
            });
        }
        Ok(Tensor {
            shape,
            storage: self.storage,
        })
    }

    /// Interprets the buffer as a slice of `f32`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn as_f32_slice(&self) -> &[f32] {
        match &self.storage {
            Storage::F32(v) => v,
            other => panic!("as_f32_slice called on {:?} tensor", other.dtype()),
        }
    }

    /// Interprets the buffer as a mutable slice of `f32`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn as_f32_slice_mut(&mut self) -> &mut [f32] {
        match &mut self.storage {
            Storage::F32(v) => v,
            other => panic!("as_f32_slice_mut called on {:?} tensor", other.dtype()),
        }
    }

    /// Interprets the buffer as a slice of `i64`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::I64`.
    pub fn as_i64_slice(&self) -> &[i64] {
        match &self.storage {
            Storage::I64(v) => v,
            other => panic!("as_i64_slice called on {:?} tensor", other.dtype()),
        }
    }
}

fn check_len(shape: &Shape, len: usize, dtype: DType) -> Result<(), TensorError> {
    let expected = shape.num_elements();
    if len != expected {
        return Err(TensorError::BufferSizeMismatch {
            expected: expected * dtype.size_bytes(),
            actual: len * dtype.size_bytes(),
        });
    }
    Ok(())
}

/// A borrowed, read-only view over a [`Tensor`]'s data.
///
/// Views are zero-copy and tied to the lifetime of the source tensor,
/// enforced by the borrow checker.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    shape: &'a Shape,
    storage: &'a Storage,
}

impl<'a> TensorView<'a> {
    /// Returns the shape of the viewed tensor.
    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    /// Returns the data type of the viewed tensor.
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Interprets the view as a slice of `f32`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn as_f32_slice(&self) -> &'a [f32] {
        match self.storage {
            Storage::F32(v) => v,
            other => panic!("as_f32_slice called on {:?} view", other.dtype()),
        }
    }

    /// Interprets the view as a slice of `i64`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::I64`.
    pub fn as_i64_slice(&self) -> &'a [i64] {
        match self.storage {
            Storage::I64(v) => v,
            other => panic!("as_i64_slice called on {:?} view", other.dtype()),
        }
    }
}
