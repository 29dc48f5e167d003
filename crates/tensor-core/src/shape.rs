// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors and dimension utilities.

use std::fmt;

/// Describes the dimensionality of a [`crate::Tensor`].
///
/// Shapes are immutable once created and provide the bookkeeping every
/// kernel needs: strides, element counts, broadcasting and contraction
/// rules, and axis permutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.rank(), 3);
    /// assert_eq!(s.num_elements(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    /// Creates a 2-D shape (matrix).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    ///
    /// For a scalar shape (rank 0), returns 1.
    pub fn num_elements(&self) -> usize {
        if self.dims.is_empty() {
            1
        } else {
            self.dims.iter().product()
        }
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Returns the size of the last dimension, or `None` for a scalar.
    pub fn last_dim(&self) -> Option<usize> {
        self.dims.last().copied()
    }

    /// Returns a copy of this shape with the last dimension replaced.
    ///
    /// A scalar shape gains a single dimension of size `size`.
    pub fn with_last_dim(&self, size: usize) -> Shape {
        let mut dims = self.dims.clone();
        match dims.last_mut() {
            Some(last) => *last = size,
            None => dims.push(size),
        }
        Shape { dims }
    }

    /// Computes the memory footprint in bytes for a given [`crate::DType`].
    pub fn size_bytes(&self, dtype: super::DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    /// Computes row-major (C-order) strides for this shape.
    ///
    /// The stride for dimension `i` is the number of elements to skip
    /// in the flat buffer to advance one step along that dimension.
    pub fn strides(&self) -> Vec<usize> {
        let rank = self.dims.len();
        if rank == 0 {
            return vec![];
        }
        let mut strides = vec![0usize; rank];
        strides[rank - 1] = 1;
        for i in (0..rank - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Returns `true` if `self` can be broadcast onto `target` without
    /// changing `target`'s shape.
    ///
    /// Aligning dimensions from the right, each dimension of `self` must
    /// either equal the matching dimension of `target` or be 1, and `self`
    /// may not have more dimensions than `target`.
    pub fn broadcasts_to(&self, target: &Shape) -> bool {
        if self.rank() > target.rank() {
            return false;
        }
        let offset = target.rank() - self.rank();
        self.dims
            .iter()
            .enumerate()
            .all(|(i, &d)| d == target.dims[offset + i] || d == 1)
    }

    /// Returns the output shape of a (batched) matrix multiply, or `None`
    /// if the operands do not contract.
    ///
    /// `self` is `[..., M, K]`. When `rhs_transposed` is `false`, `other` is
    /// `[..., K, N]`; when `true`, it is `[..., N, K]`. The leading batch
    /// dimensions of `other` must either equal those of `self` or be absent
    /// (a rank-2 `other` is shared across every batch).
    pub fn matmul_output(&self, other: &Shape, rhs_transposed: bool) -> Option<Shape> {
        if self.rank() < 2 || other.rank() < 2 {
            return None;
        }
        let (lr, rr) = (self.rank(), other.rank());
        let m = self.dims[lr - 2];
        let k = self.dims[lr - 1];
        let (k_rhs, n) = if rhs_transposed {
            (other.dims[rr - 1], other.dims[rr - 2])
        } else {
            (other.dims[rr - 2], other.dims[rr - 1])
        };
        if k != k_rhs {
            return None;
        }
        if rr > 2 && other.dims[..rr - 2] != self.dims[..lr - 2] {
            return None;
        }
        let mut dims = self.dims[..lr - 2].to_vec();
        dims.push(m);
        dims.push(n);
        Some(Shape { dims })
    }

    /// Returns the shape obtained by reordering dimensions according to
    /// `axes`, or `None` if `axes` is not a permutation of `0..rank`.
    pub fn permuted(&self, axes: &[usize]) -> Option<Shape> {
        if axes.len() != self.rank() {
            return None;
        }
        let mut seen = vec![false; axes.len()];
        for &a in axes {
            if a >= axes.len() || seen[a] {
                return None;
            }
            seen[a] = true;
        }
        Some(Shape {
            dims: axes.iter().map(|&a| self.dims[a]).collect(),
        })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Convenience: `Shape::from(vec![2, 3])`.
impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[2, 3][..])`.
impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

/// Convenience: `Shape::from([1, 5, 12])`.
impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.num_elements(), 1);
        assert!(s.strides().is_empty());
        assert_eq!(s.last_dim(), None);
    }

    #[test]
    fn test_matrix_shape() {
        let s = Shape::matrix(3, 4);
        assert_eq!(s.rank(), 2);
        assert_eq!(s.num_elements(), 12);
        assert_eq!(s.strides(), vec![4, 1]);
        assert_eq!(s.size_bytes(DType::F32), 48);
        assert_eq!(s.size_bytes(DType::I64), 96);
    }

    #[test]
    fn test_4d_strides() {
        let s = Shape::new(vec![2, 4, 5, 3]);
        assert_eq!(s.strides(), vec![60, 15, 3, 1]);
    }

    #[test]
    fn test_with_last_dim() {
        let s = Shape::from([1, 5, 12]);
        assert_eq!(s.with_last_dim(100), Shape::from([1, 5, 100]));
        assert_eq!(Shape::scalar().with_last_dim(3), Shape::vector(3));
    }

    #[test]
    fn test_broadcasts_to() {
        let target = Shape::from([2, 5, 12]);
        assert!(Shape::vector(12).broadcasts_to(&target));
        assert!(Shape::from([5, 1]).broadcasts_to(&target));
        assert!(target.broadcasts_to(&target));
        assert!(!Shape::vector(5).broadcasts_to(&target));
        assert!(!Shape::from([1, 2, 5, 12]).broadcasts_to(&target));
    }

    #[test]
    fn test_matmul_output_plain() {
        let a = Shape::matrix(3, 4);
        let b = Shape::matrix(4, 5);
        assert_eq!(a.matmul_output(&b, false), Some(Shape::matrix(3, 5)));
        assert_eq!(a.matmul_output(&Shape::matrix(5, 5), false), None);
    }

    #[test]
    fn test_matmul_output_transposed_shared_rhs() {
        // [batch, seq, in] x [out, in]^T -> [batch, seq, out]
        let x = Shape::from([2, 5, 12]);
        let w = Shape::matrix(48, 12);
        assert_eq!(x.matmul_output(&w, true), Some(Shape::from([2, 5, 48])));
        assert_eq!(x.matmul_output(&w, false), None);
    }

    #[test]
    fn test_matmul_output_batched() {
        let q = Shape::from([1, 4, 5, 3]);
        let k = Shape::from([1, 4, 5, 3]);
        assert_eq!(q.matmul_output(&k, true), Some(Shape::from([1, 4, 5, 5])));
        // Mismatched batch dims are rejected.
        let k_bad = Shape::from([1, 2, 5, 3]);
        assert_eq!(q.matmul_output(&k_bad, true), None);
    }

    #[test]
    fn test_permuted() {
        let s = Shape::from([1, 5, 4, 3]);
        assert_eq!(s.permuted(&[0, 2, 1, 3]), Some(Shape::from([1, 4, 5, 3])));
        assert_eq!(s.permuted(&[0, 1, 1, 3]), None);
        assert_eq!(s.permuted(&[0, 1, 2]), None);
        assert_eq!(s.permuted(&[0, 1, 2, 4]), None);
    }

    #[test]
    fn test_display() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!(format!("{s}"), "[2, 3, 4]");
    }

    #[test]
    fn test_from_conversions() {
        let s1: Shape = vec![2, 3].into();
        let s2: Shape = (&[2, 3][..]).into();
        let s3: Shape = [2, 3].into();
        assert_eq!(s1, s2);
        assert_eq!(s2, s3);
    }
}
