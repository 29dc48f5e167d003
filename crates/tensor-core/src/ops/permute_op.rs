// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Axis permutation (generalised transpose).

use super::elementwise_op::increment;
use super::ensure_f32;
use crate::{Tensor, TensorError, TensorView};

/// Writes `input` with its axes reordered by `axes` into a contiguous
/// `output`, so that `output.shape()[i] == input.shape()[axes[i]]`.
///
/// Used to move attention heads in front of the sequence axis and back.
///
/// # Errors
/// Returns [`TensorError::InvalidAxes`] if `axes` is not a permutation of
/// `0..rank`, or [`TensorError::ShapeMismatch`] if `output` has the wrong shape.
pub fn permute(
    input: &TensorView<'_>,
    axes: &[usize],
    output: &mut Tensor,
) -> Result<(), TensorError> {
    ensure_f32("permute", input)?;
    ensure_f32("permute", &output.view())?;

    let expected = input
        .shape()
        .permuted(axes)
        .ok_or_else(|| TensorError::InvalidAxes {
            axes: axes.to_vec(),
            shape: input.shape().clone(),
        })?;
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "permute",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let src = input.as_f32_slice();
    let in_strides = input.shape().strides();
    // Stride in the source for a unit step along each output axis.
    let strides: Vec<usize> = axes.iter().map(|&a| in_strides[a]).collect();
    let out_dims = expected.dims();
    let mut index = vec![0usize; out_dims.len()];

    for d in output.as_f32_slice_mut() {
        let pos: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        *d = src[pos];
        increment(&mut index, out_dims);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DType, Shape};

    #[test]
    fn test_permute_2d_transpose() {
        let a = Tensor::from_f32(Shape::matrix(2, 3), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let mut t = Tensor::zeros(Shape::matrix(3, 2), DType::F32);

        permute(&a.view(), &[1, 0], &mut t).unwrap();

        assert_eq!(t.as_f32_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_permute_swap_seq_and_heads() {
        // [batch=1, seq=2, heads=2, head_dim=2] → [1, heads, seq, head_dim]
        // Element value encodes (seq, head, d) as 100*s + 10*h + d.
        let data = [0.0, 1.0, 10.0, 11.0, 100.0, 101.0, 110.0, 111.0];
        let a = Tensor::from_f32(Shape::from([1, 2, 2, 2]), &data).unwrap();
        let mut t = Tensor::zeros(Shape::from([1, 2, 2, 2]), DType::F32);

        permute(&a.view(), &[0, 2, 1, 3], &mut t).unwrap();

        assert_eq!(
            t.as_f32_slice(),
            &[0.0, 1.0, 100.0, 101.0, 10.0, 11.0, 110.0, 111.0]
        );
    }

    #[test]
    fn test_permute_round_trip() {
        let data: Vec<f32> = (0..24).map(|x| x as f32).collect();
        let a = Tensor::from_f32(Shape::from([2, 3, 4]), &data).unwrap();
        let mut t = Tensor::zeros(Shape::from([4, 2, 3]), DType::F32);
        let mut back = Tensor::zeros(Shape::from([2, 3, 4]), DType::F32);

        permute(&a.view(), &[2, 0, 1], &mut t).unwrap();
        permute(&t.view(), &[1, 2, 0], &mut back).unwrap();

        assert_eq!(back.as_f32_slice(), a.as_f32_slice());
    }

    #[test]
    fn test_permute_invalid_axes() {
        let a = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
        let mut t = Tensor::zeros(Shape::matrix(3, 2), DType::F32);
        assert!(matches!(
            permute(&a.view(), &[0, 0], &mut t),
            Err(TensorError::InvalidAxes { .. })
        ));
    }
}
