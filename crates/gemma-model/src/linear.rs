// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Affine projection `y = x·Wᵀ + b`.

use tensor_core::{add, matmul_transposed, DType, Shape, Tensor};

use crate::error::InLayer;
use crate::ModelError;

/// A fully-connected layer with an `(out_features, in_features)` weight and
/// an optional `(out_features)` bias.
#[derive(Debug, Clone)]
pub struct LinearLayer {
    weight: Tensor,
    bias: Option<Tensor>,
}

impl LinearLayer {
    /// Builds a layer, checking that the weight is a matrix and the bias (if
    /// any) matches its output dimension.
    pub fn new(weight: Tensor, bias: Option<Tensor>) -> Result<Self, ModelError> {
        if weight.dtype() != DType::F32 || weight.shape().rank() != 2 {
            return Err(ModelError::Configuration(format!(
                "linear weight must be a rank-2 f32 tensor, got {} {}",
                weight.dtype(),
                weight.shape()
            )));
        }
        let out_features = weight.shape().dims()[0];
        if let Some(b) = &bias {
            if b.dtype() != DType::F32 || b.shape() != &Shape::vector(out_features) {
                return Err(ModelError::Configuration(format!(
                    "linear bias must be [{out_features}], got {}",
                    b.shape()
                )));
            }
        }
        Ok(Self { weight, bias })
    }

    /// Width of the projected (last) input axis.
    pub fn in_features(&self) -> usize {
        self.weight.shape().dims()[1]
    }

    /// Width of the output's last axis.
    pub fn out_features(&self) -> usize {
        self.weight.shape().dims()[0]
    }

    /// Projects the last axis of `input` from `in_features` to
    /// `out_features`; all leading axes are preserved. A rank-1
    /// `(in_features)` input yields a rank-1 `(out_features)` output.
    pub fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        let shape = input.shape();
        if shape.last_dim() != Some(self.in_features()) {
            return Err(ModelError::ShapeMismatch {
                layer: "linear",
                expected: shape.with_last_dim(self.in_features()),
                actual: shape.clone(),
            });
        }
        if shape.rank() == 1 {
            let row = input
                .clone()
                .reshape(Shape::matrix(1, self.in_features()))
                .in_layer("linear")?;
            return self
                .forward(&row)?
                .reshape(Shape::vector(self.out_features()))
                .in_layer("linear");
        }

        let out_shape = shape.with_last_dim(self.out_features());
        let mut output = Tensor::zeros(out_shape.clone(), DType::F32);
        matmul_transposed(&input.view(), &self.weight.view(), &mut output).in_layer("linear")?;

        match &self.bias {
            Some(bias) => {
                let mut biased = Tensor::zeros(out_shape, DType::F32);
                add(&output.view(), &bias.view(), &mut biased).in_layer("linear")?;
                Ok(biased)
            }
            None => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(n: usize) -> Tensor {
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
        }
        Tensor::from_vec(Shape::matrix(n, n), values).unwrap()
    }

    #[test]
    fn test_identity_weight_zero_bias_returns_input() {
        let layer = LinearLayer::new(identity(4), Some(Tensor::zeros(Shape::vector(4), DType::F32)))
            .unwrap();
        let data: Vec<f32> = (0..12).map(|x| x as f32 * 0.5 - 2.0).collect();
        let input = Tensor::from_f32(Shape::from([1, 3, 4]), &data).unwrap();

        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), input.shape());
        assert_eq!(output.as_f32_slice(), input.as_f32_slice());
    }

    #[test]
    fn test_projection_and_bias() {
        // W = [[1, 1], [0, 2], [1, 0]] maps 2 → 3; b = [0, 1, -1].
        let weight =
            Tensor::from_f32(Shape::matrix(3, 2), &[1.0, 1.0, 0.0, 2.0, 1.0, 0.0]).unwrap();
        let bias = Tensor::from_f32(Shape::vector(3), &[0.0, 1.0, -1.0]).unwrap();
        let layer = LinearLayer::new(weight, Some(bias)).unwrap();
        let input = Tensor::from_f32(Shape::from([1, 2, 2]), &[1.0, 2.0, 3.0, 4.0]).unwrap();

        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &Shape::from([1, 2, 3]));
        assert_eq!(output.as_f32_slice(), &[3.0, 5.0, 0.0, 7.0, 9.0, 2.0]);
    }

    #[test]
    fn test_trailing_dim_mismatch_names_shapes() {
        let layer = LinearLayer::new(identity(4), None).unwrap();
        let input = Tensor::zeros(Shape::from([1, 5, 3]), DType::F32);

        match layer.forward(&input) {
            Err(ModelError::ShapeMismatch {
                layer,
                expected,
                actual,
            }) => {
                assert_eq!(layer, "linear");
                assert_eq!(expected, Shape::from([1, 5, 4]));
                assert_eq!(actual, Shape::from([1, 5, 3]));
            }
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_rank1_input_without_leading_dims() {
        let weight =
            Tensor::from_f32(Shape::matrix(3, 2), &[1.0, 1.0, 0.0, 2.0, 1.0, 0.0]).unwrap();
        let bias = Tensor::from_f32(Shape::vector(3), &[0.0, 1.0, -1.0]).unwrap();
        let layer = LinearLayer::new(weight, Some(bias)).unwrap();
        let input = Tensor::from_f32(Shape::vector(2), &[1.0, 2.0]).unwrap();

        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &Shape::vector(3));
        assert_eq!(output.as_f32_slice(), &[3.0, 5.0, 0.0]);
    }

    #[test]
    fn test_scalar_input_rejected() {
        let layer = LinearLayer::new(identity(4), None).unwrap();
        let input = Tensor::zeros(Shape::scalar(), DType::F32);
        assert!(matches!(
            layer.forward(&input),
            Err(ModelError::ShapeMismatch { layer: "linear", .. })
        ));
    }

    #[test]
    fn test_rejects_bad_weights() {
        assert!(matches!(
            LinearLayer::new(Tensor::zeros(Shape::vector(4), DType::F32), None),
            Err(ModelError::Configuration(_))
        ));
        assert!(matches!(
            LinearLayer::new(identity(4), Some(Tensor::zeros(Shape::vector(3), DType::F32))),
            Err(ModelError::Configuration(_))
        ));
    }
}
