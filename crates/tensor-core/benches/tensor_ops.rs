// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for tensor operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tensor_core::{matmul, matmul_transposed, softmax, DType, Shape, Tensor};

fn ramp(shape: Shape) -> Tensor {
    let n = shape.num_elements();
    let values = (0..n).map(|i| ((i % 17) as f32 - 8.0) * 0.01).collect();
    Tensor::from_vec(shape, values).expect("element count matches shape")
}

fn bench_matmul(c: &mut Criterion) {
    let mut group = c.benchmark_group("matmul");
    for &size in &[16usize, 64, 128] {
        let a = ramp(Shape::matrix(size, size));
        let b = ramp(Shape::matrix(size, size));
        let mut out = Tensor::zeros(Shape::matrix(size, size), DType::F32);

        group.bench_with_input(BenchmarkId::new("nn", size), &size, |bench, _| {
            bench.iter(|| matmul(&a.view(), &b.view(), black_box(&mut out)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("nt", size), &size, |bench, _| {
            bench.iter(|| matmul_transposed(&a.view(), &b.view(), black_box(&mut out)).unwrap())
        });
    }
    group.finish();
}

fn bench_softmax(c: &mut Criterion) {
    let mut group = c.benchmark_group("softmax");
    for &seq in &[8usize, 64, 256] {
        // Attention-score layout: [batch, heads, seq, seq].
        let shape = Shape::from([1, 4, seq, seq]);
        let input = ramp(shape.clone());
        let mut out = Tensor::zeros(shape, DType::F32);

        group.bench_with_input(BenchmarkId::from_parameter(seq), &seq, |bench, _| {
            bench.iter(|| softmax(&input.view(), black_box(&mut out)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_matmul, bench_softmax);
criterion_main!(benches);
