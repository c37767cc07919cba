// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the export path.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use model_ir::{Finalized, LayerNode, Loaded, ModelGraph};
use tensor_core::{DType, Shape, Tensor};
use tflite_export::{lower, ExportIndex, TfliteInterpreter};

/// A stack of `depth` fully connected layers of width `width`.
fn mlp(depth: usize, width: usize) -> ModelGraph<Finalized> {
    let mut g: ModelGraph<Loaded> = ModelGraph::new("bench-mlp");
    let mut prev = g.add_variable("x", Tensor::placeholder(Shape::matrix(1, width), DType::F32));
    let input = prev;
    for i in 0..depth {
        let w = g.add_variable(
            format!("fc{i}.weight"),
            Tensor::zeros(Shape::matrix(width, width), DType::F32),
        );
        let b = g.add_variable(
            format!("fc{i}.bias"),
            Tensor::zeros(Shape::vector(width), DType::F32),
        );
        let out = g.add_variable(
            format!("h{i}"),
            Tensor::placeholder(Shape::matrix(1, width), DType::F32),
        );
        g.add_node(
            LayerNode::new(format!("fc{i}"), "fully_connected")
                .with_inputs([prev])
                .with_outputs([out])
                .with_weights([w, b])
                .with_property("activation", "relu"),
        );
        prev = out;
    }
    g.set_inputs(vec![input]);
    g.set_outputs(vec![prev]);
    g.finalize().expect("benchmark graph is valid")
}

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    for depth in [8, 64, 256] {
        let graph = mlp(depth, 16);
        let nodes = lower(&graph).expect("lowering succeeds");
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| ExportIndex::build(black_box(&graph), black_box(&nodes)))
        });
    }
    group.finish();
}

fn bench_to_bytes(c: &mut Criterion) {
    let interp = TfliteInterpreter::default();
    let mut group = c.benchmark_group("to_bytes");
    for width in [64, 256, 1024] {
        let graph = mlp(4, width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            b.iter(|| interp.to_bytes(black_box(&graph)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_index_build, bench_to_bytes);
criterion_main!(benches);
