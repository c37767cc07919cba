// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tflite-export
//!
//! Compiles a finalized [`model_ir::ModelGraph`] into a TensorFlow Lite
//! FlatBuffer container (identifier `TFL3`, schema version 3).
//!
//! The pipeline:
//! 1. [`lower`] turns each layer into an [`OperationNode`] with a resolved
//!    [`OperatorKind`].
//! 2. [`ExportIndex::build`] numbers operator kinds, weight buffers and
//!    tensors with [`IndexMap`]s. Buffer 0 is always the empty sentinel.
//! 3. The section builders and [`assembler::assemble`] emit the buffer
//!    table, operator-code table, subgraph and root `Model`.
//! 4. [`writer::verify`] checks the bytes against the schema before
//!    [`writer::write_atomic`] puts them on disk.
//!
//! [`TfliteInterpreter`] drives all four steps.
//!
//! # Example
//! ```
//! use model_ir::{LayerNode, ModelGraph};
//! use tensor_core::{DType, Shape, Tensor};
//! use tflite_export::{ContainerSummary, TfliteInterpreter};
//!
//! let mut graph = ModelGraph::new("dense");
//! let x = graph.add_variable("x", Tensor::placeholder(Shape::matrix(1, 3), DType::F32));
//! let w = graph.add_variable("w", Tensor::zeros(Shape::matrix(2, 3), DType::F32));
//! let y = graph.add_variable("y", Tensor::placeholder(Shape::matrix(1, 2), DType::F32));
//! graph.add_node(
//!     LayerNode::new("fc", "dense")
//!         .with_inputs([x])
//!         .with_outputs([y])
//!         .with_weights([w]),
//! );
//! graph.set_inputs(vec![x]);
//! graph.set_outputs(vec![y]);
//! let graph = graph.finalize().unwrap();
//!
//! let bytes = TfliteInterpreter::default().to_bytes(&graph).unwrap();
//! let summary = ContainerSummary::from_bytes(&bytes).unwrap();
//! assert_eq!(summary.operators.len(), 1);
//! assert_eq!(summary.buffer_sizes, vec![0, 24]);
//! ```

pub mod assembler;
mod config;
mod error;
pub mod index;
mod index_map;
mod inspect;
mod interpreter;
pub mod operation;
pub mod schema;
pub mod sections;
pub mod writer;

pub use config::{ExportConfig, DEFAULT_DESCRIPTION};
pub use error::ExportError;
pub use index::{BufferSlot, ExportIndex};
pub use index_map::IndexMap;
pub use inspect::{ContainerSummary, OperatorSummary, TensorSummary};
pub use interpreter::{ExportSummary, GraphInterpreter, TfliteInterpreter};
pub use operation::{lower, Activation, BuiltinOptions, OperationNode, OperatorKind};
