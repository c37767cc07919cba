// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! The in-memory computation graph consumed by the model exporter.
//!
//! - [`Variable`] / [`VariableId`] — named tensors stored in a graph-owned
//!   arena; the id is the tensor's identity.
//! - [`LayerNode`] — one computation: symbolic type, operand references,
//!   string properties.
//! - [`ModelGraph`] — variables plus layers in execution order, with a
//!   **type-state pattern** (`Loaded` → `Finalized`).
//! - [`ModelLoader`] — builds a finalized graph from a JSON manifest +
//!   SafeTensors weight file.
//! - [`ModelManifest`] — the JSON model descriptor.
//!
//! # Example
//! ```
//! use model_ir::{LayerNode, ModelGraph};
//! use tensor_core::{DType, Shape, Tensor};
//!
//! let mut graph = ModelGraph::new("relu-only");
//! let x = graph.add_variable("x", Tensor::placeholder(Shape::vector(4), DType::F32));
//! let y = graph.add_variable("y", Tensor::placeholder(Shape::vector(4), DType::F32));
//! graph.add_node(LayerNode::new("act", "relu").with_inputs([x]).with_outputs([y]));
//! graph.set_inputs(vec![x]);
//! graph.set_outputs(vec![y]);
//!
//! let graph = graph.finalize().unwrap();
//! assert_eq!(graph.num_nodes(), 1);
//! ```

mod error;
pub mod graph;
mod layer;
mod loader;
pub mod manifest;
mod variable;

pub use error::ModelError;
pub use graph::{Finalized, Loaded, ModelGraph};
pub use layer::LayerNode;
pub use loader::ModelLoader;
pub use manifest::ModelManifest;
pub use variable::{Variable, VariableId};
