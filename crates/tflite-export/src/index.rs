// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cross-reference indices: the integer ids every container section uses
//! to point at operator codes, buffers and tensors.
//!
//! Numbering is a deterministic function of node order and, within a node,
//! of operand order (inputs, outputs, weights). Buffer index 0 is always
//! the empty sentinel buffer.

use crate::{ExportError, IndexMap, OperationNode, OperatorKind};
use model_ir::{Finalized, ModelGraph, VariableId};
use std::collections::HashSet;
use std::fmt;
use tensor_core::Storage;

/// One entry of the buffer table.
///
/// Equality and hashing go through [`Storage`], i.e. by `BufferId`, so two
/// tensors sharing storage map to the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferSlot<'g> {
    /// The sentinel: no data.
    Empty,
    Data(&'g Storage),
}

impl fmt::Debug for BufferSlot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Data(s) => write!(f, "Data({}, {} bytes)", s.id(), s.len()),
        }
    }
}

impl<'g> BufferSlot<'g> {
    /// Slot for a variable: its storage if initialized and allocated,
    /// otherwise the sentinel.
    pub fn for_variable(
        graph: &'g ModelGraph<Finalized>,
        id: VariableId,
    ) -> Result<Self, ExportError> {
        let var = graph
            .variable(id)
            .ok_or_else(|| ExportError::InvalidGraph(format!("unknown variable {id}")))?;
        match var.tensor.storage() {
            Some(storage) if var.tensor.is_initialized() => Ok(Self::Data(storage)),
            _ => Ok(Self::Empty),
        }
    }

    /// Raw bytes held by the slot; empty for the sentinel.
    pub fn bytes(&self) -> &'g [u8] {
        match self {
            Self::Empty => &[],
            Self::Data(s) => s.as_bytes(),
        }
    }
}

/// The three index maps shared by all section builders.
#[derive(Debug)]
pub struct ExportIndex<'g> {
    pub opcodes: IndexMap<OperatorKind>,
    pub buffers: IndexMap<BufferSlot<'g>>,
    pub tensors: IndexMap<VariableId>,
    /// Variables consumed as layer weights; only these may own a buffer.
    weights: HashSet<VariableId>,
}

impl<'g> ExportIndex<'g> {
    /// Scans `nodes` once and numbers every operator kind, tensor and
    /// weight buffer they reference.
    ///
    /// Graph inputs and outputs are indexed after the nodes; for a graph
    /// whose inputs are all consumed and outputs all produced this adds
    /// nothing.
    pub fn build(
        graph: &'g ModelGraph<Finalized>,
        nodes: &[OperationNode],
    ) -> Result<Self, ExportError> {
        let mut index = Self {
            opcodes: IndexMap::new(),
            buffers: IndexMap::new(),
            tensors: IndexMap::new(),
            weights: HashSet::new(),
        };
        index.buffers.add(BufferSlot::Empty);

        for node in nodes {
            index.opcodes.add(node.kind());

            for &id in node.inputs().iter().chain(node.outputs()).chain(node.weights()) {
                index.tensors.add(id);
            }

            for &id in node.weights() {
                index.weights.insert(id);
                match BufferSlot::for_variable(graph, id)? {
                    BufferSlot::Empty => {
                        tracing::warn!(
                            layer = node.name(),
                            weight = %id,
                            "weight has no data, exporting with empty buffer"
                        );
                    }
                    slot => {
                        index.buffers.add(slot);
                    }
                }
            }
        }

        for &id in graph.inputs().iter().chain(graph.outputs()) {
            index.tensors.add(id);
        }

        tracing::debug!(
            opcodes = index.opcodes.len(),
            buffers = index.buffers.len(),
            tensors = index.tensors.len(),
            "built export index"
        );
        Ok(index)
    }

    /// Buffer index for a tensor: the index of its storage if the tensor
    /// is a layer weight with data, otherwise 0.
    ///
    /// A non-weight tensor gets 0 even when it shares storage with a weight.
    pub fn buffer_index(
        &self,
        graph: &'g ModelGraph<Finalized>,
        id: VariableId,
    ) -> Result<u32, ExportError> {
        if !self.weights.contains(&id) {
            return Ok(0);
        }
        let slot = BufferSlot::for_variable(graph, id)?;
        if self.buffers.contains(&slot) {
            self.buffers.index_of(&slot)
        } else {
            Ok(0)
        }
    }

    /// Tensor index narrowed to the `i32` the container stores.
    pub fn tensor_index(&self, id: VariableId) -> Result<i32, ExportError> {
        let index = self.tensors.index_of(&id)?;
        i32::try_from(index)
            .map_err(|_| ExportError::InvalidGraph(format!("tensor index {index} exceeds i32")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::lower;
    use model_ir::{LayerNode, Loaded};
    use tensor_core::{DType, Shape, Tensor};

    // ── Helpers ──

    /// x → fc1(w1, b1) → h → relu → a → fc2(w2) → y
    fn mlp() -> ModelGraph<Finalized> {
        let mut g: ModelGraph<Loaded> = ModelGraph::new("mlp");
        let x = g.add_variable("x", Tensor::placeholder(Shape::matrix(1, 4), DType::F32));
        let w1 = g.add_variable("fc1.weight", Tensor::zeros(Shape::matrix(8, 4), DType::F32));
        let b1 = g.add_variable("fc1.bias", Tensor::zeros(Shape::vector(8), DType::F32));
        let h = g.add_variable("h", Tensor::placeholder(Shape::matrix(1, 8), DType::F32));
        let a = g.add_variable("a", Tensor::placeholder(Shape::matrix(1, 8), DType::F32));
        let w2 = g.add_variable("fc2.weight", Tensor::zeros(Shape::matrix(2, 8), DType::F32));
        let y = g.add_variable("y", Tensor::placeholder(Shape::matrix(1, 2), DType::F32));
        g.add_node(
            LayerNode::new("fc1", "fully_connected")
                .with_inputs([x])
                .with_outputs([h])
                .with_weights([w1, b1]),
        );
        g.add_node(LayerNode::new("relu", "relu").with_inputs([h]).with_outputs([a]));
        g.add_node(
            LayerNode::new("fc2", "fully_connected")
                .with_inputs([a])
                .with_outputs([y])
                .with_weights([w2]),
        );
        g.set_inputs(vec![x]);
        g.set_outputs(vec![y]);
        g.finalize().unwrap()
    }

    fn index_of_name(graph: &ModelGraph<Finalized>, index: &ExportIndex<'_>, name: &str) -> u32 {
        let id = graph.find_variable(name).unwrap();
        index.tensors.index_of(&id).unwrap()
    }

    // ── Ordering ──

    #[test]
    fn test_sentinel_is_buffer_zero() {
        let graph = mlp();
        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();
        assert_eq!(index.buffers.value_at(0).unwrap(), &BufferSlot::Empty);
        assert_eq!(index.buffers.len(), 4);
    }

    #[test]
    fn test_opcode_first_seen_order() {
        let graph = mlp();
        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();
        let kinds: Vec<_> = index.opcodes.iter().copied().collect();
        assert_eq!(kinds, vec![OperatorKind::FullyConnected, OperatorKind::Relu]);
    }

    #[test]
    fn test_tensor_order_inputs_outputs_weights() {
        let graph = mlp();
        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();
        let order = ["x", "h", "fc1.weight", "fc1.bias", "a", "y", "fc2.weight"];
        for (expected, name) in order.iter().enumerate() {
            assert_eq!(index_of_name(&graph, &index, name), expected as u32, "{name}");
        }
        assert_eq!(index.tensors.len(), order.len());
    }

    #[test]
    fn test_buffer_index_for_weights_and_activations() {
        let graph = mlp();
        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();
        let buf = |name: &str| {
            let id = graph.find_variable(name).unwrap();
            index.buffer_index(&graph, id).unwrap()
        };
        assert_eq!(buf("fc1.weight"), 1);
        assert_eq!(buf("fc1.bias"), 2);
        assert_eq!(buf("fc2.weight"), 3);
        assert_eq!(buf("x"), 0);
        assert_eq!(buf("h"), 0);
    }

    #[test]
    fn test_input_sharing_weight_storage_gets_sentinel() {
        let mut g: ModelGraph<Loaded> = ModelGraph::new("aliased");
        let shared = Tensor::zeros(Shape::vector(4), DType::F32);
        let x = g.add_variable("x", shared.clone());
        let w = g.add_variable("w", shared);
        let y = g.add_variable("y", Tensor::placeholder(Shape::vector(4), DType::F32));
        g.add_node(
            LayerNode::new("sum", "add")
                .with_inputs([x])
                .with_outputs([y])
                .with_weights([w]),
        );
        g.set_inputs(vec![x]);
        g.set_outputs(vec![y]);
        let graph = g.finalize().unwrap();

        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();
        assert_eq!(index.buffers.len(), 2);
        assert_eq!(index.buffer_index(&graph, w).unwrap(), 1);
        assert_eq!(index.buffer_index(&graph, x).unwrap(), 0);
    }

    // ── Buffer identity ──

    #[test]
    fn test_no_weights_gives_single_buffer() {
        let mut g: ModelGraph<Loaded> = ModelGraph::new("act");
        let x = g.add_variable("x", Tensor::placeholder(Shape::vector(4), DType::F32));
        let y = g.add_variable("y", Tensor::placeholder(Shape::vector(4), DType::F32));
        g.add_node(LayerNode::new("act", "tanh").with_inputs([x]).with_outputs([y]));
        g.set_inputs(vec![x]);
        g.set_outputs(vec![y]);
        let graph = g.finalize().unwrap();

        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();
        assert_eq!(index.buffers.len(), 1);
        assert_eq!(index.tensors.len(), 2);
    }

    #[test]
    fn test_shared_storage_is_one_buffer() {
        let mut g: ModelGraph<Loaded> = ModelGraph::new("tied");
        let shared = Tensor::zeros(Shape::matrix(4, 4), DType::F32);
        let x = g.add_variable("x", Tensor::placeholder(Shape::matrix(1, 4), DType::F32));
        let w_a = g.add_variable("a.weight", shared.clone());
        let w_b = g.add_variable("b.weight", shared);
        let h = g.add_variable("h", Tensor::placeholder(Shape::matrix(1, 4), DType::F32));
        let y = g.add_variable("y", Tensor::placeholder(Shape::matrix(1, 4), DType::F32));
        g.add_node(
            LayerNode::new("a", "fc")
                .with_inputs([x])
                .with_outputs([h])
                .with_weights([w_a]),
        );
        g.add_node(
            LayerNode::new("b", "fc")
                .with_inputs([h])
                .with_outputs([y])
                .with_weights([w_b]),
        );
        g.set_inputs(vec![x]);
        g.set_outputs(vec![y]);
        let graph = g.finalize().unwrap();

        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();
        assert_eq!(index.buffers.len(), 2);
        assert_eq!(index.buffer_index(&graph, w_a).unwrap(), 1);
        assert_eq!(index.buffer_index(&graph, w_b).unwrap(), 1);
        // Distinct variables still get distinct tensor entries.
        assert_ne!(index.tensor_index(w_a).unwrap(), index.tensor_index(w_b).unwrap());
    }

    #[test]
    fn test_equal_bytes_distinct_storage_are_two_buffers() {
        let mut g: ModelGraph<Loaded> = ModelGraph::new("twins");
        let x = g.add_variable("x", Tensor::placeholder(Shape::vector(2), DType::F32));
        let w1 = g.add_variable("w1", Tensor::zeros(Shape::vector(2), DType::F32));
        let w2 = g.add_variable("w2", Tensor::zeros(Shape::vector(2), DType::F32));
        let y = g.add_variable("y", Tensor::placeholder(Shape::vector(2), DType::F32));
        g.add_node(
            LayerNode::new("sum", "add")
                .with_inputs([x])
                .with_outputs([y])
                .with_weights([w1, w2]),
        );
        g.set_inputs(vec![x]);
        g.set_outputs(vec![y]);
        let graph = g.finalize().unwrap();

        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();
        assert_eq!(index.buffers.len(), 3);
    }

    #[test]
    fn test_unallocated_weight_maps_to_sentinel() {
        let mut g: ModelGraph<Loaded> = ModelGraph::new("lazy");
        let x = g.add_variable("x", Tensor::placeholder(Shape::vector(4), DType::F32));
        let w = g.add_variable("w", Tensor::placeholder(Shape::matrix(4, 4), DType::F32));
        let u = g.add_variable("u", Tensor::uninitialized(DType::F32));
        let y = g.add_variable("y", Tensor::placeholder(Shape::vector(4), DType::F32));
        g.add_node(
            LayerNode::new("fc", "fc")
                .with_inputs([x])
                .with_outputs([y])
                .with_weights([w, u]),
        );
        g.set_inputs(vec![x]);
        g.set_outputs(vec![y]);
        let graph = g.finalize().unwrap();

        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();
        assert_eq!(index.buffers.len(), 1);
        assert_eq!(index.buffer_index(&graph, w).unwrap(), 0);
        assert_eq!(index.buffer_index(&graph, u).unwrap(), 0);
        assert!(index.tensors.contains(&u));
    }

    #[test]
    fn test_build_is_deterministic() {
        let graph = mlp();
        let nodes = lower(&graph).unwrap();
        let a = ExportIndex::build(&graph, &nodes).unwrap();
        let b = ExportIndex::build(&graph, &nodes).unwrap();
        assert!(a.tensors.iter().eq(b.tensors.iter()));
        assert!(a.opcodes.iter().eq(b.opcodes.iter()));
        assert!(a.buffers.iter().eq(b.buffers.iter()));
    }
}
