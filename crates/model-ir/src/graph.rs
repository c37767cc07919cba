// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model graph: a variable arena plus a topologically ordered node list.
//!
//! # Type-State Pattern
//!
//! The graph transitions through states enforced at compile time:
//!
//! ```text
//! ModelGraph<Loaded>     — variables and layers added, not yet checked.
//!       │  .finalize()
//!       ▼
//! ModelGraph<Finalized>  — references and ordering verified, read-only.
//! ```
//!
//! Exporters only accept `ModelGraph<Finalized>`, so they never see a graph
//! with dangling references or an invalid execution order. Finalization
//! checks the order it is given; it does not sort.

use crate::{LayerNode, ModelError, Variable, VariableId};
use std::collections::HashSet;
use std::fmt;
use tensor_core::Tensor;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph is being built and has not been checked.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been finalized and is ready for export.
#[derive(Debug, Clone)]
pub struct Finalized;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Finalized {}

// ── ModelGraph ─────────────────────────────────────────────────────

/// The complete model: named tensors and the layers connecting them.
///
/// Layers are kept in execution order. The generic parameter `S` encodes
/// the finalization state at compile time.
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Loaded> {
    /// Human-readable model name (e.g., `"mnist-mlp"`).
    pub name: String,
    variables: Vec<Variable>,
    nodes: Vec<LayerNode>,
    inputs: Vec<VariableId>,
    outputs: Vec<VariableId>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl ModelGraph<Loaded> {
    /// Creates an empty graph in the `Loaded` state.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            nodes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            _state: std::marker::PhantomData,
        }
    }

    /// Adds a named tensor to the arena and returns its handle.
    pub fn add_variable(&mut self, name: impl Into<String>, tensor: Tensor) -> VariableId {
        let id = VariableId(self.variables.len());
        self.variables.push(Variable {
            name: name.into(),
            tensor,
        });
        id
    }

    /// Appends a layer. Layers must be added in execution order.
    pub fn add_node(&mut self, node: LayerNode) {
        self.nodes.push(node);
    }

    /// Declares the tensors fed by the caller at inference time.
    pub fn set_inputs(&mut self, inputs: Vec<VariableId>) {
        self.inputs = inputs;
    }

    /// Declares the tensors returned to the caller at inference time.
    pub fn set_outputs(&mut self, outputs: Vec<VariableId>) {
        self.outputs = outputs;
    }

    /// Checks the graph and transitions to the `Finalized` state.
    ///
    /// # Checks
    /// - The graph has at least one layer.
    /// - Layer names are unique.
    /// - Every referenced variable exists.
    /// - Every layer input is a graph input or is produced by an earlier
    ///   layer, so the given order is a valid execution order.
    /// - No variable is produced twice.
    /// - Layer inputs and outputs have known, non-empty shapes.
    /// - No tensor's byte size overflows `usize`.
    pub fn finalize(self) -> Result<ModelGraph<Finalized>, ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidGraph(
                "model graph contains no layers".into(),
            ));
        }

        let in_range = |id: &VariableId| id.0 < self.variables.len();

        for var in &self.variables {
            if var.tensor.shape().checked_size_bytes(var.tensor.dtype()).is_none() {
                return Err(ModelError::InvalidGraph(format!(
                    "tensor '{}' with shape {} overflows the addressable size",
                    var.name,
                    var.tensor.shape()
                )));
            }
        }

        for id in self.inputs.iter().chain(&self.outputs) {
            if !in_range(id) {
                return Err(ModelError::InvalidGraph(format!(
                    "graph input/output {id} does not exist"
                )));
            }
        }

        let mut names = HashSet::new();
        let mut available: HashSet<VariableId> = self.inputs.iter().copied().collect();
        let mut produced = HashSet::new();

        for node in &self.nodes {
            if !names.insert(node.name.as_str()) {
                return Err(ModelError::InvalidLayer {
                    layer: node.name.clone(),
                    detail: "duplicate layer name".into(),
                });
            }

            if let Some(bad) = node.references().find(|id| !in_range(id)) {
                return Err(ModelError::InvalidLayer {
                    layer: node.name.clone(),
                    detail: format!("references unknown variable {bad}"),
                });
            }

            for id in &node.inputs {
                if !available.contains(id) {
                    return Err(ModelError::InvalidLayer {
                        layer: node.name.clone(),
                        detail: format!(
                            "input '{}' is not produced by an earlier layer",
                            self.variables[id.0].name
                        ),
                    });
                }
            }

            for id in node.inputs.iter().chain(&node.outputs) {
                if !self.variables[id.0].tensor.is_initialized() {
                    return Err(ModelError::InvalidLayer {
                        layer: node.name.clone(),
                        detail: format!(
                            "activation '{}' has zero elements",
                            self.variables[id.0].name
                        ),
                    });
                }
            }

            for id in &node.outputs {
                if !produced.insert(*id) {
                    return Err(ModelError::InvalidLayer {
                        layer: node.name.clone(),
                        detail: format!(
                            "output '{}' is produced more than once",
                            self.variables[id.0].name
                        ),
                    });
                }
                available.insert(*id);
            }
        }

        for id in &self.outputs {
            if !available.contains(id) {
                tracing::warn!(
                    "graph output '{}' is not produced by any layer",
                    self.variables[id.0].name,
                );
            }
        }

        Ok(ModelGraph {
            name: self.name,
            variables: self.variables,
            nodes: self.nodes,
            inputs: self.inputs,
            outputs: self.outputs,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Finalized state ────────────────────────────────────────────────

impl ModelGraph<Finalized> {
    /// Returns the total number of layers.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns an iterator over the layers in execution order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &LayerNode> {
        self.nodes.iter()
    }

    /// Returns a reference to a layer by position.
    pub fn node(&self, index: usize) -> Option<&LayerNode> {
        self.nodes.get(index)
    }

    /// Returns the total bytes held by allocated weight buffers, counting
    /// shared buffers once.
    pub fn total_weight_bytes(&self) -> usize {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .flat_map(|n| &n.weights)
            .filter_map(|id| self.variables[id.0].tensor.storage())
            .filter(|s| seen.insert(s.id()))
            .map(|s| s.len())
            .sum()
    }

    /// Returns a summary string describing the model.
    pub fn summary(&self) -> String {
        let total_weight_kb = self.total_weight_bytes() as f64 / 1024.0;
        format!(
            "Model '{}': {} layers, {} tensors, {:.1} KB weights",
            self.name,
            self.num_nodes(),
            self.variables.len(),
            total_weight_kb,
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> ModelGraph<S> {
    /// Returns a variable by handle.
    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    /// Returns every variable in arena order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Looks up a variable handle by name.
    pub fn find_variable(&self, name: &str) -> Option<VariableId> {
        self.variables
            .iter()
            .position(|v| v.name == name)
            .map(VariableId)
    }

    /// Returns the graph-level input tensors.
    pub fn inputs(&self) -> &[VariableId] {
        &self.inputs
    }

    /// Returns the graph-level output tensors.
    pub fn outputs(&self) -> &[VariableId] {
        &self.outputs
    }
}

impl<S: GraphState> fmt::Display for ModelGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ModelGraph '{}' ({} layers):", self.name, self.nodes.len())?;
        for node in &self.nodes {
            writeln!(f, "  {}", node.summary())?;
        }
        Ok(())
    }
}
