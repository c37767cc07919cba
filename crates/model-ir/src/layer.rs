// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer nodes of the computation graph.
//!
//! A [`LayerNode`] names its computation with a free-form, symbolic
//! `layer_type` string (e.g. `"fully_connected"`). Deciding which strings
//! are supported is the consumer's job; the graph only records them.
//! Tensors are referenced by [`VariableId`], never embedded.

use crate::VariableId;
use std::collections::BTreeMap;

/// A single computation in the model graph.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerNode {
    /// Unique identifier for this layer (e.g., `"fc1"`).
    pub name: String,
    /// Symbolic type of the computation (e.g., `"fully_connected"`).
    pub layer_type: String,
    /// Activations consumed by the layer, in operand order.
    pub inputs: Vec<VariableId>,
    /// Activations produced by the layer, in operand order.
    pub outputs: Vec<VariableId>,
    /// Trainable parameters, in operand order (e.g. weight then bias).
    pub weights: Vec<VariableId>,
    /// Unparsed layer properties (e.g., `activation = "relu"`).
    pub properties: BTreeMap<String, String>,
}

impl LayerNode {
    /// Creates a node with no operands and no properties.
    pub fn new(name: impl Into<String>, layer_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layer_type: layer_type.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            weights: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = VariableId>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = VariableId>) -> Self {
        self.outputs.extend(outputs);
        self
    }

    pub fn with_weights(mut self, weights: impl IntoIterator<Item = VariableId>) -> Self {
        self.weights.extend(weights);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Looks up a property by key.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Iterates over every tensor reference: inputs, outputs, then weights.
    pub fn references(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .chain(&self.weights)
            .copied()
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}) — {} in, {} out, {} weights",
            self.name,
            self.layer_type,
            self.inputs.len(),
            self.outputs.len(),
            self.weights.len(),
        )
    }
}
