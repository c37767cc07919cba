// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operation lowering: one finalized graph node → one [`OperationNode`].
//!
//! Lowering resolves the node's symbolic layer type to a closed
//! [`OperatorKind`] and parses the few properties that become operator
//! options. Tensor references are copied as [`VariableId`] handles; no
//! tensor data moves. A node maps to exactly one operator: there is no
//! splitting and no fusion.

use crate::schema::{activation, builtin_op};
use crate::ExportError;
use model_ir::{Finalized, LayerNode, ModelGraph, VariableId};
use std::fmt;

// ── OperatorKind ───────────────────────────────────────────────────

/// Operators the exporter can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    FullyConnected,
    Add,
    Relu,
    Logistic,
    Tanh,
    Softmax,
    Reshape,
}

impl OperatorKind {
    /// Resolves a layer type string. Matching is case-insensitive.
    pub fn from_layer_type(layer_type: &str) -> Option<Self> {
        let kind = match layer_type.to_ascii_lowercase().as_str() {
            "fully_connected" | "fc" | "dense" | "linear" => Self::FullyConnected,
            "add" | "addition" => Self::Add,
            "relu" => Self::Relu,
            "logistic" | "sigmoid" => Self::Logistic,
            "tanh" => Self::Tanh,
            "softmax" => Self::Softmax,
            "reshape" | "flatten" => Self::Reshape,
            _ => return None,
        };
        Some(kind)
    }

    /// The `BuiltinOperator` code written into the operator-code table.
    pub fn builtin_code(self) -> i32 {
        match self {
            Self::FullyConnected => builtin_op::FULLY_CONNECTED,
            Self::Add => builtin_op::ADD,
            Self::Relu => builtin_op::RELU,
            Self::Logistic => builtin_op::LOGISTIC,
            Self::Tanh => builtin_op::TANH,
            Self::Softmax => builtin_op::SOFTMAX,
            Self::Reshape => builtin_op::RESHAPE,
        }
    }

    /// Inverse of [`OperatorKind::builtin_code`].
    pub fn from_builtin_code(code: i32) -> Option<Self> {
        [
            Self::FullyConnected,
            Self::Add,
            Self::Relu,
            Self::Logistic,
            Self::Tanh,
            Self::Softmax,
            Self::Reshape,
        ]
        .into_iter()
        .find(|k| k.builtin_code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullyConnected => "FULLY_CONNECTED",
            Self::Add => "ADD",
            Self::Relu => "RELU",
            Self::Logistic => "LOGISTIC",
            Self::Tanh => "TANH",
            Self::Softmax => "SOFTMAX",
            Self::Reshape => "RESHAPE",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Options ────────────────────────────────────────────────────────

/// Fused activation applied to an operator's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    #[default]
    None,
    Relu,
    ReluN1To1,
    Relu6,
    Tanh,
}

impl Activation {
    fn parse(value: &str) -> Option<Self> {
        let act = match value.to_ascii_lowercase().as_str() {
            "none" | "linear" => Self::None,
            "relu" => Self::Relu,
            "relu_n1_to_1" => Self::ReluN1To1,
            "relu6" => Self::Relu6,
            "tanh" => Self::Tanh,
            _ => return None,
        };
        Some(act)
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            activation::NONE => Some(Self::None),
            activation::RELU => Some(Self::Relu),
            activation::RELU_N1_TO_1 => Some(Self::ReluN1To1),
            activation::RELU6 => Some(Self::Relu6),
            activation::TANH => Some(Self::Tanh),
            _ => None,
        }
    }

    /// `ActivationFunctionType` value.
    pub fn code(self) -> i8 {
        match self {
            Self::None => activation::NONE,
            Self::Relu => activation::RELU,
            Self::ReluN1To1 => activation::RELU_N1_TO_1,
            Self::Relu6 => activation::RELU6,
            Self::Tanh => activation::TANH,
        }
    }
}

/// Per-operator option tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuiltinOptions {
    FullyConnected { activation: Activation },
    Softmax { beta: f32 },
}

// ── OperationNode ──────────────────────────────────────────────────

/// A graph node with its operator resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationNode {
    name: String,
    kind: OperatorKind,
    inputs: Vec<VariableId>,
    outputs: Vec<VariableId>,
    weights: Vec<VariableId>,
    options: Option<BuiltinOptions>,
}

impl OperationNode {
    /// Lowers a single layer.
    pub fn from_layer(node: &LayerNode) -> Result<Self, ExportError> {
        let kind = OperatorKind::from_layer_type(&node.layer_type).ok_or_else(|| {
            ExportError::UnsupportedOperator {
                layer: node.name.clone(),
                layer_type: node.layer_type.clone(),
            }
        })?;

        Ok(Self {
            name: node.name.clone(),
            kind,
            inputs: node.inputs.clone(),
            outputs: node.outputs.clone(),
            weights: node.weights.clone(),
            options: parse_options(kind, node)?,
        })
    }

    /// Source layer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    pub fn inputs(&self) -> &[VariableId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[VariableId] {
        &self.outputs
    }

    pub fn weights(&self) -> &[VariableId] {
        &self.weights
    }

    pub fn options(&self) -> Option<BuiltinOptions> {
        self.options
    }

    /// Operator operands as written to the container: activations followed
    /// by weights, e.g. `[input, filter, bias]` for a fully connected layer.
    pub fn operands(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.inputs.iter().chain(&self.weights).copied()
    }
}

fn parse_options(
    kind: OperatorKind,
    node: &LayerNode,
) -> Result<Option<BuiltinOptions>, ExportError> {
    let invalid = |key: &str, value: &str| ExportError::InvalidProperty {
        layer: node.name.clone(),
        key: key.to_string(),
        value: value.to_string(),
    };

    match kind {
        OperatorKind::FullyConnected => {
            let activation = match node.property("activation") {
                Some(v) => Activation::parse(v).ok_or_else(|| invalid("activation", v))?,
                None => Activation::None,
            };
            Ok(Some(BuiltinOptions::FullyConnected { activation }))
        }
        OperatorKind::Softmax => {
            let beta = match node.property("beta") {
                Some(v) => v
                    .trim()
                    .parse::<f32>()
                    .ok()
                    .filter(|b| b.is_finite())
                    .ok_or_else(|| invalid("beta", v))?,
                None => 1.0,
            };
            Ok(Some(BuiltinOptions::Softmax { beta }))
        }
        _ => Ok(None),
    }
}

/// Lowers every node of `graph`, in graph order.
///
/// The first unsupported layer aborts lowering; no partial list is returned.
pub fn lower(graph: &ModelGraph<Finalized>) -> Result<Vec<OperationNode>, ExportError> {
    graph.iter_nodes().map(OperationNode::from_layer).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::Loaded;
    use tensor_core::{DType, Shape, Tensor};

    fn single_layer(
        node: impl FnOnce(VariableId, VariableId) -> LayerNode,
    ) -> ModelGraph<Finalized> {
        let mut g: ModelGraph<Loaded> = ModelGraph::new("single");
        let x = g.add_variable("x", Tensor::placeholder(Shape::vector(4), DType::F32));
        let y = g.add_variable("y", Tensor::placeholder(Shape::vector(4), DType::F32));
        g.add_node(node(x, y));
        g.set_inputs(vec![x]);
        g.set_outputs(vec![y]);
        g.finalize().unwrap()
    }

    // ── OperatorKind ──

    #[test]
    fn test_layer_type_aliases() {
        assert_eq!(OperatorKind::from_layer_type("FC"), Some(OperatorKind::FullyConnected));
        assert_eq!(OperatorKind::from_layer_type("Dense"), Some(OperatorKind::FullyConnected));
        assert_eq!(OperatorKind::from_layer_type("sigmoid"), Some(OperatorKind::Logistic));
        assert_eq!(OperatorKind::from_layer_type("flatten"), Some(OperatorKind::Reshape));
        assert_eq!(OperatorKind::from_layer_type("dropout"), None);
    }

    #[test]
    fn test_builtin_codes() {
        assert_eq!(OperatorKind::FullyConnected.builtin_code(), 9);
        assert_eq!(OperatorKind::Add.builtin_code(), 0);
        assert_eq!(OperatorKind::Softmax.builtin_code(), 25);
        assert_eq!(OperatorKind::from_builtin_code(28), Some(OperatorKind::Tanh));
        assert_eq!(OperatorKind::from_builtin_code(3), None);
    }

    // ── Lowering ──

    #[test]
    fn test_lower_preserves_order_and_handles() {
        let graph =
            single_layer(|x, y| LayerNode::new("act", "relu").with_inputs([x]).with_outputs([y]));
        let nodes = lower(&graph).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name(), "act");
        assert_eq!(nodes[0].kind(), OperatorKind::Relu);
        assert_eq!(nodes[0].inputs(), graph.inputs());
        assert_eq!(nodes[0].outputs(), graph.outputs());
        assert_eq!(nodes[0].options(), None);
    }

    #[test]
    fn test_unsupported_operator() {
        let graph = single_layer(|x, y| {
            LayerNode::new("drop", "dropout")
                .with_inputs([x])
                .with_outputs([y])
        });
        let err = lower(&graph).unwrap_err();
        assert!(matches!(
            err,
            ExportError::UnsupportedOperator { ref layer, ref layer_type }
                if layer == "drop" && layer_type == "dropout"
        ));
    }

    #[test]
    fn test_fully_connected_activation() {
        let graph = single_layer(|x, y| {
            LayerNode::new("fc", "dense")
                .with_inputs([x])
                .with_outputs([y])
                .with_property("activation", "ReLU6")
        });
        let nodes = lower(&graph).unwrap();
        assert_eq!(
            nodes[0].options(),
            Some(BuiltinOptions::FullyConnected { activation: Activation::Relu6 })
        );
    }

    #[test]
    fn test_fully_connected_default_activation() {
        let graph =
            single_layer(|x, y| LayerNode::new("fc", "fc").with_inputs([x]).with_outputs([y]));
        let nodes = lower(&graph).unwrap();
        assert_eq!(
            nodes[0].options(),
            Some(BuiltinOptions::FullyConnected { activation: Activation::None })
        );
    }

    #[test]
    fn test_invalid_activation() {
        let graph = single_layer(|x, y| {
            LayerNode::new("fc", "fc")
                .with_inputs([x])
                .with_outputs([y])
                .with_property("activation", "swish")
        });
        assert!(matches!(
            lower(&graph),
            Err(ExportError::InvalidProperty { ref key, .. }) if key == "activation"
        ));
    }

    #[test]
    fn test_softmax_beta() {
        let graph = single_layer(|x, y| {
            LayerNode::new("sm", "softmax")
                .with_inputs([x])
                .with_outputs([y])
                .with_property("beta", "0.5")
        });
        assert_eq!(
            lower(&graph).unwrap()[0].options(),
            Some(BuiltinOptions::Softmax { beta: 0.5 })
        );

        let graph = single_layer(|x, y| {
            LayerNode::new("sm", "softmax")
                .with_inputs([x])
                .with_outputs([y])
                .with_property("beta", "warm")
        });
        assert!(matches!(lower(&graph), Err(ExportError::InvalidProperty { .. })));
    }

    #[test]
    fn test_operands_put_weights_after_inputs() {
        let mut g: ModelGraph<Loaded> = ModelGraph::new("fc");
        let x = g.add_variable("x", Tensor::placeholder(Shape::matrix(1, 4), DType::F32));
        let w = g.add_variable("w", Tensor::zeros(Shape::matrix(2, 4), DType::F32));
        let b = g.add_variable("b", Tensor::zeros(Shape::vector(2), DType::F32));
        let y = g.add_variable("y", Tensor::placeholder(Shape::matrix(1, 2), DType::F32));
        g.add_node(
            LayerNode::new("fc", "fully_connected")
                .with_inputs([x])
                .with_outputs([y])
                .with_weights([w, b]),
        );
        g.set_inputs(vec![x]);
        g.set_outputs(vec![y]);
        let graph = g.finalize().unwrap();

        let nodes = lower(&graph).unwrap();
        assert_eq!(nodes[0].operands().collect::<Vec<_>>(), vec![x, w, b]);
    }
}
