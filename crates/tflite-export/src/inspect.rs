// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Read-only summaries of exported containers.
//!
//! A [`ContainerSummary`] copies the container's index-level structure into
//! plain owned data. It does not rebuild a graph: weights stay in the file
//! and only their sizes are reported.

use crate::operation::{Activation, BuiltinOptions, OperatorKind};
use crate::schema::{root_as_model, tensor_type, Operator};
use crate::writer::{read_file, verify};
use crate::ExportError;
use std::fmt;
use std::path::Path;

/// One tensor table entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSummary {
    pub name: Option<String>,
    pub shape: Vec<i32>,
    pub tensor_type: i8,
    pub buffer: u32,
}

/// One operator, with its opcode resolved back to an [`OperatorKind`] when
/// the exporter knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorSummary {
    pub opcode_index: u32,
    pub kind: Option<OperatorKind>,
    pub inputs: Vec<i32>,
    pub outputs: Vec<i32>,
    pub options: Option<BuiltinOptions>,
}

/// Owned view of a verified container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSummary {
    pub version: u32,
    pub description: Option<String>,
    /// Builtin code per operator-code index.
    pub operator_codes: Vec<i32>,
    /// Data length per buffer index.
    pub buffer_sizes: Vec<usize>,
    pub subgraph_name: Option<String>,
    pub tensors: Vec<TensorSummary>,
    pub operators: Vec<OperatorSummary>,
    pub inputs: Vec<i32>,
    pub outputs: Vec<i32>,
}

impl ContainerSummary {
    /// Verifies `bytes` and decodes the first subgraph.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExportError> {
        verify(bytes)?;
        let model =
            root_as_model(bytes).map_err(|e| ExportError::VerificationFailed(e.to_string()))?;

        let operator_codes: Vec<i32> = model
            .operator_codes()
            .map(|codes| codes.iter().map(|c| c.effective_builtin_code()).collect())
            .unwrap_or_default();
        let buffer_sizes = model
            .buffers()
            .map(|b| b.iter().map(|buf| buf.len()).collect())
            .unwrap_or_default();

        let subgraph = model
            .subgraphs()
            .filter(|s| !s.is_empty())
            .map(|s| s.get(0))
            .ok_or_else(|| ExportError::VerificationFailed("model has no subgraph".into()))?;

        let tensors = subgraph
            .tensors()
            .map(|ts| {
                ts.iter()
                    .map(|t| TensorSummary {
                        name: t.name().map(str::to_string),
                        shape: t.shape().map(|s| s.iter().collect()).unwrap_or_default(),
                        tensor_type: t.type_(),
                        buffer: t.buffer(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let operators = subgraph
            .operators()
            .map(|ops| {
                ops.iter()
                    .map(|op| {
                        let code = operator_codes.get(op.opcode_index() as usize).copied();
                        OperatorSummary {
                            opcode_index: op.opcode_index(),
                            kind: code.and_then(OperatorKind::from_builtin_code),
                            inputs: op.inputs().map(|v| v.iter().collect()).unwrap_or_default(),
                            outputs: op.outputs().map(|v| v.iter().collect()).unwrap_or_default(),
                            options: decode_options(&op),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            version: model.version(),
            description: model.description().map(str::to_string),
            operator_codes,
            buffer_sizes,
            subgraph_name: subgraph.name().map(str::to_string),
            tensors,
            operators,
            inputs: subgraph.inputs().map(|v| v.iter().collect()).unwrap_or_default(),
            outputs: subgraph.outputs().map(|v| v.iter().collect()).unwrap_or_default(),
        })
    }

    /// Reads and summarizes a container file.
    pub fn from_file(path: &Path) -> Result<Self, ExportError> {
        Self::from_bytes(&read_file(path)?)
    }

    /// Total bytes held by data buffers.
    pub fn total_buffer_bytes(&self) -> usize {
        self.buffer_sizes.iter().sum()
    }
}

fn decode_options(op: &Operator<'_>) -> Option<BuiltinOptions> {
    if let Some(fc) = op.builtin_options_as_fully_connected() {
        let activation = Activation::from_code(fc.fused_activation_function())?;
        return Some(BuiltinOptions::FullyConnected { activation });
    }
    op.builtin_options_as_softmax()
        .map(|sm| BuiltinOptions::Softmax { beta: sm.beta() })
}

impl fmt::Display for ContainerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "TFLite model v{} ({})",
            self.version,
            self.description.as_deref().unwrap_or("no description")
        )?;
        writeln!(
            f,
            "  {} operator codes, {} buffers ({:.1} KB), {} tensors, {} operators",
            self.operator_codes.len(),
            self.buffer_sizes.len(),
            self.total_buffer_bytes() as f64 / 1024.0,
            self.tensors.len(),
            self.operators.len(),
        )?;
        writeln!(
            f,
            "  subgraph '{}': inputs {:?}, outputs {:?}",
            self.subgraph_name.as_deref().unwrap_or(""),
            self.inputs,
            self.outputs
        )?;

        writeln!(f, "  tensors:")?;
        for (i, t) in self.tensors.iter().enumerate() {
            let dtype = tensor_type::to_dtype(t.tensor_type)
                .map(|d| d.to_string())
                .unwrap_or_else(|| format!("type#{}", t.tensor_type));
            writeln!(
                f,
                "    [{i:>3}] {:<24} {:?} {dtype} buffer={}",
                t.name.as_deref().unwrap_or("-"),
                t.shape,
                t.buffer
            )?;
        }

        writeln!(f, "  operators:")?;
        for (i, op) in self.operators.iter().enumerate() {
            let kind = op
                .kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| format!("opcode#{}", op.opcode_index));
            writeln!(
                f,
                "    [{i:>3}] {kind:<16} in={:?} out={:?}",
                op.inputs, op.outputs
            )?;
        }
        Ok(())
    }
}
