// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`GraphInterpreter`] trait and its TFLite implementation.
//!
//! ```text
//! ModelGraph<Finalized>
//!     │  lower()              one OperationNode per layer
//!     ▼
//! Vec<OperationNode>
//!     │  ExportIndex::build() opcode / buffer / tensor numbering
//!     ▼
//! ExportIndex
//!     │  assemble()           buffers, operator codes, subgraph, root
//!     ▼
//! Vec<u8>
//!     │  verify() + write_atomic()
//!     ▼
//!   file
//! ```
//!
//! The container is built fully in memory before any I/O, so a failure at
//! any stage leaves the destination untouched.

use crate::assembler::assemble;
use crate::index::ExportIndex;
use crate::operation::lower;
use crate::writer::{read_file, verify, write_atomic};
use crate::{ExportConfig, ExportError};
use model_ir::{Finalized, ModelGraph};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Converts between in-memory graphs and a serialized model format.
pub trait GraphInterpreter {
    /// Human-readable name of the format.
    fn name(&self) -> &str;

    /// Writes `graph` to `path`.
    fn serialize(
        &self,
        graph: &ModelGraph<Finalized>,
        path: &Path,
    ) -> Result<ExportSummary, ExportError>;

    /// Reads a graph back from `path`.
    fn deserialize(&self, path: &Path) -> Result<ModelGraph<Finalized>, ExportError>;
}

/// Statistics of one export call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Destination, or `None` for in-memory exports.
    pub path: Option<PathBuf>,
    pub bytes: usize,
    pub operator_codes: usize,
    pub operators: usize,
    pub tensors: usize,
    /// Buffer table length, including the sentinel.
    pub buffers: usize,
}

impl ExportSummary {
    /// Returns a one-line summary for display.
    pub fn summary(&self) -> String {
        format!(
            "{} bytes: {} operators ({} codes), {} tensors, {} buffers",
            self.bytes, self.operators, self.operator_codes, self.tensors, self.buffers
        )
    }
}

/// Exports graphs as TensorFlow Lite FlatBuffer containers.
#[derive(Debug, Clone, Default)]
pub struct TfliteInterpreter {
    config: ExportConfig,
}

impl TfliteInterpreter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Compiles `graph` into verified container bytes without touching
    /// the filesystem.
    pub fn to_bytes(&self, graph: &ModelGraph<Finalized>) -> Result<Vec<u8>, ExportError> {
        self.compile(graph).map(|(bytes, _)| bytes)
    }

    fn compile(
        &self,
        graph: &ModelGraph<Finalized>,
    ) -> Result<(Vec<u8>, ExportSummary), ExportError> {
        let nodes = lower(graph)?;
        let index = ExportIndex::build(graph, &nodes)?;
        let bytes = assemble(graph, &nodes, &index, &self.config)?;
        verify(&bytes)?;

        let summary = ExportSummary {
            path: None,
            bytes: bytes.len(),
            operator_codes: index.opcodes.len(),
            operators: nodes.len(),
            tensors: index.tensors.len(),
            buffers: index.buffers.len(),
        };
        Ok((bytes, summary))
    }
}

impl GraphInterpreter for TfliteInterpreter {
    fn name(&self) -> &str {
        "tflite"
    }

    fn serialize(
        &self,
        graph: &ModelGraph<Finalized>,
        path: &Path,
    ) -> Result<ExportSummary, ExportError> {
        let start = Instant::now();
        tracing::info!(model = %graph.name, path = %path.display(), "exporting model");

        let (bytes, mut summary) = self.compile(graph)?;
        write_atomic(&bytes, path)?;
        summary.path = Some(path.to_path_buf());

        tracing::info!(
            model = %graph.name,
            bytes = summary.bytes,
            operators = summary.operators,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "export complete"
        );
        Ok(summary)
    }

    /// Reads and verifies a container, then reports that no graph was
    /// produced. Rebuilding layers from operators is not supported, and a
    /// partially reconstructed graph is never returned.
    fn deserialize(&self, path: &Path) -> Result<ModelGraph<Finalized>, ExportError> {
        let bytes = read_file(path)?;
        verify(&bytes)?;
        tracing::warn!(
            path = %path.display(),
            "container verified, graph reconstruction is not supported"
        );
        Err(ExportError::NoGraphProduced {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{LayerNode, Loaded};
    use tensor_core::{DType, Shape, Tensor};

    fn relu_graph() -> ModelGraph<Finalized> {
        let mut g: ModelGraph<Loaded> = ModelGraph::new("relu");
        let x = g.add_variable("x", Tensor::placeholder(Shape::vector(8), DType::F32));
        let y = g.add_variable("y", Tensor::placeholder(Shape::vector(8), DType::F32));
        g.add_node(LayerNode::new("act", "relu").with_inputs([x]).with_outputs([y]));
        g.set_inputs(vec![x]);
        g.set_outputs(vec![y]);
        g.finalize().unwrap()
    }

    #[test]
    fn test_to_bytes_is_verified() {
        let bytes = TfliteInterpreter::default().to_bytes(&relu_graph()).unwrap();
        assert!(verify(&bytes).is_ok());
    }

    #[test]
    fn test_serialize_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relu.tflite");
        let summary = TfliteInterpreter::default()
            .serialize(&relu_graph(), &path)
            .unwrap();

        assert_eq!(summary.path.as_deref(), Some(path.as_path()));
        assert_eq!(summary.operators, 1);
        assert_eq!(summary.operator_codes, 1);
        assert_eq!(summary.tensors, 2);
        assert_eq!(summary.buffers, 1);
        assert_eq!(summary.bytes as u64, std::fs::metadata(&path).unwrap().len());
        assert!(summary.summary().contains("1 operators"));
    }

    #[test]
    fn test_trait_object() {
        let interp: Box<dyn GraphInterpreter> = Box::new(TfliteInterpreter::default());
        assert_eq!(interp.name(), "tflite");
    }
}
