// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model export.

use std::path::PathBuf;

/// Errors that can occur while compiling a graph into a model container.
///
/// None of these are transient: they describe either a graph the exporter
/// cannot express or an environment problem, so nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A layer's symbolic type has no operator mapping.
    #[error("unsupported operator '{layer_type}' in layer '{layer}'")]
    UnsupportedOperator { layer: String, layer_type: String },

    /// A layer property could not be turned into operator options.
    #[error("invalid property '{key}' = '{value}' in layer '{layer}'")]
    InvalidProperty {
        layer: String,
        key: String,
        value: String,
    },

    /// An index map was queried for a value that was never inserted.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// An index map was queried past its current size.
    #[error("index {index} out of range (size {len})")]
    IndexOutOfRange { index: u32, len: usize },

    /// The graph cannot be represented in the container format.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// The serialized buffer does not satisfy the container schema.
    #[error("verifying serialized model failed: {0}")]
    VerificationFailed(String),

    /// A file could not be opened, read or written.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The reverse transform did not reconstruct a graph.
    #[error("no graph produced from '{}'", path.display())]
    NoGraphProduced { path: PathBuf },

    /// Export configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}
