// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Export configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! description = "mnist classifier, exported nightly"
//! subgraph_name = "main"
//! tensor_names = true
//! ```
//!
//! Every key is optional. The schema version and file identifier are fixed
//! by the container format and cannot be configured.

use crate::ExportError;
use std::path::Path;

/// Default `Model.description` string.
pub const DEFAULT_DESCRIPTION: &str = "This file is generated from edge-model-export";

/// Options controlling how a graph is written into a container.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Free-form text stored in `Model.description`.
    pub description: String,
    /// Subgraph name; defaults to the graph's own name.
    pub subgraph_name: Option<String>,
    /// Whether tensor names are written. Disabling trims the file slightly.
    pub tensor_names: bool,
}

impl ExportConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ExportError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExportError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ExportError> {
        toml::from_str(toml_str)
            .map_err(|e| ExportError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ExportError> {
        toml::to_string_pretty(self)
            .map_err(|e| ExportError::Config(format!("TOML serialise error: {e}")))
    }

    /// Returns a copy with `description` replaced.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_string(),
            subgraph_name: None,
            tensor_names: true,
        }
    }
}
