// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON model manifest parsing.
//!
//! The manifest (`model.json`) describes the graph's tensors and layers in
//! execution order. Weight data lives in a SafeTensors file next to it.
//!
//! # Format
//! ```json
//! {
//!   "name": "mnist-mlp",
//!   "dtype": "f32",
//!   "inputs": ["x"],
//!   "outputs": ["y"],
//!   "tensors": [
//!     { "name": "x", "shape": [1, 784] },
//!     { "name": "fc1.weight", "shape": [128, 784], "data": "safetensors" },
//!     { "name": "y", "shape": [1, 128] }
//!   ],
//!   "layers": [
//!     {
//!       "name": "fc1",
//!       "layer_type": "fully_connected",
//!       "inputs": ["x"],
//!       "outputs": ["y"],
//!       "weights": ["fc1.weight"],
//!       "properties": { "activation": "relu" }
//!     }
//!   ]
//! }
//! ```

use crate::ModelError;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tensor_core::{DType, Shape};

/// Top-level model manifest, deserialized from `model.json`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    /// Human-readable model name.
    pub name: String,
    /// Default element type for tensors that do not declare one.
    #[serde(default = "default_dtype")]
    pub dtype: String,
    /// Graph input tensor names.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Graph output tensor names.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Every tensor in the graph.
    pub tensors: Vec<ManifestTensor>,
    /// Layers in execution order.
    pub layers: Vec<ManifestLayer>,
}

fn default_dtype() -> String {
    "f32".to_string()
}

/// Where a tensor's contents come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorData {
    /// No data: activations, or weights exported without contents.
    #[default]
    None,
    /// Read from the SafeTensors file under the tensor's name.
    Safetensors,
}

/// A single tensor entry in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestTensor {
    pub name: String,
    pub shape: Vec<usize>,
    /// Element type; falls back to the manifest-level `dtype`.
    #[serde(default)]
    pub dtype: Option<String>,
    #[serde(default)]
    pub data: TensorData,
}

/// A single layer entry in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestLayer {
    /// Layer name (e.g., `"fc1"`).
    pub name: String,
    /// Symbolic layer type (e.g., `"fully_connected"`).
    pub layer_type: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub weights: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ModelManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Validates that the manifest is internally consistent.
    ///
    /// Checks:
    /// - At least one layer is defined.
    /// - Every dtype string is valid.
    /// - Every tensor's byte size fits in `usize`.
    /// - No duplicate tensor or layer names.
    /// - Every tensor referenced by a layer or by the graph inputs/outputs
    ///   is declared.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.layers.is_empty() {
            return Err(ModelError::InvalidGraph(
                "manifest contains no layers".into(),
            ));
        }

        parse_dtype(&self.dtype).ok_or_else(|| ModelError::InvalidLayer {
            layer: self.name.clone(),
            detail: format!("unsupported dtype '{}'", self.dtype),
        })?;

        let mut tensor_names = HashSet::new();
        for tensor in &self.tensors {
            if !tensor_names.insert(tensor.name.as_str()) {
                return Err(ModelError::InvalidGraph(format!(
                    "duplicate tensor name '{}'",
                    tensor.name
                )));
            }
            let dtype = self.tensor_dtype(tensor)?;
            if Shape::from(tensor.shape.as_slice()).checked_size_bytes(dtype).is_none() {
                return Err(ModelError::InvalidGraph(format!(
                    "tensor '{}' with shape {:?} overflows the addressable size",
                    tensor.name, tensor.shape
                )));
            }
        }

        let mut layer_names = HashSet::new();
        for layer in &self.layers {
            if !layer_names.insert(layer.name.as_str()) {
                return Err(ModelError::InvalidLayer {
                    layer: layer.name.clone(),
                    detail: "duplicate layer name".into(),
                });
            }

            let refs = layer
                .inputs
                .iter()
                .chain(&layer.outputs)
                .chain(&layer.weights);
            for name in refs {
                if !tensor_names.contains(name.as_str()) {
                    return Err(ModelError::UnknownTensor {
                        name: name.clone(),
                        referrer: layer.name.clone(),
                    });
                }
            }
        }

        for name in self.inputs.iter().chain(&self.outputs) {
            if !tensor_names.contains(name.as_str()) {
                return Err(ModelError::UnknownTensor {
                    name: name.clone(),
                    referrer: self.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Resolves the element type of a tensor entry.
    pub fn tensor_dtype(&self, tensor: &ManifestTensor) -> Result<DType, ModelError> {
        let label = tensor.dtype.as_deref().unwrap_or(&self.dtype);
        parse_dtype(label).ok_or_else(|| ModelError::InvalidLayer {
            layer: tensor.name.clone(),
            detail: format!("unsupported dtype '{label}'"),
        })
    }

    /// Returns `true` if any tensor reads its data from SafeTensors.
    pub fn needs_weight_file(&self) -> bool {
        self.tensors
            .iter()
            .any(|t| t.data == TensorData::Safetensors)
    }
}

/// Parses a dtype string into a [`tensor_core::DType`].
pub(crate) fn parse_dtype(s: &str) -> Option<DType> {
    DType::from_str_loose(s)
}
