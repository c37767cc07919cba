// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model loading from manifest + SafeTensors files.
//!
//! The loader reads a model directory containing:
//! - `model.json` — the graph manifest (see [`ModelManifest`]).
//! - `model.safetensors` — weight data in HuggingFace SafeTensors format,
//!   only required when some tensor declares `"data": "safetensors"`.
//!
//! Tensors declared without data become placeholders: they carry a shape
//! and dtype but no storage.

use crate::graph::Finalized;
use crate::manifest::TensorData;
use crate::{LayerNode, ModelError, ModelGraph, ModelManifest, VariableId};
use std::collections::HashMap;
use std::path::Path;
use tensor_core::{DType, Shape, Tensor};

/// Default manifest filename.
const MANIFEST_FILE: &str = "model.json";

/// Default SafeTensors filename.
const WEIGHTS_FILE: &str = "model.safetensors";

/// Loads a model from disk into a finalized [`ModelGraph`].
///
/// # Example
/// ```no_run
/// use model_ir::ModelLoader;
/// use std::path::Path;
///
/// let graph = ModelLoader::load(Path::new("./models/mnist-mlp")).unwrap();
/// println!("Loaded {} layers", graph.num_nodes());
/// ```
pub struct ModelLoader;

impl ModelLoader {
    /// Loads and finalizes a model from the given directory.
    ///
    /// Steps:
    /// 1. Parse `model.json` and validate it.
    /// 2. If needed, memory-map `model.safetensors` and copy out the
    ///    declared weights.
    /// 3. Build the variable arena and layer list in manifest order.
    /// 4. Finalize the [`ModelGraph`].
    pub fn load(model_dir: &Path) -> Result<ModelGraph<Finalized>, ModelError> {
        let manifest = ModelManifest::from_file(&model_dir.join(MANIFEST_FILE))?;
        manifest.validate()?;

        let weights = if manifest.needs_weight_file() {
            Self::read_weights(model_dir, &manifest)?
        } else {
            HashMap::new()
        };

        Self::build_graph(&manifest, weights)
    }

    /// Builds a model from a manifest and in-memory weight tensors.
    ///
    /// Useful for testing without actual SafeTensors files.
    pub fn from_manifest_and_weights(
        manifest: &ModelManifest,
        weights: HashMap<String, Tensor>,
    ) -> Result<ModelGraph<Finalized>, ModelError> {
        manifest.validate()?;
        Self::build_graph(manifest, weights)
    }

    /// Reads every tensor the manifest declares as SafeTensors-backed.
    ///
    /// Uses memory-mapped I/O so only the requested tensors are touched.
    fn read_weights(
        model_dir: &Path,
        manifest: &ModelManifest,
    ) -> Result<HashMap<String, Tensor>, ModelError> {
        let weights_path = model_dir.join(WEIGHTS_FILE);
        let file = std::fs::File::open(&weights_path).map_err(|e| {
            ModelError::SafeTensorsError(format!(
                "cannot open '{}': {e}",
                weights_path.display()
            ))
        })?;

        // SAFETY: the file is opened read-only and not modified while mapped.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| {
            ModelError::SafeTensorsError(format!("mmap failed: {e}"))
        })?;

        let tensors = safetensors::SafeTensors::deserialize(&mmap).map_err(|e| {
            ModelError::SafeTensorsError(format!("SafeTensors parse error: {e}"))
        })?;

        let mut weights = HashMap::new();
        for entry in manifest
            .tensors
            .iter()
            .filter(|t| t.data == TensorData::Safetensors)
        {
            let view = tensors
                .tensor(&entry.name)
                .map_err(|_| ModelError::WeightNotFound {
                    name: entry.name.clone(),
                })?;
            let dtype = convert_safetensor_dtype(view.dtype())?;
            let shape = Shape::new(view.shape().to_vec());
            let tensor = Tensor::from_bytes(shape, dtype, view.data().to_vec())?;
            weights.insert(entry.name.clone(), tensor);
        }

        tracing::debug!(
            "read {} weight tensors from {}",
            weights.len(),
            weights_path.display(),
        );

        Ok(weights)
    }

    /// Converts manifest entries into a graph, attaching loaded weights.
    fn build_graph(
        manifest: &ModelManifest,
        mut weights: HashMap<String, Tensor>,
    ) -> Result<ModelGraph<Finalized>, ModelError> {
        let mut graph = ModelGraph::new(manifest.name.clone());
        let mut ids: HashMap<&str, VariableId> = HashMap::with_capacity(manifest.tensors.len());

        for entry in &manifest.tensors {
            let dtype = manifest.tensor_dtype(entry)?;
            let shape = Shape::new(entry.shape.clone());

            let tensor = match entry.data {
                TensorData::None => Tensor::placeholder(shape, dtype),
                TensorData::Safetensors => {
                    let loaded = weights.remove(&entry.name).ok_or_else(|| {
                        ModelError::WeightNotFound {
                            name: entry.name.clone(),
                        }
                    })?;
                    check_declared(&entry.name, &shape, dtype, &loaded)?;
                    loaded
                }
            };

            ids.insert(entry.name.as_str(), graph.add_variable(entry.name.clone(), tensor));
        }

        let resolve = |names: &[String], referrer: &str| -> Result<Vec<VariableId>, ModelError> {
            names
                .iter()
                .map(|name| {
                    ids.get(name.as_str())
                        .copied()
                        .ok_or_else(|| ModelError::UnknownTensor {
                            name: name.clone(),
                            referrer: referrer.to_string(),
                        })
                })
                .collect()
        };

        let mut nodes = Vec::with_capacity(manifest.layers.len());
        for layer in &manifest.layers {
            let mut node = LayerNode::new(layer.name.clone(), layer.layer_type.clone())
                .with_inputs(resolve(&layer.inputs, &layer.name)?)
                .with_outputs(resolve(&layer.outputs, &layer.name)?)
                .with_weights(resolve(&layer.weights, &layer.name)?);
            node.properties = layer.properties.clone();
            nodes.push(node);
        }
        let inputs = resolve(&manifest.inputs, &manifest.name)?;
        let outputs = resolve(&manifest.outputs, &manifest.name)?;

        for node in nodes {
            graph.add_node(node);
        }
        graph.set_inputs(inputs);
        graph.set_outputs(outputs);

        graph.finalize()
    }
}

/// Checks that a loaded weight matches its manifest declaration.
fn check_declared(
    name: &str,
    shape: &Shape,
    dtype: DType,
    loaded: &Tensor,
) -> Result<(), ModelError> {
    if loaded.shape() != shape || loaded.dtype() != dtype {
        return Err(ModelError::InvalidLayer {
            layer: name.to_string(),
            detail: format!(
                "declared {shape} {dtype}, weight file has {} {}",
                loaded.shape(),
                loaded.dtype(),
            ),
        });
    }
    Ok(())
}

/// Converts a SafeTensors `Dtype` to our [`DType`].
fn convert_safetensor_dtype(st_dtype: safetensors::Dtype) -> Result<DType, ModelError> {
    match st_dtype {
        safetensors::Dtype::F32 => Ok(DType::F32),
        safetensors::Dtype::F16 => Ok(DType::F16),
        safetensors::Dtype::BF16 => Ok(DType::BF16),
        safetensors::Dtype::I8 => Ok(DType::I8),
        safetensors::Dtype::I32 => Ok(DType::I32),
        safetensors::Dtype::U8 => Ok(DType::U8),
        other => Err(ModelError::SafeTensorsError(format!(
            "unsupported SafeTensors dtype: {other:?}"
        ))),
    }
}
