// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Container verification and atomic file output.

use crate::schema::{has_identifier, root_as_model, Model, FILE_IDENTIFIER, SCHEMA_VERSION};
use crate::ExportError;
use std::fs::Permissions;
use std::io::Write;
use std::path::Path;

/// Checks that `bytes` form a well-formed container.
///
/// 1. The `TFL3` identifier is present.
/// 2. The FlatBuffer verifier accepts the `Model` root, including every
///    nested table, vector, string and options union.
/// 3. Cross-references resolve: buffer 0 is empty and every opcode,
///    tensor and buffer index is in range.
pub fn verify(bytes: &[u8]) -> Result<(), ExportError> {
    if !has_identifier(bytes) {
        return Err(ExportError::VerificationFailed(format!(
            "missing '{FILE_IDENTIFIER}' file identifier"
        )));
    }
    let model =
        root_as_model(bytes).map_err(|e| ExportError::VerificationFailed(e.to_string()))?;
    check_references(&model)
}

fn check_references(model: &Model<'_>) -> Result<(), ExportError> {
    let fail = |msg: String| Err(ExportError::VerificationFailed(msg));

    if model.version() != SCHEMA_VERSION {
        return fail(format!("unsupported schema version {}", model.version()));
    }

    let Some(buffers) = model.buffers().filter(|b| !b.is_empty()) else {
        return fail("buffer table is missing the sentinel entry".into());
    };
    if !buffers.get(0).is_empty() {
        return fail("buffer 0 must be empty".into());
    }
    let num_opcodes = model.operator_codes().map(|v| v.len()).unwrap_or(0);
    let Some(subgraphs) = model.subgraphs().filter(|s| !s.is_empty()) else {
        return fail("model has no subgraph".into());
    };

    for (s, subgraph) in subgraphs.iter().enumerate() {
        let num_tensors = subgraph.tensors().map(|t| t.len()).unwrap_or(0);

        if let Some(tensors) = subgraph.tensors() {
            for (t, tensor) in tensors.iter().enumerate() {
                if tensor.buffer() as usize >= buffers.len() {
                    return fail(format!(
                        "subgraph {s} tensor {t}: buffer {} out of range ({})",
                        tensor.buffer(),
                        buffers.len()
                    ));
                }
            }
        }

        check_tensor_list(subgraph.inputs(), num_tensors, || format!("subgraph {s} inputs"))?;
        check_tensor_list(subgraph.outputs(), num_tensors, || format!("subgraph {s} outputs"))?;

        if let Some(operators) = subgraph.operators() {
            for (o, op) in operators.iter().enumerate() {
                if op.opcode_index() as usize >= num_opcodes {
                    return fail(format!(
                        "subgraph {s} operator {o}: opcode {} out of range ({num_opcodes})",
                        op.opcode_index()
                    ));
                }
                check_tensor_list(op.inputs(), num_tensors, || {
                    format!("subgraph {s} operator {o} inputs")
                })?;
                check_tensor_list(op.outputs(), num_tensors, || {
                    format!("subgraph {s} operator {o} outputs")
                })?;
            }
        }
    }
    Ok(())
}

/// Every entry must be a tensor index, or -1 for an omitted optional operand.
fn check_tensor_list(
    list: Option<flatbuffers::Vector<'_, i32>>,
    num_tensors: usize,
    what: impl FnOnce() -> String,
) -> Result<(), ExportError> {
    let Some(list) = list else {
        return Ok(());
    };
    match list
        .iter()
        .find(|&i| i != -1 && (i < 0 || i as usize >= num_tensors))
    {
        Some(bad) => Err(ExportError::VerificationFailed(format!(
            "{}: tensor {bad} out of range ({num_tensors})",
            what()
        ))),
        None => Ok(()),
    }
}

/// Writes `bytes` to `path` through a sibling temporary file.
///
/// The destination is replaced by rename once the data is synced, so it
/// either keeps its previous content or holds the complete new file. A
/// replaced file keeps its permissions; a new one is created `0o644`.
pub fn write_atomic(bytes: &[u8], path: &Path) -> Result<(), ExportError> {
    let io_err = |source: std::io::Error| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    if let Some(perms) = output_permissions(path) {
        tmp.as_file().set_permissions(perms).map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote container");
    Ok(())
}

/// Permissions for the file written to `path`: those of the file being
/// replaced, else `0o644` on Unix. Temp files start out `0o600`.
fn output_permissions(path: &Path) -> Option<Permissions> {
    std::fs::metadata(path)
        .map(|meta| meta.permissions())
        .ok()
        .or_else(new_file_permissions)
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}

/// Reads a whole file, mapping failures to [`ExportError::Io`].
pub fn read_file(path: &Path) -> Result<Vec<u8>, ExportError> {
    std::fs::read(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
