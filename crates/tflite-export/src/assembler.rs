// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Assembles the root `Model` table from the three sections.

use crate::index::ExportIndex;
use crate::operation::OperationNode;
use crate::schema::{vt, FILE_IDENTIFIER, SCHEMA_VERSION};
use crate::sections::{build_buffers, build_operator_codes, build_subgraphs};
use crate::{ExportConfig, ExportError};
use flatbuffers::FlatBufferBuilder;
use model_ir::{Finalized, ModelGraph};

/// Builder headroom on top of the raw weight bytes.
const TABLE_OVERHEAD: usize = 4096;

/// Serializes a complete container into an owned byte buffer.
///
/// The result is not verified; see [`crate::writer::verify`].
pub fn assemble<'g>(
    graph: &'g ModelGraph<Finalized>,
    nodes: &[OperationNode],
    index: &ExportIndex<'g>,
    config: &ExportConfig,
) -> Result<Vec<u8>, ExportError> {
    let weight_bytes: usize = index.buffers.iter().map(|s| s.bytes().len()).sum();
    // FlatBuffers offsets are 32-bit signed.
    if weight_bytes + TABLE_OVERHEAD > i32::MAX as usize {
        return Err(ExportError::InvalidGraph(format!(
            "{weight_bytes} bytes of weights exceed the 2 GiB container limit"
        )));
    }
    let mut fbb = FlatBufferBuilder::with_capacity(weight_bytes + TABLE_OVERHEAD);

    let buffers = build_buffers(&mut fbb, index);
    let operator_codes = build_operator_codes(&mut fbb, index);
    let subgraphs = build_subgraphs(&mut fbb, graph, nodes, index, config)?;
    let description = fbb.create_string(&config.description);

    let start = fbb.start_table();
    fbb.push_slot::<u32>(vt::model::VERSION, SCHEMA_VERSION, 0);
    fbb.push_slot_always(vt::model::OPERATOR_CODES, operator_codes);
    fbb.push_slot_always(vt::model::SUBGRAPHS, subgraphs);
    fbb.push_slot_always(vt::model::DESCRIPTION, description);
    fbb.push_slot_always(vt::model::BUFFERS, buffers);
    let model = fbb.end_table(start);

    fbb.finish(model, Some(FILE_IDENTIFIER));
    Ok(fbb.finished_data().to_vec())
}
