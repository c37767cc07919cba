// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Section builders: the buffer table, the operator-code table and the
//! subgraph, each written into a shared [`FlatBufferBuilder`].
//!
//! Every vector is emitted in index-map order, so an entry's position is
//! the id other sections use to reference it.

use crate::index::ExportIndex;
use crate::operation::{BuiltinOptions, OperationNode};
use crate::schema::{builtin_op, builtin_options, tensor_type, vt};
use crate::{ExportConfig, ExportError};
use flatbuffers::{
    FlatBufferBuilder, ForwardsUOffset, TableFinishedWIPOffset, UnionWIPOffset, Vector, WIPOffset,
};
use model_ir::{Finalized, ModelGraph, VariableId};

/// A finished vector of tables.
pub type TableVector<'fbb> = WIPOffset<Vector<'fbb, ForwardsUOffset<TableFinishedWIPOffset>>>;

/// Writes one `Buffer` per buffer-map entry. Entry 0 has no `data` field.
pub fn build_buffers<'fbb>(
    fbb: &mut FlatBufferBuilder<'fbb>,
    index: &ExportIndex<'_>,
) -> TableVector<'fbb> {
    let mut tables = Vec::with_capacity(index.buffers.len());
    let mut total = 0usize;
    for slot in index.buffers.iter() {
        let bytes = slot.bytes();
        let data = (!bytes.is_empty()).then(|| fbb.create_vector(bytes));
        let start = fbb.start_table();
        if let Some(data) = data {
            fbb.push_slot_always(vt::buffer::DATA, data);
        }
        tables.push(fbb.end_table(start));
        total += bytes.len();
    }
    tracing::debug!(buffers = tables.len(), bytes = total, "built buffer table");
    fbb.create_vector(&tables)
}

/// Writes one `OperatorCode` per distinct operator kind.
pub fn build_operator_codes<'fbb>(
    fbb: &mut FlatBufferBuilder<'fbb>,
    index: &ExportIndex<'_>,
) -> TableVector<'fbb> {
    let tables: Vec<_> = index
        .opcodes
        .iter()
        .map(|kind| {
            let code = kind.builtin_code();
            let deprecated = code.min(builtin_op::PLACEHOLDER_FOR_GREATER_OP_CODES) as i8;
            let start = fbb.start_table();
            fbb.push_slot::<i8>(vt::operator_code::DEPRECATED_BUILTIN_CODE, deprecated, 0);
            fbb.push_slot::<i32>(vt::operator_code::VERSION, 1, 1);
            fbb.push_slot::<i32>(vt::operator_code::BUILTIN_CODE, code, 0);
            fbb.end_table(start)
        })
        .collect();
    tracing::debug!(operator_codes = tables.len(), "built operator-code table");
    fbb.create_vector(&tables)
}

/// Writes the single subgraph: tensors, operators, graph inputs/outputs
/// and name.
pub fn build_subgraphs<'fbb, 'g>(
    fbb: &mut FlatBufferBuilder<'fbb>,
    graph: &'g ModelGraph<Finalized>,
    nodes: &[OperationNode],
    index: &ExportIndex<'g>,
    config: &ExportConfig,
) -> Result<TableVector<'fbb>, ExportError> {
    let tensors = build_tensors(fbb, graph, index, config)?;

    let mut operators = Vec::with_capacity(nodes.len());
    for node in nodes {
        operators.push(build_operator(fbb, node, index)?);
    }
    let operators = fbb.create_vector(&operators);

    let inputs = tensor_indices(index, graph.inputs().iter().copied())?;
    let outputs = tensor_indices(index, graph.outputs().iter().copied())?;
    let inputs = fbb.create_vector(&inputs);
    let outputs = fbb.create_vector(&outputs);
    let name = fbb.create_string(config.subgraph_name.as_deref().unwrap_or(&graph.name));

    let start = fbb.start_table();
    fbb.push_slot_always(vt::sub_graph::TENSORS, tensors);
    fbb.push_slot_always(vt::sub_graph::INPUTS, inputs);
    fbb.push_slot_always(vt::sub_graph::OUTPUTS, outputs);
    fbb.push_slot_always(vt::sub_graph::OPERATORS, operators);
    fbb.push_slot_always(vt::sub_graph::NAME, name);
    let subgraph = fbb.end_table(start);

    tracing::debug!(
        tensors = index.tensors.len(),
        operators = nodes.len(),
        "built subgraph"
    );
    Ok(fbb.create_vector(&[subgraph]))
}

fn build_tensors<'fbb, 'g>(
    fbb: &mut FlatBufferBuilder<'fbb>,
    graph: &'g ModelGraph<Finalized>,
    index: &ExportIndex<'g>,
    config: &ExportConfig,
) -> Result<TableVector<'fbb>, ExportError> {
    let mut tables = Vec::with_capacity(index.tensors.len());
    for &id in index.tensors.iter() {
        let var = graph
            .variable(id)
            .ok_or_else(|| ExportError::InvalidGraph(format!("unknown variable {id}")))?;
        let dims = var
            .tensor
            .shape()
            .dims()
            .iter()
            .map(|&d| {
                i32::try_from(d).map_err(|_| {
                    ExportError::InvalidGraph(format!(
                        "dimension {d} of '{}' does not fit in i32",
                        var.name
                    ))
                })
            })
            .collect::<Result<Vec<i32>, _>>()?;
        let buffer = index.buffer_index(graph, id)?;

        let shape = fbb.create_vector(&dims);
        let name = config.tensor_names.then(|| fbb.create_string(&var.name));
        let start = fbb.start_table();
        fbb.push_slot_always(vt::tensor::SHAPE, shape);
        fbb.push_slot::<i8>(vt::tensor::TYPE, tensor_type::from_dtype(var.tensor.dtype()), 0);
        fbb.push_slot::<u32>(vt::tensor::BUFFER, buffer, 0);
        if let Some(name) = name {
            fbb.push_slot_always(vt::tensor::NAME, name);
        }
        tables.push(fbb.end_table(start));
    }
    Ok(fbb.create_vector(&tables))
}

fn build_operator<'fbb>(
    fbb: &mut FlatBufferBuilder<'fbb>,
    node: &OperationNode,
    index: &ExportIndex<'_>,
) -> Result<WIPOffset<TableFinishedWIPOffset>, ExportError> {
    let opcode_index = index.opcodes.index_of(&node.kind())?;
    let inputs = tensor_indices(index, node.operands())?;
    let outputs = tensor_indices(index, node.outputs().iter().copied())?;

    let inputs = fbb.create_vector(&inputs);
    let outputs = fbb.create_vector(&outputs);
    let options = node.options().map(|o| build_options(fbb, o));

    let start = fbb.start_table();
    fbb.push_slot::<u32>(vt::operator::OPCODE_INDEX, opcode_index, 0);
    fbb.push_slot_always(vt::operator::INPUTS, inputs);
    fbb.push_slot_always(vt::operator::OUTPUTS, outputs);
    if let Some((kind, table)) = options {
        fbb.push_slot::<u8>(vt::operator::BUILTIN_OPTIONS_TYPE, kind, builtin_options::NONE);
        fbb.push_slot_always(vt::operator::BUILTIN_OPTIONS, table);
    }
    Ok(fbb.end_table(start))
}

fn build_options(
    fbb: &mut FlatBufferBuilder<'_>,
    options: BuiltinOptions,
) -> (u8, WIPOffset<UnionWIPOffset>) {
    match options {
        BuiltinOptions::FullyConnected { activation } => {
            let start = fbb.start_table();
            fbb.push_slot::<i8>(
                vt::fully_connected_options::FUSED_ACTIVATION_FUNCTION,
                activation.code(),
                0,
            );
            let table = fbb.end_table(start);
            (builtin_options::FULLY_CONNECTED_OPTIONS, table.as_union_value())
        }
        BuiltinOptions::Softmax { beta } => {
            let start = fbb.start_table();
            fbb.push_slot::<f32>(vt::softmax_options::BETA, beta, 0.0);
            let table = fbb.end_table(start);
            (builtin_options::SOFTMAX_OPTIONS, table.as_union_value())
        }
    }
}

fn tensor_indices(
    index: &ExportIndex<'_>,
    ids: impl IntoIterator<Item = VariableId>,
) -> Result<Vec<i32>, ExportError> {
    ids.into_iter().map(|id| index.tensor_index(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::lower;
    use crate::schema::{Buffer, OperatorCode, SubGraph};
    use flatbuffers::Follow;
    use model_ir::{LayerNode, Loaded};
    use tensor_core::{DType, Shape, Tensor};

    fn small_graph() -> ModelGraph<Finalized> {
        let mut g: ModelGraph<Loaded> = ModelGraph::new("small");
        let x = g.add_variable("x", Tensor::placeholder(Shape::matrix(1, 2), DType::F32));
        let w = g.add_variable(
            "w",
            Tensor::from_f32(Shape::matrix(2, 2), &[1.0, 2.0, 3.0, 4.0]).unwrap(),
        );
        let y = g.add_variable("y", Tensor::placeholder(Shape::matrix(1, 2), DType::F32));
        let z = g.add_variable("z", Tensor::placeholder(Shape::matrix(1, 2), DType::F32));
        g.add_node(LayerNode::new("fc", "fc").with_inputs([x]).with_outputs([y]).with_weights([w]));
        g.add_node(
            LayerNode::new("sm", "softmax")
                .with_inputs([y])
                .with_outputs([z])
                .with_property("beta", "2.0"),
        );
        g.set_inputs(vec![x]);
        g.set_outputs(vec![z]);
        g.finalize().unwrap()
    }

    /// Finishes `vec` as a root so it can be read back with `Follow`.
    fn finish_vector<'fbb>(fbb: &mut FlatBufferBuilder<'fbb>, vec: TableVector<'fbb>) -> Vec<u8> {
        let start = fbb.start_table();
        fbb.push_slot_always(4, vec);
        let root = fbb.end_table(start);
        fbb.finish_minimal(root);
        fbb.finished_data().to_vec()
    }

    fn read_vector<'a, T: Follow<'a> + 'a>(buf: &'a [u8]) -> Vector<'a, ForwardsUOffset<T>> {
        let table = unsafe { flatbuffers::root_unchecked::<flatbuffers::Table<'a>>(buf) };
        unsafe { table.get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<T>>>>(4, None) }.unwrap()
    }

    #[test]
    fn test_buffers_sentinel_then_data() {
        let graph = small_graph();
        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();

        let mut fbb = FlatBufferBuilder::new();
        let vec = build_buffers(&mut fbb, &index);
        let buf = finish_vector(&mut fbb, vec);
        let buffers = read_vector::<Buffer<'_>>(&buf);

        assert_eq!(buffers.len(), 2);
        assert!(buffers.get(0).data().is_none());
        let expected: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        assert_eq!(buffers.get(1).data().unwrap().bytes(), &expected[..]);
    }

    #[test]
    fn test_operator_codes_follow_first_use() {
        let graph = small_graph();
        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();

        let mut fbb = FlatBufferBuilder::new();
        let vec = build_operator_codes(&mut fbb, &index);
        let buf = finish_vector(&mut fbb, vec);
        let codes = read_vector::<OperatorCode<'_>>(&buf);

        assert_eq!(codes.len(), 2);
        assert_eq!(codes.get(0).builtin_code(), builtin_op::FULLY_CONNECTED);
        assert_eq!(codes.get(0).deprecated_builtin_code(), 9);
        assert_eq!(codes.get(1).builtin_code(), builtin_op::SOFTMAX);
        assert_eq!(codes.get(1).version(), 1);
    }

    #[test]
    fn test_subgraph_contents() {
        let graph = small_graph();
        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();

        let mut fbb = FlatBufferBuilder::new();
        let config = ExportConfig::default();
        let vec = build_subgraphs(&mut fbb, &graph, &nodes, &index, &config).unwrap();
        let buf = finish_vector(&mut fbb, vec);
        let subgraphs = read_vector::<SubGraph<'_>>(&buf);
        assert_eq!(subgraphs.len(), 1);

        let sg = subgraphs.get(0);
        assert_eq!(sg.name(), Some("small"));
        let tensors = sg.tensors().unwrap();
        // x, y, w, z
        assert_eq!(tensors.len(), 4);
        assert_eq!(tensors.get(2).name(), Some("w"));
        assert_eq!(tensors.get(2).buffer(), 1);
        assert_eq!(tensors.get(0).buffer(), 0);
        assert_eq!(tensors.get(0).shape().unwrap().iter().collect::<Vec<_>>(), vec![1, 2]);

        let ops = sg.operators().unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops.get(0).inputs().unwrap().iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(ops.get(0).outputs().unwrap().iter().collect::<Vec<_>>(), vec![1]);
        assert!(ops.get(0).builtin_options_as_fully_connected().is_some());
        assert_eq!(ops.get(1).opcode_index(), 1);
        assert_eq!(ops.get(1).builtin_options_as_softmax().unwrap().beta(), 2.0);

        assert_eq!(sg.inputs().unwrap().iter().collect::<Vec<_>>(), vec![0]);
        assert_eq!(sg.outputs().unwrap().iter().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_subgraph_name_override_and_anonymous_tensors() {
        let graph = small_graph();
        let nodes = lower(&graph).unwrap();
        let index = ExportIndex::build(&graph, &nodes).unwrap();
        let config = ExportConfig {
            subgraph_name: Some("main".into()),
            tensor_names: false,
            ..Default::default()
        };

        let mut fbb = FlatBufferBuilder::new();
        let vec = build_subgraphs(&mut fbb, &graph, &nodes, &index, &config).unwrap();
        let buf = finish_vector(&mut fbb, vec);
        let sg = read_vector::<SubGraph<'_>>(&buf).get(0);

        assert_eq!(sg.name(), Some("main"));
        assert!(sg.tensors().unwrap().iter().all(|t| t.name().is_none()));
    }
}
