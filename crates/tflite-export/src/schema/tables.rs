// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Read-side accessors and verifiers for the exported tables.
//!
//! These follow the shape of `flatc --rust` output: each table is a thin
//! wrapper around [`flatbuffers::Table`] with typed field accessors and a
//! [`Verifiable`] impl. A [`Model`] can only be obtained through
//! [`root_as_model`], which runs the verifier first, so the accessors may
//! read fields without further bounds checks.

use super::{builtin_options, vt, FILE_IDENTIFIER};
use flatbuffers::{Follow, ForwardsUOffset, InvalidFlatbuffer, Table, Vector, Verifiable, Verifier};

macro_rules! table {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone)]
        pub struct $name<'a> {
            tab: Table<'a>,
        }

        impl<'a> Follow<'a> for $name<'a> {
            type Inner = $name<'a>;

            #[inline]
            unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
                Self {
                    tab: Table::new(buf, loc),
                }
            }
        }
    };
}

table!(
    /// Root table: version, description and the three top-level sections.
    Model
);
table!(
    /// One entry of the operator-code table.
    OperatorCode
);
table!(
    /// The tensor table, operator list and graph inputs/outputs.
    SubGraph
);
table!(
    /// One entry of the subgraph tensor table.
    Tensor
);
table!(
    /// One operator invocation.
    Operator
);
table!(
    /// One raw data buffer.
    Buffer
);
table!(FullyConnectedOptions);
table!(SoftmaxOptions);

/// Returns `true` if `buf` carries the TFLite file identifier.
pub fn has_identifier(buf: &[u8]) -> bool {
    buf.len() >= 8 && &buf[4..8] == FILE_IDENTIFIER.as_bytes()
}

/// Verifies `buf` and returns its root [`Model`].
pub fn root_as_model(buf: &[u8]) -> Result<Model<'_>, InvalidFlatbuffer> {
    flatbuffers::root::<Model<'_>>(buf)
}

// SAFETY (all accessors below): tables are only reachable from a `Model`
// returned by `root_as_model`, whose buffer has passed verification.

impl<'a> Model<'a> {
    pub fn version(&self) -> u32 {
        unsafe { self.tab.get::<u32>(vt::model::VERSION, Some(0)) }.unwrap_or(0)
    }

    pub fn operator_codes(&self) -> Option<Vector<'a, ForwardsUOffset<OperatorCode<'a>>>> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<OperatorCode<'a>>>>>(
                    vt::model::OPERATOR_CODES,
                    None,
                )
        }
    }

    pub fn subgraphs(&self) -> Option<Vector<'a, ForwardsUOffset<SubGraph<'a>>>> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<SubGraph<'a>>>>>(
                    vt::model::SUBGRAPHS,
                    None,
                )
        }
    }

    pub fn description(&self) -> Option<&'a str> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<&str>>(vt::model::DESCRIPTION, None)
        }
    }

    pub fn buffers(&self) -> Option<Vector<'a, ForwardsUOffset<Buffer<'a>>>> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<Buffer<'a>>>>>(
                    vt::model::BUFFERS,
                    None,
                )
        }
    }
}

impl Verifiable for Model<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<u32>("version", vt::model::VERSION, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<OperatorCode<'_>>>>>(
                "operator_codes",
                vt::model::OPERATOR_CODES,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<SubGraph<'_>>>>>(
                "subgraphs",
                vt::model::SUBGRAPHS,
                false,
            )?
            .visit_field::<ForwardsUOffset<&str>>("description", vt::model::DESCRIPTION, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<Buffer<'_>>>>>(
                "buffers",
                vt::model::BUFFERS,
                false,
            )?
            .finish();
        Ok(())
    }
}

impl<'a> OperatorCode<'a> {
    pub fn deprecated_builtin_code(&self) -> i8 {
        unsafe {
            self.tab
                .get::<i8>(vt::operator_code::DEPRECATED_BUILTIN_CODE, Some(0))
        }
        .unwrap_or(0)
    }

    pub fn version(&self) -> i32 {
        unsafe { self.tab.get::<i32>(vt::operator_code::VERSION, Some(1)) }.unwrap_or(1)
    }

    pub fn builtin_code(&self) -> i32 {
        unsafe { self.tab.get::<i32>(vt::operator_code::BUILTIN_CODE, Some(0)) }.unwrap_or(0)
    }

    /// The operator code as readers resolve it: the larger of the two
    /// code fields, since old writers only fill the deprecated one.
    pub fn effective_builtin_code(&self) -> i32 {
        self.builtin_code()
            .max(i32::from(self.deprecated_builtin_code()))
    }
}

impl Verifiable for OperatorCode<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i8>(
                "deprecated_builtin_code",
                vt::operator_code::DEPRECATED_BUILTIN_CODE,
                false,
            )?
            .visit_field::<ForwardsUOffset<&str>>(
                "custom_code",
                vt::operator_code::CUSTOM_CODE,
                false,
            )?
            .visit_field::<i32>("version", vt::operator_code::VERSION, false)?
            .visit_field::<i32>("builtin_code", vt::operator_code::BUILTIN_CODE, false)?
            .finish();
        Ok(())
    }
}

impl<'a> SubGraph<'a> {
    pub fn tensors(&self) -> Option<Vector<'a, ForwardsUOffset<Tensor<'a>>>> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<Tensor<'a>>>>>(
                    vt::sub_graph::TENSORS,
                    None,
                )
        }
    }

    pub fn inputs(&self) -> Option<Vector<'a, i32>> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, i32>>>(vt::sub_graph::INPUTS, None)
        }
    }

    pub fn outputs(&self) -> Option<Vector<'a, i32>> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, i32>>>(vt::sub_graph::OUTPUTS, None)
        }
    }

    pub fn operators(&self) -> Option<Vector<'a, ForwardsUOffset<Operator<'a>>>> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<Operator<'a>>>>>(
                    vt::sub_graph::OPERATORS,
                    None,
                )
        }
    }

    pub fn name(&self) -> Option<&'a str> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<&str>>(vt::sub_graph::NAME, None)
        }
    }
}

impl Verifiable for SubGraph<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<Tensor<'_>>>>>(
                "tensors",
                vt::sub_graph::TENSORS,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>(
                "inputs",
                vt::sub_graph::INPUTS,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>(
                "outputs",
                vt::sub_graph::OUTPUTS,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<Operator<'_>>>>>(
                "operators",
                vt::sub_graph::OPERATORS,
                false,
            )?
            .visit_field::<ForwardsUOffset<&str>>("name", vt::sub_graph::NAME, false)?
            .finish();
        Ok(())
    }
}

impl<'a> Tensor<'a> {
    pub fn shape(&self) -> Option<Vector<'a, i32>> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, i32>>>(vt::tensor::SHAPE, None)
        }
    }

    pub fn type_(&self) -> i8 {
        unsafe { self.tab.get::<i8>(vt::tensor::TYPE, Some(0)) }.unwrap_or(0)
    }

    pub fn buffer(&self) -> u32 {
        unsafe { self.tab.get::<u32>(vt::tensor::BUFFER, Some(0)) }.unwrap_or(0)
    }

    pub fn name(&self) -> Option<&'a str> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<&str>>(vt::tensor::NAME, None)
        }
    }
}

impl Verifiable for Tensor<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("shape", vt::tensor::SHAPE, false)?
            .visit_field::<i8>("type", vt::tensor::TYPE, false)?
            .visit_field::<u32>("buffer", vt::tensor::BUFFER, false)?
            .visit_field::<ForwardsUOffset<&str>>("name", vt::tensor::NAME, false)?
            .finish();
        Ok(())
    }
}

impl<'a> Operator<'a> {
    pub fn opcode_index(&self) -> u32 {
        unsafe { self.tab.get::<u32>(vt::operator::OPCODE_INDEX, Some(0)) }.unwrap_or(0)
    }

    pub fn inputs(&self) -> Option<Vector<'a, i32>> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, i32>>>(vt::operator::INPUTS, None)
        }
    }

    pub fn outputs(&self) -> Option<Vector<'a, i32>> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, i32>>>(vt::operator::OUTPUTS, None)
        }
    }

    pub fn builtin_options_type(&self) -> u8 {
        unsafe {
            self.tab
                .get::<u8>(vt::operator::BUILTIN_OPTIONS_TYPE, Some(builtin_options::NONE))
        }
        .unwrap_or(builtin_options::NONE)
    }

    pub fn builtin_options_as_fully_connected(&self) -> Option<FullyConnectedOptions<'a>> {
        if self.builtin_options_type() != builtin_options::FULLY_CONNECTED_OPTIONS {
            return None;
        }
        unsafe {
            self.tab.get::<ForwardsUOffset<FullyConnectedOptions<'a>>>(
                vt::operator::BUILTIN_OPTIONS,
                None,
            )
        }
    }

    pub fn builtin_options_as_softmax(&self) -> Option<SoftmaxOptions<'a>> {
        if self.builtin_options_type() != builtin_options::SOFTMAX_OPTIONS {
            return None;
        }
        unsafe {
            self.tab
                .get::<ForwardsUOffset<SoftmaxOptions<'a>>>(vt::operator::BUILTIN_OPTIONS, None)
        }
    }
}

impl Verifiable for Operator<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<u32>("opcode_index", vt::operator::OPCODE_INDEX, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>(
                "inputs",
                vt::operator::INPUTS,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>(
                "outputs",
                vt::operator::OUTPUTS,
                false,
            )?
            .visit_union::<u8, _>(
                "builtin_options_type",
                vt::operator::BUILTIN_OPTIONS_TYPE,
                "builtin_options",
                vt::operator::BUILTIN_OPTIONS,
                false,
                |key, v, pos| match key {
                    builtin_options::FULLY_CONNECTED_OPTIONS => v
                        .verify_union_variant::<ForwardsUOffset<FullyConnectedOptions<'_>>>(
                            "BuiltinOptions::FullyConnectedOptions",
                            pos,
                        ),
                    builtin_options::SOFTMAX_OPTIONS => v
                        .verify_union_variant::<ForwardsUOffset<SoftmaxOptions<'_>>>(
                            "BuiltinOptions::SoftmaxOptions",
                            pos,
                        ),
                    _ => Ok(()),
                },
            )?
            .finish();
        Ok(())
    }
}

impl<'a> Buffer<'a> {
    pub fn data(&self) -> Option<Vector<'a, u8>> {
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, u8>>>(vt::buffer::DATA, None)
        }
    }

    /// Length of the data vector, 0 when absent.
    pub fn len(&self) -> usize {
        self.data().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Verifiable for Buffer<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, u8>>>("data", vt::buffer::DATA, false)?
            .finish();
        Ok(())
    }
}

impl FullyConnectedOptions<'_> {
    pub fn fused_activation_function(&self) -> i8 {
        unsafe {
            self.tab.get::<i8>(
                vt::fully_connected_options::FUSED_ACTIVATION_FUNCTION,
                Some(0),
            )
        }
        .unwrap_or(0)
    }
}

impl Verifiable for FullyConnectedOptions<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i8>(
                "fused_activation_function",
                vt::fully_connected_options::FUSED_ACTIVATION_FUNCTION,
                false,
            )?
            .visit_field::<i8>(
                "weights_format",
                vt::fully_connected_options::WEIGHTS_FORMAT,
                false,
            )?
            .visit_field::<bool>(
                "keep_num_dims",
                vt::fully_connected_options::KEEP_NUM_DIMS,
                false,
            )?
            .finish();
        Ok(())
    }
}

impl SoftmaxOptions<'_> {
    pub fn beta(&self) -> f32 {
        unsafe { self.tab.get::<f32>(vt::softmax_options::BETA, Some(0.0)) }.unwrap_or(0.0)
    }
}

impl Verifiable for SoftmaxOptions<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<f32>("beta", vt::softmax_options::BETA, false)?
            .finish();
        Ok(())
    }
}
