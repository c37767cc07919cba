// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The subset of the TensorFlow Lite FlatBuffer schema (`schema.fbs`,
//! version 3) that the exporter writes.
//!
//! Tables are built with the `flatbuffers` builder API directly, so this
//! module only carries wire constants and vtable slot offsets. A field's
//! vtable offset is `4 + 2 * field_id`. The read side lives in [`tables`].

pub mod tables;

pub use tables::{
    has_identifier, root_as_model, Buffer, FullyConnectedOptions, Model, Operator, OperatorCode,
    SoftmaxOptions, SubGraph, Tensor,
};

/// File identifier stored at bytes 4..8 of every TFLite model.
pub const FILE_IDENTIFIER: &str = "TFL3";

/// Schema version written into `Model.version`.
pub const SCHEMA_VERSION: u32 = 3;

/// `BuiltinOperator` enum values.
pub mod builtin_op {
    pub const ADD: i32 = 0;
    pub const FULLY_CONNECTED: i32 = 9;
    pub const LOGISTIC: i32 = 14;
    pub const RELU: i32 = 19;
    pub const RESHAPE: i32 = 22;
    pub const SOFTMAX: i32 = 25;
    pub const TANH: i32 = 28;

    /// Largest code representable in `OperatorCode.deprecated_builtin_code`.
    pub const PLACEHOLDER_FOR_GREATER_OP_CODES: i32 = 127;
}

/// `TensorType` enum values.
pub mod tensor_type {
    use tensor_core::DType;

    pub const FLOAT32: i8 = 0;
    pub const FLOAT16: i8 = 1;
    pub const INT32: i8 = 2;
    pub const UINT8: i8 = 3;
    pub const INT8: i8 = 9;
    pub const BFLOAT16: i8 = 18;

    pub fn from_dtype(dtype: DType) -> i8 {
        match dtype {
            DType::F32 => FLOAT32,
            DType::F16 => FLOAT16,
            DType::BF16 => BFLOAT16,
            DType::I8 => INT8,
            DType::I32 => INT32,
            DType::U8 => UINT8,
        }
    }

    pub fn to_dtype(code: i8) -> Option<DType> {
        match code {
            FLOAT32 => Some(DType::F32),
            FLOAT16 => Some(DType::F16),
            BFLOAT16 => Some(DType::BF16),
            INT8 => Some(DType::I8),
            INT32 => Some(DType::I32),
            UINT8 => Some(DType::U8),
            _ => None,
        }
    }
}

/// `ActivationFunctionType` enum values.
pub mod activation {
    pub const NONE: i8 = 0;
    pub const RELU: i8 = 1;
    pub const RELU_N1_TO_1: i8 = 2;
    pub const RELU6: i8 = 3;
    pub const TANH: i8 = 4;
}

/// `BuiltinOptions` union discriminants.
pub mod builtin_options {
    pub const NONE: u8 = 0;
    pub const FULLY_CONNECTED_OPTIONS: u8 = 8;
    pub const SOFTMAX_OPTIONS: u8 = 9;
}

/// Vtable slot offsets, one module per table.
pub mod vt {
    use flatbuffers::VOffsetT;

    pub mod model {
        use super::VOffsetT;
        pub const VERSION: VOffsetT = 4;
        pub const OPERATOR_CODES: VOffsetT = 6;
        pub const SUBGRAPHS: VOffsetT = 8;
        pub const DESCRIPTION: VOffsetT = 10;
        pub const BUFFERS: VOffsetT = 12;
    }

    pub mod operator_code {
        use super::VOffsetT;
        pub const DEPRECATED_BUILTIN_CODE: VOffsetT = 4;
        pub const CUSTOM_CODE: VOffsetT = 6;
        pub const VERSION: VOffsetT = 8;
        pub const BUILTIN_CODE: VOffsetT = 10;
    }

    pub mod sub_graph {
        use super::VOffsetT;
        pub const TENSORS: VOffsetT = 4;
        pub const INPUTS: VOffsetT = 6;
        pub const OUTPUTS: VOffsetT = 8;
        pub const OPERATORS: VOffsetT = 10;
        pub const NAME: VOffsetT = 12;
    }

    pub mod tensor {
        use super::VOffsetT;
        pub const SHAPE: VOffsetT = 4;
        pub const TYPE: VOffsetT = 6;
        pub const BUFFER: VOffsetT = 8;
        pub const NAME: VOffsetT = 10;
    }

    pub mod operator {
        use super::VOffsetT;
        pub const OPCODE_INDEX: VOffsetT = 4;
        pub const INPUTS: VOffsetT = 6;
        pub const OUTPUTS: VOffsetT = 8;
        pub const BUILTIN_OPTIONS_TYPE: VOffsetT = 10;
        pub const BUILTIN_OPTIONS: VOffsetT = 12;
    }

    pub mod buffer {
        use super::VOffsetT;
        pub const DATA: VOffsetT = 4;
    }

    pub mod fully_connected_options {
        use super::VOffsetT;
        pub const FUSED_ACTIVATION_FUNCTION: VOffsetT = 4;
        pub const WEIGHTS_FORMAT: VOffsetT = 6;
        pub const KEEP_NUM_DIMS: VOffsetT = 8;
    }

    pub mod softmax_options {
        use super::VOffsetT;
        pub const BETA: VOffsetT = 4;
    }
}
