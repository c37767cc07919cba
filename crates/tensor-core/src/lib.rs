// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor descriptors and weight storage for the model exporter.
//!
//! This crate provides:
//! - [`Tensor`] — shape + dtype + optional backing memory.
//! - [`Shape`] — runtime shape descriptors.
//! - [`DType`] — supported element data types.
//! - [`Storage`] / [`BufferId`] — allocated bytes with a stable identity,
//!   so that weight buffers can be deduplicated by ownership rather than by
//!   content or address.
//!
//! # Design Goals
//! - Buffer identity is explicit and allocator-independent.
//! - Byte layout is little-endian, row-major.
//! - Clean error types via `thiserror`.

mod dtype;
mod error;
mod shape;
mod storage;
mod tensor;

pub use dtype::DType;
pub use error::TensorError;
pub use shape::Shape;
pub use storage::{BufferId, Storage};
pub use tensor::Tensor;
