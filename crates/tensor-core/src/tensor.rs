// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type.

use crate::{BufferId, DType, Shape, Storage, TensorError};
use std::sync::Arc;

/// An n-dimensional tensor descriptor with optional backing memory.
///
/// A tensor goes through three observable states:
///
/// - **uninitialized** — its dimensions have not been decided yet
///   (the shape has zero elements);
/// - **placeholder** — dimensions are known but no memory is allocated
///   (activations of a graph that is only being described);
/// - **allocated** — it owns a [`Storage`] buffer.
///
/// Cloning a tensor shares its storage: both clones report the same
/// [`BufferId`]. This is how tied weights are expressed.
///
/// # Memory Layout
/// Data is stored in row-major (C) order as a flat little-endian byte buffer.
#[derive(Debug, Clone)]
pub struct Tensor {
    shape: Shape,
    dtype: DType,
    storage: Option<Arc<Storage>>,
}

impl Tensor {
    /// Creates a new allocated tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let t = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
    /// assert_eq!(t.size_bytes(), 24); // 2 * 3 * 4 bytes
    /// assert!(t.is_allocated());
    /// ```
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let size = shape.size_bytes(dtype);
        Self {
            shape,
            dtype,
            storage: Some(Arc::new(Storage::new(vec![0u8; size]))),
        }
    }

    /// Creates a tensor from raw little-endian bytes.
    ///
    /// Returns an error if the buffer size does not match `shape.size_bytes(dtype)`.
    pub fn from_bytes(shape: Shape, dtype: DType, data: Vec<u8>) -> Result<Self, TensorError> {
        let expected = shape.size_bytes(dtype);
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            shape,
            dtype,
            storage: Some(Arc::new(Storage::new(data))),
        })
    }

    /// Creates a tensor from a slice of `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.to_f32_vec().unwrap(), vec![1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        let expected_elements = shape.num_elements();
        if values.len() != expected_elements {
            return Err(TensorError::BufferSizeMismatch {
                expected: shape.size_bytes(DType::F32),
                actual: values.len() * DType::F32.size_bytes(),
            });
        }
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Ok(Self {
            shape,
            dtype: DType::F32,
            storage: Some(Arc::new(Storage::new(data))),
        })
    }

    /// Creates a tensor with known dimensions but no memory.
    pub fn placeholder(shape: Shape, dtype: DType) -> Self {
        Self {
            shape,
            dtype,
            storage: None,
        }
    }

    /// Creates a tensor whose dimensions are not decided yet.
    pub fn uninitialized(dtype: DType) -> Self {
        Self {
            shape: Shape::vector(0),
            dtype,
            storage: None,
        }
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns `true` once the tensor's dimensions are known.
    pub fn is_initialized(&self) -> bool {
        !self.shape.is_empty()
    }

    /// Returns `true` if the tensor owns memory.
    pub fn is_allocated(&self) -> bool {
        self.storage.is_some()
    }

    /// Returns the backing storage, if allocated.
    pub fn storage(&self) -> Option<&Storage> {
        self.storage.as_deref()
    }

    /// Returns the identity of the backing buffer, if allocated.
    pub fn buffer_id(&self) -> Option<BufferId> {
        self.storage.as_ref().map(|s| s.id())
    }

    /// Returns the raw bytes, if allocated.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.storage.as_ref().map(|s| s.as_bytes())
    }

    /// Returns the memory footprint described by the shape, in bytes.
    pub fn size_bytes(&self) -> usize {
        self.shape.size_bytes(self.dtype)
    }

    /// Decodes the buffer as `f32` values.
    ///
    /// Returns `None` for unallocated or non-`F32` tensors.
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        if self.dtype != DType::F32 {
            return None;
        }
        let bytes = self.as_bytes()?;
        Some(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let t = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
        assert_eq!(t.size_bytes(), 24);
        assert_eq!(t.shape(), &Shape::matrix(2, 3));
        assert_eq!(t.dtype(), DType::F32);
        assert!(t.is_initialized());
        assert!(t.is_allocated());
        assert!(t.to_f32_vec().unwrap().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_from_f32_little_endian() {
        let t = Tensor::from_f32(Shape::vector(2), &[1.0, -2.5]).unwrap();
        let bytes = t.as_bytes().unwrap();
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &(-2.5f32).to_le_bytes());
        assert_eq!(t.to_f32_vec().unwrap(), vec![1.0, -2.5]);
    }

    #[test]
    fn test_from_f32_count_mismatch() {
        let result = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0]);
        assert!(matches!(
            result,
            Err(TensorError::BufferSizeMismatch { expected: 12, actual: 8 })
        ));
    }

    #[test]
    fn test_from_bytes_size_mismatch() {
        let result = Tensor::from_bytes(Shape::matrix(2, 3), DType::F32, vec![0u8; 10]);
        assert!(result.is_err());
    }

    #[test]
    fn test_placeholder_is_unallocated() {
        let t = Tensor::placeholder(Shape::matrix(1, 8), DType::F32);
        assert!(t.is_initialized());
        assert!(!t.is_allocated());
        assert!(t.buffer_id().is_none());
        assert!(t.as_bytes().is_none());
        assert_eq!(t.size_bytes(), 32);
    }

    #[test]
    fn test_uninitialized() {
        let t = Tensor::uninitialized(DType::F32);
        assert!(!t.is_initialized());
        assert!(!t.is_allocated());
    }

    #[test]
    fn test_clone_shares_storage() {
        let a = Tensor::zeros(Shape::vector(4), DType::F32);
        let b = a.clone();
        assert!(a.buffer_id().is_some());
        assert_eq!(a.buffer_id(), b.buffer_id());

        let c = Tensor::zeros(Shape::vector(4), DType::F32);
        assert_ne!(a.buffer_id(), c.buffer_id());
    }

    #[test]
    fn test_to_f32_vec_wrong_dtype() {
        let t = Tensor::zeros(Shape::vector(4), DType::I8);
        assert!(t.to_f32_vec().is_none());
    }
}
