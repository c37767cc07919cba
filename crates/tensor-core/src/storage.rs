// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocated tensor memory with a stable ownership identity.
//!
//! Every [`Storage`] receives a fresh [`BufferId`] when it is allocated.
//! Two tensors refer to "the same buffer" exactly when they hold the same
//! `Storage` (shared through an `Arc`), regardless of where the bytes live
//! or what they contain. Equality and hashing of `Storage` therefore look
//! at the id only.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one allocated buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for BufferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "buf#{}", self.0)
    }
}

/// A contiguous, little-endian byte buffer backing an allocated tensor.
#[derive(Debug)]
pub struct Storage {
    id: BufferId,
    bytes: Vec<u8>,
}

impl Storage {
    /// Takes ownership of `bytes` and assigns a new [`BufferId`].
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            id: BufferId::next(),
            bytes,
        }
    }

    /// Returns the identity of this buffer.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the buffer length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl PartialEq for Storage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Storage {}

impl Hash for Storage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
