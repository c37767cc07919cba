// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named tensors owned by a graph's variable arena.

use tensor_core::Tensor;

/// Stable handle to a [`Variable`] inside one [`crate::ModelGraph`].
///
/// The id is the variable's position in the graph arena. It is assigned
/// once by [`crate::ModelGraph::add_variable`] and never reused, so it
/// serves as the identity of a tensor descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub(crate) usize);

impl VariableId {
    /// Returns the arena position.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for VariableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// A named tensor: a layer input, output or weight.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Unique name within the graph (e.g., `"fc1.weight"`).
    pub name: String,
    /// Descriptor and, for weights, the data.
    pub tensor: Tensor,
}

impl Variable {
    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        let state = if self.tensor.is_allocated() {
            "allocated"
        } else if self.tensor.is_initialized() {
            "placeholder"
        } else {
            "uninitialized"
        };
        format!(
            "{} {} {} ({state})",
            self.name,
            self.tensor.shape(),
            self.tensor.dtype(),
        )
    }
}
