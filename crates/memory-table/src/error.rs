// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the memory table.

/// Errors that can occur when resolving symbolic tensor names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// The name is not (or no longer) bound to a live value.
    #[error("missing reference: no live tensor named '{name}'")]
    MissingReference { name: String },
}
