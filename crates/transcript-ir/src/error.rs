// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for transcript decoding and encoding.

use tensor_core::TensorError;

/// Errors that can occur while reading, decoding or writing transcripts.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The transcript file could not be read or written.
    #[error("transcript I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON.
    #[error("failed to parse transcript JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A record is missing its discriminator or a required field, or a field
    /// has the wrong JSON type.
    #[error("schema error at {path}: {detail}")]
    Schema { path: String, detail: String },

    /// An argument record names a tag outside the known set.
    #[error("unknown argument tag '{tag}' at {path}")]
    UnknownArgumentTag { path: String, tag: String },

    /// The base64 armor of a host tensor payload is invalid.
    #[error("invalid base64 payload at {path}: {source}")]
    Base64 {
        path: String,
        #[source]
        source: base64::DecodeError,
    },

    /// A host tensor payload or dtype name could not be interpreted.
    #[error("invalid tensor payload at {path}: {source}")]
    Tensor {
        path: String,
        #[source]
        source: TensorError,
    },
}

impl CodecError {
    pub(crate) fn schema(path: &str, detail: impl Into<String>) -> Self {
        Self::Schema {
            path: path.to_string(),
            detail: detail.into(),
        }
    }
}
