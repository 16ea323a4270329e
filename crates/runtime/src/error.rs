// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for transcript replay.

use std::fmt;

use memory_table::TableError;
use transcript_ir::{ArgumentTag, CodecError, LivenessViolation};

use crate::BackendError;

/// Errors that terminate a replay. None are recoverable; the first one
/// raised ends the run.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// An argument or free names a tensor that is not live.
    #[error("missing reference '{name}'{}", at_index(.index))]
    MissingReference { name: String, index: Option<usize> },

    /// A verified device-to-host transfer differed from the recorded value.
    #[error("verification mismatch at instruction {index} for '{name}': {detail}")]
    VerificationMismatch {
        index: usize,
        name: String,
        detail: String,
    },

    /// An argument kind the marshaller cannot pass to a backend op.
    #[error("unsupported {tag} argument to '{op}'")]
    UnsupportedArgument { op: String, tag: ArgumentTag },

    /// The op name is not in the opcode table.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// The transcript contains an argument tag outside the known set.
    #[error("unknown argument tag '{tag}' at {path}")]
    UnknownArgumentTag { path: String, tag: String },

    /// The transcript document could not be decoded.
    #[error("transcript decode failed: {0}")]
    Decode(#[source] CodecError),

    /// An op received arguments that do not fit its signature.
    #[error("invalid arguments to '{op}': {detail}")]
    InvalidArguments { op: String, detail: String },

    /// The backend rejected an op.
    #[error("backend failed in '{op}': {source}")]
    Backend {
        op: String,
        #[source]
        source: BackendError,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An op-level failure, tagged with the instruction that raised it.
    #[error("instruction {index}: {source}")]
    AtInstruction {
        index: usize,
        #[source]
        source: Box<RuntimeError>,
    },
}

fn at_index(index: &Option<usize>) -> String {
    index.map(|i| format!(" at instruction {i}")).unwrap_or_default()
}

/// The failure category of a [`RuntimeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingReference,
    VerificationMismatch,
    UnsupportedArgument,
    UnknownOperation,
    UnknownArgumentTag,
    DecodeSchemaError,
    InvalidArguments,
    Backend,
    Config,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingReference => "MissingReference",
            Self::VerificationMismatch => "VerificationMismatch",
            Self::UnsupportedArgument => "UnsupportedArgument",
            Self::UnknownOperation => "UnknownOperation",
            Self::UnknownArgumentTag => "UnknownArgumentTag",
            Self::DecodeSchemaError => "DecodeSchemaError",
            Self::InvalidArguments => "InvalidArguments",
            Self::Backend => "Backend",
            Self::Config => "Config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingReference { .. } => ErrorKind::MissingReference,
            Self::VerificationMismatch { .. } => ErrorKind::VerificationMismatch,
            Self::UnsupportedArgument { .. } => ErrorKind::UnsupportedArgument,
            Self::UnknownOperation(_) => ErrorKind::UnknownOperation,
            Self::UnknownArgumentTag { .. } => ErrorKind::UnknownArgumentTag,
            Self::Decode(_) => ErrorKind::DecodeSchemaError,
            Self::InvalidArguments { .. } => ErrorKind::InvalidArguments,
            Self::Backend { .. } => ErrorKind::Backend,
            Self::Config(_) => ErrorKind::Config,
            Self::AtInstruction { source, .. } => source.kind(),
        }
    }

    /// Index of the instruction that failed, when known.
    pub fn instruction_index(&self) -> Option<usize> {
        match self {
            Self::MissingReference { index, .. } => *index,
            Self::VerificationMismatch { index, .. } | Self::AtInstruction { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub(crate) fn invalid(op: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidArguments {
            op: op.into(),
            detail: detail.into(),
        }
    }

    /// Attaches the failing instruction index. Errors that already carry
    /// one are returned unchanged.
    pub(crate) fn at(self, index: usize) -> Self {
        match self {
            Self::MissingReference { name, index: None } => Self::MissingReference {
                name,
                index: Some(index),
            },
            tagged @ (Self::MissingReference { .. }
            | Self::VerificationMismatch { .. }
            | Self::AtInstruction { .. }) => tagged,
            other => Self::AtInstruction {
                index,
                source: Box::new(other),
            },
        }
    }
}

impl From<TableError> for RuntimeError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::MissingReference { name } => Self::MissingReference { name, index: None },
        }
    }
}

impl From<LivenessViolation> for RuntimeError {
    fn from(v: LivenessViolation) -> Self {
        Self::MissingReference {
            name: v.name,
            index: Some(v.index),
        }
    }
}

impl From<CodecError> for RuntimeError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::UnknownArgumentTag { path, tag } => Self::UnknownArgumentTag { path, tag },
            other => Self::Decode(other),
        }
    }
}
