// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`Transcript`] container and its file helpers.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::{codec, CodecError, Instruction};

/// An ordered, replayable sequence of instructions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    instructions: Vec<Instruction>,
}

/// First reference to a name that is not live at that point of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("instruction {index} references '{name}', which is not live")]
pub struct LivenessViolation {
    pub index: usize,
    pub name: String,
}

impl Transcript {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Number of `DeviceOp` instructions.
    pub fn device_op_count(&self) -> usize {
        self.iter()
            .filter(|i| matches!(i, Instruction::DeviceOp(_)))
            .count()
    }

    /// Device-op names and how often each occurs, sorted by name.
    pub fn opcode_histogram(&self) -> BTreeMap<&str, usize> {
        let mut histogram = BTreeMap::new();
        for instruction in self.iter() {
            if let Instruction::DeviceOp(op) = instruction {
                *histogram.entry(op.name.as_str()).or_insert(0) += 1;
            }
        }
        histogram
    }

    /// One-line description.
    pub fn summary(&self) -> String {
        let frees = self
            .iter()
            .filter(|i| matches!(i, Instruction::FreeDeviceTensor { .. }))
            .count();
        let segments = self
            .iter()
            .filter(|i| matches!(i, Instruction::SegmentStart { .. }))
            .count();
        format!(
            "Transcript: {} instructions ({} device ops, {} distinct, {} frees, {} segments)",
            self.len(),
            self.device_op_count(),
            self.opcode_histogram().len(),
            frees,
            segments,
        )
    }

    /// Walks the transcript without executing it and reports the first
    /// argument or free that names a tensor which is not live at that point.
    pub fn check_liveness(&self) -> Result<(), LivenessViolation> {
        let mut live: HashSet<&str> = HashSet::new();
        for (index, instruction) in self.iter().enumerate() {
            match instruction {
                Instruction::DeviceOp(op) => {
                    for arg in &op.args {
                        if let Some(name) = arg.referenced_names().into_iter().find(|n| !live.contains(n)) {
                            return Err(LivenessViolation {
                                index,
                                name: name.to_string(),
                            });
                        }
                    }
                    if let Some(out) = op.out_ref() {
                        live.insert(&out.name);
                    }
                }
                Instruction::FreeDeviceTensor { name } => {
                    if !live.remove(name.as_str()) {
                        return Err(LivenessViolation {
                            index,
                            name: name.clone(),
                        });
                    }
                }
                Instruction::SegmentStart { .. } | Instruction::SegmentEnd => {}
            }
        }
        Ok(())
    }

    // ── Files ───────────────────────────────────────────────────────

    /// Loads and decodes a transcript file.
    pub fn from_file(path: &Path) -> Result<Self, CodecError> {
        let content = std::fs::read_to_string(path)?;
        let transcript = Self::from_json(&content)?;
        tracing::info!("loaded {} from '{}'", transcript.summary(), path.display());
        Ok(transcript)
    }

    /// Decodes a transcript from JSON text.
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        let document: serde_json::Value = serde_json::from_str(json)?;
        codec::decode_transcript(&document)
    }

    /// Encodes the transcript as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(&codec::encode_transcript(self))?)
    }

    /// Encodes the transcript and writes it to `path`.
    pub fn save(&self, path: &Path) -> Result<(), CodecError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

impl FromIterator<Instruction> for Transcript {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
