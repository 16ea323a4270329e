// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `transcript-rt check` command: decode and liveness-check a transcript.

use std::path::PathBuf;

use transcript_ir::Transcript;

pub async fn execute(path: PathBuf) -> anyhow::Result<()> {
    let transcript = Transcript::from_file(&path)
        .map_err(|e| anyhow::anyhow!("failed to load transcript '{}': {e}", path.display()))?;

    let unknown: Vec<&str> = transcript
        .opcode_histogram()
        .into_keys()
        .filter(|name| runtime::OpCode::from_name(name).is_none())
        .collect();
    if !unknown.is_empty() {
        anyhow::bail!("unsupported ops: {}", unknown.join(", "));
    }

    transcript.check_liveness()?;

    println!("  OK  {}", transcript.summary());
    Ok(())
}
