// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # transcript-rt
//!
//! Command-line interface for the transcript replay runtime.
//!
//! ## Usage
//! ```bash
//! # Replay a transcript and check every recorded download
//! transcript-rt run ./keygen.json --verify
//!
//! # Replay five times on four threads and keep the last report
//! transcript-rt run ./keygen.json --threads 4 --repeat 5 --report report.json
//!
//! # Print the opcode histogram, or the whole transcript
//! transcript-rt inspect ./keygen.json --full
//!
//! # Decode and liveness-check without executing
//! transcript-rt check ./keygen.json
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "transcript-rt",
    about = "Replay engine for recorded tensor-op transcripts",
    version,
    author
)]
struct Cli {
    /// Path to a TOML runtime configuration file (CLI flags override it).
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a transcript on the CPU backend.
    Run {
        /// Path to the transcript JSON document.
        transcript: std::path::PathBuf,

        /// Compare every device_to_host result with its recorded value.
        #[arg(long)]
        verify: bool,

        /// Worker threads for the backend (defaults to the online cores).
        #[arg(short, long)]
        threads: Option<usize>,

        /// Number of times to replay the transcript.
        #[arg(short, long, default_value_t = 1)]
        repeat: usize,

        /// Run the static liveness check before executing.
        #[arg(long)]
        preflight: bool,

        /// Write the final run report as JSON to this path.
        #[arg(long)]
        report: Option<std::path::PathBuf>,
    },

    /// Print a transcript's structure without executing it.
    Inspect {
        /// Path to the transcript JSON document.
        transcript: std::path::PathBuf,

        /// Print every instruction instead of only the summary.
        #[arg(long)]
        full: bool,
    },

    /// Decode a transcript and check that every name is bound before use.
    Check {
        /// Path to the transcript JSON document.
        transcript: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            transcript,
            verify,
            threads,
            repeat,
            preflight,
            report,
        } => {
            let options = commands::run::RunOptions {
                config: cli.config,
                verify,
                threads,
                repeat,
                preflight,
                report,
            };
            commands::run::execute(transcript, options).await
        }
        Commands::Inspect { transcript, full } => commands::inspect::execute(transcript, full).await,
        Commands::Check { transcript } => commands::check::execute(transcript).await,
    }
}
