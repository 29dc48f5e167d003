// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # gemma-rt
//!
//! Command-line interface for the gemma-rt inference engine.
//!
//! ## Usage
//! ```bash
//! # Run one forward pass (falls back to a synthetic toy model)
//! gemma-rt run --model ./models/gemma-2b --tokens 10,25,5,78,99
//!
//! # Inspect a model directory
//! gemma-rt inspect --model ./models/gemma-2b
//! ```

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gemma-rt",
    about = "Forward inference for Gemma-style transformer models",
    version,
    author
)]
struct Cli {
    /// Path to a TOML runtime configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one forward pass over a token sequence.
    Run {
        /// Path to the model directory.
        #[arg(short, long)]
        model: PathBuf,

        /// Comma-separated token ids.
        #[arg(short, long, default_value = "10,25,5,78,99")]
        tokens: String,
    },

    /// Inspect a model: print hyperparameters and weight inventory.
    Inspect {
        /// Path to the model directory.
        #[arg(short, long)]
        model: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { model, tokens } => {
            let config = commands::runtime_config(cli.config.as_deref(), model)?;
            commands::run::execute(config, &tokens)
        }
        Commands::Inspect { model } => {
            let config = commands::runtime_config(cli.config.as_deref(), model)?;
            commands::inspect::execute(config)
        }
    }
}
