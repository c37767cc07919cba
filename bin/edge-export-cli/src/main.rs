// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # edge-export
//!
//! Command-line interface for the TFLite model exporter.
//!
//! ## Usage
//! ```bash
//! # Export a model directory (model.json + model.safetensors)
//! edge-export export --model ./models/mnist-mlp --output mnist.tflite
//!
//! # Override the container description
//! edge-export export -m ./models/mnist-mlp -o mnist.tflite --description "nightly"
//!
//! # Inspect an exported container
//! edge-export inspect --file mnist.tflite
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "edge-export",
    about = "Export model graphs to TensorFlow Lite FlatBuffer containers",
    version,
    author
)]
struct Cli {
    /// Path to a TOML export configuration file.
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
    /// Compile a model directory into a .tflite file.
    Export {
        /// Path to the model directory.
        #[arg(short, long)]
        model: PathBuf,

        /// Destination .tflite file; replaced atomically.
        #[arg(short, long)]
        output: PathBuf,

        /// Description stored in the container (overrides the config file).
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Verify a .tflite file and print its tables.
    Inspect {
        /// Path to the .tflite file.
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Export {
            model,
            output,
            description,
        } => commands::export::execute(cli.config, model, output, description),
        Commands::Inspect { file } => commands::inspect::execute(file),
    }
}
