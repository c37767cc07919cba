// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `edge-export export` command: model directory → .tflite file.
//!
//! ```text
//! ModelLoader::load → ModelGraph<Finalized> → TfliteInterpreter::serialize
//! ```

use anyhow::Context;
use std::path::PathBuf;
use tflite_export::{ExportConfig, GraphInterpreter, TfliteInterpreter};

pub fn execute(
    config: Option<PathBuf>,
    model: PathBuf,
    output: PathBuf,
    description: Option<String>,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           edge-export · TFLite Exporter              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Configuration ──────────────────────────────────────────
    let mut export_config = match &config {
        Some(path) => ExportConfig::from_file(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => ExportConfig::default(),
    };
    if let Some(description) = description {
        export_config = export_config.with_description(description);
    }

    println!("  Config:");
    println!("   Model:       {}", model.display());
    println!("   Output:      {}", output.display());
    println!("   Description: \"{}\"", export_config.description);
    println!();

    // ── Load ───────────────────────────────────────────────────
    println!("  [1/2] Loading model...");
    let graph = model_ir::ModelLoader::load(&model)
        .with_context(|| format!("failed to load model from '{}'", model.display()))?;
    println!("        {}", graph.summary());
    println!();

    // ── Export ─────────────────────────────────────────────────
    println!("  [2/2] Exporting...");
    let interpreter = TfliteInterpreter::new(export_config);
    let summary = interpreter
        .serialize(&graph, &output)
        .with_context(|| format!("failed to export '{}'", graph.name))?;
    println!("        {}", summary.summary());
    println!();
    println!("  Wrote {}", output.display());
    Ok(())
}
