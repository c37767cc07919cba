// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `edge-export inspect` command: verify a container and print its tables.

use anyhow::Context;
use std::path::PathBuf;
use tflite_export::ContainerSummary;

pub fn execute(file: PathBuf) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║          edge-export · Container Inspector           ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let summary = ContainerSummary::from_file(&file)
        .with_context(|| format!("failed to inspect '{}'", file.display()))?;

    println!("  File: {}", file.display());
    print!("{summary}");

    // ── Operator codes ─────────────────────────────────────────
    println!("  operator codes:");
    for (i, code) in summary.operator_codes.iter().enumerate() {
        let name = tflite_export::OperatorKind::from_builtin_code(*code)
            .map(|k| k.as_str())
            .unwrap_or("unknown");
        println!("    [{i:>3}] {code:>4} {name}");
    }
    println!();
    Ok(())
}
