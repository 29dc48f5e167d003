// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `gemma-rt inspect` command: display hyperparameters and weight layout.
//!
//! Reads `config.json` and the SafeTensors header (if present) without
//! decoding any weights.

use runtime::{RuntimeConfig, WeightLoader};

pub fn execute(config: RuntimeConfig) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              gemma-rt · Model Inspector              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let model = config.resolve_model_config().map_err(|e| {
        anyhow::anyhow!(
            "failed to read model config from '{}': {e}",
            config.model_path.display()
        )
    })?;

    // ── Hyperparameters ────────────────────────────────────────
    println!("  Model: {}", config.model_path.display());
    println!("   Blocks:        {}", model.num_hidden_layers);
    println!("   Embed dim:     {}", model.embed_dim());
    println!(
        "   Heads:         {} (head dim {})",
        model.num_attention_heads,
        model.head_dim(),
    );
    println!("   FFN dim:       {}", model.intermediate_size);
    println!("   Vocab:         {}", model.vocab_size);
    println!("   Norm eps:      {:e}", model.rms_norm_eps);
    println!(
        "   Parameters:    {} ({:.2} MB as f32)",
        model.parameter_count(),
        (model.parameter_count() * 4) as f64 / (1024.0 * 1024.0),
    );
    println!();

    // ── Weight Inventory ───────────────────────────────────────
    let weights = config.weights_path();
    if !weights.is_file() {
        println!("  No weight file at '{}'.", weights.display());
        println!();
        return Ok(());
    }

    let loader = WeightLoader::open(&config.model_path, &config.weights_file)?;
    let inventory = loader.inventory()?;

    println!("  Weights: {} ({} tensors)", weights.display(), inventory.len());
    println!("  {:<52} {:<6} {:>16}", "Name", "DType", "Shape");
    println!("  {}", "-".repeat(76));
    for tensor in &inventory {
        println!(
            "  {:<52} {:<6} {:>16}",
            truncate(&tensor.name, 52),
            tensor.dtype,
            format!("{:?}", tensor.shape),
        );
    }
    println!();

    Ok(())
}

/// Truncates to at most `max_chars` characters, ending in `...` when cut.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
