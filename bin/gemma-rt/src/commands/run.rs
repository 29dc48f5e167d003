// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `gemma-rt run` command: one forward pass over a token sequence.
//!
//! Demonstrates the full type-state pipeline:
//! ```text
//! InferenceEngine<Idle> → configure → <Configured> → load → <Ready> → run
//! ```

use anyhow::Context;
use gemma_model::GemmaConfig;
use runtime::{
    Configured, InferenceEngine, InferenceOutput, Ready, RuntimeConfig, RuntimeError, WeightLoader,
};
use tensor_core::{Shape, Tensor};

use super::preview;

pub fn execute(config: RuntimeConfig, tokens: &str) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             gemma-rt · Inference Runner              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let token_ids = parse_tokens(tokens)?;

    println!("  Config:");
    println!("   Model:     {}", config.model_path.display());
    println!("   Tokens:    {}", preview(&token_ids, 16));
    println!("   Profiling: {}", config.enable_profiling);
    println!();

    // Step 1: Idle → Configured (resolve hyperparameters, open weights).
    println!("  [1/3] Resolving model configuration...");
    let Some(configured) = configure(config.clone())? else {
        println!("        Model config not found. Running synthetic toy demo...");
        println!();
        return run_synthetic_demo(config, token_ids);
    };
    let model_config = configured.model_config();
    println!(
        "        {} blocks, embed {}, {} heads, vocab {}",
        model_config.num_hidden_layers,
        model_config.embed_dim(),
        model_config.num_attention_heads,
        model_config.vocab_size,
    );
    println!(
        "        Weights: {}",
        if configured.weight_loader().is_file_backed() {
            "safetensors (mmap)"
        } else {
            "synthetic"
        }
    );
    println!();

    // Step 2: Configured → Ready (assemble the model).
    println!("  [2/3] Loading weights...");
    let ready = configured.load()?;
    println!("        Model ready.");
    println!();

    // Step 3: Ready → run.
    println!("  [3/3] Running forward pass...");
    let output = forward(&ready, token_ids)?;
    println!();
    print_results(&output);

    Ok(())
}

/// Configures the engine. `None` means the model directory has no config
/// at all; a config that exists but fails to read or validate is an error.
fn configure(config: RuntimeConfig) -> anyhow::Result<Option<InferenceEngine<Configured>>> {
    match InferenceEngine::new(config).configure() {
        Ok(configured) => Ok(Some(configured)),
        Err(RuntimeError::ModelConfigNotFound(path)) => {
            tracing::warn!("no model config at '{}'", path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Runs the pipeline with the built-in toy hyperparameters and seeded
/// synthetic weights.
fn run_synthetic_demo(config: RuntimeConfig, token_ids: Vec<i64>) -> anyhow::Result<()> {
    let toy = GemmaConfig::toy();
    println!(
        "  Toy model: {} blocks, embed {}, {} heads, ffn {}, vocab {} ({} parameters)",
        toy.num_hidden_layers,
        toy.embed_dim(),
        toy.num_attention_heads,
        toy.intermediate_size,
        toy.vocab_size,
        toy.parameter_count(),
    );
    println!();

    let model = WeightLoader::synthetic(config.seed).build_model(&toy)?;
    let ready = InferenceEngine::from_model(config, toy, model);

    println!("  Running forward pass ({} tokens)...", token_ids.len());
    let output = forward(&ready, token_ids)?;
    println!();
    print_results(&output);

    Ok(())
}

fn forward(engine: &InferenceEngine<Ready>, token_ids: Vec<i64>) -> anyhow::Result<InferenceOutput> {
    let tokens = Tensor::from_i64(Shape::matrix(1, token_ids.len()), &token_ids)?;
    Ok(engine.run(&tokens)?)
}

fn print_results(output: &InferenceOutput) {
    let predictions = output.argmax();
    let first_row = predictions.first().map(Vec::as_slice).unwrap_or_default();

    println!("  Results:");
    println!("   Logits shape:     {}", output.logits.shape());
    println!("   Next-token argmax: {}", preview(first_row, 16));
    println!();
    println!("  Metrics:");
    println!("   {}", output.metrics.summary());
    for stage in &output.metrics.stages {
        println!(
            "     {:<20} {:>8.3}ms",
            stage.stage.to_string(),
            stage.duration.as_secs_f64() * 1000.0,
        );
    }
    println!();
}

/// Parses a comma-separated list of token ids.
fn parse_tokens(s: &str) -> anyhow::Result<Vec<i64>> {
    let ids = s
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<i64>().with_context(|| format!("invalid token id '{t}'")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    anyhow::ensure!(!ids.is_empty(), "no token ids given");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        assert_eq!(parse_tokens("10,25, 5 ,78,99").unwrap(), vec![10, 25, 5, 78, 99]);
        assert_eq!(parse_tokens("3,").unwrap(), vec![3]);
    }

    fn write_config(dir: &std::path::Path, json: &str) {
        std::fs::write(dir.join("config.json"), json).unwrap();
    }

    #[test]
    fn test_configure_missing_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let configured = configure(RuntimeConfig::for_model(dir.path())).unwrap();
        assert!(configured.is_none());
    }

    #[test]
    fn test_configure_invalid_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"{"hidden_size":12,"num_attention_heads":5,"num_hidden_layers":2,
                "intermediate_size":48,"vocab_size":100}"#,
        );

        let err = configure(RuntimeConfig::for_model(dir.path())).unwrap_err();
        assert!(err.to_string().contains("not divisible"), "{err}");
    }

    #[test]
    fn test_configure_malformed_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "{ not json");

        assert!(configure(RuntimeConfig::for_model(dir.path())).is_err());
    }

    #[test]
    fn test_configure_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"{"hidden_size":12,"num_attention_heads":4,"num_hidden_layers":2,
                "intermediate_size":48,"vocab_size":100}"#,
        );

        let configured = configure(RuntimeConfig::for_model(dir.path())).unwrap().unwrap();
        assert_eq!(configured.model_config(), &GemmaConfig::toy());
        assert!(!configured.weight_loader().is_file_backed());
    }

    #[test]
    fn test_parse_tokens_rejects_garbage() {
        assert!(parse_tokens("1,x,3").is_err());
        assert!(parse_tokens("").is_err());
        assert!(parse_tokens(" , ").is_err());
    }
}
