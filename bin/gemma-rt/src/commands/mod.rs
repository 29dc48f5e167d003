// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

pub mod inspect;
pub mod run;

use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` takes precedence over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Builds the runtime configuration: the TOML file when given, with
/// `model` always overriding its model path.
pub fn runtime_config(
    config_file: Option<&Path>,
    model: PathBuf,
) -> anyhow::Result<runtime::RuntimeConfig> {
    let mut config = match config_file {
        Some(path) => runtime::RuntimeConfig::from_file(path)?,
        None => runtime::RuntimeConfig::default(),
    };
    config.model_path = model;
    Ok(config)
}

/// Formats at most `max` items, marking truncation.
pub fn preview<T: std::fmt::Debug>(items: &[T], max: usize) -> String {
    format!(
        "{:?}{}",
        &items[..items.len().min(max)],
        if items.len() > max { " ..." } else { "" },
    )
}
