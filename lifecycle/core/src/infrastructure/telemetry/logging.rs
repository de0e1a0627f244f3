// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Process-wide `tracing` subscriber setup.

use crate::domain::config::LifecycleConfig;
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Filter for the subscriber. `RUST_LOG` wins over the configured level.
fn log_filter(config: &LifecycleConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("Failed to create log filter from '{}'", config.log_level))
}

/// Installs a compact fmt subscriber filtered at `config.log_level`.
pub fn init_logging(config: &LifecycleConfig) -> Result<()> {
    let filter = log_filter(config)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    Ok(())
}
