//! Shared helpers for CLI commands.

use std::path::Path;

use anyhow::{Context, Result};

use reconnect_core::Agreement;

/// Read and parse an agreement record file (JSON, camelCase fields as the
/// API serves them).
pub fn read_agreement(path: &Path) -> Result<Agreement> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid agreement record", path.display()))
}

/// Dimmed `label  value` line used across command output.
pub fn field(label: &str, value: &str) -> String {
    use colored::Colorize;
    format!("   {:<14} {}", label.dimmed(), value)
}
