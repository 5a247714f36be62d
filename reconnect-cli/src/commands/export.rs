//! Export command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use tracing::info;

use reconnect_core::{render_document, FontSet};

use crate::utils::{field, read_agreement};

/// Execute the export command.
pub fn execute(
    file: PathBuf,
    out: PathBuf,
    base_url: &str,
    font: Option<PathBuf>,
) -> Result<()> {
    let agreement = read_agreement(&file)?;
    let fonts = FontSet::load(font.as_deref()).context("no usable font for rendering")?;

    let rendered = render_document(&agreement, base_url, Utc::now(), &fonts)
        .context("document rendering failed")?;

    let target = out.join(&rendered.file_name);
    std::fs::write(&target, &rendered.pdf)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    info!(agreement_id = %agreement.id, bytes = rendered.pdf.len(), "document exported");

    println!();
    println!("{}", "Document exported".green().bold());
    println!("{}", field("Agreement ID", &agreement.id.to_string()));
    println!("{}", field("Status", agreement.status.as_str()));
    println!("{}", field("File", &target.display().to_string()));
    if agreement.agreement_hash.is_some() {
        println!(
            "{}",
            field("QR", "embedded (agreement is completed and sealed)")
        );
    } else {
        println!("{}", field("QR", "omitted (agreement not completed)"));
    }

    Ok(())
}
