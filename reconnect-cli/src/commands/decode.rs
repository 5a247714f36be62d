//! Decode command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use reconnect_core::VerificationPayload;

use crate::utils::field;

/// Execute the decode command.
pub fn execute(payload: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let raw = match (payload, file) {
        (Some(payload), _) => payload,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?,
        (None, None) => bail!("provide a payload string or --file"),
    };

    let payload = VerificationPayload::decode(raw.trim())
        .context("malformed verification payload")?;

    println!();
    println!("{}", "Verification payload".bold());
    println!("{}", field("Agreement ID", &payload.agreement_id));
    println!("{}", field("Title", &payload.title));
    println!("{}", field("Date", &payload.date));
    println!("{}", field("Author", &payload.author_name));
    println!("{}", field("Partner", &payload.partner_name));
    println!("{}", field("Hash", &payload.agreement_hash));
    if let Some(hash) = &payload.author_signature_hash {
        println!("{}", field("Author sig", hash));
    }
    if let Some(hash) = &payload.partner_signature_hash {
        println!("{}", field("Partner sig", hash));
    }
    println!("{}", field("Verify at", &payload.verification_url));
    println!("{}", field("Issued", &payload.timestamp));
    println!("{}", field("Platform", &payload.platform));

    Ok(())
}
