//! Verify command implementation.
//!
//! Offline mode recomputes the integrity tag from an agreement record file.
//! Server mode asks a running reconnect-server, which performs the same
//! recomputation against its stored record.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracing::info;
use uuid::Uuid;

use reconnect_core::{verify, VerificationOutcome};

use crate::utils::{field, read_agreement};

/// Execute the verify command.
pub async fn execute(
    file: Option<PathBuf>,
    server: Option<String>,
    id: Option<Uuid>,
    quiet: bool,
) -> Result<()> {
    match (file, server, id) {
        (Some(path), _, _) => verify_offline(path, quiet),
        (None, Some(server), Some(id)) => verify_against_server(&server, id, quiet).await,
        _ => bail!("provide --file, or --server together with --id"),
    }
}

fn verify_offline(path: PathBuf, quiet: bool) -> Result<()> {
    let agreement = read_agreement(&path)?;
    info!(agreement_id = %agreement.id, status = %agreement.status, "record loaded");

    match verify::check(&agreement) {
        VerificationOutcome::Valid => {
            if !quiet {
                print_verdict(true, "Integrity tag matches the stored record");
                println!("{}", field("Agreement ID", &agreement.id.to_string()));
                println!("{}", field("Title", &agreement.title));
                println!(
                    "{}",
                    field(
                        "Hash",
                        agreement.agreement_hash.as_deref().unwrap_or_default()
                    )
                );
            }
            Ok(())
        }
        VerificationOutcome::Incomplete => {
            bail!("agreement {} is not completed; nothing to verify", agreement.id)
        }
        VerificationOutcome::HashMismatch {
            expected,
            recomputed,
        } => {
            if !quiet {
                print_verdict(false, "Record was altered after sealing");
                println!("{}", field("Sealed", &expected));
                println!("{}", field("Recomputed", &recomputed));
            }
            bail!("agreement hash mismatch: sealed {expected}, recomputed {recomputed}")
        }
    }
}

async fn verify_against_server(server: &str, id: Uuid, quiet: bool) -> Result<()> {
    let url = format!("{}/agreements/{id}/verify", server.trim_end_matches('/'));
    info!(%url, "querying server");

    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("request to server failed: {url}"))?;
    if !response.status().is_success() {
        bail!("server returned {} for {url}", response.status());
    }

    let body: serde_json::Value = response
        .json()
        .await
        .context("server returned a malformed verification response")?;

    let valid = body["valid"].as_bool().unwrap_or(false);
    if valid {
        if !quiet {
            print_verdict(true, "Server recomputation matches the sealed tag");
        }
        Ok(())
    } else {
        let reason = body["reason"].as_str().unwrap_or("UNKNOWN").to_string();
        if !quiet {
            print_verdict(false, &format!("Server reports {reason}"));
        }
        match reason.as_str() {
            "NOT_FOUND" => bail!("agreement {id} not found on the server"),
            "INCOMPLETE" => bail!("agreement {id} is not completed; nothing to verify"),
            _ => bail!("agreement hash mismatch reported by server"),
        }
    }
}

fn print_verdict(authentic: bool, detail: &str) {
    println!();
    if authentic {
        println!("{}", "╔════════════════════════════════════════╗".green());
        println!("{}", "║              AUTHENTIC                 ║".green().bold());
        println!("{}", "╚════════════════════════════════════════╝".green());
    } else {
        println!("{}", "╔════════════════════════════════════════╗".red());
        println!("{}", "║              TAMPERED                  ║".red().bold());
        println!("{}", "╚════════════════════════════════════════╝".red());
    }
    println!();
    println!("   {}", detail.dimmed());
}
