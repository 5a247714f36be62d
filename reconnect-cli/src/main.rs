//! Reconnect CLI - agreement verification and document export tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

#[derive(Parser)]
#[command(name = "reconnect")]
#[command(author, version, about = "Couple agreement verification and export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the integrity tag for a piece of text
    Hash {
        /// The text to tag
        #[arg(value_name = "TEXT")]
        text: String,

        /// Use the SHA3-256 variant instead of the rolling tag
        #[arg(long)]
        sha3: bool,
    },

    /// Decode and pretty-print a QR verification payload
    Decode {
        /// The payload JSON string (as scanned from a document QR)
        #[arg(value_name = "PAYLOAD", conflicts_with = "file")]
        payload: Option<String>,

        /// Read the payload from a file instead
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Verify an agreement offline from a record file, or against a server
    Verify {
        /// Path to an agreement record (JSON)
        #[arg(short, long, value_name = "FILE", conflicts_with_all = ["server", "id"])]
        file: Option<PathBuf>,

        /// Base URL of a running reconnect-server
        #[arg(long, value_name = "URL", requires = "id")]
        server: Option<String>,

        /// Agreement ID to verify against the server
        #[arg(long, value_name = "UUID", requires = "server")]
        id: Option<uuid::Uuid>,

        /// Only set the exit code, print nothing
        #[arg(short, long)]
        quiet: bool,
    },

    /// Render the PDF document for an agreement record
    Export {
        /// Path to an agreement record (JSON)
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,

        /// Output directory for the PDF
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        /// Base URL baked into the QR verification payload
        #[arg(long, value_name = "URL", default_value = "http://localhost:3000")]
        base_url: String,

        /// Font file to render with (falls back to system fonts)
        #[arg(long, value_name = "FONT")]
        font: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Hash { text, sha3 } => commands::hash::execute(&text, sha3),
        Commands::Decode { payload, file } => commands::decode::execute(payload, file),
        Commands::Verify {
            file,
            server,
            id,
            quiet,
        } => commands::verify::execute(file, server, id, quiet).await,
        Commands::Export {
            file,
            out,
            base_url,
            font,
        } => commands::export::execute(file, out, &base_url, font),
    };

    if let Err(err) = result {
        let exit = exit_codes::ExitCode::from_anyhow(&err);
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(exit.code);
    }
}
