//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

#![allow(dead_code)] // Not every code has a producer yet; kept for scripts

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Data format error (verification failed, tampered record, malformed
/// payload). Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Service unavailable (server not reachable).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify error by inspecting the chain
        let code = if message.contains("Failed to read") {
            INPUT_ERROR
        } else if message.contains("hash mismatch")
            || message.contains("not completed")
            || message.contains("malformed")
            || message.contains("TAMPERED")
        {
            VERIFICATION_FAILED
        } else if message.contains("server") || message.contains("request") {
            NETWORK_ERROR
        } else if message.contains("Failed to write") {
            IO_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}
