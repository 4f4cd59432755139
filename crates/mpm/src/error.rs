//! Error types for the mpm TUI.
//!
//! This module defines TUI-specific errors that can occur during terminal
//! initialization, backend communication and configuration loading.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;

use mpm_core::DomainError;
use thiserror::Error;

// ============================================================================
// TUI Error Type
// ============================================================================

/// TUI application errors.
///
/// Backend failures are split three ways so the operator can tell them
/// apart: the request never completed (`Transport`), the backend answered
/// with an error status (`ServerRejected`), or it answered with a body we
/// could not interpret (`MalformedSnapshot`, `ParseError`).
#[derive(Error, Debug)]
pub enum TuiError {
    /// Failed to initialize the terminal.
    ///
    /// Common causes include running in a non-TTY environment or an
    /// unsupported terminal emulator.
    #[error("Failed to initialize terminal: {0}")]
    TerminalInit(String),

    /// Failed to cleanup/restore the terminal.
    ///
    /// The terminal may be left in an inconsistent state; running `reset`
    /// can help recover.
    #[error("Failed to restore terminal: {0}")]
    TerminalCleanup(String),

    /// The request did not complete: connection refused, timeout, DNS.
    #[error("Backend unreachable: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("Backend rejected request ({status}): {detail}")]
    ServerRejected {
        /// HTTP status code.
        status: u16,
        /// `detail` from the error body, or the status reason.
        detail: String,
    },

    /// The process list could not be normalized.
    #[error("Malformed process list: {0}")]
    MalformedSnapshot(String),

    /// Domain rule violated before any request was sent.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error passthrough.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parse error passthrough.
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl TuiError {
    /// Returns true for failures where the backend was never reached.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for TuiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::MalformedSnapshot(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::ServerRejected {
                status: status.as_u16(),
                detail: status.canonical_reason().unwrap_or("error").to_string(),
            };
        }
        Self::Transport(err.to_string())
    }
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Convenience Result type alias for TUI operations.
pub type Result<T> = std::result::Result<T, TuiError>;

// ============================================================================
// Tests
// ============================================================================
