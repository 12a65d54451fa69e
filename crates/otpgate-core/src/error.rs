// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the otpgate delivery engine.

use thiserror::Error;

/// The primary error type used across otpgate traits and core operations.
///
/// Per-delivery failures (transport errors, disconnected sessions) are NOT
/// represented here -- they travel as [`crate::types::GatewayError`] values
/// inside delivery outcomes. This enum is for faults that should stop a
/// component from being constructed or an operation from proceeding at all.
#[derive(Debug, Error)]
pub enum OtpgateError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Registry/store errors (lookup of an unknown number, backend failure).
    #[error("registry error: {0}")]
    Registry(String),

    /// Mailer errors (SMTP connection, bad recipient address, send failure).
    #[error("mailer error: {message}")]
    Mailer {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
