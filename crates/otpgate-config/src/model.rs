// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the otpgate delivery engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level otpgate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values; a
/// deployment without `[[numbers]]` entries simply has no WhatsApp channel.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OtpgateConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Remote session-automation API settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Dispatch and delivery-job settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// SMTP fallback settings.
    #[serde(default)]
    pub email: EmailConfig,

    /// Configured sending numbers, seeded into the registry at startup.
    #[serde(default)]
    pub numbers: Vec<NumberConfig>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Remote session-automation API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base URL of the session-automation service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Static API key sent in the `x-api-key` header. Required as soon as
    /// any `[[numbers]]` entry exists.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds for every remote call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// TTL in seconds for the per-session status cache. 0 disables caching.
    #[serde(default = "default_status_cache_ttl_secs")]
    pub status_cache_ttl_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            status_cache_ttl_secs: default_status_cache_ttl_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.whatsapp-plus.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_status_cache_ttl_secs() -> u64 {
    20
}

/// Dispatch and delivery-job configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Service name embedded in the OTP message template.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Errors tolerated on one number before the circuit breaker trips.
    #[serde(default = "default_error_threshold")]
    pub error_threshold: u32,

    /// Fixed delay in seconds before the in-job WhatsApp retry.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Wall-clock timeout in seconds for one delivery-job execution.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Queue-level retries for a delivery job that timed out.
    #[serde(default = "default_max_job_retries")]
    pub max_job_retries: u32,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            error_threshold: default_error_threshold(),
            retry_delay_secs: default_retry_delay_secs(),
            job_timeout_secs: default_job_timeout_secs(),
            max_job_retries: default_max_job_retries(),
        }
    }
}

fn default_service_name() -> String {
    "otpgate".to_string()
}

fn default_error_threshold() -> u32 {
    5
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_job_timeout_secs() -> u64 {
    30
}

fn default_max_job_retries() -> u32 {
    3
}

/// SMTP fallback configuration.
///
/// Leaving `smtp_host` unset disables the email channel entirely; the
/// dispatcher then treats every request as having no email on file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// SMTP relay hostname. `None` disables email fallback.
    #[serde(default)]
    pub smtp_host: Option<String>,

    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username. Must be set together with `password`.
    #[serde(default)]
    pub username: Option<String>,

    /// SMTP password. Must be set together with `username`.
    #[serde(default)]
    pub password: Option<String>,

    /// Sender address. Required when `smtp_host` is set.
    #[serde(default)]
    pub from_address: Option<String>,

    /// Subject line for OTP mails.
    #[serde(default = "default_email_subject")]
    pub subject: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from_address: None,
            subject: default_email_subject(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_email_subject() -> String {
    "Your OTP Code".to_string()
}

/// One configured WhatsApp sending identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NumberConfig {
    /// Virtual mobile number this identity sends from.
    pub mobile: String,

    /// Remote session ID bound to this number (unique across entries).
    pub session_id: String,

    /// Friendly name, advisory only.
    #[serde(default)]
    pub name: Option<String>,

    /// Operator notes, advisory only.
    #[serde(default)]
    pub description: Option<String>,

    /// Operator kill switch; `false` keeps the number out of selection.
    #[serde(default = "default_number_active")]
    pub is_active: bool,

    /// Open key-value bag carried on the registry entry, uninterpreted.
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

fn default_number_active() -> bool {
    true
}
