// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: duplicate number identities, credential presence, and
//! non-zero bounds. Misconfiguration is fatal at startup, never per-call.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::OtpgateConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &OtpgateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Gateway URL must be present and look like an HTTP endpoint.
    let base_url = config.gateway.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.base_url must not be empty".to_string(),
        });
    } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("gateway.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    // An API key is a startup requirement as soon as numbers are configured.
    if !config.numbers.is_empty() {
        let key_missing = config
            .gateway
            .api_key
            .as_deref()
            .map(|k| k.trim().is_empty())
            .unwrap_or(true);
        if key_missing {
            errors.push(ConfigError::Validation {
                message: "gateway.api_key is required when [[numbers]] entries are configured"
                    .to_string(),
            });
        }
    }

    if config.gateway.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.request_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.delivery.error_threshold == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.error_threshold must be at least 1".to_string(),
        });
    }

    if config.delivery.job_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.job_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.delivery.max_job_retries == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.max_job_retries must be at least 1".to_string(),
        });
    }

    // Validate number entries: identities present and unique.
    let mut seen_sessions = HashSet::new();
    let mut seen_mobiles = HashSet::new();
    for (i, number) in config.numbers.iter().enumerate() {
        if number.mobile.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("numbers[{i}].mobile must not be empty"),
            });
        }
        if number.session_id.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("numbers[{i}].session_id must not be empty"),
            });
        }
        if !number.session_id.trim().is_empty() && !seen_sessions.insert(&number.session_id) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate session_id `{}` in [[numbers]] array",
                    number.session_id
                ),
            });
        }
        if !number.mobile.trim().is_empty() && !seen_mobiles.insert(&number.mobile) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate mobile `{}` in [[numbers]] array", number.mobile),
            });
        }
    }

    // Email section: host implies a sender, credentials come in pairs.
    if config.email.smtp_host.is_some() {
        if config.email.from_address.as_deref().unwrap_or("").trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "email.from_address is required when email.smtp_host is set".to_string(),
            });
        }
        if config.email.smtp_port == 0 {
            errors.push(ConfigError::Validation {
                message: "email.smtp_port must not be 0".to_string(),
            });
        }
    }
    if config.email.username.is_some() != config.email.password.is_some() {
        errors.push(ConfigError::Validation {
            message: "email.username and email.password must be set together".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
