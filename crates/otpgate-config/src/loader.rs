// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./otpgate.toml` > `~/.config/otpgate/otpgate.toml`
//! > `/etc/otpgate/otpgate.toml` with environment variable overrides via
//! `OTPGATE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::OtpgateConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/otpgate/otpgate.toml` (system-wide)
/// 3. `~/.config/otpgate/otpgate.toml` (user XDG config)
/// 4. `./otpgate.toml` (local directory)
/// 5. `OTPGATE_*` environment variables
pub fn load_config() -> Result<OtpgateConfig, figment::Error> {
    base_figment().merge(env_provider()).extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<OtpgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OtpgateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<OtpgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OtpgateConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

fn base_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(OtpgateConfig::default()))
        .merge(Toml::file("/etc/otpgate/otpgate.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("otpgate/otpgate.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("otpgate.toml"))
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `OTPGATE_GATEWAY_API_KEY` must map to
/// `gateway.api_key`, not `gateway.api.key`.
fn env_provider() -> Env {
    Env::prefixed("OTPGATE_").map(|key| {
        // `key` is the lowercased env var name with the prefix stripped,
        // e.g. OTPGATE_GATEWAY_API_KEY -> "gateway_api_key".
        let mapped = key
            .as_str()
            .replacen("log_", "log.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("delivery_", "delivery.", 1)
            .replacen("email_", "email.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_load_without_any_source() {
        let config = load_config_from_str("").expect("empty config should load");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.gateway.request_timeout_secs, 30);
        assert_eq!(config.delivery.error_threshold, 5);
        assert!(config.numbers.is_empty());
    }

    #[test]
    #[serial]
    fn env_override_maps_into_gateway_section() {
        // Env overrides apply on top of a config file path.
        unsafe {
            std::env::set_var("OTPGATE_GATEWAY_API_KEY", "k-from-env");
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("otpgate.toml");
        std::fs::write(&path, "[gateway]\nbase_url = \"http://localhost:3000\"\n").unwrap();

        let config = load_config_from_path(&path).expect("config should load");
        assert_eq!(config.gateway.base_url, "http://localhost:3000");
        assert_eq!(config.gateway.api_key.as_deref(), Some("k-from-env"));

        unsafe {
            std::env::remove_var("OTPGATE_GATEWAY_API_KEY");
        }
    }

    #[test]
    #[serial]
    fn env_override_does_not_split_inner_underscores() {
        unsafe {
            std::env::set_var("OTPGATE_DELIVERY_SERVICE_NAME", "acme");
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("otpgate.toml");
        std::fs::write(&path, "").unwrap();

        let config = load_config_from_path(&path).expect("config should load");
        assert_eq!(config.delivery.service_name, "acme");

        unsafe {
            std::env::remove_var("OTPGATE_DELIVERY_SERVICE_NAME");
        }
    }
}
