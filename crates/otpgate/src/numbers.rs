// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `otpgate numbers` command implementation.
//!
//! Lists the configured sending pool, optionally probing each number's
//! live session state first. The probe applies the same registry
//! transitions the engine uses: a connected probe resets the error count,
//! a failed one marks the number disconnected.

use std::io::IsTerminal;
use std::sync::Arc;

use otpgate_config::OtpgateConfig;
use otpgate_core::error::OtpgateError;
use otpgate_core::types::NumberStatus;
use otpgate_core::{NumberStore, SessionApi};
use otpgate_registry::NumberRegistry;
use tracing::debug;

pub async fn run(config: &OtpgateConfig, probe: bool, json: bool) -> Result<(), OtpgateError> {
    let registry = Arc::new(NumberRegistry::from_config(
        &config.numbers,
        config.delivery.error_threshold,
    ));

    if probe && !registry.is_empty() {
        let gateway = crate::build_gateway(config)?;
        probe_pool(&registry, gateway.as_ref()).await?;
    }

    let mut numbers = registry.all();
    numbers.sort_by(|a, b| a.session.as_str().cmp(b.session.as_str()));

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&numbers)
                .map_err(|e| OtpgateError::Internal(format!("failed to encode numbers: {e}")))?
        );
        return Ok(());
    }

    if numbers.is_empty() {
        println!("no sending numbers configured (add [[numbers]] entries to otpgate.toml)");
        return Ok(());
    }

    let use_color = std::io::stdout().is_terminal();
    println!();
    println!(
        "  {:<14} {:<16} {:<13} {:<7} {:>6} {:>7}  {}",
        "SESSION", "MOBILE", "STATUS", "ACTIVE", "USED", "ERRORS", "LAST USED"
    );
    println!("  {}", "-".repeat(78));
    for number in &numbers {
        let last_used = number
            .last_used_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {:<14} {:<16} {:<13} {:<7} {:>6} {:>7}  {}",
            number.session.as_str(),
            number.mobile,
            status_label(number.status, use_color),
            number.is_active,
            number.usage_count,
            number.error_count,
            last_used
        );
    }
    println!();
    Ok(())
}

/// Probes every configured number and applies connect/disconnect
/// transitions. Shared with the `send` command, which probes before
/// dispatching so a fresh process starts from live state.
pub async fn probe_pool(
    registry: &NumberRegistry,
    gateway: &dyn SessionApi,
) -> Result<(), OtpgateError> {
    for number in registry.all() {
        match gateway.status(&number.session).await {
            Ok(status) if status.connected => {
                registry.mark_connected(&number.session).await?;
            }
            Ok(status) => {
                debug!(session = %number.session, state = %status.state, "probe: not connected");
                registry.mark_disconnected(&number.session).await?;
            }
            Err(e) => {
                debug!(session = %number.session, error = %e, "probe failed");
                registry.mark_disconnected(&number.session).await?;
            }
        }
    }
    Ok(())
}

fn status_label(status: NumberStatus, use_color: bool) -> String {
    if !use_color {
        return status.to_string();
    }
    use colored::Colorize;
    match status {
        NumberStatus::Connected => status.to_string().green().to_string(),
        NumberStatus::Error => status.to_string().red().to_string(),
        NumberStatus::Disconnected => status.to_string().yellow().to_string(),
        NumberStatus::Active | NumberStatus::Inactive => status.to_string().dimmed().to_string(),
    }
}
