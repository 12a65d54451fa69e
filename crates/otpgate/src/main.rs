// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! otpgate - multi-number WhatsApp OTP delivery with email fallback.
//!
//! This is the operator CLI: session lifecycle control, QR/pairing-code
//! authentication assists, registry inspection with live connection
//! probing, and test sends through the full dispatch path.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod numbers;
mod send;
mod session;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use otpgate_session::SessionClient;

/// otpgate - multi-number WhatsApp OTP delivery with email fallback.
#[derive(Parser, Debug)]
#[command(name = "otpgate", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Control a remote WhatsApp session.
    Session {
        #[command(subcommand)]
        command: session::SessionCommands,
    },
    /// List configured sending numbers.
    Numbers {
        /// Probe each number's live session state and update the registry.
        #[arg(long)]
        probe: bool,
        /// Output structured JSON for scripting.
        #[arg(long)]
        json: bool,
    },
    /// Send a test OTP through the full dispatch path.
    Send {
        /// Recipient mobile number.
        mobile: String,
        /// Code to deliver. A random 6-digit code is generated if omitted.
        #[arg(long)]
        code: Option<String>,
        /// Recipient email address for the fallback leg.
        #[arg(long)]
        email: Option<String>,
        /// Run through the asynchronous delivery job instead of a direct
        /// dispatch.
        #[arg(long)]
        job: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup; misconfiguration is
    // fatal here, never during a dispatch.
    let config = match otpgate_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            otpgate_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    let result = match cli.command {
        Some(Commands::Session { command }) => match SessionClient::new(&config.gateway) {
            Ok(client) => session::run(&client, command).await,
            Err(e) => Err(e),
        },
        Some(Commands::Numbers { probe, json }) => numbers::run(&config, probe, json).await,
        Some(Commands::Send {
            mobile,
            code,
            email,
            job,
        }) => send::run(&config, &mobile, code, email, job).await,
        None => {
            println!("otpgate: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("otpgate: {e}");
        std::process::exit(1);
    }
}

/// Builds the shared session client, wrapped for the dispatcher's seam.
pub(crate) fn build_gateway(
    config: &otpgate_config::OtpgateConfig,
) -> Result<Arc<SessionClient>, otpgate_core::OtpgateError> {
    Ok(Arc::new(SessionClient::new(&config.gateway)?))
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("otpgate={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn empty_config_is_valid_for_the_cli() {
        // A deployment with no numbers and no mailer still parses; the
        // commands then report an empty pool instead of failing startup.
        let config = otpgate_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert!(config.numbers.is_empty());
    }
}
