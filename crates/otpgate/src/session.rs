// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `otpgate session` command implementations.
//!
//! Operator tooling against one remote session: lifecycle control, live
//! status, and the QR/pairing-code authentication assists.

use std::io::IsTerminal;
use std::path::PathBuf;

use base64::Engine;
use clap::Subcommand;
use otpgate_core::error::OtpgateError;
use otpgate_core::types::SessionHandle;
use otpgate_core::SessionApi;
use otpgate_session::SessionClient;

/// Session subcommands.
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Request remote creation of the session.
    Start { session: String },
    /// Stop the session, keeping its authentication.
    Stop { session: String },
    /// Restart the session.
    Restart { session: String },
    /// Destroy the session and its remote state.
    Terminate { session: String },
    /// Query live session state.
    Status {
        session: String,
        /// Output structured JSON for scripting.
        #[arg(long)]
        json: bool,
    },
    /// Fetch the authentication QR code image.
    Qr {
        session: String,
        /// Write the image to a file instead of printing a data URI.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Request a phone-pairing code.
    Pair { session: String, phone: String },
}

pub async fn run(client: &SessionClient, command: SessionCommands) -> Result<(), OtpgateError> {
    match command {
        SessionCommands::Start { session } => {
            lifecycle(client.start(&SessionHandle(session)).await, "started")
        }
        SessionCommands::Stop { session } => {
            lifecycle(client.stop(&SessionHandle(session)).await, "stopped")
        }
        SessionCommands::Restart { session } => {
            lifecycle(client.restart(&SessionHandle(session)).await, "restarted")
        }
        SessionCommands::Terminate { session } => {
            lifecycle(client.terminate(&SessionHandle(session)).await, "terminated")
        }
        SessionCommands::Status { session, json } => status(client, &session, json).await,
        SessionCommands::Qr { session, out } => qr(client, &session, out).await,
        SessionCommands::Pair { session, phone } => {
            let ack = client
                .request_pairing_code(&SessionHandle(session), &phone)
                .await
                .map_err(gateway_error)?;
            match ack.message {
                Some(message) => println!("pairing code requested: {message}"),
                None => println!("pairing code requested"),
            }
            Ok(())
        }
    }
}

fn lifecycle(
    result: Result<otpgate_core::types::GatewayAck, otpgate_core::types::GatewayError>,
    verb: &str,
) -> Result<(), OtpgateError> {
    let ack = result.map_err(gateway_error)?;
    match ack.message {
        Some(message) => println!("session {verb}: {message}"),
        None => println!("session {verb}"),
    }
    Ok(())
}

async fn status(client: &SessionClient, session: &str, json: bool) -> Result<(), OtpgateError> {
    let handle = SessionHandle(session.to_string());
    match client.status(&handle).await {
        Ok(status) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "session": session,
                        "connected": status.connected,
                        "state": status.state,
                    })
                );
            } else {
                let use_color = std::io::stdout().is_terminal();
                print_status(session, status.connected, &status.state, use_color);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "session": session,
                        "connected": false,
                        "error": e.to_string(),
                    })
                );
                Ok(())
            } else {
                Err(gateway_error(e))
            }
        }
    }
}

fn print_status(session: &str, connected: bool, state: &str, use_color: bool) {
    if use_color {
        use colored::Colorize;
        if connected {
            println!("  {} {session}: {}", "✓".green(), state.green());
        } else {
            println!("  {} {session}: {}", "✗".red(), state.yellow());
        }
    } else if connected {
        println!("  [OK] {session}: {state}");
    } else {
        println!("  [--] {session}: {state}");
    }
}

async fn qr(
    client: &SessionClient,
    session: &str,
    out: Option<PathBuf>,
) -> Result<(), OtpgateError> {
    let image = client
        .qr_code(&SessionHandle(session.to_string()))
        .await
        .map_err(gateway_error)?;

    match out {
        Some(path) => {
            std::fs::write(&path, &image.bytes).map_err(|e| {
                OtpgateError::Internal(format!("failed to write {}: {e}", path.display()))
            })?;
            println!("QR code written to {} ({})", path.display(), image.content_type);
        }
        None => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
            println!("data:{};base64,{encoded}", image.content_type);
        }
    }
    Ok(())
}

/// Gateway failures are values inside the engine; at the CLI boundary they
/// become the process's error output.
fn gateway_error(e: otpgate_core::types::GatewayError) -> OtpgateError {
    OtpgateError::Internal(e.to_string())
}
