// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway trait for the remote WhatsApp Web session-automation service.

use async_trait::async_trait;

use crate::types::{ChatId, GatewayAck, GatewayError, QrImage, SessionHandle, SessionStatus};

/// Client for one remote session-management API.
///
/// Every operation is idempotent from the caller's perspective and every
/// failure comes back as a [`GatewayError`] value -- implementations must
/// catch transport faults internally rather than letting them escape.
///
/// Lifecycle operations (`start`/`stop`/`restart`/`terminate`) must
/// invalidate any cached status for the session before returning, so the
/// next `status` call performs a live remote query.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Requests remote creation of the session.
    async fn start(&self, session: &SessionHandle) -> Result<GatewayAck, GatewayError>;

    /// Stops the session, keeping its authentication.
    async fn stop(&self, session: &SessionHandle) -> Result<GatewayAck, GatewayError>;

    /// Stops and restarts the session.
    async fn restart(&self, session: &SessionHandle) -> Result<GatewayAck, GatewayError>;

    /// Destroys the session and its remote state.
    async fn terminate(&self, session: &SessionHandle) -> Result<GatewayAck, GatewayError>;

    /// Queries remote session state. Implementations may serve a briefly
    /// cached value and may attempt one bounded auto-start when the remote
    /// reports the session missing; callers must not rely on the recovery
    /// succeeding.
    async fn status(&self, session: &SessionHandle) -> Result<SessionStatus, GatewayError>;

    /// Fetches the authentication QR code image (operator tooling).
    async fn qr_code(&self, session: &SessionHandle) -> Result<QrImage, GatewayError>;

    /// Requests a phone-pairing code (operator tooling).
    async fn request_pairing_code(
        &self,
        session: &SessionHandle,
        phone_number: &str,
    ) -> Result<GatewayAck, GatewayError>;

    /// Sends a text message to a chat. Fails with
    /// [`GatewayError::SessionNotConnected`] when the remote reports the
    /// session inactive.
    async fn send_message(
        &self,
        session: &SessionHandle,
        chat: &ChatId,
        text: &str,
    ) -> Result<(), GatewayError>;
}
