// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email capability consumed by the dispatcher for guaranteed-delivery
//! fallback.

use async_trait::async_trait;

use crate::error::OtpgateError;

/// Sends a templated OTP message to an email address.
///
/// Failures are returned as values and the dispatcher records them in the
/// delivery outcome without raising; an email failure must never abort a
/// dispatch.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(&self, recipient: &str, code: &str) -> Result<(), OtpgateError>;
}
