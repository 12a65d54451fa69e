// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock mailer for deterministic testing.

use async_trait::async_trait;
use tokio::sync::Mutex;

use otpgate_core::error::OtpgateError;
use otpgate_core::OtpMailer;

/// A mock email channel.
///
/// Records every send; `set_failure` makes all subsequent sends fail with
/// the given message.
#[derive(Default)]
pub struct MockMailer {
    fail_with: Mutex<Option<String>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail with this message.
    pub async fn set_failure(&self, message: &str) {
        *self.fail_with.lock().await = Some(message.to_string());
    }

    /// All `(recipient, code)` pairs that were sent.
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl OtpMailer for MockMailer {
    async fn send_otp(&self, recipient: &str, code: &str) -> Result<(), OtpgateError> {
        if let Some(message) = self.fail_with.lock().await.clone() {
            return Err(OtpgateError::Mailer {
                message,
                source: None,
            });
        }
        self.sent
            .lock()
            .await
            .push((recipient.to_string(), code.to_string()));
        Ok(())
    }
}
