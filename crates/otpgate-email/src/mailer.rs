// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP implementation of the [`OtpMailer`] capability.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use otpgate_config::model::EmailConfig;
use otpgate_core::error::OtpgateError;
use otpgate_core::OtpMailer;
use tracing::{error, info};

use crate::template;

/// Sends OTP mails over an SMTP relay (STARTTLS via rustls).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    subject: String,
}

impl SmtpMailer {
    /// Creates a mailer from email configuration.
    ///
    /// Requires `smtp_host` and `from_address`; a deployment without them
    /// simply constructs no mailer and runs WhatsApp-only.
    pub fn new(config: &EmailConfig) -> Result<Self, OtpgateError> {
        let host = config.smtp_host.as_deref().ok_or_else(|| {
            OtpgateError::Config("email.smtp_host is required for the SMTP mailer".into())
        })?;

        let from: Mailbox = config
            .from_address
            .as_deref()
            .ok_or_else(|| {
                OtpgateError::Config("email.from_address is required for the SMTP mailer".into())
            })?
            .parse()
            .map_err(|e| OtpgateError::Config(format!("invalid email.from_address: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| OtpgateError::Config(format!("invalid SMTP relay `{host}`: {e}")))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            subject: config.subject.clone(),
        })
    }
}

#[async_trait]
impl OtpMailer for SmtpMailer {
    async fn send_otp(&self, recipient: &str, code: &str) -> Result<(), OtpgateError> {
        let to: Mailbox = recipient.parse().map_err(|e| OtpgateError::Mailer {
            message: format!("invalid recipient address: {e}"),
            source: None,
        })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&self.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(template::otp_body(code))
            .map_err(|e| OtpgateError::Mailer {
                message: format!("failed to build OTP mail: {e}"),
                source: Some(Box::new(e)),
            })?;

        match self.transport.send(message).await {
            Ok(_) => {
                info!(recipient, code_len = code.len(), "OTP mail sent");
                Ok(())
            }
            Err(e) => {
                error!(recipient, error = %e, "OTP mail failed");
                Err(OtpgateError::Mailer {
                    message: format!("SMTP send failed: {e}"),
                    source: Some(Box::new(e)),
                })
            }
        }
    }
}
