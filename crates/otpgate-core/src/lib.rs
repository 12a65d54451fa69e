// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the otpgate OTP delivery engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the otpgate workspace: the session gateway
//! seam, the number-registry seam, and the email-fallback capability.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::OtpgateError;
pub use types::{
    derive_fallback_method, ChatId, DeliveryOutcome, EmailDisposition, FallbackMethod,
    GatewayAck, GatewayError, NumberStatus, OtpRequest, QrImage, SendingNumber, SessionHandle,
    SessionStatus, WhatsappFailure,
};

pub use traits::{NumberStore, OtpMailer, SessionApi};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = OtpgateError::Config("test".into());
        let _registry = OtpgateError::Registry("test".into());
        let _mailer = OtpgateError::Mailer {
            message: "test".into(),
            source: None,
        };
        let _timeout = OtpgateError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = OtpgateError::Internal("test".into());
    }

    #[test]
    fn gateway_error_displays_are_stable() {
        let transport = GatewayError::Transport {
            message: "connection refused".into(),
        };
        assert_eq!(
            transport.to_string(),
            "gateway transport failure: connection refused"
        );

        let api = GatewayError::Api {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(api.to_string(), "gateway returned 503: overloaded");
    }

    #[test]
    fn traits_are_object_safe() {
        // If any trait loses object safety, this stops compiling.
        fn _session(_: &dyn SessionApi) {}
        fn _store(_: &dyn NumberStore) {}
        fn _mailer(_: &dyn OtpMailer) {}
    }
}
