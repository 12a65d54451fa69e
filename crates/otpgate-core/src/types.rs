// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the otpgate workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The chat-identifier suffix the remote WhatsApp automation API expects.
pub const CHAT_SUFFIX: &str = "@c.us";

/// The sole liveness signal consumed from the remote session status.
pub const CONNECTED_STATE: &str = "CONNECTED";

/// Identifier of one remote WhatsApp Web automation session.
///
/// A sending number and its remote session are associated only by this
/// string; the handle is what crosses the gateway boundary, never the
/// registry entity itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(pub String);

impl SessionHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A WhatsApp chat identifier in the remote API's addressing format:
/// the recipient's digits followed by [`CHAT_SUFFIX`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatId(String);

impl ChatId {
    /// Builds a chat identifier from a mobile number, stripping every
    /// non-digit character (`+`, spaces, dashes) before appending the suffix.
    pub fn from_mobile(mobile: &str) -> Self {
        let digits: String = mobile.chars().filter(|c| c.is_ascii_digit()).collect();
        Self(format!("{digits}{CHAT_SUFFIX}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last-known state of a sending number's remote session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NumberStatus {
    Inactive,
    Active,
    Connected,
    Disconnected,
    Error,
}

/// Snapshot of one configured WhatsApp sending identity.
///
/// Owned by the number registry; callers receive point-in-time copies, so
/// two reads of the same number may disagree under concurrent dispatch.
/// That skew is bounded and accepted (selection fairness is eventual).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendingNumber {
    /// Virtual mobile number this identity sends from.
    pub mobile: String,
    /// Remote session this identity is bound to (1:1).
    pub session: SessionHandle,
    /// Friendly name, advisory only.
    pub name: Option<String>,
    /// Operator notes, advisory only.
    pub description: Option<String>,
    /// Last-known session state.
    pub status: NumberStatus,
    /// Operator-controlled kill switch, independent of `status`.
    pub is_active: bool,
    /// Successful sends, monotonic.
    pub usage_count: u64,
    /// Failed sends or failed status checks since the last successful
    /// (re)connection.
    pub error_count: u32,
    pub connected_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    /// Open key-value bag, uninterpreted by the core.
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

impl SendingNumber {
    /// A number is selectable iff the operator switch is on AND the
    /// last-known session state is connected.
    pub fn is_available(&self) -> bool {
        self.is_active && self.status == NumberStatus::Connected
    }
}

/// Remote session state as reported by the automation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// True iff `state == "CONNECTED"`.
    pub connected: bool,
    /// Raw state string from the remote (`CONNECTED`, `STARTING`, ...).
    pub state: String,
    /// Full response body, kept opaque for diagnostics.
    pub raw: serde_json::Value,
}

impl SessionStatus {
    pub fn from_state(state: impl Into<String>, raw: serde_json::Value) -> Self {
        let state = state.into();
        Self {
            connected: state == CONNECTED_STATE,
            state,
            raw,
        }
    }
}

/// Acknowledgement of a session lifecycle operation.
#[derive(Debug, Clone)]
pub struct GatewayAck {
    pub message: Option<String>,
    pub raw: serde_json::Value,
}

/// A QR code image fetched for operator-assisted session authentication.
#[derive(Debug, Clone)]
pub struct QrImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Structured failure of a remote gateway operation.
///
/// Transport faults (timeouts, connection errors, malformed responses) are
/// converted into these values at the gateway boundary; they never
/// propagate as panics or bubble up through `?` past it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Network-level failure: the request never completed cleanly.
    #[error("gateway transport failure: {message}")]
    Transport { message: String },

    /// The remote answered with a non-success HTTP status.
    #[error("gateway returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The remote does not know this session.
    #[error("session not found")]
    SessionNotFound,

    /// The session exists but is not in the connected state.
    #[error("session not connected (state: {state:?})")]
    SessionNotConnected { state: Option<String> },
}

/// Why the WhatsApp leg of a delivery did not produce a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum WhatsappFailure {
    /// The selector found no active, connected number. Nothing will
    /// materialize mid-call, so this is never retried within one dispatch.
    NoNumberAvailable,
    /// The pre-send status check reported a non-connected session.
    SessionNotConnected { state: Option<String> },
    /// The status check itself could not be completed.
    GatewayUnavailable { message: String },
    /// The send call failed after a connected status check.
    SendFailed { message: String },
}

impl WhatsappFailure {
    /// Whether a short-delay retry of the WhatsApp leg is worthwhile.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, WhatsappFailure::NoNumberAvailable)
    }
}

/// What happened on the email leg of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailDisposition {
    /// The fallback email went out.
    Sent,
    /// An email was attempted and failed.
    Failed,
    /// No address on file, or no mailer configured.
    NotAvailable,
}

/// Summary tag describing which channel(s) carried a given OTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FallbackMethod {
    WhatsappAndEmail,
    EmailPrimary,
    WhatsappOnly,
    BothFailed,
    WhatsappFailedNoEmail,
}

/// Derives the fallback method from the outcome of both legs.
pub fn derive_fallback_method(whatsapp_sent: bool, email: EmailDisposition) -> FallbackMethod {
    match (whatsapp_sent, email) {
        (true, EmailDisposition::Sent) => FallbackMethod::WhatsappAndEmail,
        (false, EmailDisposition::Sent) => FallbackMethod::EmailPrimary,
        (true, _) => FallbackMethod::WhatsappOnly,
        (false, EmailDisposition::Failed) => FallbackMethod::BothFailed,
        (false, EmailDisposition::NotAvailable) => FallbackMethod::WhatsappFailedNoEmail,
    }
}

/// One OTP delivery request, with every identity passed explicitly.
#[derive(Debug, Clone)]
pub struct OtpRequest {
    /// Recipient mobile number.
    pub mobile: String,
    /// The one-time code. Generated, cached, and verified by the caller;
    /// this engine only delivers it.
    pub code: String,
    /// The recipient's registered email address, if any.
    pub email: Option<String>,
}

/// Caller-facing result of one OTP dispatch.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub whatsapp_sent: bool,
    pub email_sent: bool,
    pub fallback_method: FallbackMethod,
    /// Why the WhatsApp leg failed, when it did.
    pub whatsapp_failure: Option<WhatsappFailure>,
    /// The swallowed email failure, when one occurred. Never raised to the
    /// caller, but kept here so it stays observable.
    pub email_failure: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_strips_non_digits() {
        let chat = ChatId::from_mobile("+49 171-2345678");
        assert_eq!(chat.as_str(), "491712345678@c.us");
    }

    #[test]
    fn chat_id_plain_digits_pass_through() {
        let chat = ChatId::from_mobile("15551234567");
        assert_eq!(chat.as_str(), "15551234567@c.us");
    }

    #[test]
    fn session_status_connected_only_on_exact_state() {
        let connected = SessionStatus::from_state("CONNECTED", serde_json::Value::Null);
        assert!(connected.connected);

        let starting = SessionStatus::from_state("STARTING", serde_json::Value::Null);
        assert!(!starting.connected);

        // Case matters: the wire contract uses the exact uppercase token.
        let lowercase = SessionStatus::from_state("connected", serde_json::Value::Null);
        assert!(!lowercase.connected);
    }

    #[test]
    fn availability_requires_active_and_connected() {
        let mut number = test_number();
        assert!(number.is_available());

        number.is_active = false;
        assert!(!number.is_available());

        number.is_active = true;
        number.status = NumberStatus::Disconnected;
        assert!(!number.is_available());
    }

    #[test]
    fn fallback_derivation_matches_the_full_table() {
        use EmailDisposition::*;
        assert_eq!(
            derive_fallback_method(true, Sent),
            FallbackMethod::WhatsappAndEmail
        );
        assert_eq!(
            derive_fallback_method(false, Sent),
            FallbackMethod::EmailPrimary
        );
        assert_eq!(
            derive_fallback_method(true, Failed),
            FallbackMethod::WhatsappOnly
        );
        assert_eq!(
            derive_fallback_method(true, NotAvailable),
            FallbackMethod::WhatsappOnly
        );
        assert_eq!(
            derive_fallback_method(false, Failed),
            FallbackMethod::BothFailed
        );
        assert_eq!(
            derive_fallback_method(false, NotAvailable),
            FallbackMethod::WhatsappFailedNoEmail
        );
    }

    #[test]
    fn fallback_method_display_is_snake_case() {
        assert_eq!(
            FallbackMethod::WhatsappAndEmail.to_string(),
            "whatsapp_and_email"
        );
        assert_eq!(
            FallbackMethod::WhatsappFailedNoEmail.to_string(),
            "whatsapp_failed_no_email"
        );
    }

    #[test]
    fn no_number_is_not_retryable_everything_else_is() {
        assert!(!WhatsappFailure::NoNumberAvailable.is_retryable());
        assert!(WhatsappFailure::SessionNotConnected { state: None }.is_retryable());
        assert!(
            WhatsappFailure::GatewayUnavailable {
                message: "timeout".into()
            }
            .is_retryable()
        );
        assert!(
            WhatsappFailure::SendFailed {
                message: "502".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn number_status_round_trips_through_strings() {
        use std::str::FromStr;
        for status in [
            NumberStatus::Inactive,
            NumberStatus::Active,
            NumberStatus::Connected,
            NumberStatus::Disconnected,
            NumberStatus::Error,
        ] {
            let s = status.to_string();
            assert_eq!(NumberStatus::from_str(&s).unwrap(), status);
        }
    }

    fn test_number() -> SendingNumber {
        SendingNumber {
            mobile: "15551234567".into(),
            session: SessionHandle::from("wa-main"),
            name: None,
            description: None,
            status: NumberStatus::Connected,
            is_active: true,
            usage_count: 0,
            error_count: 0,
            connected_at: None,
            last_used_at: None,
            settings: serde_json::Map::new(),
        }
    }
}
