// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort, multi-channel OTP delivery.
//!
//! The dispatcher turns "deliver this code to this mobile" into: select the
//! least-used number, confirm session liveness, send, update health
//! counters, then send the email fallback and derive the summary tag.
//! Channel failures become outcome flags; only infrastructure faults
//! (unknown registry entries, store backend errors) surface as `Err`.

use std::sync::Arc;

use otpgate_core::error::OtpgateError;
use otpgate_core::types::{
    derive_fallback_method, ChatId, DeliveryOutcome, EmailDisposition, GatewayError, OtpRequest,
    WhatsappFailure,
};
use otpgate_core::{NumberStore, OtpMailer, SessionApi};
use otpgate_registry::{NumberSelector, Selection};
use tracing::{error, info, warn};

/// Result of the WhatsApp leg alone.
#[derive(Debug)]
pub struct WhatsappLeg {
    pub sent: bool,
    pub failure: Option<WhatsappFailure>,
}

impl WhatsappLeg {
    fn sent_ok() -> Self {
        Self {
            sent: true,
            failure: None,
        }
    }

    fn failed(failure: WhatsappFailure) -> Self {
        Self {
            sent: false,
            failure: Some(failure),
        }
    }
}

/// Orchestrates one OTP delivery across the WhatsApp and email channels.
pub struct OtpDispatcher {
    store: Arc<dyn NumberStore>,
    gateway: Arc<dyn SessionApi>,
    mailer: Option<Arc<dyn OtpMailer>>,
    service_name: String,
}

impl OtpDispatcher {
    pub fn new(
        store: Arc<dyn NumberStore>,
        gateway: Arc<dyn SessionApi>,
        mailer: Option<Arc<dyn OtpMailer>>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            mailer,
            service_name: service_name.into(),
        }
    }

    pub(crate) fn mailer(&self) -> Option<&Arc<dyn OtpMailer>> {
        self.mailer.as_ref()
    }

    /// The fixed WhatsApp message template. Expiry enforcement itself
    /// belongs to the caller's OTP cache.
    pub fn otp_message(&self, code: &str) -> String {
        format!(
            "Your {} OTP code is: {code}. This code will expire in 5 minutes.",
            self.service_name
        )
    }

    /// Runs the WhatsApp leg only: select, liveness-check, send, and update
    /// health counters. Exposed separately so the delivery job can retry it
    /// without repeating the email leg.
    pub async fn send_whatsapp(
        &self,
        mobile: &str,
        code: &str,
    ) -> Result<WhatsappLeg, OtpgateError> {
        let candidate = match NumberSelector::pick(self.store.as_ref()).await? {
            Selection::Chosen(number) => number,
            Selection::NoneAvailable => {
                warn!(mobile, "no available WhatsApp number for OTP delivery");
                return Ok(WhatsappLeg::failed(WhatsappFailure::NoNumberAvailable));
            }
        };

        // Liveness check immediately before sending. The gateway may serve
        // a briefly cached status here.
        match self.gateway.status(&candidate.session).await {
            Ok(status) if status.connected => {}
            Ok(status) => {
                warn!(
                    mobile,
                    session = %candidate.session,
                    state = %status.state,
                    "selected number's session is not connected"
                );
                self.store.record_error(&candidate.session).await?;
                return Ok(WhatsappLeg::failed(WhatsappFailure::SessionNotConnected {
                    state: Some(status.state),
                }));
            }
            Err(e) => {
                warn!(
                    mobile,
                    session = %candidate.session,
                    error = %e,
                    "session status check failed"
                );
                self.store.record_error(&candidate.session).await?;
                let failure = match e {
                    GatewayError::SessionNotConnected { state } => {
                        WhatsappFailure::SessionNotConnected { state }
                    }
                    other => WhatsappFailure::GatewayUnavailable {
                        message: other.to_string(),
                    },
                };
                return Ok(WhatsappLeg::failed(failure));
            }
        }

        let chat = ChatId::from_mobile(mobile);
        let text = self.otp_message(code);
        match self.gateway.send_message(&candidate.session, &chat, &text).await {
            Ok(()) => {
                self.store.record_success(&candidate.session).await?;
                info!(
                    mobile,
                    session = %candidate.session,
                    sender = %candidate.mobile,
                    "WhatsApp OTP sent"
                );
                Ok(WhatsappLeg::sent_ok())
            }
            Err(GatewayError::SessionNotConnected { state }) => {
                self.store.record_error(&candidate.session).await?;
                warn!(
                    mobile,
                    session = %candidate.session,
                    "send rejected: session not connected"
                );
                Ok(WhatsappLeg::failed(WhatsappFailure::SessionNotConnected {
                    state,
                }))
            }
            Err(e) => {
                self.store.record_error(&candidate.session).await?;
                error!(
                    mobile,
                    session = %candidate.session,
                    error = %e,
                    "WhatsApp send failed"
                );
                Ok(WhatsappLeg::failed(WhatsappFailure::SendFailed {
                    message: e.to_string(),
                }))
            }
        }
    }

    /// Delivers one OTP across both channels and derives the outcome.
    pub async fn send_otp(&self, request: &OtpRequest) -> Result<DeliveryOutcome, OtpgateError> {
        let leg = self.send_whatsapp(&request.mobile, &request.code).await?;
        let (email, email_failure) = self
            .email_leg(request.email.as_deref(), &request.code)
            .await;

        let fallback_method = derive_fallback_method(leg.sent, email);
        let outcome = DeliveryOutcome {
            whatsapp_sent: leg.sent,
            email_sent: email == EmailDisposition::Sent,
            fallback_method,
            whatsapp_failure: leg.failure,
            email_failure,
        };

        info!(
            mobile = %request.mobile,
            whatsapp_sent = outcome.whatsapp_sent,
            email_sent = outcome.email_sent,
            fallback = %outcome.fallback_method,
            code_len = request.code.len(),
            "OTP dispatch complete"
        );
        Ok(outcome)
    }

    /// The email leg: always attempted when an address and a mailer exist,
    /// regardless of how the WhatsApp leg went. Failures are absorbed into
    /// the disposition, never raised.
    async fn email_leg(
        &self,
        email: Option<&str>,
        code: &str,
    ) -> (EmailDisposition, Option<String>) {
        match (email, &self.mailer) {
            (Some(address), Some(mailer)) => match mailer.send_otp(address, code).await {
                Ok(()) => (EmailDisposition::Sent, None),
                Err(e) => {
                    error!(recipient = address, error = %e, "email OTP failed");
                    (EmailDisposition::Failed, Some(e.to_string()))
                }
            },
            (Some(_), None) => {
                warn!("recipient has an email address but no mailer is configured");
                (EmailDisposition::NotAvailable, None)
            }
            (None, _) => (EmailDisposition::NotAvailable, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otpgate_config::model::NumberConfig;
    use otpgate_core::types::{FallbackMethod, SessionHandle, SessionStatus};
    use otpgate_registry::NumberRegistry;
    use otpgate_test_utils::{MockMailer, MockSessionApi};

    fn number_config(mobile: &str, session_id: &str) -> NumberConfig {
        NumberConfig {
            mobile: mobile.to_string(),
            session_id: session_id.to_string(),
            name: None,
            description: None,
            is_active: true,
            settings: serde_json::Map::new(),
        }
    }

    async fn connected_registry(sessions: &[&str]) -> Arc<NumberRegistry> {
        let configs: Vec<NumberConfig> = sessions
            .iter()
            .enumerate()
            .map(|(i, s)| number_config(&format!("155500{i:04}"), s))
            .collect();
        let registry = Arc::new(NumberRegistry::from_config(&configs, 5));
        for session in sessions {
            registry
                .mark_connected(&SessionHandle::from(*session))
                .await
                .unwrap();
        }
        registry
    }

    struct Setup {
        registry: Arc<NumberRegistry>,
        gateway: Arc<MockSessionApi>,
        mailer: Arc<MockMailer>,
        dispatcher: OtpDispatcher,
    }

    async fn setup(sessions: &[&str]) -> Setup {
        let registry = connected_registry(sessions).await;
        let gateway = Arc::new(MockSessionApi::new());
        let mailer = Arc::new(MockMailer::new());
        let dispatcher = OtpDispatcher::new(
            registry.clone(),
            gateway.clone(),
            Some(mailer.clone()),
            "acme",
        );
        Setup {
            registry,
            gateway,
            mailer,
            dispatcher,
        }
    }

    fn request(email: Option<&str>) -> OtpRequest {
        OtpRequest {
            mobile: "491712345678".into(),
            code: "123456".into(),
            email: email.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn both_channels_succeed() {
        let s = setup(&["wa-01"]).await;
        let outcome = s
            .dispatcher
            .send_otp(&request(Some("user@example.com")))
            .await
            .unwrap();

        assert!(outcome.whatsapp_sent);
        assert!(outcome.email_sent);
        assert_eq!(outcome.fallback_method, FallbackMethod::WhatsappAndEmail);
        assert!(outcome.whatsapp_failure.is_none());
        assert!(outcome.email_failure.is_none());

        // Health bookkeeping: one successful use.
        let number = s
            .registry
            .get(&SessionHandle::from("wa-01"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(number.usage_count, 1);
        assert!(number.last_used_at.is_some());
        assert_eq!(number.error_count, 0);
        assert_eq!(s.mailer.sent_count().await, 1);
    }

    #[tokio::test]
    async fn message_uses_the_fixed_template() {
        let s = setup(&["wa-01"]).await;
        s.dispatcher.send_otp(&request(None)).await.unwrap();

        let sent = s.gateway.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat, "491712345678@c.us");
        assert_eq!(
            sent[0].text,
            "Your acme OTP code is: 123456. This code will expire in 5 minutes."
        );
    }

    #[tokio::test]
    async fn whatsapp_only_when_no_email_on_file() {
        let s = setup(&["wa-01"]).await;
        let outcome = s.dispatcher.send_otp(&request(None)).await.unwrap();

        assert!(outcome.whatsapp_sent);
        assert!(!outcome.email_sent);
        assert_eq!(outcome.fallback_method, FallbackMethod::WhatsappOnly);
        assert_eq!(s.mailer.sent_count().await, 0);
    }

    #[tokio::test]
    async fn no_number_skips_the_gateway_entirely() {
        let registry = Arc::new(NumberRegistry::new(5));
        let gateway = Arc::new(MockSessionApi::new());
        let dispatcher = OtpDispatcher::new(registry, gateway.clone(), None, "acme");

        let outcome = dispatcher.send_otp(&request(None)).await.unwrap();
        assert!(!outcome.whatsapp_sent);
        assert!(!outcome.email_sent);
        assert_eq!(
            outcome.fallback_method,
            FallbackMethod::WhatsappFailedNoEmail
        );
        assert_eq!(
            outcome.whatsapp_failure,
            Some(WhatsappFailure::NoNumberAvailable)
        );

        // No spurious remote calls of any kind.
        assert_eq!(gateway.status_count().await, 0);
        assert_eq!(gateway.send_count().await, 0);
    }

    #[tokio::test]
    async fn no_number_with_email_falls_back_to_email_primary() {
        let registry = Arc::new(NumberRegistry::new(5));
        let gateway = Arc::new(MockSessionApi::new());
        let mailer = Arc::new(MockMailer::new());
        let dispatcher = OtpDispatcher::new(registry, gateway, Some(mailer.clone()), "acme");

        let outcome = dispatcher
            .send_otp(&request(Some("user@example.com")))
            .await
            .unwrap();
        assert!(!outcome.whatsapp_sent);
        assert!(outcome.email_sent);
        assert_eq!(outcome.fallback_method, FallbackMethod::EmailPrimary);
        assert_eq!(mailer.sent_count().await, 1);
    }

    #[tokio::test]
    async fn disconnected_session_records_an_error_and_skips_the_send() {
        let s = setup(&["wa-01"]).await;
        s.gateway
            .push_status(
                "wa-01",
                Ok(SessionStatus::from_state(
                    "STARTING",
                    serde_json::Value::Null,
                )),
            )
            .await;

        let outcome = s
            .dispatcher
            .send_otp(&request(Some("user@example.com")))
            .await
            .unwrap();

        assert!(!outcome.whatsapp_sent);
        assert_eq!(
            outcome.whatsapp_failure,
            Some(WhatsappFailure::SessionNotConnected {
                state: Some("STARTING".into())
            })
        );
        assert_eq!(outcome.fallback_method, FallbackMethod::EmailPrimary);
        assert_eq!(s.gateway.send_count().await, 0, "no send after a failed check");

        let number = s
            .registry
            .get(&SessionHandle::from("wa-01"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(number.error_count, 1);
        assert_eq!(number.usage_count, 0);
    }

    #[tokio::test]
    async fn status_transport_failure_counts_against_the_number() {
        let s = setup(&["wa-01"]).await;
        s.gateway
            .push_status(
                "wa-01",
                Err(GatewayError::Transport {
                    message: "timed out".into(),
                }),
            )
            .await;

        let outcome = s.dispatcher.send_otp(&request(None)).await.unwrap();
        assert!(matches!(
            outcome.whatsapp_failure,
            Some(WhatsappFailure::GatewayUnavailable { .. })
        ));

        let number = s
            .registry
            .get(&SessionHandle::from("wa-01"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(number.error_count, 1);
    }

    #[tokio::test]
    async fn send_failure_records_an_error() {
        let s = setup(&["wa-01"]).await;
        s.gateway
            .push_send(Err(GatewayError::Api {
                status: 502,
                body: "bad gateway".into(),
            }))
            .await;

        let outcome = s.dispatcher.send_otp(&request(None)).await.unwrap();
        assert!(!outcome.whatsapp_sent);
        assert!(matches!(
            outcome.whatsapp_failure,
            Some(WhatsappFailure::SendFailed { .. })
        ));

        let number = s
            .registry
            .get(&SessionHandle::from("wa-01"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(number.error_count, 1);
        assert_eq!(number.usage_count, 0);
    }

    #[tokio::test]
    async fn email_failure_is_swallowed_into_the_outcome() {
        let s = setup(&["wa-01"]).await;
        s.gateway
            .push_send(Err(GatewayError::SessionNotConnected { state: None }))
            .await;
        s.mailer.set_failure("smtp relay down").await;

        let outcome = s
            .dispatcher
            .send_otp(&request(Some("user@example.com")))
            .await
            .unwrap();

        assert!(!outcome.whatsapp_sent);
        assert!(!outcome.email_sent);
        assert_eq!(outcome.fallback_method, FallbackMethod::BothFailed);
        let failure = outcome.email_failure.expect("swallowed failure is kept");
        assert!(failure.contains("smtp relay down"));
    }

    #[tokio::test]
    async fn email_address_without_mailer_counts_as_no_email() {
        let registry = connected_registry(&["wa-01"]).await;
        let gateway = Arc::new(MockSessionApi::new());
        gateway
            .push_send(Err(GatewayError::SessionNotConnected { state: None }))
            .await;
        let dispatcher = OtpDispatcher::new(registry, gateway, None, "acme");

        let outcome = dispatcher
            .send_otp(&request(Some("user@example.com")))
            .await
            .unwrap();
        assert_eq!(
            outcome.fallback_method,
            FallbackMethod::WhatsappFailedNoEmail
        );
    }

    #[tokio::test]
    async fn least_used_number_carries_the_send() {
        let s = setup(&["wa-01", "wa-02"]).await;
        // wa-01 has history; wa-02 is fresh.
        for _ in 0..3 {
            s.registry
                .record_success(&SessionHandle::from("wa-01"))
                .await
                .unwrap();
        }

        s.dispatcher.send_otp(&request(None)).await.unwrap();

        let sent = s.gateway.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].session, "wa-02");
    }
}
