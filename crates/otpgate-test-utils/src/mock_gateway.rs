// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock session gateway for deterministic testing.
//!
//! `MockSessionApi` implements `SessionApi` with scripted per-call results
//! and captured calls for assertion. Unscripted calls succeed: status
//! reports a connected session and sends are accepted.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use otpgate_core::types::{
    ChatId, GatewayAck, GatewayError, QrImage, SessionHandle, SessionStatus,
};
use otpgate_core::SessionApi;

/// A message captured by [`MockSessionApi::send_message`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub session: String,
    pub chat: String,
    pub text: String,
}

/// A mock session-automation gateway.
///
/// Script failures with `push_status` / `push_send`; every queue drains in
/// FIFO order and falls back to success once empty.
#[derive(Default)]
pub struct MockSessionApi {
    statuses: Mutex<HashMap<String, VecDeque<Result<SessionStatus, GatewayError>>>>,
    send_results: Mutex<VecDeque<Result<(), GatewayError>>>,
    sent: Mutex<Vec<SentMessage>>,
    status_calls: Mutex<Vec<String>>,
    lifecycle_calls: Mutex<Vec<(String, String)>>,
    delay: Mutex<Option<Duration>>,
}

impl MockSessionApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next status result for a session.
    pub async fn push_status(&self, session: &str, result: Result<SessionStatus, GatewayError>) {
        self.statuses
            .lock()
            .await
            .entry(session.to_string())
            .or_default()
            .push_back(result);
    }

    /// Queues the next send result (applies to whichever session sends next).
    pub async fn push_send(&self, result: Result<(), GatewayError>) {
        self.send_results.lock().await.push_back(result);
    }

    /// Delays every status query, for timeout tests under paused time.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.lock().await = Some(delay);
    }

    /// All messages accepted by `send_message`.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn send_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Sessions queried through `status`, in order.
    pub async fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().await.clone()
    }

    pub async fn status_count(&self) -> usize {
        self.status_calls.lock().await.len()
    }

    /// Lifecycle operations performed, as `(op, session)` pairs.
    pub async fn lifecycle_calls(&self) -> Vec<(String, String)> {
        self.lifecycle_calls.lock().await.clone()
    }

    async fn record_lifecycle(
        &self,
        op: &str,
        session: &SessionHandle,
    ) -> Result<GatewayAck, GatewayError> {
        self.lifecycle_calls
            .lock()
            .await
            .push((op.to_string(), session.to_string()));
        Ok(GatewayAck {
            message: None,
            raw: serde_json::json!({"success": true}),
        })
    }

    fn connected_status() -> SessionStatus {
        SessionStatus::from_state("CONNECTED", serde_json::json!({"state": "CONNECTED"}))
    }
}

#[async_trait]
impl SessionApi for MockSessionApi {
    async fn start(&self, session: &SessionHandle) -> Result<GatewayAck, GatewayError> {
        self.record_lifecycle("start", session).await
    }

    async fn stop(&self, session: &SessionHandle) -> Result<GatewayAck, GatewayError> {
        self.record_lifecycle("stop", session).await
    }

    async fn restart(&self, session: &SessionHandle) -> Result<GatewayAck, GatewayError> {
        self.record_lifecycle("restart", session).await
    }

    async fn terminate(&self, session: &SessionHandle) -> Result<GatewayAck, GatewayError> {
        self.record_lifecycle("terminate", session).await
    }

    async fn status(&self, session: &SessionHandle) -> Result<SessionStatus, GatewayError> {
        self.status_calls.lock().await.push(session.to_string());

        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .statuses
            .lock()
            .await
            .get_mut(session.as_str())
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(result) => result,
            None => Ok(Self::connected_status()),
        }
    }

    async fn qr_code(&self, _session: &SessionHandle) -> Result<QrImage, GatewayError> {
        Ok(QrImage {
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
            content_type: "image/png".into(),
        })
    }

    async fn request_pairing_code(
        &self,
        session: &SessionHandle,
        _phone_number: &str,
    ) -> Result<GatewayAck, GatewayError> {
        self.record_lifecycle("pairing_code", session).await
    }

    async fn send_message(
        &self,
        session: &SessionHandle,
        chat: &ChatId,
        text: &str,
    ) -> Result<(), GatewayError> {
        let result = self
            .send_results
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(()));
        if result.is_ok() {
            self.sent.lock().await.push(SentMessage {
                session: session.to_string(),
                chat: chat.to_string(),
                text: text.to_string(),
            });
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unscripted_status_is_connected() {
        let gateway = MockSessionApi::new();
        let status = gateway.status(&SessionHandle::from("wa-01")).await.unwrap();
        assert!(status.connected);
        assert_eq!(gateway.status_count().await, 1);
    }

    #[tokio::test]
    async fn scripted_results_drain_in_order() {
        let gateway = MockSessionApi::new();
        gateway
            .push_status("wa-01", Err(GatewayError::SessionNotFound))
            .await;

        let first = gateway.status(&SessionHandle::from("wa-01")).await;
        assert_eq!(first.unwrap_err(), GatewayError::SessionNotFound);

        // Queue drained: back to the connected default.
        let second = gateway.status(&SessionHandle::from("wa-01")).await.unwrap();
        assert!(second.connected);
    }

    #[tokio::test]
    async fn failed_sends_are_not_captured() {
        let gateway = MockSessionApi::new();
        gateway
            .push_send(Err(GatewayError::SessionNotConnected { state: None }))
            .await;

        let chat = ChatId::from_mobile("15551234567");
        let err = gateway
            .send_message(&SessionHandle::from("wa-01"), &chat, "text")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SessionNotConnected { .. }));
        assert_eq!(gateway.send_count().await, 0);

        gateway
            .send_message(&SessionHandle::from("wa-01"), &chat, "text")
            .await
            .unwrap();
        assert_eq!(gateway.send_count().await, 1);
    }
}
