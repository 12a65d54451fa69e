// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the remote WhatsApp Web session-automation API.
//!
//! Provides [`SessionClient`], which handles request construction, the
//! static API-key header, bounded timeouts, and conversion of every
//! transport fault into a structured [`GatewayError`] value. Implements
//! the [`SessionApi`] trait consumed by the dispatcher and operator CLI.

use std::time::Duration;

use async_trait::async_trait;
use otpgate_config::model::GatewayConfig;
use otpgate_core::error::OtpgateError;
use otpgate_core::types::{
    ChatId, GatewayAck, GatewayError, QrImage, SessionHandle, SessionStatus,
};
use otpgate_core::SessionApi;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, info, warn};

use crate::cache::StatusCache;

/// Delay between an auto-start of a missing session and the status retry.
/// The remote needs a moment to spin the browser session up.
const RECOVERY_DELAY: Duration = Duration::from_secs(2);

/// The remote's error token for a send against a non-connected session.
const SESSION_NOT_CONNECTED: &str = "session_not_connected";

/// The remote's message token for an unknown session.
const SESSION_NOT_FOUND: &str = "session_not_found";

/// Client for the session-automation service.
///
/// One instance serves any number of sessions; the session handle is passed
/// per call. Cheap to clone is not needed -- hold it in an `Arc`.
pub struct SessionClient {
    client: reqwest::Client,
    base_url: String,
    cache: StatusCache,
    recovery_delay: Duration,
}

impl SessionClient {
    /// Creates a client from gateway configuration.
    ///
    /// Fails fast when the API key is missing -- per-call operation must
    /// never be the place a credential problem first surfaces.
    pub fn new(config: &GatewayConfig) -> Result<Self, OtpgateError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                OtpgateError::Config("gateway.api_key is required for the session client".into())
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| OtpgateError::Config(format!("invalid API key header value: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| OtpgateError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache: StatusCache::new(Duration::from_secs(config.status_cache_ttl_secs)),
            recovery_delay: RECOVERY_DELAY,
        })
    }

    /// Shortens the auto-start recovery delay (for tests).
    #[cfg(test)]
    pub fn with_recovery_delay(mut self, delay: Duration) -> Self {
        self.recovery_delay = delay;
        self
    }

    /// Runs one session lifecycle operation (`start`, `stop`, `restart`,
    /// `terminate`), invalidating the cached status first so the next
    /// status query is live.
    async fn lifecycle(
        &self,
        op: &str,
        session: &SessionHandle,
        tolerate_existing: bool,
    ) -> Result<GatewayAck, GatewayError> {
        self.cache.invalidate(session.as_str());

        let url = format!("{}/session/{op}/{}", self.base_url, session);
        let response = self.client.get(&url).send().await.map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if status.is_success() {
            debug!(session = %session, op, "session lifecycle operation accepted");
            return Ok(ack_from_body(&body));
        }

        // The remote answers 422 when the session already exists; for a
        // start that is not a failure, the session is simply live.
        if tolerate_existing
            && status.as_u16() == 422
            && body.contains("already exists")
        {
            info!(session = %session, "session already exists, treating start as success");
            return Ok(ack_from_body(&body));
        }

        Err(GatewayError::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// One live status query, without cache or recovery.
    async fn query_status(&self, session: &SessionHandle) -> Result<SessionStatus, GatewayError> {
        let url = format!("{}/session/status/{}", self.base_url, session);
        let response = self.client.get(&url).send().await.map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if status.as_u16() == 404 {
            return Err(GatewayError::SessionNotFound);
        }
        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
        if raw.get("message").and_then(|m| m.as_str()) == Some(SESSION_NOT_FOUND) {
            return Err(GatewayError::SessionNotFound);
        }

        let state = raw
            .get("state")
            .and_then(|s| s.as_str())
            .unwrap_or("UNKNOWN")
            .to_string();
        Ok(SessionStatus::from_state(state, raw))
    }
}

#[async_trait]
impl SessionApi for SessionClient {
    async fn start(&self, session: &SessionHandle) -> Result<GatewayAck, GatewayError> {
        self.lifecycle("start", session, true).await
    }

    async fn stop(&self, session: &SessionHandle) -> Result<GatewayAck, GatewayError> {
        self.lifecycle("stop", session, false).await
    }

    async fn restart(&self, session: &SessionHandle) -> Result<GatewayAck, GatewayError> {
        self.lifecycle("restart", session, false).await
    }

    async fn terminate(&self, session: &SessionHandle) -> Result<GatewayAck, GatewayError> {
        self.lifecycle("terminate", session, false).await
    }

    async fn status(&self, session: &SessionHandle) -> Result<SessionStatus, GatewayError> {
        if let Some(cached) = self.cache.get(session.as_str()) {
            debug!(session = %session, state = %cached.state, "serving cached session status");
            return Ok(cached);
        }

        // Bounded auto-recovery: an unknown session gets one start attempt
        // and one status retry. Never recurses.
        let mut recovered = false;
        loop {
            match self.query_status(session).await {
                Ok(status) => {
                    self.cache.insert(session.as_str(), status.clone());
                    return Ok(status);
                }
                Err(GatewayError::SessionNotFound) if !recovered => {
                    recovered = true;
                    info!(session = %session, "session not found, attempting auto-start");
                    if let Err(e) = self.start(session).await {
                        warn!(session = %session, error = %e, "auto-start failed");
                        return Err(GatewayError::SessionNotFound);
                    }
                    tokio::time::sleep(self.recovery_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn qr_code(&self, session: &SessionHandle) -> Result<QrImage, GatewayError> {
        let url = format!("{}/session/qr/{}/image", self.base_url, session);
        let response = self.client.get(&url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response.bytes().await.map_err(transport)?.to_vec();

        Ok(QrImage {
            bytes,
            content_type,
        })
    }

    async fn request_pairing_code(
        &self,
        session: &SessionHandle,
        phone_number: &str,
    ) -> Result<GatewayAck, GatewayError> {
        let url = format!("{}/session/requestPairingCode/{}", self.base_url, session);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "phoneNumber": phone_number,
                "showNotification": true,
            }))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if status.is_success() {
            Ok(ack_from_body(&body))
        } else {
            Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn send_message(
        &self,
        session: &SessionHandle,
        chat: &ChatId,
        text: &str,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/client/sendMessage/{}", self.base_url, session);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chatId": chat.as_str(),
                "contentType": "string",
                "content": text,
            }))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if status.is_success() {
            debug!(session = %session, chat = %chat, "message accepted by gateway");
            return Ok(());
        }

        if status.as_u16() == 404 {
            let raw: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
            if raw.get("error").and_then(|e| e.as_str()) == Some(SESSION_NOT_CONNECTED) {
                return Err(GatewayError::SessionNotConnected { state: None });
            }
            return Err(GatewayError::SessionNotFound);
        }

        Err(GatewayError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

/// Converts a reqwest error into the structured transport failure.
fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        message: e.to_string(),
    }
}

/// Builds an acknowledgement from a (possibly non-JSON) response body.
fn ack_from_body(body: &str) -> GatewayAck {
    let raw: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    let message = raw
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string);
    GatewayAck { message, raw }
}
