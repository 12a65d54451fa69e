// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory registry of configured sending numbers.
//!
//! Entries live in a sharded concurrent map keyed by session ID. Health
//! mutations take the entry's shard write lock, so counter increments are
//! never lost under concurrent dispatch; reads hand out snapshots, so
//! observed counts may lag by a bounded amount. Timestamps and status are
//! last-writer-wins.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use otpgate_config::model::NumberConfig;
use otpgate_core::error::OtpgateError;
use otpgate_core::types::{NumberStatus, SendingNumber, SessionHandle};
use otpgate_core::NumberStore;
use tracing::{debug, info, warn};

/// The pool of WhatsApp sending identities.
///
/// Rows are created from configuration at startup and soft-disabled by the
/// circuit breaker; nothing here ever deletes one.
pub struct NumberRegistry {
    entries: DashMap<String, SendingNumber>,
    error_threshold: u32,
}

impl NumberRegistry {
    pub fn new(error_threshold: u32) -> Self {
        Self {
            entries: DashMap::new(),
            error_threshold,
        }
    }

    /// Builds a registry seeded from `[[numbers]]` config entries.
    ///
    /// Numbers start in the `inactive` status; a connection probe or an
    /// operator action moves them to `connected` before they are selectable.
    pub fn from_config(numbers: &[NumberConfig], error_threshold: u32) -> Self {
        let registry = Self::new(error_threshold);
        for number in numbers {
            registry.insert(number);
        }
        registry
    }

    /// Adds one configured number to the pool.
    pub fn insert(&self, config: &NumberConfig) {
        let number = SendingNumber {
            mobile: config.mobile.clone(),
            session: SessionHandle(config.session_id.clone()),
            name: config.name.clone(),
            description: config.description.clone(),
            status: NumberStatus::Inactive,
            is_active: config.is_active,
            usage_count: 0,
            error_count: 0,
            connected_at: None,
            last_used_at: None,
            settings: config.settings.clone(),
        };
        debug!(session = %number.session, mobile = %number.mobile, "number registered");
        self.entries.insert(config.session_id.clone(), number);
    }

    /// Snapshots of every registered number, in no particular order.
    pub fn all(&self) -> Vec<SendingNumber> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn with_entry<R>(
        &self,
        session: &SessionHandle,
        f: impl FnOnce(&mut SendingNumber) -> R,
    ) -> Result<R, OtpgateError> {
        let mut entry = self.entries.get_mut(session.as_str()).ok_or_else(|| {
            OtpgateError::Registry(format!("unknown sending number for session `{session}`"))
        })?;
        Ok(f(entry.value_mut()))
    }
}

#[async_trait]
impl NumberStore for NumberRegistry {
    async fn available(&self) -> Result<Vec<SendingNumber>, OtpgateError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.value().is_available())
            .map(|e| e.value().clone())
            .collect())
    }

    async fn get(&self, session: &SessionHandle) -> Result<Option<SendingNumber>, OtpgateError> {
        Ok(self.entries.get(session.as_str()).map(|e| e.value().clone()))
    }

    async fn record_success(&self, session: &SessionHandle) -> Result<(), OtpgateError> {
        self.with_entry(session, |number| {
            number.usage_count += 1;
            number.last_used_at = Some(Utc::now());
            debug!(
                session = %number.session,
                usage_count = number.usage_count,
                "send recorded"
            );
        })
    }

    async fn record_error(&self, session: &SessionHandle) -> Result<(), OtpgateError> {
        let threshold = self.error_threshold;
        self.with_entry(session, |number| {
            number.error_count += 1;
            if number.error_count >= threshold
                && (number.is_active || number.status != NumberStatus::Error)
            {
                warn!(
                    session = %number.session,
                    mobile = %number.mobile,
                    error_count = number.error_count,
                    "circuit breaker tripped, number deactivated"
                );
                number.is_active = false;
                number.status = NumberStatus::Error;
            }
        })
    }

    async fn mark_connected(&self, session: &SessionHandle) -> Result<(), OtpgateError> {
        self.with_entry(session, |number| {
            number.status = NumberStatus::Connected;
            number.connected_at = Some(Utc::now());
            // A successful (re)connection wipes the error history.
            number.error_count = 0;
            info!(session = %number.session, mobile = %number.mobile, "number connected");
        })
    }

    async fn mark_disconnected(&self, session: &SessionHandle) -> Result<(), OtpgateError> {
        self.with_entry(session, |number| {
            number.status = NumberStatus::Disconnected;
            number.connected_at = None;
            info!(session = %number.session, mobile = %number.mobile, "number disconnected");
        })
    }
}
