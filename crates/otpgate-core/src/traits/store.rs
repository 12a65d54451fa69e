// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry trait for the pool of configured sending numbers.

use async_trait::async_trait;

use crate::error::OtpgateError;
use crate::types::{SendingNumber, SessionHandle};

/// Store of [`SendingNumber`] entries with health bookkeeping.
///
/// Counter updates are atomic increments; status and timestamp updates are
/// last-writer-wins. Rows are never deleted through this trait -- the
/// circuit breaker's soft-disable is the only automatic lifecycle change.
#[async_trait]
pub trait NumberStore: Send + Sync {
    /// Snapshots of every number satisfying `is_active AND connected`,
    /// in no particular order.
    async fn available(&self) -> Result<Vec<SendingNumber>, OtpgateError>;

    /// Snapshot of one number by its session handle.
    async fn get(&self, session: &SessionHandle) -> Result<Option<SendingNumber>, OtpgateError>;

    /// Records a successful send: increments `usage_count` and stamps
    /// `last_used_at`.
    async fn record_success(&self, session: &SessionHandle) -> Result<(), OtpgateError>;

    /// Records a failed send or failed status check: increments
    /// `error_count` and, at the configured threshold, trips the circuit
    /// breaker (`is_active := false`, `status := error`). Idempotent on
    /// those two fields past the threshold.
    async fn record_error(&self, session: &SessionHandle) -> Result<(), OtpgateError>;

    /// Marks the number connected: stamps `connected_at` and resets
    /// `error_count` to zero, whatever its prior value.
    async fn mark_connected(&self, session: &SessionHandle) -> Result<(), OtpgateError>;

    /// Marks the number disconnected and clears `connected_at`.
    async fn mark_disconnected(&self, session: &SessionHandle) -> Result<(), OtpgateError>;
}
