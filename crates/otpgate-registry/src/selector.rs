// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Least-used selection over the available sending numbers.
//!
//! Greedy fair-load policy: lowest `usage_count` wins, ties broken by the
//! oldest `last_used_at` (never-used first). Not sticky per recipient and
//! not weighted by error rate -- the circuit breaker is the only health
//! input, and it acts by removing numbers from the available set.

use otpgate_core::error::OtpgateError;
use otpgate_core::types::SendingNumber;
use otpgate_core::NumberStore;
use tracing::debug;

/// Result of asking the selector for a candidate.
///
/// `NoneAvailable` is deliberately distinct from an error: no number will
/// materialize mid-call, so the dispatcher treats it as non-retryable
/// within the same dispatch.
#[derive(Debug)]
pub enum Selection {
    Chosen(SendingNumber),
    NoneAvailable,
}

/// Picks the best available number for the next send.
pub struct NumberSelector;

impl NumberSelector {
    pub async fn pick(store: &dyn NumberStore) -> Result<Selection, OtpgateError> {
        let mut candidates = store.available().await?;
        if candidates.is_empty() {
            return Ok(Selection::NoneAvailable);
        }

        // Option<DateTime> orders None first, which is exactly the
        // "never-used before least-recently-used" tie-break we want.
        candidates.sort_by(|a, b| {
            a.usage_count
                .cmp(&b.usage_count)
                .then(a.last_used_at.cmp(&b.last_used_at))
        });

        let chosen = candidates.swap_remove(0);
        debug!(
            session = %chosen.session,
            mobile = %chosen.mobile,
            usage_count = chosen.usage_count,
            "number selected"
        );
        Ok(Selection::Chosen(chosen))
    }
}
