// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery orchestration for the otpgate engine.
//!
//! [`OtpDispatcher`] performs one multi-channel dispatch: least-used number
//! selection, pre-send liveness check, send, health bookkeeping, email
//! fallback, and outcome derivation. [`DeliveryJob`] wraps a dispatch for
//! asynchronous execution with bounded retries and an outer timeout.

pub mod dispatcher;
pub mod job;

pub use dispatcher::{OtpDispatcher, WhatsappLeg};
pub use job::{DeliveryJob, JobConfig, JobOutcome, JobState};
