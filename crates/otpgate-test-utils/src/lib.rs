// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapters for deterministic otpgate tests.
//!
//! Provides scripted, call-recording implementations of the core seams so
//! dispatcher and job behavior can be asserted without a remote gateway or
//! SMTP relay.

pub mod mock_gateway;
pub mod mock_mailer;

pub use mock_gateway::{MockSessionApi, SentMessage};
pub use mock_mailer::MockMailer;
