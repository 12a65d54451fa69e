// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email fallback channel for the otpgate delivery engine.
//!
//! Implements [`otpgate_core::OtpMailer`] over lettre's async SMTP
//! transport. Used by the dispatcher as the guaranteed-delivery fallback
//! when the WhatsApp leg fails (and alongside it when it succeeds).

pub mod mailer;
pub mod template;

pub use mailer::SmtpMailer;
