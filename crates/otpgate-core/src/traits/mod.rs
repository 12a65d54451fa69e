// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the seams of the delivery engine.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility; the
//! dispatcher holds them as `Arc<dyn ...>` so tests can substitute mocks.

pub mod mailer;
pub mod session;
pub mod store;

pub use mailer::OtpMailer;
pub use session::SessionApi;
pub use store::NumberStore;
