// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session gateway for the otpgate delivery engine.
//!
//! Implements [`otpgate_core::SessionApi`] against the remote WhatsApp Web
//! session-automation service: lifecycle control, status with bounded
//! auto-recovery and short-TTL caching, QR/pairing-code assists, and
//! message sending.

pub mod cache;
pub mod client;

pub use cache::StatusCache;
pub use client::SessionClient;
