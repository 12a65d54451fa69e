// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sending-number registry and selection policy for the otpgate delivery
//! engine.
//!
//! [`NumberRegistry`] implements [`otpgate_core::NumberStore`]: the pool of
//! configured WhatsApp identities with atomic health bookkeeping and the
//! 5-error circuit breaker. [`NumberSelector`] implements the greedy
//! least-used pick over the available subset.

pub mod registry;
pub mod selector;

pub use registry::NumberRegistry;
pub use selector::{NumberSelector, Selection};
