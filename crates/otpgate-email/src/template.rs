// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed OTP mail template.
//!
//! The expiry wording is informational only -- actual expiry enforcement
//! lives in the caller's OTP cache.

/// Plain-text body for an OTP mail.
pub fn otp_body(code: &str) -> String {
    format!(
        "Your OTP code is: {code}\n\n\
         This code will expire in 5 minutes.\n\
         If you did not request this code, please ignore this message.\n"
    )
}
