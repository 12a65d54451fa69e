// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `otpgate send` command implementation.
//!
//! Drives the full dispatch path with an operator-supplied (or generated)
//! code: probe the pool, select, send, and report the outcome. With
//! `--job` the dispatch runs through the asynchronous delivery job,
//! exercising its retry and timeout handling.

use std::sync::Arc;

use otpgate_config::OtpgateConfig;
use otpgate_core::error::OtpgateError;
use otpgate_core::types::{DeliveryOutcome, OtpRequest};
use otpgate_dispatch::{DeliveryJob, JobConfig, JobState, OtpDispatcher};
use otpgate_email::SmtpMailer;
use otpgate_registry::NumberRegistry;
use rand::Rng;

use crate::numbers::probe_pool;

pub async fn run(
    config: &OtpgateConfig,
    mobile: &str,
    code: Option<String>,
    email: Option<String>,
    job: bool,
) -> Result<(), OtpgateError> {
    let gateway = crate::build_gateway(config)?;

    let registry = Arc::new(NumberRegistry::from_config(
        &config.numbers,
        config.delivery.error_threshold,
    ));
    // Fresh process: bring the registry to live state before selecting.
    probe_pool(&registry, gateway.as_ref()).await?;

    let mailer: Option<Arc<dyn otpgate_core::OtpMailer>> = if config.email.smtp_host.is_some() {
        Some(Arc::new(SmtpMailer::new(&config.email)?))
    } else {
        None
    };

    let dispatcher = OtpDispatcher::new(
        registry,
        gateway,
        mailer,
        config.delivery.service_name.clone(),
    );

    let code = code.unwrap_or_else(generate_code);
    let request = OtpRequest {
        mobile: mobile.to_string(),
        code,
        email,
    };

    if job {
        let job_config = JobConfig::from_delivery(&config.delivery);
        let mut delivery_job = DeliveryJob::new(request);
        let outcome = delivery_job.run(&dispatcher, &job_config).await;
        println!("job {} finished: {}", delivery_job.id(), outcome.state);
        match (outcome.state, outcome.delivery) {
            (JobState::Failed, _) => Err(OtpgateError::Timeout {
                duration: job_config.timeout,
            }),
            (_, Some(delivery)) => report(&delivery),
            (_, None) => Ok(()),
        }
    } else {
        let delivery = dispatcher.send_otp(&request).await?;
        report(&delivery)
    }
}

fn report(outcome: &DeliveryOutcome) -> Result<(), OtpgateError> {
    println!("whatsapp_sent:   {}", outcome.whatsapp_sent);
    println!("email_sent:      {}", outcome.email_sent);
    println!("fallback_method: {}", outcome.fallback_method);
    if let Some(failure) = &outcome.whatsapp_failure {
        println!("whatsapp_failure: {failure}");
    }
    if let Some(failure) = &outcome.email_failure {
        println!("email_failure:    {failure}");
    }

    // Hardened behavior: a fully-failed delivery is a failed command, not
    // a silent success.
    if !outcome.whatsapp_sent && !outcome.email_sent {
        return Err(OtpgateError::Internal(
            "delivery failed on every channel".into(),
        ));
    }
    Ok(())
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn report_fails_when_no_channel_delivered() {
        use otpgate_core::types::{FallbackMethod, WhatsappFailure};
        let outcome = DeliveryOutcome {
            whatsapp_sent: false,
            email_sent: false,
            fallback_method: FallbackMethod::WhatsappFailedNoEmail,
            whatsapp_failure: Some(WhatsappFailure::NoNumberAvailable),
            email_failure: None,
        };
        assert!(report(&outcome).is_err());
    }

    #[test]
    fn report_accepts_a_single_successful_channel() {
        use otpgate_core::types::FallbackMethod;
        let outcome = DeliveryOutcome {
            whatsapp_sent: false,
            email_sent: true,
            fallback_method: FallbackMethod::EmailPrimary,
            whatsapp_failure: None,
            email_failure: None,
        };
        assert!(report(&outcome).is_ok());
    }
}
