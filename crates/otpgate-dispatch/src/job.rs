// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Asynchronous, retryable wrapper around the dispatcher.
//!
//! A delivery job runs one dispatch off the request path, bounded by a
//! wall-clock timeout, with one in-job retry of the WhatsApp leg for
//! retryable failures and a direct email fallback if the dispatcher
//! faults. The job never reports failure for a cleanly-handled WhatsApp
//! miss -- only resource exhaustion (timeouts across every queue-level
//! retry) ends in `Failed`.

use std::sync::Arc;
use std::time::Duration;

use otpgate_config::model::DeliveryConfig;
use otpgate_core::types::{
    derive_fallback_method, DeliveryOutcome, EmailDisposition, OtpRequest,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::dispatcher::OtpDispatcher;

/// States in the delivery-job FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Created, not yet picked up.
    Pending,
    /// Executing a dispatch attempt.
    Running,
    /// The WhatsApp leg delivered the code.
    Succeeded,
    /// The WhatsApp leg did not deliver, but the job handled it cleanly
    /// (email fallback attempted, outcome recorded).
    SucceededWithFallback,
    /// Resource exhaustion: every attempt hit the wall-clock timeout.
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Running => write!(f, "running"),
            JobState::Succeeded => write!(f, "succeeded"),
            JobState::SucceededWithFallback => write!(f, "succeeded_with_fallback"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Bounds for one job: outer timeout, in-job retry delay, queue retries.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub timeout: Duration,
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl JobConfig {
    pub fn from_delivery(config: &DeliveryConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.job_timeout_secs),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            max_retries: config.max_job_retries,
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self::from_delivery(&DeliveryConfig::default())
    }
}

/// Final result of a job run.
#[derive(Debug)]
pub struct JobOutcome {
    pub state: JobState,
    /// The delivery outcome, when a dispatch completed. `None` after a
    /// dispatcher fault or timeout exhaustion.
    pub delivery: Option<DeliveryOutcome>,
}

/// One queued OTP delivery.
pub struct DeliveryJob {
    id: Uuid,
    request: OtpRequest,
    state: JobState,
}

impl DeliveryJob {
    pub fn new(request: OtpRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            state: JobState::Pending,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Runs the job to completion on the current task.
    pub async fn run(&mut self, dispatcher: &OtpDispatcher, config: &JobConfig) -> JobOutcome {
        for attempt in 1..=config.max_retries {
            self.state = JobState::Running;
            debug!(job_id = %self.id, attempt, mobile = %self.request.mobile, "delivery job attempt");

            match tokio::time::timeout(config.timeout, self.execute(dispatcher, config)).await {
                Ok((state, delivery)) => {
                    self.state = state;
                    info!(job_id = %self.id, state = %state, "delivery job finished");
                    return JobOutcome { state, delivery };
                }
                Err(_) => {
                    warn!(
                        job_id = %self.id,
                        attempt,
                        timeout = ?config.timeout,
                        "delivery job attempt timed out"
                    );
                }
            }
        }

        self.state = JobState::Failed;
        error!(
            job_id = %self.id,
            retries = config.max_retries,
            "delivery job exhausted its retries"
        );
        JobOutcome {
            state: JobState::Failed,
            delivery: None,
        }
    }

    /// Runs the job on a spawned task -- the "enqueue" entry point for
    /// callers that must not block their request path on remote latency.
    pub fn spawn(
        mut self,
        dispatcher: Arc<OtpDispatcher>,
        config: JobConfig,
    ) -> tokio::task::JoinHandle<JobOutcome> {
        tokio::spawn(async move { self.run(dispatcher.as_ref(), &config).await })
    }

    async fn execute(
        &self,
        dispatcher: &OtpDispatcher,
        config: &JobConfig,
    ) -> (JobState, Option<DeliveryOutcome>) {
        match dispatcher.send_otp(&self.request).await {
            Ok(mut outcome) => {
                let retryable = !outcome.whatsapp_sent
                    && outcome
                        .whatsapp_failure
                        .as_ref()
                        .is_some_and(|f| f.is_retryable());

                if retryable {
                    info!(
                        job_id = %self.id,
                        delay = ?config.retry_delay,
                        "retrying the WhatsApp leg once"
                    );
                    tokio::time::sleep(config.retry_delay).await;

                    // Retry only the WhatsApp leg; the email leg already ran.
                    match dispatcher
                        .send_whatsapp(&self.request.mobile, &self.request.code)
                        .await
                    {
                        Ok(leg) if leg.sent => {
                            outcome.whatsapp_sent = true;
                            outcome.whatsapp_failure = None;
                            outcome.fallback_method =
                                derive_fallback_method(true, email_disposition(&outcome));
                        }
                        Ok(leg) => {
                            outcome.whatsapp_failure = leg.failure;
                        }
                        Err(e) => {
                            warn!(job_id = %self.id, error = %e, "WhatsApp retry faulted");
                        }
                    }
                }

                let state = if outcome.whatsapp_sent {
                    JobState::Succeeded
                } else {
                    JobState::SucceededWithFallback
                };
                (state, Some(outcome))
            }
            Err(e) => {
                // Unexpected fault: bypass the dispatcher and try email
                // directly, then swallow -- re-running the whole job could
                // duplicate side effects that already happened.
                error!(
                    job_id = %self.id,
                    error = %e,
                    "dispatcher faulted, attempting direct email fallback"
                );
                self.direct_email_fallback(dispatcher).await;
                (JobState::SucceededWithFallback, None)
            }
        }
    }

    async fn direct_email_fallback(&self, dispatcher: &OtpDispatcher) {
        let (Some(email), Some(mailer)) = (self.request.email.as_deref(), dispatcher.mailer())
        else {
            warn!(job_id = %self.id, "no email fallback possible after dispatcher fault");
            return;
        };
        match mailer.send_otp(email, &self.request.code).await {
            Ok(()) => info!(job_id = %self.id, "direct email fallback sent"),
            Err(e) => {
                error!(job_id = %self.id, error = %e, "direct email fallback also failed");
            }
        }
    }
}

/// Reconstructs the email leg's disposition from a recorded outcome.
fn email_disposition(outcome: &DeliveryOutcome) -> EmailDisposition {
    if outcome.email_sent {
        EmailDisposition::Sent
    } else if outcome.email_failure.is_some() {
        EmailDisposition::Failed
    } else {
        EmailDisposition::NotAvailable
    }
}
