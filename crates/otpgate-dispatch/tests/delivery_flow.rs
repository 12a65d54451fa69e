// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end delivery flows over a real registry with mock channels:
//! circuit breaking through repeated dispatches, and load balancing
//! across a healthy pool.

use std::sync::Arc;

use otpgate_config::model::NumberConfig;
use otpgate_core::types::{
    FallbackMethod, GatewayError, NumberStatus, OtpRequest, SessionHandle, WhatsappFailure,
};
use otpgate_core::NumberStore;
use otpgate_dispatch::OtpDispatcher;
use otpgate_registry::NumberRegistry;
use otpgate_test_utils::{MockMailer, MockSessionApi};

fn number_config(mobile: &str, session_id: &str) -> NumberConfig {
    NumberConfig {
        mobile: mobile.to_string(),
        session_id: session_id.to_string(),
        name: None,
        description: None,
        is_active: true,
        settings: serde_json::Map::new(),
    }
}

async fn connected_registry(sessions: &[&str]) -> Arc<NumberRegistry> {
    let configs: Vec<NumberConfig> = sessions
        .iter()
        .enumerate()
        .map(|(i, s)| number_config(&format!("155500{i:04}"), s))
        .collect();
    let registry = Arc::new(NumberRegistry::from_config(&configs, 5));
    for session in sessions {
        registry
            .mark_connected(&SessionHandle::from(*session))
            .await
            .unwrap();
    }
    registry
}

fn request(email: Option<&str>) -> OtpRequest {
    OtpRequest {
        mobile: "491712345678".into(),
        code: "424242".into(),
        email: email.map(str::to_string),
    }
}

/// Five failed sends trip the breaker; the sixth dispatch no longer
/// touches the gateway because the number has left the available set.
#[tokio::test]
async fn repeated_failures_trip_the_breaker_and_stop_remote_calls() {
    let registry = connected_registry(&["wa-01"]).await;
    let gateway = Arc::new(MockSessionApi::new());
    let mailer = Arc::new(MockMailer::new());
    for _ in 0..5 {
        gateway
            .push_send(Err(GatewayError::Api {
                status: 502,
                body: "bad gateway".into(),
            }))
            .await;
    }

    let dispatcher = OtpDispatcher::new(
        registry.clone(),
        gateway.clone(),
        Some(mailer.clone()),
        "acme",
    );

    for _ in 0..5 {
        let outcome = dispatcher
            .send_otp(&request(Some("user@example.com")))
            .await
            .unwrap();
        assert!(!outcome.whatsapp_sent);
        assert!(outcome.email_sent, "email keeps carrying the code");
    }

    let number = registry
        .get(&SessionHandle::from("wa-01"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(number.error_count, 5);
    assert!(!number.is_active);
    assert_eq!(number.status, NumberStatus::Error);

    // Sixth dispatch: selector comes up empty, gateway untouched.
    let before = gateway.status_count().await;
    let outcome = dispatcher
        .send_otp(&request(Some("user@example.com")))
        .await
        .unwrap();
    assert_eq!(
        outcome.whatsapp_failure,
        Some(WhatsappFailure::NoNumberAvailable)
    );
    assert_eq!(outcome.fallback_method, FallbackMethod::EmailPrimary);
    assert_eq!(gateway.status_count().await, before);
}

/// A healthy two-number pool splits the load evenly.
#[tokio::test]
async fn healthy_pool_balances_sends_across_numbers() {
    let registry = connected_registry(&["wa-01", "wa-02"]).await;
    let gateway = Arc::new(MockSessionApi::new());
    let dispatcher = OtpDispatcher::new(registry.clone(), gateway.clone(), None, "acme");

    for _ in 0..6 {
        let outcome = dispatcher.send_otp(&request(None)).await.unwrap();
        assert!(outcome.whatsapp_sent);
    }

    let counts: Vec<u64> = registry.all().iter().map(|n| n.usage_count).collect();
    assert_eq!(counts.iter().sum::<u64>(), 6);
    let spread = counts.iter().max().unwrap() - counts.iter().min().unwrap();
    assert!(spread <= 1, "expected even split, got {counts:?}");
}

/// When one number dies mid-stream the other keeps the channel alive.
#[tokio::test]
async fn pool_survives_a_single_number_going_dark() {
    let registry = connected_registry(&["wa-01", "wa-02"]).await;
    let gateway = Arc::new(MockSessionApi::new());
    let dispatcher = OtpDispatcher::new(registry.clone(), gateway.clone(), None, "acme");

    // wa-01 is marked disconnected, as a connection probe would do after
    // the remote dropped; the selector skips it from here on.
    registry
        .mark_disconnected(&SessionHandle::from("wa-01"))
        .await
        .unwrap();

    for _ in 0..4 {
        let outcome = dispatcher.send_otp(&request(None)).await.unwrap();
        assert!(outcome.whatsapp_sent);
    }

    let sent = gateway.sent_messages().await;
    assert!(sent.iter().all(|m| m.session == "wa-02"));
}
