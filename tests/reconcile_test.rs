//! Payment reconciliation sweep tests
//!
//! Stale PENDING orders must resolve without webhook delivery: expiry
//! when the gateway knows nothing, recovery to PAID when the webhook
//! was lost but the payment went through.

mod helpers;

use ChowBuddy::config::PaymentConfig;
use ChowBuddy::dispatch::PaymentReconciler;
use ChowBuddy::models::order::PaymentStatus;
use ChowBuddy::models::session::ConversationState;
use ChowBuddy::services::VerifiedPayment;
use ChowBuddy::storage::OrderStore;

use helpers::TestHarness;

/// Zero-minute timeout makes every pending order immediately stale
fn reconciler(harness: &TestHarness) -> PaymentReconciler {
    let config = PaymentConfig {
        api_url: "http://localhost".to_string(),
        secret_key: "sk_test".to_string(),
        timeout_seconds: 5,
        pending_timeout_minutes: 0,
    };
    PaymentReconciler::new(
        harness.dispatcher.clone(),
        harness.orders.clone() as std::sync::Arc<dyn OrderStore>,
        harness.payments.clone(),
        &config,
    )
}

#[tokio::test]
async fn stale_order_expires_and_session_returns_to_cart_review() {
    let harness = TestHarness::new();
    let order_ref = harness.checkout_one_burger("u1").await;

    // No webhook ever arrives and the gateway has no record
    harness.payments.set_verify_answer(VerifiedPayment::Unknown);

    let stats = reconciler(&harness).run_once().await.unwrap();
    assert_eq!(stats.scanned, 1);
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.recovered, 0);

    let order = harness.orders.find_by_ref(&order_ref).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Expired);

    // Cart intact so the user can retry checkout
    let session = harness.session("u1").await;
    assert_eq!(session.state, ConversationState::CartReview);
    assert_eq!(session.cart.len(), 1);
    assert_eq!(session.cart[0].name, "Cheeseburger");

    let notice = harness.sender.last_message_for("u1").unwrap();
    assert!(notice.contains("not completed"));
}

#[tokio::test]
async fn paid_but_unreported_order_is_recovered_as_paid() {
    let harness = TestHarness::new();
    let order_ref = harness.checkout_one_burger("u1").await;

    // The webhook was lost, but the gateway confirms the payment
    harness.payments.set_verify_answer(VerifiedPayment::Paid);

    let stats = reconciler(&harness).run_once().await.unwrap();
    assert_eq!(stats.recovered, 1);
    assert_eq!(stats.expired, 0);

    let order = harness.orders.find_by_ref(&order_ref).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);

    // Completed cycle resets the session
    let session = harness.session("u1").await;
    assert_eq!(session.state, ConversationState::Idle);
    assert!(session.cart.is_empty());
}

#[tokio::test]
async fn second_sweep_finds_nothing_to_do() {
    let harness = TestHarness::new();
    harness.checkout_one_burger("u1").await;
    harness.payments.set_verify_answer(VerifiedPayment::Unknown);

    let sweeper = reconciler(&harness);
    let first = sweeper.run_once().await.unwrap();
    assert_eq!(first.expired, 1);

    // The order left PENDING, so the next sweep scans nothing
    let second = sweeper.run_once().await.unwrap();
    assert_eq!(second.scanned, 0);
    assert_eq!(second.expired, 0);
}

#[tokio::test]
async fn failed_verification_marks_order_failed() {
    let harness = TestHarness::new();
    let order_ref = harness.checkout_one_burger("u1").await;

    harness.payments.set_verify_answer(VerifiedPayment::Failed);

    reconciler(&harness).run_once().await.unwrap();

    let order = harness.orders.find_by_ref(&order_ref).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Failed);

    let session = harness.session("u1").await;
    assert_eq!(session.state, ConversationState::CartReview);
}
