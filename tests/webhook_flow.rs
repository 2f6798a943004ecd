mod common;

use rust_decimal::Decimal;
use serde_json::json;

use common::TestApp;
use paisagismo_backend::models::{
    notification::SendStatus,
    order::{Order, OrderStatus},
    payment::{CheckoutRequest, WebhookPayload},
};
use paisagismo_backend::services::webhook_service::WebhookOutcome;

const ADMIN: &str = "admin@paisagismo.test";
const CUSTOMER: &str = "maria@exemplo.com";

fn event(name: &str, reference: &str, payment_id: &str) -> WebhookPayload {
    serde_json::from_value(json!({
        "event": name,
        "payment": {
            "id": payment_id,
            "externalReference": reference,
            "status": "CONFIRMED",
            "value": 699.0
        }
    }))
    .unwrap()
}

async fn checkout(app: &TestApp, order: &Order) -> String {
    app.state
        .checkout_service
        .initiate(&CheckoutRequest {
            order_id: Some(order.id),
            order_code: Some(order.code.clone()),
            plan_name: Some(order.plan_name.clone()),
            price: order.price_cents().map(|c| Decimal::new(c, 2)),
            site_url: None,
        })
        .await
        .unwrap()
        .checkout_url
}

#[tokio::test]
async fn ipe_order_is_paid_end_to_end() {
    let app = TestApp::new();
    app.db.set_admins(&[ADMIN]);

    let order = app.order("Ipê").await;
    let snapshot = order.plan_snapshot.clone().unwrap();
    assert_eq!(snapshot.price_cents, 69900);
    assert!(snapshot.features.iter().any(|f| f == "1 rodada de revisão"));
    assert_eq!(order.status, OrderStatus::AguardandoPagamento);

    checkout(&app, &order).await;
    let with_checkout = app.db.order(order.id);
    let payment_id = with_checkout.gateway_payment_id.clone().unwrap();

    let outcome = app
        .state
        .webhook_service
        .process(&event("PAYMENT_CONFIRMED", &order.code, &payment_id))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        WebhookOutcome::Applied {
            order_code: order.code.clone(),
            status: OrderStatus::Recebido,
            newly_paid: true,
        }
    );

    let paid = app.db.order(order.id);
    assert_eq!(paid.status, OrderStatus::Recebido);
    assert!(paid.paid_at.is_some());
    assert_eq!(paid.delivery_deadline_days, Some(7));
    assert_eq!(paid.payment_status.as_deref(), Some("CONFIRMED"));
    assert_eq!(paid.last_gateway_event.as_deref(), Some("PAYMENT_CONFIRMED"));
    assert!(paid.last_webhook_at.is_some());

    let to_customer = app.mailer.sent_to(CUSTOMER);
    assert_eq!(to_customer.len(), 1);
    assert!(to_customer[0].subject.contains("Pagamento confirmado"));
    assert_eq!(app.mailer.sent_to(ADMIN).len(), 1);

    let records = app.db.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.status == SendStatus::Sent));
    assert!(records.iter().all(|r| r.related_order_id == Some(order.id)));
}

#[tokio::test]
async fn replayed_confirmation_does_not_resend_or_move_paid_at() {
    let app = TestApp::new();
    app.db.set_admins(&[ADMIN]);
    let order = app.order("Ipê").await;

    let first = event("PAYMENT_CONFIRMED", &order.code, "pay_1");
    app.state.webhook_service.process(&first).await.unwrap();
    let paid_at = app.db.order(order.id).paid_at;

    let replay = app
        .state
        .webhook_service
        .process(&event("PAYMENT_RECEIVED", &order.code, "pay_1"))
        .await
        .unwrap();

    assert!(matches!(replay, WebhookOutcome::Applied { newly_paid: false, .. }));
    let after = app.db.order(order.id);
    assert_eq!(after.paid_at, paid_at);
    assert_eq!(after.last_gateway_event.as_deref(), Some("PAYMENT_RECEIVED"));
    assert_eq!(after.payment_status.as_deref(), Some("RECEIVED"));
    assert_eq!(app.mailer.sent().len(), 2);
}

#[tokio::test]
async fn concurrent_confirmations_send_a_single_email() {
    let app = TestApp::new();
    let order = app.order("Ipê").await;

    let a = event("PAYMENT_CONFIRMED", &order.code, "pay_1");
    let b = event("CHECKOUT_PAID", &order.code, "pay_1");
    let (ra, rb) = tokio::join!(
        app.state.webhook_service.process(&a),
        app.state.webhook_service.process(&b)
    );
    ra.unwrap();
    rb.unwrap();

    assert_eq!(app.db.order(order.id).status, OrderStatus::Recebido);
    assert_eq!(app.mailer.sent_to(CUSTOMER).len(), 1);
}

#[tokio::test]
async fn unknown_reference_is_acknowledged_without_changes() {
    let app = TestApp::new();
    let order = app.order("Ipê").await;

    let outcome = app
        .state
        .webhook_service
        .process(&event("PAYMENT_CONFIRMED", "ZZZZ9999", "pay_desconhecido"))
        .await
        .unwrap();

    assert_eq!(outcome, WebhookOutcome::Unmatched);
    assert!(outcome.ack().ok);
    let untouched = app.db.order(order.id);
    assert_eq!(untouched.status, OrderStatus::AguardandoPagamento);
    assert!(untouched.last_gateway_event.is_none());
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn cancelled_order_is_not_revived_by_payment() {
    let app = TestApp::new();
    let order = app.order("Ipê").await;

    app.state
        .webhook_service
        .process(&event("PAYMENT_CANCELED", &order.code, "pay_1"))
        .await
        .unwrap();
    assert_eq!(app.db.order(order.id).status, OrderStatus::Cancelado);

    let outcome = app
        .state
        .webhook_service
        .process(&event("PAYMENT_CONFIRMED", &order.code, "pay_1"))
        .await
        .unwrap();

    assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
    assert!(outcome.ack().warning.is_some());
    let after = app.db.order(order.id);
    assert_eq!(after.status, OrderStatus::Cancelado);
    assert!(after.paid_at.is_none());
    assert_eq!(after.last_gateway_event.as_deref(), Some("PAYMENT_CONFIRMED"));
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn falls_back_to_payment_id_then_checkout_id() {
    let app = TestApp::new();
    let order = app.order("Ipê").await;
    checkout(&app, &order).await;
    let stored = app.db.order(order.id);
    let payment_id = stored.gateway_payment_id.clone().unwrap();

    let by_payment: WebhookPayload = serde_json::from_value(json!({
        "event": "PAYMENT_OVERDUE",
        "payment": { "id": payment_id }
    }))
    .unwrap();
    let outcome = app.state.webhook_service.process(&by_payment).await.unwrap();
    assert_eq!(outcome, WebhookOutcome::Recorded { order_code: order.code.clone() });
    let overdue = app.db.order(order.id);
    assert_eq!(overdue.payment_status.as_deref(), Some("OVERDUE"));
    assert_eq!(overdue.status, OrderStatus::AguardandoPagamento);

    let by_checkout: WebhookPayload = serde_json::from_value(json!({
        "event": "CHECKOUT_PAID",
        "checkout": { "id": stored.gateway_checkout_id.clone().unwrap() }
    }))
    .unwrap();
    let outcome = app.state.webhook_service.process(&by_checkout).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Applied { newly_paid: true, .. }));
}

#[tokio::test]
async fn payment_never_regresses_an_order_in_production() {
    let app = TestApp::new();
    let order = app.order("Ipê").await;
    app.db.force_status(order.id, OrderStatus::EmProducao);

    let outcome = app
        .state
        .webhook_service
        .process(&event("PAYMENT_RECEIVED", &order.code, "pay_1"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        WebhookOutcome::Applied { status: OrderStatus::EmProducao, .. }
    ));
    assert_eq!(app.db.order(order.id).status, OrderStatus::EmProducao);
}

#[tokio::test]
async fn jasmim_gets_three_day_deadline() {
    let app = TestApp::new();
    let order = app.order("Jasmim").await;

    app.state
        .webhook_service
        .process(&event("PAYMENT_CONFIRMED", &order.code.to_lowercase(), "pay_1"))
        .await
        .unwrap();

    assert_eq!(app.db.order(order.id).delivery_deadline_days, Some(3));
}

#[tokio::test]
async fn refund_cancels_and_marks_sub_status() {
    let app = TestApp::new();
    let order = app.order("Girassol").await;
    app.state
        .webhook_service
        .process(&event("PAYMENT_CONFIRMED", &order.code, "pay_1"))
        .await
        .unwrap();

    app.state
        .webhook_service
        .process(&event("PAYMENT_REFUNDED", &order.code, "pay_1"))
        .await
        .unwrap();

    let refunded = app.db.order(order.id);
    assert_eq!(refunded.status, OrderStatus::Cancelado);
    assert_eq!(refunded.payment_status.as_deref(), Some("REFUNDED"));
    assert!(refunded.paid_at.is_some());
}
