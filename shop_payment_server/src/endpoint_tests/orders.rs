use actix_web::{http::StatusCode, web, web::ServiceConfig};
use shop_payment_engine::{
    db_types::{OrderStatus, PaymentStatus, User},
    events::EventProducers,
    PaymentFlowApi,
};

use super::{
    helpers::{get_request, post_request, sample_order, sample_payment, test_gateway},
    mocks::MockPaymentGateway,
};
use crate::routes::{CheckoutRoute, CreatePaymentRoute, OrderStatusRoute, PaymentStatusRoute};

fn configure(mock: MockPaymentGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = PaymentFlowApi::new(mock, test_gateway(), EventProducers::default());
        cfg.app_data(web::Data::new(api))
            .service(CheckoutRoute::<MockPaymentGateway>::new())
            .service(OrderStatusRoute::<MockPaymentGateway>::new())
            .service(CreatePaymentRoute::<MockPaymentGateway>::new())
            .service(PaymentStatusRoute::<MockPaymentGateway>::new());
    }
}

fn sample_user() -> User {
    let now = chrono::Utc::now();
    User {
        id: 1,
        telegram_id: "tg-1000".to_string(),
        username: Some("alice".to_string()),
        loyalty_points: 0,
        total_spent: csp_common::Money::default(),
        total_orders: 0,
        created_at: now,
        updated_at: now,
    }
}

#[actix_web::test]
async fn checkout_creates_an_order() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockPaymentGateway::new();
    mock.expect_fetch_or_create_user().times(1).returning(|_, _| Ok(sample_user()));
    mock.expect_insert_order()
        .times(1)
        .withf(|o| o.items.len() == 1 && o.user_id == 1)
        .returning(|_| Ok(sample_order()));
    let body = br#"{
        "telegram_id": "tg-1000",
        "username": "alice",
        "currency": "USD",
        "items": [
            {"product_id": 7, "product_name": "Hoodie", "product_kind": "Physical", "quantity": 1, "unit_price": 5000}
        ]
    }"#
    .to_vec();
    let (status, body) =
        post_request("/checkout", &[("content-type", "application/json")], body, configure(mock)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.contains("ORD-20240101-ABC123"), "got: {body}");
}

#[actix_web::test]
async fn order_status_returns_the_order_with_items_and_payments() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockPaymentGateway::new();
    mock.expect_fetch_order_by_number().times(1).returning(|_| Ok(Some(sample_order())));
    mock.expect_fetch_order_items().times(1).returning(|_| Ok(vec![]));
    mock.expect_fetch_payments_for_order()
        .times(1)
        .returning(|_| Ok(vec![sample_payment(PaymentStatus::Waiting)]));
    let (status, body) = get_request("/orders/ORD-20240101-ABC123", configure(mock)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""payments""#), "got: {body}");
    assert!(body.contains("np_5745459419"), "got: {body}");
}

#[actix_web::test]
async fn an_unknown_order_is_not_found() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockPaymentGateway::new();
    mock.expect_fetch_order_by_number().times(1).returning(|_| Ok(None));
    let (status, _) = get_request("/orders/ORD-20240101-ZZZZZZ", configure(mock)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn a_payment_for_a_missing_order_is_not_found_before_the_gateway_is_called() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockPaymentGateway::new();
    mock.expect_fetch_order_by_number().times(1).returning(|_| Ok(None));
    let body = br#"{"pay_currency": "btc"}"#.to_vec();
    let (status, _) = post_request(
        "/orders/ORD-20240101-ZZZZZZ/payments",
        &[("content-type", "application/json")],
        body,
        configure(mock),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn a_payment_for_a_paid_order_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockPaymentGateway::new();
    mock.expect_fetch_order_by_number().times(1).returning(|_| {
        let mut order = sample_order();
        order.status = OrderStatus::Paid;
        Ok(Some(order))
    });
    let body = br#"{"pay_currency": "btc"}"#.to_vec();
    let (status, _) = post_request(
        "/orders/ORD-20240101-ABC123/payments",
        &[("content-type", "application/json")],
        body,
        configure(mock),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn payment_status_returns_the_local_record() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockPaymentGateway::new();
    mock.expect_fetch_payment()
        .times(1)
        .returning(|_| Ok(Some(sample_payment(PaymentStatus::Finished))));
    let (status, body) = get_request("/payments/np_5745459419", configure(mock)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Finished"), "got: {body}");
}
