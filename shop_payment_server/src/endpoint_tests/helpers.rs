use actix_web::{
    http::StatusCode,
    test::{call_service, init_service, read_body, TestRequest},
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use csp_common::{Money, Secret};
use nowpayments_tools::{signature::sign_ipn_body, NowPaymentsApi, NowPaymentsConfig};
use shop_payment_engine::db_types::{Order, OrderNumber, OrderStatus, Payment, PaymentStatus};

pub const TEST_IPN_SECRET: &str = "test-secret";

pub fn test_gateway() -> NowPaymentsApi {
    let config = NowPaymentsConfig {
        base_url: "http://localhost:1".to_string(),
        api_key: Secret::new("test-key".to_string()),
        ipn_secret: Secret::new(TEST_IPN_SECRET.to_string()),
        callback_base_url: "http://localhost:1".to_string(),
    };
    NowPaymentsApi::new(config).expect("Error creating gateway client")
}

pub fn sign(body: &[u8]) -> String {
    sign_ipn_body(&Secret::new(TEST_IPN_SECRET.to_string()), body)
}

pub async fn get_request<F>(path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = init_service(App::new().configure(configure)).await;
    let req = TestRequest::get().uri(path).to_request();
    let res = call_service(&app, req).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&read_body(res).await).to_string();
    (status, body)
}

pub async fn post_request<F>(path: &str, headers: &[(&str, &str)], body: Vec<u8>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = init_service(App::new().configure(configure)).await;
    let mut req = TestRequest::post().uri(path);
    for (name, value) in headers {
        req = req.insert_header((*name, *value));
    }
    let req = req.set_payload(body).to_request();
    let res = call_service(&app, req).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&read_body(res).await).to_string();
    (status, body)
}

pub fn sample_order() -> Order {
    Order {
        id: 1,
        order_number: OrderNumber("ORD-20240101-ABC123".into()),
        user_id: 1,
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Waiting,
        subtotal: Money::from_cents(5000),
        discount_amount: Money::default(),
        tax_amount: Money::default(),
        shipping_amount: Money::default(),
        total_amount: Money::from_cents(5000),
        currency: "USD".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
    }
}

pub fn sample_payment(status: PaymentStatus) -> Payment {
    Payment {
        id: 1,
        order_id: 1,
        payment_id: "np_5745459419".to_string(),
        status,
        pay_address: "3EZ2uTdVDAMFXTfc6uLDDKR6o8qKBZXVkj".to_string(),
        price_amount: Money::from_cents(5000),
        price_currency: "USD".to_string(),
        pay_amount: 0.0021,
        pay_currency: "btc".to_string(),
        actually_paid: 0.0,
        actually_paid_currency: None,
        purchase_id: "order_ORD-20240101-ABC123_00aa11bb".to_string(),
        txid: None,
        network: None,
        expires_at: None,
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 35, 0).unwrap(),
    }
}
