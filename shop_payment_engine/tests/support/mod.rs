#![allow(dead_code)]
use csp_common::{Money, Secret};
use log::*;
use nowpayments_tools::{signature::sign_ipn_body, NowPaymentsApi, NowPaymentsConfig};
use shop_payment_engine::{
    db_types::{NewOrderItem, NewPayment, Order, OrderDraft, Payment, PaymentStatus, ProductKind},
    events::EventProducers,
    PaymentFlowApi,
    PaymentGatewayDatabase,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

use shop_payment_engine::test_utils::prepare_env::{prepare_test_env, random_db_path};

pub const TEST_IPN_SECRET: &str = "test-secret";

/// A gateway config pointing nowhere. Tests never reach the network; they only need the IPN secret for signing
/// and verifying notification bodies.
pub fn test_gateway() -> NowPaymentsApi {
    let config = NowPaymentsConfig {
        base_url: "http://localhost:1".to_string(),
        api_key: Secret::new("test-key".to_string()),
        ipn_secret: Secret::new(TEST_IPN_SECRET.to_string()),
        callback_base_url: "http://localhost:1".to_string(),
    };
    NowPaymentsApi::new(config).expect("Error creating gateway client")
}

/// A single pool connection keeps concurrent transactions strictly serialized, which makes the race tests
/// deterministic without changing the semantics under test.
pub async fn setup_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating database")
}

pub async fn setup() -> PaymentFlowApi<SqliteDatabase> {
    PaymentFlowApi::new(setup_db().await, test_gateway(), EventProducers::default())
}

pub async fn tear_down(mut api: PaymentFlowApi<SqliteDatabase>) {
    let url = api.db().url().to_string();
    if let Err(e) = api.db_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}

pub fn physical_item(name: &str, price_cents: i64, qty: i64) -> NewOrderItem {
    NewOrderItem {
        product_id: 101,
        product_name: name.to_string(),
        product_sku: Some(format!("SKU-{name}")),
        product_kind: ProductKind::Physical,
        quantity: qty,
        unit_price: Money::from_cents(price_cents),
        download_expiry_days: None,
        download_limit: None,
    }
}

pub fn digital_item(name: &str, price_cents: i64) -> NewOrderItem {
    NewOrderItem {
        product_id: 202,
        product_name: name.to_string(),
        product_sku: None,
        product_kind: ProductKind::Digital,
        quantity: 1,
        unit_price: Money::from_cents(price_cents),
        download_expiry_days: None,
        download_limit: None,
    }
}

pub async fn checkout(api: &PaymentFlowApi<SqliteDatabase>, items: Vec<NewOrderItem>) -> Order {
    let draft = OrderDraft {
        currency: "USD".to_string(),
        items,
        discount_amount: Money::default(),
        tax_amount: Money::default(),
        shipping_amount: Money::default(),
    };
    api.checkout("tg-1000", Some("alice"), draft).await.expect("Error creating order")
}

/// Records a payment as if the processor had just quoted it, without going through the REST client.
pub async fn open_payment(api: &PaymentFlowApi<SqliteDatabase>, order: &Order, payment_id: &str) -> Payment {
    let payment = NewPayment {
        order_id: order.id,
        payment_id: payment_id.to_string(),
        status: PaymentStatus::Waiting,
        pay_address: "3EZ2uTdVDAMFXTfc6uLDDKR6o8qKBZXVkj".to_string(),
        price_amount: order.total_amount,
        price_currency: order.currency.clone(),
        pay_amount: 0.0021,
        pay_currency: "btc".to_string(),
        purchase_id: format!("order_{}_deadbeef", order.order_number.as_str()),
        expires_at: None,
    };
    api.db().insert_payment(payment).await.expect("Error recording payment")
}

pub fn notification(payment_id: &str, status: &str) -> Vec<u8> {
    format!(r#"{{"payment_id":"{payment_id}","payment_status":"{status}","actually_paid":0.0021}}"#).into_bytes()
}

pub fn sign(body: &[u8]) -> String {
    sign_ipn_body(&Secret::new(TEST_IPN_SECRET.to_string()), body)
}
