use actix_web::{http::StatusCode, web, web::ServiceConfig};
use shop_payment_engine::{db_types::PaymentStatus, events::EventProducers, traits::ReconciliationOutcome,
    PaymentFlowApi};

use super::{
    helpers::{post_request, sample_payment, sign, test_gateway},
    mocks::MockPaymentGateway,
};
use crate::{config::ProxyConfig, routes::IpnWebhookRoute};

const WEBHOOK_PATH: &str = "/webhook/payment-ipn";

fn configure(mock: MockPaymentGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = PaymentFlowApi::new(mock, test_gateway(), EventProducers::default());
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(ProxyConfig::default()))
            .service(IpnWebhookRoute::<MockPaymentGateway>::new());
    }
}

#[actix_web::test]
async fn a_signed_notification_is_applied() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockPaymentGateway::new();
    mock.expect_apply_payment_update()
        .times(1)
        .withf(|u| u.payment_id == "np_5745459419" && u.status == PaymentStatus::Confirming)
        .returning(|_| Ok(ReconciliationOutcome::Updated { payment: sample_payment(PaymentStatus::Confirming) }));
    let body = br#"{"payment_id":"np_5745459419","payment_status":"confirming"}"#.to_vec();
    let sig = sign(&body);
    let (status, body) =
        post_request(WEBHOOK_PATH, &[("x-nowpayments-sig", sig.as_str())], body, configure(mock)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"ok""#), "got: {body}");
}

#[actix_web::test]
async fn a_bad_signature_is_rejected_without_touching_the_backend() {
    let _ = env_logger::try_init().ok();
    // no expectations: any backend call panics the test
    let mock = MockPaymentGateway::new();
    let body = br#"{"payment_id":"np_5745459419","payment_status":"finished"}"#.to_vec();
    let (status, body) =
        post_request(WEBHOOK_PATH, &[("x-nowpayments-sig", "00ff00ff00ff")], body, configure(mock)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("error"), "got: {body}");
}

#[actix_web::test]
async fn a_missing_signature_header_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mock = MockPaymentGateway::new();
    let body = br#"{"payment_id":"np_5745459419","payment_status":"finished"}"#.to_vec();
    let (status, _) = post_request(WEBHOOK_PATH, &[], body, configure(mock)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn a_signed_but_malformed_body_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let mock = MockPaymentGateway::new();
    let body = br#"{"payment_id":"np_5745459419"}"#.to_vec();
    let sig = sign(&body);
    let (status, _) = post_request(WEBHOOK_PATH, &[("x-nowpayments-sig", sig.as_str())], body, configure(mock)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn an_unknown_payment_id_maps_to_not_found() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockPaymentGateway::new();
    mock.expect_apply_payment_update().times(1).returning(|u| {
        Err(shop_payment_engine::traits::PaymentGatewayError::PaymentNotFound(u.payment_id))
    });
    let body = br#"{"payment_id":"np_unknown","payment_status":"finished"}"#.to_vec();
    let sig = sign(&body);
    let (status, _) = post_request(WEBHOOK_PATH, &[("x-nowpayments-sig", sig.as_str())], body, configure(mock)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
