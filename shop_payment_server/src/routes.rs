//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will
//! cause the current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database
//! calls and so on) must therefore be expressed as a future or asynchronous function.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use shop_payment_engine::{db_types::OrderNumber, traits::PaymentGatewayDatabase, PaymentFlowApi, PaymentFlowError};

use crate::{
    config::ProxyConfig,
    data_objects::{CheckoutRequest, NewPaymentParams, OrderResult, PaymentQuoteResponse},
    errors::ServerError,
    helpers::get_remote_ip,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//---------------------------------------------- IPN webhook ----------------------------------------------------
route!(ipn_webhook => Post "/webhook/payment-ipn" impl PaymentGatewayDatabase);
/// The processor posts every payment status change here, signed with the merchant's IPN secret.
///
/// The raw body bytes are handed to the engine untouched: the HMAC is computed over the exact bytes on the wire,
/// so any re-serialization would break verification. Replays and out-of-order deliveries are welcome; the engine
/// sorts them out and this handler just reports what happened.
pub async fn ipn_webhook<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<PaymentFlowApi<B>>,
    proxy: web::Data<ProxyConfig>,
) -> Result<HttpResponse, ServerError> {
    let peer = get_remote_ip(&req, &proxy);
    trace!("💻️ Payment notification received from {peer}");
    let signature = req
        .headers()
        .get("x-nowpayments-sig")
        .and_then(|v| v.to_str().ok())
        .ok_or(ServerError::InvalidSignature)?;
    let outcome = api.apply_notification(&body, signature).await.map_err(|e| {
        match &e {
            PaymentFlowError::InvalidSignature => warn!("💻️ Rejected a notification from {peer}: bad signature"),
            e => info!("💻️ Notification from {peer} not applied. {e}"),
        }
        ServerError::from(e)
    })?;
    debug!("💻️ Notification applied to payment {}", outcome.payment().payment_id);
    // the processor only looks at the status code, but it documents this exact body
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl PaymentGatewayDatabase);
pub async fn checkout<B: PaymentGatewayDatabase>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let CheckoutRequest { telegram_id, username, order } = body.into_inner();
    let order = api.checkout(&telegram_id, username.as_deref(), order).await?;
    info!("💻️ Order {} created via checkout", order.order_number);
    Ok(HttpResponse::Created().json(order))
}

//----------------------------------------------    Orders   ----------------------------------------------------
route!(order_status => Get "/orders/{order_number}" impl PaymentGatewayDatabase);
pub async fn order_status<B: PaymentGatewayDatabase>(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber(path.into_inner());
    let order = api
        .db()
        .fetch_order_by_number(&order_number)
        .await
        .map_err(|e| ServerError::BackendError(e.to_string()))?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No order exists with order number {order_number}")))?;
    let items = api.db().fetch_order_items(order.id).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    let payments =
        api.db().fetch_payments_for_order(order.id).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    Ok(HttpResponse::Ok().json(OrderResult { order, items, payments }))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(create_payment => Post "/orders/{order_number}/payments" impl PaymentGatewayDatabase);
pub async fn create_payment<B: PaymentGatewayDatabase>(
    path: web::Path<String>,
    body: web::Json<NewPaymentParams>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber(path.into_inner());
    let params = body.into_inner();
    let (payment, _quote) = api.create_payment(&order_number, &params.pay_currency).await?;
    info!("💻️ Payment {} opened for order {order_number}", payment.payment_id);
    Ok(HttpResponse::Created().json(PaymentQuoteResponse::from(&payment)))
}

route!(payment_status => Get "/payments/{payment_id}" impl PaymentGatewayDatabase);
pub async fn payment_status<B: PaymentGatewayDatabase>(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payment_id = path.into_inner();
    let payment = api
        .db()
        .fetch_payment(&payment_id)
        .await
        .map_err(|e| ServerError::BackendError(e.to_string()))?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No payment exists with payment id {payment_id}")))?;
    Ok(HttpResponse::Ok().json(payment))
}

route!(refresh_payment => Post "/payments/{payment_id}/refresh" impl PaymentGatewayDatabase);
/// Polls the processor for the payment's current status and reconciles the answer, exactly as if a notification
/// had arrived. Useful when a webhook delivery was missed.
pub async fn refresh_payment<B: PaymentGatewayDatabase>(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payment_id = path.into_inner();
    let outcome = api.poll_payment_status(&payment_id).await?;
    Ok(HttpResponse::Ok().json(outcome.payment()))
}

//---------------------------------------------- Currencies  ----------------------------------------------------
route!(currencies => Get "/currencies" impl PaymentGatewayDatabase);
pub async fn currencies<B: PaymentGatewayDatabase>(api: web::Data<PaymentFlowApi<B>>) -> HttpResponse {
    let currencies = api.supported_currencies().await;
    HttpResponse::Ok().json(currencies)
}
