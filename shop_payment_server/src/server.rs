use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use nowpayments_tools::NowPaymentsApi;
use shop_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    PaymentFlowApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        CheckoutRoute,
        CreatePaymentRoute,
        CurrenciesRoute,
        IpnWebhookRoute,
        OrderStatusRoute,
        PaymentStatusRoute,
        RefreshPaymentRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    // No hooks are registered by default; deployments that embed the server add theirs before this point.
    let handlers = EventHandlers::new(100, EventHooks::default());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let gateway =
        NowPaymentsApi::new(config.nowpayments.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let proxy = config.proxy;
    let srv = HttpServer::new(move || {
        let api = PaymentFlowApi::new(db.clone(), gateway.clone(), producers.clone());
        let api_scope = web::scope("/api")
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(OrderStatusRoute::<SqliteDatabase>::new())
            .service(CreatePaymentRoute::<SqliteDatabase>::new())
            .service(PaymentStatusRoute::<SqliteDatabase>::new())
            .service(RefreshPaymentRoute::<SqliteDatabase>::new())
            .service(CurrenciesRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("csp::access_log"))
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(proxy))
            .service(health)
            .service(IpnWebhookRoute::<SqliteDatabase>::new())
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
