use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use farmgate_engine::{CatalogApi, DeliveryApi, OrderFlowApi, PaymentFlowApi, SqliteDatabase};

use crate::{
    auth::JwtVerifier,
    catalog_routes::{
        CreateProductRoute,
        DeleteProductRoute,
        ListProductsRoute,
        ProductByIdRoute,
        UpdateProductRoute,
    },
    config::ServerConfig,
    errors::ServerError,
    payment_routes::{
        InitPaymentRoute,
        MyTransactionsRoute,
        PaymentWebhookRoute,
        ReconcileTransactionRoute,
        RefundPaymentRoute,
    },
    routes::{
        health,
        AmendOrderRoute,
        DeliveryForOrderRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        PlaceOrderRoute,
        UpdateDeliveryRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    // Built once so the configuration warnings fire once, not per worker.
    let adapters = config.payments.build_adapters();
    let host = config.host.clone();
    let port = config.port;
    let shutdown_grace_secs = config.shutdown_grace_secs;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone());
        let payments_api = PaymentFlowApi::new(db.clone(), adapters.clone(), config.provider_timeout);
        let catalog_api = CatalogApi::new(db.clone());
        let deliveries_api = DeliveryApi::new(db.clone());
        let verifier = JwtVerifier::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("fgp::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(deliveries_api))
            .app_data(web::Data::new(adapters.clone()))
            .app_data(web::Data::new(verifier));
        let api_scope = web::scope("/api")
            .service(PlaceOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(AmendOrderRoute::<SqliteDatabase>::new())
            .service(DeliveryForOrderRoute::<SqliteDatabase>::new())
            .service(UpdateDeliveryRoute::<SqliteDatabase>::new())
            .service(InitPaymentRoute::<SqliteDatabase>::new())
            .service(MyTransactionsRoute::<SqliteDatabase>::new())
            .service(RefundPaymentRoute::<SqliteDatabase>::new())
            .service(ReconcileTransactionRoute::<SqliteDatabase>::new())
            .service(CreateProductRoute::<SqliteDatabase>::new())
            .service(ListProductsRoute::<SqliteDatabase>::new())
            .service(ProductByIdRoute::<SqliteDatabase>::new())
            .service(UpdateProductRoute::<SqliteDatabase>::new())
            .service(DeleteProductRoute::<SqliteDatabase>::new());
        // Provider webhooks live outside /api: no bearer auth, payload signatures instead.
        let webhook_scope = web::scope("/webhooks").service(PaymentWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .shutdown_timeout(shutdown_grace_secs)
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
