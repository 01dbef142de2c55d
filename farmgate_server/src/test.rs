
mod misc {

    use actix_web::{body::MessageBody, test, test::TestRequest, App};

    use crate::routes::health;

    #[actix_web::test]
    async fn health_endpoint() {
        let app = test::init_service(App::new().service(health)).await;
        let req = TestRequest::get().uri("/health").to_request();
        let (_req, res) = test::call_service(&app, req).await.into_parts();
        let status = res.status();
        let body = res.into_body().try_into_bytes().unwrap();
        assert!(status.is_success());
        assert_eq!(body, "👍️\n");
    }
}

mod auth {
    use std::time::Duration;

    use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
    use farmgate_engine::{db_types::Role, providers::PaymentAdapters, OrderFlowApi, PaymentFlowApi};
    use fgp_common::Secret;

    use crate::{
        auth::{JwtVerifier, TokenIssuer},
        config::AuthConfig,
        payment_routes::RefundPaymentRoute,
        routes::MyOrdersRoute,
        test::mocks::{user, MockDb},
    };

    fn test_auth_config() -> AuthConfig {
        AuthConfig { jwt_secret: Secret::new("a-test-secret-that-is-long-enough-for-hs256".to_string()) }
    }

    #[actix_web::test]
    async fn missing_token_is_unauthorized() {
        let api = OrderFlowApi::new(MockDb::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(api))
                .app_data(web::Data::new(JwtVerifier::new(&test_auth_config())))
                .service(web::scope("/api").service(MyOrdersRoute::<MockDb>::new())),
        )
        .await;
        let req = TestRequest::get().uri("/api/orders").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn valid_token_reaches_the_handler() {
        let config = test_auth_config();
        let mut db = MockDb::new();
        db.expect_fetch_user().returning(|id| Ok(Some(user(id, Role::Shop))));
        db.expect_search_orders().returning(|_| Ok(vec![]));
        let api = OrderFlowApi::new(db);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(api))
                .app_data(web::Data::new(JwtVerifier::new(&config)))
                .service(web::scope("/api").service(MyOrdersRoute::<MockDb>::new())),
        )
        .await;
        let token = TokenIssuer::new(&config).issue_token(5, Role::Shop, None).unwrap();
        let req = TestRequest::get()
            .uri("/api/orders")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn expired_token_is_unauthorized() {
        let config = test_auth_config();
        let api = OrderFlowApi::new(MockDb::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(api))
                .app_data(web::Data::new(JwtVerifier::new(&config)))
                .service(web::scope("/api").service(MyOrdersRoute::<MockDb>::new())),
        )
        .await;
        // Well past the validator's clock-skew leeway.
        let token = TokenIssuer::new(&config).issue_token(5, Role::Shop, Some(chrono::Duration::hours(-2))).unwrap();
        let req = TestRequest::get()
            .uri("/api/orders")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn admin_route_refuses_other_roles() {
        let config = test_auth_config();
        let adapters = PaymentAdapters::mock_only(Secret::new("webhook-test-secret".to_string()));
        let api = PaymentFlowApi::new(MockDb::new(), adapters, Duration::from_secs(5));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(api))
                .app_data(web::Data::new(JwtVerifier::new(&config)))
                .service(web::scope("/api").service(RefundPaymentRoute::<MockDb>::new())),
        )
        .await;
        let token = TokenIssuer::new(&config).issue_token(5, Role::Shop, None).unwrap();
        let req = TestRequest::post()
            .uri("/api/payments/refund")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(serde_json::json!({ "transaction_id": 1 }))
            .to_request();
        // The rejection comes from the ACL middleware, so it surfaces as a service error rather
        // than a response.
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::FORBIDDEN);
    }
}

mod webhooks {
    use std::time::Duration;

    use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
    use farmgate_engine::{
        db_types::{OrderStatusType, TransactionStatusType},
        providers::{sign_webhook, PaymentAdapters},
        PaymentFlowApi,
        SettlementResult,
    };
    use fgp_common::Secret;

    use crate::{
        payment_routes::PaymentWebhookRoute,
        test::mocks::{order, transaction, MockDb},
    };

    const WEBHOOK_SECRET: &str = "webhook-test-secret";

    fn secret() -> Secret<String> {
        Secret::new(WEBHOOK_SECRET.to_string())
    }

    macro_rules! webhook_app {
        ($db:expr) => {{
            let adapters = PaymentAdapters::mock_only(secret());
            let api = PaymentFlowApi::new($db, adapters.clone(), Duration::from_secs(5));
            test::init_service(
                App::new()
                    .app_data(web::Data::new(api))
                    .app_data(web::Data::new(adapters))
                    .service(web::scope("/webhooks").service(PaymentWebhookRoute::<MockDb>::new())),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn unknown_provider_is_not_found() {
        let app = webhook_app!(MockDb::new());
        let req = TestRequest::post().uri("/webhooks/payments/paypal").set_payload("{}").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn bad_signature_is_still_acknowledged() {
        // No expectations on the database: a delivery that fails authentication must be
        // discarded before any lookup happens, and still acknowledged with a 200.
        let app = webhook_app!(MockDb::new());
        let body = br#"{"transaction_id":42}"#;
        let bad_sig = sign_webhook(&Secret::new("a-different-secret".to_string()), body);
        let req = TestRequest::post()
            .uri("/webhooks/payments/mock")
            .insert_header(("X-Mock-Signature", bad_sig))
            .set_payload(body.to_vec())
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn completed_webhook_settles_the_transaction() {
        let mut db = MockDb::new();
        db.expect_fetch_transaction_by_external_id()
            .withf(|id| id == "mock_42")
            .returning(|_| Ok(Some(transaction(42, 7, TransactionStatusType::Pending))));
        db.expect_complete_transaction().withf(|id| *id == 42).returning(|_| {
            Ok(SettlementResult {
                transaction: transaction(42, 7, TransactionStatusType::Completed),
                was_applied: true,
                confirmed_order: Some(order(7, 2, 1, OrderStatusType::Confirmed)),
            })
        });
        let app = webhook_app!(db);
        let body = br#"{"transaction_id":42}"#;
        let sig = sign_webhook(&secret(), body);
        let req = TestRequest::post()
            .uri("/webhooks/payments/mock")
            .insert_header(("X-Mock-Signature", sig))
            .set_payload(body.to_vec())
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn replayed_webhook_is_acknowledged() {
        let mut db = MockDb::new();
        db.expect_fetch_transaction_by_external_id()
            .returning(|_| Ok(Some(transaction(42, 7, TransactionStatusType::Pending))));
        // The guarded update reports that the transaction had already settled.
        db.expect_complete_transaction().returning(|_| {
            Ok(SettlementResult {
                transaction: transaction(42, 7, TransactionStatusType::Completed),
                was_applied: false,
                confirmed_order: None,
            })
        });
        let app = webhook_app!(db);
        let body = br#"{"transaction_id":42}"#;
        let sig = sign_webhook(&secret(), body);
        let req = TestRequest::post()
            .uri("/webhooks/payments/mock")
            .insert_header(("X-Mock-Signature", sig))
            .set_payload(body.to_vec())
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
