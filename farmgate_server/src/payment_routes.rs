//! Payment endpoints: initiation, transaction queries, refunds, reconciliation, and the
//! provider-facing webhook.
//!
//! The webhook is the one endpoint with an unusual response contract. Providers treat anything
//! other than a 200 as an invitation to redeliver forever, so every authentication or payload
//! failure is absorbed, logged and acknowledged; only a database failure produces a 500. The
//! signature is verified over the exact bytes received, which is why the handler takes
//! `web::Bytes` rather than a typed JSON extractor.

use std::str::FromStr;

use actix_web::{web, HttpRequest, HttpResponse};
use farmgate_engine::{
    db_types::{PaymentProviderType, Role},
    providers::{PaymentAdapter, PaymentAdapters},
    MarketplaceDatabase,
    PaymentFlowApi,
};
use log::*;

use crate::{
    auth::JwtClaims,
    data_objects::{PaymentInitRequest, RefundRequest, TransactionsQuery},
    errors::ServerError,
    route,
};

route!(init_payment => Post "/payments/init" impl MarketplaceDatabase);
/// Open a payment session for an order. Only the ordering shop (or an admin) may initiate, and
/// an order holds at most one pending transaction; a double-submit comes back as a 400.
pub async fn init_payment<B: MarketplaceDatabase>(
    claims: JwtClaims,
    body: web::Json<PaymentInitRequest>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let PaymentInitRequest { order_id, provider } = body.into_inner();
    debug!("💻️ POST payment init for order {order_id} via {provider} by user {}", claims.sub);
    let init = api.init_payment(claims.sub, order_id, provider).await?;
    Ok(HttpResponse::Ok().json(init))
}

route!(my_transactions => Get "/payments/transactions" impl MarketplaceDatabase);
/// The caller's payment transactions, newest first. `?order_id=` narrows to one order.
pub async fn my_transactions<B: MarketplaceDatabase>(
    claims: JwtClaims,
    query: web::Query<TransactionsQuery>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET transactions for user {}", claims.sub);
    let txs = api.transactions_for_actor(claims.sub, query.into_inner().order_id).await?;
    Ok(HttpResponse::Ok().json(txs))
}

route!(refund_payment => Post "/payments/refund" impl MarketplaceDatabase where requires [Role::Admin]);
/// Refund a completed transaction through its provider. The parent order is left untouched; the
/// operator decides its fate separately.
pub async fn refund_payment<B: MarketplaceDatabase>(
    claims: JwtClaims,
    body: web::Json<RefundRequest>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let RefundRequest { transaction_id, amount } = body.into_inner();
    debug!("💻️ POST refund for transaction {transaction_id} by admin {}", claims.sub);
    let refunded = api.refund(claims.sub, transaction_id, amount).await?;
    Ok(HttpResponse::Ok().json(refunded))
}

route!(reconcile_transaction => Post "/payments/reconcile/{id}" impl MarketplaceDatabase where requires [Role::Admin]);
/// Poll the provider for a transaction's real state and settle accordingly. The escape hatch for
/// webhooks that never arrived.
pub async fn reconcile_transaction<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let transaction_id = path.into_inner();
    debug!("💻️ POST reconcile for transaction {transaction_id} by admin {}", claims.sub);
    let settlement = api.reconcile_transaction(claims.sub, transaction_id).await?;
    Ok(HttpResponse::Ok().json(settlement.transaction))
}

route!(payment_webhook => Post "/payments/{provider}" impl MarketplaceDatabase);
/// Ingest a provider webhook. Unauthenticated by design; the payload signature is the
/// authentication. An unknown provider tag is the one case that 404s, before the body is even
/// looked at.
pub async fn payment_webhook<B: MarketplaceDatabase>(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
    adapters: web::Data<PaymentAdapters>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let tag = path.into_inner();
    let provider = PaymentProviderType::from_str(&tag)
        .map_err(|_| ServerError::NoRecordFound(format!("'{tag}' is not a known payment provider")))?;
    let header = adapters.get(provider).signature_header();
    let signature = req.headers().get(header).and_then(|v| v.to_str().ok());
    let disposition = api.ingest_webhook(provider, &body, signature).await?;
    debug!("💻️ {provider} webhook acknowledged as {disposition:?}");
    // Providers only look for the 200 and this exact body; anything fancier confuses some of them.
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}
