//! `PaymentFlowApi` drives the payment-transaction state machine.
//!
//! ```text
//!                    ┌──────────┐
//!        webhook ───▶│completed │───▶ refunded   (admin refund)
//!        ┌─────┐     └──────────┘
//!   ───▶ │pending│──▶ failed                     (webhook / reconcile)
//!        └─────┘ └──▶ cancelled                  (webhook / provider failure)
//! ```
//!
//! Initiation creates the single allowed `pending` transaction for an order and opens a session
//! with the provider. Settlement is driven by signed webhooks: the adapter authenticates and
//! normalizes the raw delivery, then the storage layer applies a status-guarded single-row
//! update, so replays and out-of-order deliveries degrade into no-ops instead of double
//! settlements. Completing a payment confirms the parent order in the same database
//! transaction.
//!
//! Every call that leaves the process (session creation, status polls, refunds) is bounded by
//! the configured provider timeout.

use std::{fmt::Debug, future::Future, time::Duration};

use fgp_common::Money;
use log::{error, info, warn};
use tokio::time::timeout;

use crate::{
    db_types::{NewTransaction, PaymentProviderType, PaymentTransaction, Role, TransactionStatusType, User},
    fge_api::{
        errors::PaymentFlowError,
        payment_objects::{PaymentInit, TransactionQueryFilter, WebhookDisposition},
    },
    providers::{PaymentAdapter, PaymentAdapters, ProviderError},
    traits::{OrderManagement, PaymentManagement, SettlementResult, UserManagement},
};

pub struct PaymentFlowApi<B> {
    db: B,
    adapters: PaymentAdapters,
    provider_timeout: Duration,
}

impl<B: Debug> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi ({:?})", self.db)
    }
}

impl<B> PaymentFlowApi<B>
where B: UserManagement + OrderManagement + PaymentManagement
{
    pub fn new(db: B, adapters: PaymentAdapters, provider_timeout: Duration) -> Self {
        Self { db, adapters, provider_timeout }
    }

    /// Initiate payment for an order on behalf of its buyer (admins may initiate for anyone).
    ///
    /// The `pending` transaction is created first; its insert is the atomic guard that allows at
    /// most one pending transaction per order, so a double-submit comes back as
    /// [`PaymentFlowError::AlreadyInitiated`] before any provider traffic happens. If the
    /// provider then refuses the session, the freshly created transaction is cancelled again so
    /// the buyer can retry.
    pub async fn init_payment(
        &self,
        actor_id: i64,
        order_id: i64,
        provider: PaymentProviderType,
    ) -> Result<PaymentInit, PaymentFlowError> {
        let actor = self.fetch_actor(actor_id).await?;
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| PaymentFlowError::NotFound(format!("Order {order_id} does not exist")))?;
        if actor.role != Role::Admin && order.shop_id != actor.id {
            return Err(PaymentFlowError::Forbidden(
                "Only the ordering shop may initiate payment for this order".to_string(),
            ));
        }
        let tx = self.db.insert_transaction(NewTransaction::new(order.id, order.total_amount, provider)).await?;
        let adapter = self.adapters.get(provider);
        let session = match self.bounded(provider, adapter.create_payment(&tx, &order)).await {
            Ok(session) => session,
            Err(e) => {
                // Free the one-pending-transaction slot so the buyer can retry.
                if let Err(db_err) = self.db.cancel_transaction(tx.id).await {
                    error!("💸️ Could not cancel transaction {} after a provider failure: {db_err}", tx.id);
                }
                return Err(e.into());
            },
        };
        let metadata = session.payment_data.as_ref().map(|data| data.to_string());
        let tx = self.db.record_provider_session(tx.id, &session.external_id, metadata.as_deref()).await?;
        info!("💸️ Payment {} initiated for order {} via {provider}", tx.id, order.id);
        Ok(PaymentInit {
            transaction_id: tx.id,
            provider,
            payment_url: session.payment_url,
            payment_data: session.payment_data,
        })
    }

    /// Ingest a raw webhook delivery for `provider`.
    ///
    /// The caller acknowledges the delivery with HTTP 200 no matter which disposition comes
    /// back; providers treat error responses as an invitation to retry forever. Authentication
    /// or payload failures and unknown transaction references are therefore absorbed here,
    /// logged, and reported as a disposition rather than an error. Only a database failure is a
    /// real `Err`.
    pub async fn ingest_webhook(
        &self,
        provider: PaymentProviderType,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookDisposition, PaymentFlowError> {
        let adapter = self.adapters.get(provider);
        let event = match adapter.normalize_webhook(body, signature) {
            Ok(event) => event,
            Err(e) => {
                warn!("📨️ Discarding {provider} webhook: {e}");
                return Ok(WebhookDisposition::Rejected);
            },
        };
        let tx = match self.db.fetch_transaction_by_external_id(&event.external_id).await? {
            Some(tx) => tx,
            None => {
                info!("📨️ {provider} webhook references unknown transaction '{}'; ignoring", event.external_id);
                return Ok(WebhookDisposition::UnknownTransaction);
            },
        };
        if let Some(amount) = event.amount {
            if amount != tx.amount {
                warn!(
                    "📨️ {provider} webhook for transaction {} carries amount {amount}, expected {}; discarding",
                    tx.id, tx.amount
                );
                return Ok(WebhookDisposition::Rejected);
            }
        }
        let settlement = match event.new_status {
            TransactionStatusType::Completed => self.db.complete_transaction(tx.id).await?,
            TransactionStatusType::Failed => self.db.fail_transaction(tx.id).await?,
            TransactionStatusType::Cancelled => self.db.cancel_transaction(tx.id).await?,
            other => {
                warn!("📨️ {provider} webhook tried to move transaction {} to {other}; discarding", tx.id);
                return Ok(WebhookDisposition::Rejected);
            },
        };
        if !settlement.was_applied {
            info!(
                "📨️ {provider} webhook replay for transaction {}; already {}",
                tx.id, settlement.transaction.status
            );
            return Ok(WebhookDisposition::Replayed);
        }
        match &settlement.confirmed_order {
            Some(order) => info!("💸️ Payment {} completed; order {} confirmed", tx.id, order.id),
            None => info!("💸️ Transaction {} settled as {}", tx.id, settlement.transaction.status),
        }
        Ok(WebhookDisposition::Applied)
    }

    /// Refund a completed transaction. Admin only.
    ///
    /// The provider is asked first; only its acceptance moves the transaction to `refunded`.
    /// The parent order is deliberately left untouched, the operator decides its fate
    /// separately.
    pub async fn refund(
        &self,
        actor_id: i64,
        transaction_id: i64,
        amount: Option<Money>,
    ) -> Result<PaymentTransaction, PaymentFlowError> {
        let actor = self.fetch_actor(actor_id).await?;
        if actor.role != Role::Admin {
            return Err(PaymentFlowError::Forbidden("Only administrators may issue refunds".to_string()));
        }
        let tx = self
            .db
            .fetch_transaction(transaction_id)
            .await?
            .ok_or_else(|| PaymentFlowError::NotFound(format!("Transaction {transaction_id} does not exist")))?;
        if tx.status != TransactionStatusType::Completed {
            return Err(PaymentFlowError::InvalidTransition {
                from: tx.status,
                to: TransactionStatusType::Refunded,
            });
        }
        if let Some(amount) = amount {
            if !amount.is_positive() || amount > tx.amount {
                return Err(PaymentFlowError::Validation(
                    "Refund amount must be positive and no larger than the captured amount".to_string(),
                ));
            }
        }
        let external_id = tx.external_id.clone().ok_or_else(|| {
            PaymentFlowError::Validation(format!("Transaction {} has no provider reference", tx.id))
        })?;
        let adapter = self.adapters.get(tx.provider);
        self.bounded(tx.provider, adapter.refund_payment(&external_id, amount)).await?;
        let refunded = self.db.refund_transaction(tx.id).await?;
        info!(
            "💸️ Transaction {} refunded by admin {}; order {} left untouched",
            refunded.id, actor.id, refunded.order_id
        );
        Ok(refunded)
    }

    /// The actor's transactions, newest first. Admins see all of them; buyers and sellers see
    /// transactions on orders they participate in. `order_id` narrows to one order.
    pub async fn transactions_for_actor(
        &self,
        actor_id: i64,
        order_id: Option<i64>,
    ) -> Result<Vec<PaymentTransaction>, PaymentFlowError> {
        let actor = self.fetch_actor(actor_id).await?;
        let mut filter = TransactionQueryFilter::default();
        if actor.role != Role::Admin {
            filter = filter.with_participant_id(actor.id);
        }
        if let Some(order_id) = order_id {
            filter = filter.with_order_id(order_id);
        }
        Ok(self.db.search_transactions(filter).await?)
    }

    /// Poll the provider for a transaction's real state and settle accordingly. Admin only.
    ///
    /// This is the escape hatch for webhooks that never arrived: if the provider reports the
    /// payment completed (or failed) while our transaction still sits in `pending`, the same
    /// guarded settlement as the webhook path is applied. A provider that reports no movement
    /// leaves everything untouched.
    pub async fn reconcile_transaction(
        &self,
        actor_id: i64,
        transaction_id: i64,
    ) -> Result<SettlementResult, PaymentFlowError> {
        let actor = self.fetch_actor(actor_id).await?;
        if actor.role != Role::Admin {
            return Err(PaymentFlowError::Forbidden("Only administrators may reconcile transactions".to_string()));
        }
        let tx = self
            .db
            .fetch_transaction(transaction_id)
            .await?
            .ok_or_else(|| PaymentFlowError::NotFound(format!("Transaction {transaction_id} does not exist")))?;
        let external_id = tx.external_id.clone().ok_or_else(|| {
            PaymentFlowError::Validation(format!("Transaction {} has no provider reference", tx.id))
        })?;
        let adapter = self.adapters.get(tx.provider);
        let verification = self.bounded(tx.provider, adapter.verify_payment(&external_id)).await?;
        let settlement = match verification.status {
            TransactionStatusType::Completed => self.db.complete_transaction(tx.id).await?,
            TransactionStatusType::Failed => self.db.fail_transaction(tx.id).await?,
            TransactionStatusType::Cancelled => self.db.cancel_transaction(tx.id).await?,
            other => {
                info!("💸️ Provider reports transaction {} as {other}; nothing to reconcile", tx.id);
                return Ok(SettlementResult { transaction: tx, was_applied: false, confirmed_order: None });
            },
        };
        if settlement.was_applied {
            info!(
                "💸️ Reconciliation settled transaction {} as {}",
                settlement.transaction.id, settlement.transaction.status
            );
        }
        Ok(settlement)
    }

    async fn bounded<T, F>(&self, provider: PaymentProviderType, call: F) -> Result<T, ProviderError>
    where F: Future<Output = Result<T, ProviderError>> {
        match timeout(self.provider_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(provider, self.provider_timeout.as_secs())),
        }
    }

    async fn fetch_actor(&self, user_id: i64) -> Result<User, PaymentFlowError> {
        let user = self
            .db
            .fetch_user(user_id)
            .await?
            .ok_or_else(|| PaymentFlowError::Forbidden(format!("User {user_id} is not registered")))?;
        if !user.is_active {
            return Err(PaymentFlowError::Forbidden(format!("User {user_id} is deactivated")));
        }
        Ok(user)
    }
}
