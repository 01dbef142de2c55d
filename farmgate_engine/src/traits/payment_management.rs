use crate::{
    db_types::{NewTransaction, PaymentTransaction},
    fge_api::payment_objects::TransactionQueryFilter,
    traits::{SettlementResult, StorageError},
};

/// Payment-transaction persistence and the guarded status transitions driven by webhooks.
///
/// The settlement methods are single-row updates predicated on the current status, so replays
/// and out-of-order webhook deliveries cannot double-apply a transition.
#[allow(async_fn_in_trait)]
pub trait PaymentManagement {
    /// Create a `pending` transaction for the order.
    ///
    /// At most one pending transaction may exist per order at any time; a second attempt fails
    /// with [`StorageError::DuplicatePendingTransaction`] without writing anything.
    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<PaymentTransaction, StorageError>;

    /// Record the provider-side session for a freshly created transaction: its external
    /// reference id and the opaque metadata blob the provider returned.
    async fn record_provider_session(
        &self,
        transaction_id: i64,
        external_id: &str,
        metadata: Option<&str>,
    ) -> Result<PaymentTransaction, StorageError>;

    async fn fetch_transaction(&self, transaction_id: i64) -> Result<Option<PaymentTransaction>, StorageError>;

    async fn fetch_transaction_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<PaymentTransaction>, StorageError>;

    /// Fetches transactions according to the criteria in the filter, newest first.
    async fn search_transactions(
        &self,
        query: TransactionQueryFilter,
    ) -> Result<Vec<PaymentTransaction>, StorageError>;

    /// Settle the transaction as `completed` and, in the same transaction, move the linked order
    /// from `pending` to `confirmed` (creating its delivery record).
    ///
    /// If the transaction already left `pending`, nothing changes and the result reports
    /// `was_applied == false`. If the order already left `pending`, the order is left untouched
    /// and `confirmed_order` is `None`.
    async fn complete_transaction(&self, transaction_id: i64) -> Result<SettlementResult, StorageError>;

    /// Settle the transaction as `failed`. The order is not touched; the buyer may initiate a new
    /// transaction. Idempotent in the same way as [`PaymentManagement::complete_transaction`].
    async fn fail_transaction(&self, transaction_id: i64) -> Result<SettlementResult, StorageError>;

    /// Settle the transaction as `cancelled`. Same semantics as
    /// [`PaymentManagement::fail_transaction`].
    async fn cancel_transaction(&self, transaction_id: i64) -> Result<SettlementResult, StorageError>;

    /// Move a `completed` transaction to `refunded`. Unlike the webhook settlements this is an
    /// operator action, so a transaction in any other state fails loudly with
    /// [`StorageError::TransactionStateConflict`].
    async fn refund_transaction(&self, transaction_id: i64) -> Result<PaymentTransaction, StorageError>;
}
