use fgp_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{PaymentProviderType, TransactionStatusType};

/// What the caller gets back from payment initiation: the transaction to track, and whatever the
/// provider handed us to send the payer to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInit {
    pub transaction_id: i64,
    pub provider: PaymentProviderType,
    pub payment_url: Option<String>,
    pub payment_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionQueryFilter {
    pub order_id: Option<i64>,
    /// Restrict to transactions on orders this user participates in (as buyer or seller).
    pub participant_id: Option<i64>,
    pub status: Option<TransactionStatusType>,
}

impl TransactionQueryFilter {
    pub fn with_order_id(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_participant_id(mut self, user_id: i64) -> Self {
        self.participant_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: TransactionStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() && self.participant_id.is_none() && self.status.is_none()
    }
}

/// The outcome of a webhook delivery, reported for logging. The provider-facing response is an
/// acknowledgement in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// The settlement was applied to the transaction (and possibly confirmed the order).
    Applied,
    /// The event referenced a transaction that has already settled. Nothing changed.
    Replayed,
    /// The event referenced no transaction known to us. Nothing changed.
    UnknownTransaction,
    /// The payload was malformed or its signature did not verify. Nothing changed.
    Rejected,
}

/// A webhook event after the provider adapter has verified and normalized it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedWebhookEvent {
    pub external_id: String,
    pub new_status: TransactionStatusType,
    pub amount: Option<Money>,
}
