//! The mock provider used in development and tests.
//!
//! It behaves like a perfectly agreeable payment provider: sessions always open, status polls
//! always report success, refunds always go through. Webhook deliveries still have to be signed
//! with the configured secret, so the ingestion path exercises the same authentication code as
//! the real providers.

use fgp_common::{Money, Secret};
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;

use crate::{
    db_types::{Order, PaymentProviderType, PaymentTransaction, TransactionStatusType},
    fge_api::payment_objects::NormalizedWebhookEvent,
    providers::{verify_webhook, PaymentAdapter, ProviderError, ProviderSession, ProviderVerification},
};

pub const MOCK_BASE_URL: &str = "http://localhost:8000";

/// Test deliveries may reference the payment either by the provider-side id or by the raw
/// transaction id. A missing status settles as completed.
#[derive(Debug, Deserialize)]
struct MockWebhook {
    external_id: Option<String>,
    transaction_id: Option<i64>,
    status: Option<String>,
    amount: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct MockAdapter {
    secret: Secret<String>,
    base_url: String,
    enabled: bool,
}

impl MockAdapter {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret, base_url: MOCK_BASE_URL.into(), enabled: true }
    }

    /// The adapter deployed when mock mode is off. A stray or malicious delivery aimed at the
    /// mock endpoint must not be able to settle real transactions, so every call is refused.
    pub fn disabled() -> Self {
        Self { secret: Secret::default(), base_url: MOCK_BASE_URL.into(), enabled: false }
    }

    pub fn with_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = url.into();
        self
    }

    fn check_configured(&self) -> Result<(), ProviderError> {
        if !self.enabled || self.secret.reveal().is_empty() {
            return Err(ProviderError::NotConfigured(PaymentProviderType::Mock));
        }
        Ok(())
    }
}

impl PaymentAdapter for MockAdapter {
    fn provider(&self) -> PaymentProviderType {
        PaymentProviderType::Mock
    }

    fn signature_header(&self) -> &'static str {
        "X-Mock-Signature"
    }

    async fn create_payment(
        &self,
        transaction: &PaymentTransaction,
        order: &Order,
    ) -> Result<ProviderSession, ProviderError> {
        self.check_configured()?;
        let external_id = format!("mock_{}", transaction.id);
        let payment_url = format!("{}/mock-payment/{}", self.base_url, transaction.id);
        let payment_data = json!({
            "transaction_id": transaction.id,
            "amount": transaction.amount.value(),
            "status": "success",
        });
        info!("🪙️ Mock payment session {external_id} opened for order {}", order.id);
        Ok(ProviderSession { external_id, payment_url: Some(payment_url), payment_data: Some(payment_data) })
    }

    async fn verify_payment(&self, external_id: &str) -> Result<ProviderVerification, ProviderError> {
        self.check_configured()?;
        debug!("🪙️ Mock status poll for {external_id}: reporting completed");
        Ok(ProviderVerification { status: TransactionStatusType::Completed, amount: None })
    }

    fn normalize_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<NormalizedWebhookEvent, ProviderError> {
        self.check_configured()?;
        verify_webhook(&self.secret, body, signature)?;
        let payload = serde_json::from_slice::<MockWebhook>(body)
            .map_err(|e| ProviderError::InvalidPayload(PaymentProviderType::Mock, e.to_string()))?;
        let external_id = match (payload.external_id, payload.transaction_id) {
            (Some(id), _) => id,
            (None, Some(txid)) => format!("mock_{txid}"),
            (None, None) => {
                return Err(ProviderError::InvalidPayload(
                    PaymentProviderType::Mock,
                    "neither external_id nor transaction_id present".to_string(),
                ))
            },
        };
        let status = payload.status.unwrap_or_else(|| "completed".to_string());
        let new_status = match status.as_str() {
            "completed" | "success" => TransactionStatusType::Completed,
            "failed" => TransactionStatusType::Failed,
            "cancelled" => TransactionStatusType::Cancelled,
            other => {
                return Err(ProviderError::InvalidPayload(
                    PaymentProviderType::Mock,
                    format!("unhandled payment status '{other}'"),
                ))
            },
        };
        Ok(NormalizedWebhookEvent { external_id, new_status, amount: payload.amount.map(Money::from_tiyin) })
    }

    async fn refund_payment(&self, external_id: &str, amount: Option<Money>) -> Result<(), ProviderError> {
        self.check_configured()?;
        info!("🪙️ Mock refund for {external_id}, amount {amount:?}");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use fgp_common::Secret;

    use super::*;
    use crate::providers::sign_webhook;

    fn secret() -> Secret<String> {
        Secret::new("mock-secret".to_string())
    }

    #[test]
    fn transaction_id_maps_to_external_id() {
        let body = br#"{"transaction_id":42}"#;
        let sig = sign_webhook(&secret(), body);
        let event = MockAdapter::new(secret()).normalize_webhook(body, Some(&sig)).unwrap();
        assert_eq!(event.external_id, "mock_42");
        assert_eq!(event.new_status, TransactionStatusType::Completed);
    }

    #[test]
    fn explicit_external_id_wins() {
        let body = br#"{"external_id":"mock_7","transaction_id":42,"status":"failed"}"#;
        let sig = sign_webhook(&secret(), body);
        let event = MockAdapter::new(secret()).normalize_webhook(body, Some(&sig)).unwrap();
        assert_eq!(event.external_id, "mock_7");
        assert_eq!(event.new_status, TransactionStatusType::Failed);
    }

    #[test]
    fn payload_without_any_reference_is_rejected() {
        let body = br#"{"status":"completed"}"#;
        let sig = sign_webhook(&secret(), body);
        let err = MockAdapter::new(secret()).normalize_webhook(body, Some(&sig)).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidPayload(PaymentProviderType::Mock, _)));
    }

    #[test]
    fn disabled_mock_refuses_signed_webhooks() {
        let body = br#"{"transaction_id":42}"#;
        let sig = sign_webhook(&secret(), body);
        let err = MockAdapter::disabled().normalize_webhook(body, Some(&sig)).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(PaymentProviderType::Mock)));
    }
}
