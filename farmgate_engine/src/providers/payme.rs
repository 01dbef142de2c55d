//! Payme (checkout.paycom.uz) integration.

use fgp_common::{Money, Secret};
use log::debug;
use serde::Deserialize;
use serde_json::json;

use crate::{
    db_types::{Order, PaymentProviderType, PaymentTransaction, TransactionStatusType},
    fge_api::payment_objects::NormalizedWebhookEvent,
    providers::{verify_webhook, PaymentAdapter, ProviderError, ProviderSession, ProviderVerification},
};

pub const PAYME_CHECKOUT_URL: &str = "https://checkout.paycom.uz";

// Payment state codes as Payme reports them in webhook notifications.
const STATE_PAID: i64 = 2;
const STATE_CANCELLED: i64 = -1;
const STATE_CANCELLED_AFTER_PAID: i64 = -2;

#[derive(Debug, Deserialize)]
struct PaymeWebhook {
    external_id: String,
    state: i64,
    // Amount in tiyin, when the notification carries one.
    amount: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct PaymeAdapter {
    merchant_id: String,
    secret: Secret<String>,
    checkout_url: String,
}

impl PaymeAdapter {
    pub fn new<S: Into<String>>(merchant_id: S, secret: Secret<String>) -> Self {
        Self { merchant_id: merchant_id.into(), secret, checkout_url: PAYME_CHECKOUT_URL.into() }
    }

    /// An adapter with no credentials. Every call fails with [`ProviderError::NotConfigured`].
    pub fn unconfigured() -> Self {
        Self::new("", Secret::default())
    }

    pub fn with_checkout_url<S: Into<String>>(mut self, url: S) -> Self {
        self.checkout_url = url.into();
        self
    }

    fn check_configured(&self) -> Result<(), ProviderError> {
        if self.merchant_id.is_empty() || self.secret.reveal().is_empty() {
            return Err(ProviderError::NotConfigured(PaymentProviderType::Payme));
        }
        Ok(())
    }
}

impl PaymentAdapter for PaymeAdapter {
    fn provider(&self) -> PaymentProviderType {
        PaymentProviderType::Payme
    }

    fn signature_header(&self) -> &'static str {
        "X-Payme-Signature"
    }

    async fn create_payment(
        &self,
        transaction: &PaymentTransaction,
        order: &Order,
    ) -> Result<ProviderSession, ProviderError> {
        self.check_configured()?;
        let external_id = format!("payme_{}", transaction.id);
        let payment_url = format!("{}/payment/{}", self.checkout_url, transaction.id);
        let payment_data = json!({
            "merchant_id": self.merchant_id,
            "amount": transaction.amount.value(),
            "account": { "order_id": order.id },
        });
        debug!("💰️ Payme session {external_id} opened for order {}", order.id);
        Ok(ProviderSession { external_id, payment_url: Some(payment_url), payment_data: Some(payment_data) })
    }

    async fn verify_payment(&self, external_id: &str) -> Result<ProviderVerification, ProviderError> {
        self.check_configured()?;
        // The merchant API status poll is not wired up, so the provider-side state is unknown.
        debug!("💰️ Payme status poll for {external_id}: reporting pending");
        Ok(ProviderVerification { status: TransactionStatusType::Pending, amount: None })
    }

    fn normalize_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<NormalizedWebhookEvent, ProviderError> {
        self.check_configured()?;
        verify_webhook(&self.secret, body, signature)?;
        let payload = serde_json::from_slice::<PaymeWebhook>(body)
            .map_err(|e| ProviderError::InvalidPayload(PaymentProviderType::Payme, e.to_string()))?;
        let new_status = match payload.state {
            STATE_PAID => TransactionStatusType::Completed,
            STATE_CANCELLED | STATE_CANCELLED_AFTER_PAID => TransactionStatusType::Cancelled,
            other => {
                return Err(ProviderError::InvalidPayload(
                    PaymentProviderType::Payme,
                    format!("unhandled payment state {other}"),
                ))
            },
        };
        Ok(NormalizedWebhookEvent {
            external_id: payload.external_id,
            new_status,
            amount: payload.amount.map(Money::from_tiyin),
        })
    }

    async fn refund_payment(&self, external_id: &str, _amount: Option<Money>) -> Result<(), ProviderError> {
        self.check_configured()?;
        // Refunds go through the Payme merchant cabinet; the API does not expose them to us.
        Err(ProviderError::Rejected(
            PaymentProviderType::Payme,
            format!("refund of {external_id} must be issued from the merchant cabinet"),
        ))
    }
}

#[cfg(test)]
mod test {
    use fgp_common::Secret;

    use super::*;
    use crate::providers::sign_webhook;

    fn adapter() -> PaymeAdapter {
        PaymeAdapter::new("merchant-1", Secret::new("payme-secret".to_string()))
    }

    #[test]
    fn paid_state_normalizes_to_completed() {
        let body = br#"{"external_id":"payme_7","state":2,"amount":1125000}"#;
        let sig = sign_webhook(&Secret::new("payme-secret".to_string()), body);
        let event = adapter().normalize_webhook(body, Some(&sig)).unwrap();
        assert_eq!(event.external_id, "payme_7");
        assert_eq!(event.new_status, TransactionStatusType::Completed);
        assert_eq!(event.amount.unwrap().value(), 1_125_000);
    }

    #[test]
    fn cancelled_states_normalize_to_cancelled() {
        for state in [-1, -2] {
            let body = format!(r#"{{"external_id":"payme_7","state":{state}}}"#);
            let sig = sign_webhook(&Secret::new("payme-secret".to_string()), body.as_bytes());
            let event = adapter().normalize_webhook(body.as_bytes(), Some(&sig)).unwrap();
            assert_eq!(event.new_status, TransactionStatusType::Cancelled);
        }
    }

    #[test]
    fn created_state_is_not_settleable() {
        let body = br#"{"external_id":"payme_7","state":1}"#;
        let sig = sign_webhook(&Secret::new("payme-secret".to_string()), body);
        let err = adapter().normalize_webhook(body, Some(&sig)).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidPayload(PaymentProviderType::Payme, _)));
    }

    #[test]
    fn unsigned_webhook_is_rejected_before_parsing() {
        let err = adapter().normalize_webhook(b"not even json", None).unwrap_err();
        assert!(matches!(err, ProviderError::MissingSignature));
    }

    #[test]
    fn unconfigured_adapter_refuses_everything() {
        let err = PaymeAdapter::unconfigured().normalize_webhook(b"{}", Some("00")).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(PaymentProviderType::Payme)));
    }
}
