//! Click (api.click.uz) integration.

use fgp_common::{Money, Secret};
use log::debug;
use serde::Deserialize;
use serde_json::json;

use crate::{
    db_types::{Order, PaymentProviderType, PaymentTransaction, TransactionStatusType},
    fge_api::payment_objects::NormalizedWebhookEvent,
    providers::{verify_webhook, PaymentAdapter, ProviderError, ProviderSession, ProviderVerification},
};

pub const CLICK_API_URL: &str = "https://api.click.uz";

/// The merchant/complete callback. `error == 0` is a successful payment; anything else is the
/// provider reporting a failure code.
#[derive(Debug, Deserialize)]
struct ClickWebhook {
    external_id: String,
    error: i64,
    error_note: Option<String>,
    // Amount in tiyin, when the callback carries one.
    amount: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ClickAdapter {
    merchant_id: String,
    service_id: String,
    secret: Secret<String>,
    base_url: String,
}

impl ClickAdapter {
    pub fn new<S1, S2>(merchant_id: S1, service_id: S2, secret: Secret<String>) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            merchant_id: merchant_id.into(),
            service_id: service_id.into(),
            secret,
            base_url: CLICK_API_URL.into(),
        }
    }

    /// An adapter with no credentials. Every call fails with [`ProviderError::NotConfigured`].
    pub fn unconfigured() -> Self {
        Self::new("", "", Secret::default())
    }

    pub fn with_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = url.into();
        self
    }

    fn check_configured(&self) -> Result<(), ProviderError> {
        if self.merchant_id.is_empty() || self.service_id.is_empty() || self.secret.reveal().is_empty() {
            return Err(ProviderError::NotConfigured(PaymentProviderType::Click));
        }
        Ok(())
    }
}

impl PaymentAdapter for ClickAdapter {
    fn provider(&self) -> PaymentProviderType {
        PaymentProviderType::Click
    }

    fn signature_header(&self) -> &'static str {
        "X-Click-Signature"
    }

    async fn create_payment(
        &self,
        transaction: &PaymentTransaction,
        order: &Order,
    ) -> Result<ProviderSession, ProviderError> {
        self.check_configured()?;
        let external_id = format!("click_{}", transaction.id);
        let payment_url = format!("{}/payment/{}", self.base_url, transaction.id);
        let payment_data = json!({
            "merchant_id": self.merchant_id,
            "service_id": self.service_id,
            "amount": transaction.amount.value(),
        });
        debug!("💰️ Click session {external_id} opened for order {}", order.id);
        Ok(ProviderSession { external_id, payment_url: Some(payment_url), payment_data: Some(payment_data) })
    }

    async fn verify_payment(&self, external_id: &str) -> Result<ProviderVerification, ProviderError> {
        self.check_configured()?;
        debug!("💰️ Click status poll for {external_id}: reporting pending");
        Ok(ProviderVerification { status: TransactionStatusType::Pending, amount: None })
    }

    fn normalize_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<NormalizedWebhookEvent, ProviderError> {
        self.check_configured()?;
        verify_webhook(&self.secret, body, signature)?;
        let payload = serde_json::from_slice::<ClickWebhook>(body)
            .map_err(|e| ProviderError::InvalidPayload(PaymentProviderType::Click, e.to_string()))?;
        let new_status = if payload.error == 0 {
            TransactionStatusType::Completed
        } else {
            let note = payload.error_note.unwrap_or_default();
            debug!("💰️ Click reported error {} for {}: {note}", payload.error, payload.external_id);
            TransactionStatusType::Failed
        };
        Ok(NormalizedWebhookEvent {
            external_id: payload.external_id,
            new_status,
            amount: payload.amount.map(Money::from_tiyin),
        })
    }

    async fn refund_payment(&self, external_id: &str, _amount: Option<Money>) -> Result<(), ProviderError> {
        self.check_configured()?;
        Err(ProviderError::Rejected(
            PaymentProviderType::Click,
            format!("refund of {external_id} must be issued from the merchant cabinet"),
        ))
    }
}

#[cfg(test)]
mod test {
    use fgp_common::Secret;

    use super::*;
    use crate::providers::sign_webhook;

    fn adapter() -> ClickAdapter {
        ClickAdapter::new("m-1", "svc-9", Secret::new("click-secret".to_string()))
    }

    #[test]
    fn zero_error_code_normalizes_to_completed() {
        let body = br#"{"external_id":"click_3","error":0,"amount":50000}"#;
        let sig = sign_webhook(&Secret::new("click-secret".to_string()), body);
        let event = adapter().normalize_webhook(body, Some(&sig)).unwrap();
        assert_eq!(event.external_id, "click_3");
        assert_eq!(event.new_status, TransactionStatusType::Completed);
    }

    #[test]
    fn nonzero_error_code_normalizes_to_failed() {
        let body = br#"{"external_id":"click_3","error":-5017,"error_note":"Insufficient funds"}"#;
        let sig = sign_webhook(&Secret::new("click-secret".to_string()), body);
        let event = adapter().normalize_webhook(body, Some(&sig)).unwrap();
        assert_eq!(event.new_status, TransactionStatusType::Failed);
        assert!(event.amount.is_none());
    }

    #[test]
    fn garbage_body_is_a_typed_error() {
        let body = b"\x00\x01\x02";
        let sig = sign_webhook(&Secret::new("click-secret".to_string()), body);
        let err = adapter().normalize_webhook(body, Some(&sig)).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidPayload(PaymentProviderType::Click, _)));
    }
}
