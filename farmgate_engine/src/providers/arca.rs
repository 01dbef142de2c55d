//! Arca (arca.uz) integration.

use fgp_common::{Money, Secret};
use log::debug;
use serde::Deserialize;
use serde_json::json;

use crate::{
    db_types::{Order, PaymentProviderType, PaymentTransaction, TransactionStatusType},
    fge_api::payment_objects::NormalizedWebhookEvent,
    providers::{verify_webhook, PaymentAdapter, ProviderError, ProviderSession, ProviderVerification},
};

pub const ARCA_API_URL: &str = "https://arca.uz/api";

/// The PaymentResult callback.
#[derive(Debug, Deserialize)]
struct ArcaWebhook {
    external_id: String,
    status: String,
    // Amount in tiyin, when the callback carries one.
    amount: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ArcaAdapter {
    merchant_id: String,
    secret: Secret<String>,
    // TLS client certificate for the merchant API; unused until the live calls are wired up.
    certificate_path: Option<String>,
    base_url: String,
}

impl ArcaAdapter {
    pub fn new<S: Into<String>>(merchant_id: S, secret: Secret<String>) -> Self {
        Self { merchant_id: merchant_id.into(), secret, certificate_path: None, base_url: ARCA_API_URL.into() }
    }

    /// An adapter with no credentials. Every call fails with [`ProviderError::NotConfigured`].
    pub fn unconfigured() -> Self {
        Self::new("", Secret::default())
    }

    pub fn with_certificate_path<S: Into<String>>(mut self, path: S) -> Self {
        self.certificate_path = Some(path.into());
        self
    }

    pub fn with_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = url.into();
        self
    }

    fn check_configured(&self) -> Result<(), ProviderError> {
        if self.merchant_id.is_empty() || self.secret.reveal().is_empty() {
            return Err(ProviderError::NotConfigured(PaymentProviderType::Arca));
        }
        Ok(())
    }
}

impl PaymentAdapter for ArcaAdapter {
    fn provider(&self) -> PaymentProviderType {
        PaymentProviderType::Arca
    }

    fn signature_header(&self) -> &'static str {
        "X-Arca-Signature"
    }

    async fn create_payment(
        &self,
        transaction: &PaymentTransaction,
        order: &Order,
    ) -> Result<ProviderSession, ProviderError> {
        self.check_configured()?;
        let external_id = format!("arca_{}", transaction.id);
        let payment_url = format!("{}/payment/{}", self.base_url, transaction.id);
        let payment_data = json!({
            "merchant_id": self.merchant_id,
            "amount": transaction.amount.value(),
        });
        debug!("💰️ Arca session {external_id} opened for order {}", order.id);
        Ok(ProviderSession { external_id, payment_url: Some(payment_url), payment_data: Some(payment_data) })
    }

    async fn verify_payment(&self, external_id: &str) -> Result<ProviderVerification, ProviderError> {
        self.check_configured()?;
        debug!("💰️ Arca status poll for {external_id}: reporting pending");
        Ok(ProviderVerification { status: TransactionStatusType::Pending, amount: None })
    }

    fn normalize_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<NormalizedWebhookEvent, ProviderError> {
        self.check_configured()?;
        verify_webhook(&self.secret, body, signature)?;
        let payload = serde_json::from_slice::<ArcaWebhook>(body)
            .map_err(|e| ProviderError::InvalidPayload(PaymentProviderType::Arca, e.to_string()))?;
        let new_status = match payload.status.as_str() {
            "success" => TransactionStatusType::Completed,
            "failed" | "declined" => TransactionStatusType::Failed,
            "cancelled" => TransactionStatusType::Cancelled,
            other => {
                return Err(ProviderError::InvalidPayload(
                    PaymentProviderType::Arca,
                    format!("unhandled payment result '{other}'"),
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
        Err(ProviderError::Rejected(
            PaymentProviderType::Arca,
            format!("refund of {external_id} must be issued through the acquiring bank"),
        ))
    }
}

#[cfg(test)]
mod test {
    use fgp_common::Secret;

    use super::*;
    use crate::providers::sign_webhook;

    fn adapter() -> ArcaAdapter {
        ArcaAdapter::new("arca-m", Secret::new("arca-secret".to_string()))
    }

    #[test]
    fn success_normalizes_to_completed() {
        let body = br#"{"external_id":"arca_11","status":"success","amount":980000}"#;
        let sig = sign_webhook(&Secret::new("arca-secret".to_string()), body);
        let event = adapter().normalize_webhook(body, Some(&sig)).unwrap();
        assert_eq!(event.new_status, TransactionStatusType::Completed);
    }

    #[test]
    fn declined_normalizes_to_failed() {
        let body = br#"{"external_id":"arca_11","status":"declined"}"#;
        let sig = sign_webhook(&Secret::new("arca-secret".to_string()), body);
        let event = adapter().normalize_webhook(body, Some(&sig)).unwrap();
        assert_eq!(event.new_status, TransactionStatusType::Failed);
    }

    #[test]
    fn unknown_result_is_a_typed_error() {
        let body = br#"{"external_id":"arca_11","status":"on_hold"}"#;
        let sig = sign_webhook(&Secret::new("arca-secret".to_string()), body);
        let err = adapter().normalize_webhook(body, Some(&sig)).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidPayload(PaymentProviderType::Arca, _)));
    }
}
