//! Payment provider adapters.
//!
//! Each provider the marketplace settles through (Payme, Click, Arca, and the mock used in
//! development) implements [`PaymentAdapter`]. The adapters own everything provider-specific:
//! session construction, webhook payload shapes, and signature verification. Shared code never
//! branches on the provider name; it talks to the trait and lets [`PaymentAdapters`] pick the
//! implementation.
//!
//! Webhook bodies are untrusted input. An adapter must authenticate the raw bytes (HMAC-SHA256
//! under the provider's shared secret, delivered hex-encoded in the provider's signature header)
//! before it parses anything out of them.

mod arca;
mod click;
mod mock;
mod payme;

pub use arca::ArcaAdapter;
pub use click::ClickAdapter;
use fgp_common::{Money, Secret};
use hmac::{Hmac, Mac};
use log::warn;
pub use mock::MockAdapter;
pub use payme::PaymeAdapter;
use sha2::Sha256;
use thiserror::Error;

use crate::{
    db_types::{Order, PaymentProviderType, PaymentTransaction, TransactionStatusType},
    fge_api::payment_objects::NormalizedWebhookEvent,
};

//--------------------------------------     Errors     ---------------------------------------

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("{0} is not configured on this deployment")]
    NotConfigured(PaymentProviderType),
    #[error("Malformed {0} payload: {1}")]
    InvalidPayload(PaymentProviderType, String),
    #[error("The webhook did not carry a signature header")]
    MissingSignature,
    #[error("The webhook signature does not match the payload")]
    InvalidSignature,
    #[error("{0} did not respond within {1} seconds")]
    Timeout(PaymentProviderType, u64),
    #[error("{0} rejected the request: {1}")]
    Rejected(PaymentProviderType, String),
}

//-----------------------------------     Data objects     ------------------------------------

/// What a provider hands back when a new payment session is opened.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    /// The provider-side reference for this payment. Webhooks are correlated on this value.
    pub external_id: String,
    /// Where to send the buyer to complete the payment, if the provider uses a hosted page.
    pub payment_url: Option<String>,
    /// Opaque provider metadata the client may need (merchant ids, form fields and so on).
    pub payment_data: Option<serde_json::Value>,
}

/// A provider's answer to a status query for an existing payment session.
#[derive(Debug, Clone)]
pub struct ProviderVerification {
    pub status: TransactionStatusType,
    pub amount: Option<Money>,
}

//----------------------------------     Adapter trait     ------------------------------------

/// The capability set every payment provider integration offers.
///
/// `create_payment`, `verify_payment` and `refund_payment` talk (or would talk) to the provider
/// and are async. `normalize_webhook` is pure: it authenticates the raw bytes and maps the
/// provider's payload into a [`NormalizedWebhookEvent`], with no provider IO.
#[allow(async_fn_in_trait)]
pub trait PaymentAdapter {
    fn provider(&self) -> PaymentProviderType;

    /// The HTTP header this provider delivers its hex HMAC-SHA256 webhook signature in.
    fn signature_header(&self) -> &'static str;

    /// Open a payment session for the transaction and return the provider-side references.
    async fn create_payment(
        &self,
        transaction: &PaymentTransaction,
        order: &Order,
    ) -> Result<ProviderSession, ProviderError>;

    /// Query the provider for the current state of a payment session.
    async fn verify_payment(&self, external_id: &str) -> Result<ProviderVerification, ProviderError>;

    /// Authenticate a raw webhook delivery and normalize it.
    ///
    /// The signature is verified over the exact bytes received, before any parsing. Every
    /// failure mode (missing or bad signature, malformed body, a state code the adapter does not
    /// settle on) is a typed error, never a panic.
    fn normalize_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<NormalizedWebhookEvent, ProviderError>;

    /// Ask the provider to return funds for a completed payment. `None` refunds the full amount.
    async fn refund_payment(&self, external_id: &str, amount: Option<Money>) -> Result<(), ProviderError>;
}

//--------------------------------     Signature helpers     ----------------------------------

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 tag over `body`. Exposed so tests and operator tooling can produce
/// webhook signatures that [`verify_webhook`] accepts.
pub fn sign_webhook(secret: &Secret<String>, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.reveal().as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify the hex HMAC-SHA256 signature over the raw webhook bytes. Comparison happens on the
/// decoded tag in constant time.
pub(crate) fn verify_webhook(secret: &Secret<String>, body: &[u8], signature: Option<&str>) -> Result<(), ProviderError> {
    let signature = signature.ok_or(ProviderError::MissingSignature)?;
    let tag = hex::decode(signature.trim()).map_err(|_| ProviderError::InvalidSignature)?;
    let mut mac = HmacSha256::new_from_slice(secret.reveal().as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    mac.verify_slice(&tag).map_err(|_| ProviderError::InvalidSignature)
}

//---------------------------------     Adapter registry     ----------------------------------

/// Runtime dispatch over the concrete adapters. The async trait methods keep [`PaymentAdapter`]
/// out of `dyn` territory, so the registry hands out this enum instead of boxed trait objects.
#[derive(Debug, Clone)]
pub enum ActiveAdapter {
    Payme(PaymeAdapter),
    Click(ClickAdapter),
    Arca(ArcaAdapter),
    Mock(MockAdapter),
}

impl PaymentAdapter for ActiveAdapter {
    fn provider(&self) -> PaymentProviderType {
        match self {
            ActiveAdapter::Payme(a) => a.provider(),
            ActiveAdapter::Click(a) => a.provider(),
            ActiveAdapter::Arca(a) => a.provider(),
            ActiveAdapter::Mock(a) => a.provider(),
        }
    }

    fn signature_header(&self) -> &'static str {
        match self {
            ActiveAdapter::Payme(a) => a.signature_header(),
            ActiveAdapter::Click(a) => a.signature_header(),
            ActiveAdapter::Arca(a) => a.signature_header(),
            ActiveAdapter::Mock(a) => a.signature_header(),
        }
    }

    async fn create_payment(
        &self,
        transaction: &PaymentTransaction,
        order: &Order,
    ) -> Result<ProviderSession, ProviderError> {
        match self {
            ActiveAdapter::Payme(a) => a.create_payment(transaction, order).await,
            ActiveAdapter::Click(a) => a.create_payment(transaction, order).await,
            ActiveAdapter::Arca(a) => a.create_payment(transaction, order).await,
            ActiveAdapter::Mock(a) => a.create_payment(transaction, order).await,
        }
    }

    async fn verify_payment(&self, external_id: &str) -> Result<ProviderVerification, ProviderError> {
        match self {
            ActiveAdapter::Payme(a) => a.verify_payment(external_id).await,
            ActiveAdapter::Click(a) => a.verify_payment(external_id).await,
            ActiveAdapter::Arca(a) => a.verify_payment(external_id).await,
            ActiveAdapter::Mock(a) => a.verify_payment(external_id).await,
        }
    }

    fn normalize_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<NormalizedWebhookEvent, ProviderError> {
        match self {
            ActiveAdapter::Payme(a) => a.normalize_webhook(body, signature),
            ActiveAdapter::Click(a) => a.normalize_webhook(body, signature),
            ActiveAdapter::Arca(a) => a.normalize_webhook(body, signature),
            ActiveAdapter::Mock(a) => a.normalize_webhook(body, signature),
        }
    }

    async fn refund_payment(&self, external_id: &str, amount: Option<Money>) -> Result<(), ProviderError> {
        match self {
            ActiveAdapter::Payme(a) => a.refund_payment(external_id, amount).await,
            ActiveAdapter::Click(a) => a.refund_payment(external_id, amount).await,
            ActiveAdapter::Arca(a) => a.refund_payment(external_id, amount).await,
            ActiveAdapter::Mock(a) => a.refund_payment(external_id, amount).await,
        }
    }
}

/// The configured adapter set. Built once at startup and shared by the payment flows.
///
/// Mock mode is an explicit deployment decision, never a silent fallback: when `use_mock` is set
/// every provider tag resolves to the mock adapter, and when it is not, the mock adapter is
/// disabled entirely so a misdirected webhook cannot settle real transactions for free.
#[derive(Debug, Clone)]
pub struct PaymentAdapters {
    payme: PaymeAdapter,
    click: ClickAdapter,
    arca: ArcaAdapter,
    mock: MockAdapter,
    use_mock: bool,
}

impl PaymentAdapters {
    pub fn new(payme: PaymeAdapter, click: ClickAdapter, arca: ArcaAdapter, mock: MockAdapter, use_mock: bool) -> Self {
        if use_mock {
            warn!(
                "🪙️ Payment providers are running in MOCK mode. Every provider resolves to the mock adapter and no \
                 real money moves."
            );
        }
        Self { payme, click, arca, mock, use_mock }
    }

    /// An adapter set for tests and local development. Every provider resolves to a mock with
    /// the given secret.
    pub fn mock_only(secret: Secret<String>) -> Self {
        Self::new(
            PaymeAdapter::unconfigured(),
            ClickAdapter::unconfigured(),
            ArcaAdapter::unconfigured(),
            MockAdapter::new(secret),
            true,
        )
    }

    pub fn is_mock_mode(&self) -> bool {
        self.use_mock
    }

    /// Resolve the adapter for a provider tag.
    pub fn get(&self, provider: PaymentProviderType) -> ActiveAdapter {
        if self.use_mock {
            return ActiveAdapter::Mock(self.mock.clone());
        }
        match provider {
            PaymentProviderType::Payme => ActiveAdapter::Payme(self.payme.clone()),
            PaymentProviderType::Click => ActiveAdapter::Click(self.click.clone()),
            PaymentProviderType::Arca => ActiveAdapter::Arca(self.arca.clone()),
            PaymentProviderType::Mock => ActiveAdapter::Mock(self.mock.clone()),
        }
    }
}

#[cfg(test)]
mod test {
    use fgp_common::Secret;

    use super::{sign_webhook, verify_webhook, ProviderError};

    #[test]
    fn signatures_round_trip() {
        let secret = Secret::new("s3kr1t".to_string());
        let body = br#"{"external_id":"mock_1","status":"completed"}"#;
        let sig = sign_webhook(&secret, body);
        assert!(verify_webhook(&secret, body, Some(&sig)).is_ok());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let secret = Secret::new("s3kr1t".to_string());
        let sig = sign_webhook(&secret, b"original");
        let err = verify_webhook(&secret, b"tampered", Some(&sig)).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSignature));
    }

    #[test]
    fn missing_signature_is_rejected() {
        let secret = Secret::new("s3kr1t".to_string());
        let err = verify_webhook(&secret, b"anything", None).unwrap_err();
        assert!(matches!(err, ProviderError::MissingSignature));
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        let secret = Secret::new("s3kr1t".to_string());
        let err = verify_webhook(&secret, b"anything", Some("not-hex!")).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSignature));
    }
}
