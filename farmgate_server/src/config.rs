use std::{env, time::Duration};

use farmgate_engine::providers::{ArcaAdapter, ClickAdapter, MockAdapter, PaymentAdapters, PaymeAdapter};
use fgp_common::Secret;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::errors::ServerError;

const DEFAULT_FGP_HOST: &str = "127.0.0.1";
const DEFAULT_FGP_PORT: u16 = 8480;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
/// HS256 is only as strong as the secret; refuse anything shorter than this.
const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Seconds that in-flight requests get to finish when the server shuts down.
    pub shutdown_grace_secs: u64,
    pub auth: AuthConfig,
    /// Upper bound on any single call out to a payment provider.
    pub provider_timeout: Duration,
    pub payments: PaymentProviderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FGP_HOST.to_string(),
            port: DEFAULT_FGP_PORT,
            database_url: String::default(),
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
            auth: AuthConfig::default(),
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            payments: PaymentProviderConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("FGP_HOST").ok().unwrap_or_else(|| DEFAULT_FGP_HOST.into());
        let port = env::var("FGP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for FGP_PORT. {e} Using the default, {DEFAULT_FGP_PORT}, instead."
                    );
                    DEFAULT_FGP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_FGP_PORT);
        let database_url = env::var("FGP_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ FGP_DATABASE_URL is not set. Please set it to the URL for the marketplace database.");
            String::default()
        });
        let shutdown_grace_secs = env::var("FGP_SHUTDOWN_GRACE_SECS")
            .map(|s| {
                s.parse::<u64>().unwrap_or_else(|e| {
                    warn!("🪛️ Invalid configuration value for FGP_SHUTDOWN_GRACE_SECS. {e}");
                    DEFAULT_SHUTDOWN_GRACE_SECS
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS);
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to \
                 the default configuration."
            );
            AuthConfig::default()
        });
        let provider_timeout = env::var("FGP_PROVIDER_TIMEOUT_SECS")
            .map(|s| {
                s.parse::<u64>().unwrap_or_else(|e| {
                    warn!("🪛️ Invalid configuration value for FGP_PROVIDER_TIMEOUT_SECS. {e}");
                    DEFAULT_PROVIDER_TIMEOUT_SECS
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS);
        let payments = PaymentProviderConfig::from_env_or_default();
        Self {
            host,
            port,
            database_url,
            shutdown_grace_secs,
            auth,
            provider_timeout: Duration::from_secs(provider_timeout),
            payments,
        }
    }
}

//-------------------------------------------------  AuthConfig  ------------------------------------------------------

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The secret used to sign and verify access tokens (HS256).
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session, so every token \
             issued will die with the process. DO NOT operate on production like this. Set FGP_JWT_SECRET instead. \
             🚨️🚨️🚨️"
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(64).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("FGP_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [FGP_JWT_SECRET]")))?;
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ServerError::ConfigurationError(format!(
                "FGP_JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters"
            )));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}

//-------------------------------------------  PaymentProviderConfig  -------------------------------------------------

/// Credentials for the payment providers this deployment settles through.
///
/// Providers with missing credentials are built unconfigured; calls against them fail with a
/// clean 400 rather than at startup, so a deployment that only uses Payme does not have to
/// configure Click and Arca.
#[derive(Clone, Debug, Default)]
pub struct PaymentProviderConfig {
    /// When true, every provider tag resolves to the mock adapter and no real money moves.
    pub use_mock: bool,
    pub payme_merchant_id: Option<String>,
    pub payme_secret: Option<Secret<String>>,
    pub click_merchant_id: Option<String>,
    pub click_service_id: Option<String>,
    pub click_secret: Option<Secret<String>>,
    pub arca_merchant_id: Option<String>,
    pub arca_secret: Option<Secret<String>>,
    pub arca_cert_path: Option<String>,
    pub mock_secret: Option<Secret<String>>,
}

impl PaymentProviderConfig {
    pub fn from_env_or_default() -> Self {
        let use_mock = match env::var("FGP_PAYMENTS_MODE").map(|s| s.to_lowercase()) {
            Ok(s) if s == "mock" => true,
            Ok(s) if s == "live" => false,
            Ok(s) => {
                warn!("🪛️ '{s}' is not a valid value for FGP_PAYMENTS_MODE. Using 'live'.");
                false
            },
            Err(_) => false,
        };
        Self {
            use_mock,
            payme_merchant_id: env::var("FGP_PAYME_MERCHANT_ID").ok(),
            payme_secret: env::var("FGP_PAYME_SECRET").ok().map(Secret::new),
            click_merchant_id: env::var("FGP_CLICK_MERCHANT_ID").ok(),
            click_service_id: env::var("FGP_CLICK_SERVICE_ID").ok(),
            click_secret: env::var("FGP_CLICK_SECRET").ok().map(Secret::new),
            arca_merchant_id: env::var("FGP_ARCA_MERCHANT_ID").ok(),
            arca_secret: env::var("FGP_ARCA_SECRET").ok().map(Secret::new),
            arca_cert_path: env::var("FGP_ARCA_CERT_PATH").ok(),
            mock_secret: env::var("FGP_MOCK_SECRET").ok().map(Secret::new),
        }
    }

    /// Build the adapter registry the payment flows dispatch through.
    pub fn build_adapters(&self) -> PaymentAdapters {
        let payme = match (&self.payme_merchant_id, &self.payme_secret) {
            (Some(id), Some(secret)) => PaymeAdapter::new(id.clone(), secret.clone()),
            _ => {
                info!("🪛️ Payme credentials are not set. The Payme provider is unavailable.");
                PaymeAdapter::unconfigured()
            },
        };
        let click = match (&self.click_merchant_id, &self.click_service_id, &self.click_secret) {
            (Some(id), Some(service), Some(secret)) => ClickAdapter::new(id.clone(), service.clone(), secret.clone()),
            _ => {
                info!("🪛️ Click credentials are not set. The Click provider is unavailable.");
                ClickAdapter::unconfigured()
            },
        };
        let arca = match (&self.arca_merchant_id, &self.arca_secret) {
            (Some(id), Some(secret)) => {
                let adapter = ArcaAdapter::new(id.clone(), secret.clone());
                match &self.arca_cert_path {
                    Some(path) => adapter.with_certificate_path(path.clone()),
                    None => adapter,
                }
            },
            _ => {
                info!("🪛️ Arca credentials are not set. The Arca provider is unavailable.");
                ArcaAdapter::unconfigured()
            },
        };
        let mock = match (self.use_mock, &self.mock_secret) {
            (true, Some(secret)) => MockAdapter::new(secret.clone()),
            (true, None) => {
                warn!(
                    "🪛️ FGP_PAYMENTS_MODE is 'mock' but FGP_MOCK_SECRET is not set. The mock provider cannot \
                     authenticate webhooks and is disabled."
                );
                MockAdapter::disabled()
            },
            // Outside mock mode the mock adapter stays disabled so a stray webhook cannot settle
            // real transactions.
            (false, _) => MockAdapter::disabled(),
        };
        PaymentAdapters::new(payme, click, arca, mock, self.use_mock)
    }
}
