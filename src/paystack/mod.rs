// Paystack provider module

pub mod errors;
pub mod rest;
pub mod types;
pub mod webhook;

use async_trait::async_trait;
use reqwest::Client;

use self::errors::GatewayError;
use self::types::{AuthorizedCheckout, InitializeRequest, VerifiedTransaction};
use crate::settings::PaystackSettings;

/// The seam between the booking flow and the hosted payment provider.
///
/// `initialize` opens a hosted checkout for a booking reference;
/// `verify` fetches the provider's ground truth for that reference.
/// The reconciler depends on this trait, never on the concrete client.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(
        &self,
        req: InitializeRequest,
    ) -> Result<AuthorizedCheckout, GatewayError>;

    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError>;
}

#[derive(Clone)]
pub struct PaystackProvider {
    pub(crate) rest: rest::PaystackRestClient,
}

impl PaystackProvider {
    // Build reqwest client with rustls and timeout from cfg.
    pub fn new(cfg: PaystackSettings) -> Result<Self, GatewayError> {
        if cfg.secret_key.is_empty() {
            return Err(GatewayError::MissingCredentials);
        }
        let timeout = std::time::Duration::from_millis(if cfg.timeout_ms > 0 {
            cfg.timeout_ms
        } else {
            15_000
        });
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let rest = rest::PaystackRestClient::new(http, cfg.api_base, cfg.secret_key);

        Ok(Self { rest })
    }
}

#[async_trait]
impl PaymentGateway for PaystackProvider {
    async fn initialize(
        &self,
        req: InitializeRequest,
    ) -> Result<AuthorizedCheckout, GatewayError> {
        self.rest.initialize_transaction(&req).await
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError> {
        self.rest.verify_transaction(reference).await
    }
}
