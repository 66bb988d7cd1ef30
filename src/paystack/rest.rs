// Paystack REST client
// Implements the two endpoints the booking flow needs, with minor-unit
// enforcement and the booking reference as the correlation key.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::future::Future;
use tracing::{info, instrument, warn};

use crate::paystack::errors::{is_transient, GatewayError};
use crate::paystack::types::{
    require_positive_minor_units, ApiEnvelope, AuthorizedCheckout, InitializeData,
    InitializeRequest, TransactionStatus, VerifiedTransaction, VerifyData,
};

#[derive(Clone)]
pub struct PaystackRestClient {
    pub(crate) http: Client,
    pub(crate) api_base: String,
    pub(crate) secret_key: String,
    // Backoff knobs for the single transient retry on initialize
    pub(crate) base_delay_ms: u64,
    pub(crate) max_delay_ms: u64,
}

impl PaystackRestClient {
    pub fn new(http: Client, api_base: String, secret_key: String) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }

    fn map_error(status: StatusCode, body: &str) -> GatewayError {
        if let Ok(env) = serde_json::from_str::<ApiEnvelope>(body) {
            GatewayError::Api {
                message: env.message,
                http_status: Some(status.as_u16()),
            }
        } else {
            GatewayError::Http(format!("status={} body={}", status.as_u16(), body))
        }
    }

    async fn with_retries<F, Fut, T>(
        &self,
        desc: &str,
        max_retries: u32,
        mut op: F,
    ) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if !is_transient(&e) || attempt >= max_retries {
                        return Err(e);
                    }

                    // Backoff with full jitter
                    let cap = self.max_delay_ms.max(self.base_delay_ms);
                    let mut rng = SmallRng::from_entropy();
                    let delay_ms = if cap > self.base_delay_ms {
                        rng.gen_range(self.base_delay_ms..=cap)
                    } else {
                        self.base_delay_ms
                    };

                    warn!(
                        target: "paystack",
                        desc = %desc,
                        attempt = attempt + 1,
                        max_retries = max_retries,
                        next_delay_ms = delay_ms,
                        error = %e,
                        "retrying transient gateway error"
                    );

                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
            }
        }
    }

    // POST /transaction/initialize
    // The booking reference is attached verbatim; retried at most once on
    // transient failure.
    #[instrument(skip(self, req), fields(method = "POST", path = "/transaction/initialize", reference = %req.reference))]
    pub async fn initialize_transaction(
        &self,
        req: &InitializeRequest,
    ) -> Result<AuthorizedCheckout, GatewayError> {
        if self.secret_key.is_empty() {
            return Err(GatewayError::MissingCredentials);
        }
        require_positive_minor_units(req.amount_minor)
            .map_err(|_| GatewayError::Precondition("amount must be positive minor units"))?;

        let mut body = json!({
            "email": req.email,
            "amount": req.amount_minor,
            "currency": req.currency,
            "reference": req.reference,
        });
        if let Some(cb) = &req.callback_url {
            body["callback_url"] = json!(cb);
        }
        if !req.metadata.is_empty() {
            body["metadata"] = json!(req.metadata);
        }

        info!(
            target: "paystack",
            method = "POST",
            path = "/transaction/initialize",
            amount_minor = req.amount_minor,
            currency = %req.currency,
            reference = %req.reference,
            "gateway request"
        );

        let req_builder = || {
            let url = format!("{}/transaction/initialize", self.api_base);
            let req = self.http.post(url).bearer_auth(&self.secret_key).json(&body);
            async move {
                let resp = req
                    .send()
                    .await
                    .map_err(|e| GatewayError::Http(e.to_string()))?;
                let status = resp.status();
                let text = resp
                    .text()
                    .await
                    .map_err(|e| GatewayError::Decode(e.to_string()))?;
                if !status.is_success() {
                    return Err(Self::map_error(status, &text));
                }
                let env: ApiEnvelope = serde_json::from_str(&text)
                    .map_err(|e| GatewayError::Decode(e.to_string()))?;
                if !env.status {
                    return Err(GatewayError::Api {
                        message: env.message,
                        http_status: Some(status.as_u16()),
                    });
                }
                let data: InitializeData = env
                    .data
                    .ok_or_else(|| GatewayError::Decode("missing data in envelope".into()))
                    .and_then(|d| {
                        serde_json::from_value(d).map_err(|e| GatewayError::Decode(e.to_string()))
                    })?;
                Ok(AuthorizedCheckout {
                    authorization_url: data.authorization_url,
                    access_code: data.access_code,
                    reference: data.reference,
                })
            }
        };
        self.with_retries("initialize_transaction", 1, req_builder).await
    }

    // GET /transaction/verify/:reference
    // Never auto-retried: verification must stay explicit and re-triggerable
    // by an operator.
    #[instrument(skip(self), fields(method = "GET", path = "/transaction/verify", reference = %reference))]
    pub async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<VerifiedTransaction, GatewayError> {
        if self.secret_key.is_empty() {
            return Err(GatewayError::MissingCredentials);
        }

        info!(
            target: "paystack",
            method = "GET",
            path = "/transaction/verify",
            reference = %reference,
            "gateway request"
        );

        let url = format!("{}/transaction/verify/{}", self.api_base, reference);
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        if !status.is_success() {
            return Err(Self::map_error(status, &text));
        }
        let env: ApiEnvelope =
            serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))?;
        if !env.status {
            return Err(GatewayError::Api {
                message: env.message,
                http_status: Some(status.as_u16()),
            });
        }
        let raw = env
            .data
            .ok_or_else(|| GatewayError::Decode("missing data in envelope".into()))?;
        let data: VerifyData = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        Ok(VerifiedTransaction {
            reference: data.reference.unwrap_or_else(|| reference.to_string()),
            status: TransactionStatus::from(data.status.as_str()),
            amount_minor: data.amount,
            currency: data.currency,
            raw,
        })
    }
}
