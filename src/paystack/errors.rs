// Paystack-specific error types and mappings

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway credentials not configured")]
    MissingCredentials,
    #[error("http error: {0}")]
    Http(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("gateway rejected request: {message} (http_status={http_status:?})")]
    Api {
        message: String,
        http_status: Option<u16>,
    },
    #[error("precondition failed: {0}")]
    Precondition(&'static str),
}

// Helper indicating whether an error is likely transient (network/timeout or 5xx)
pub fn is_transient(e: &GatewayError) -> bool {
    match e {
        GatewayError::Http(_) => true,
        GatewayError::Api {
            http_status: Some(s),
            ..
        } => (500..600).contains(s),
        _ => false,
    }
}

// Webhook-specific errors
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("missing signature header")]
    MissingSignature,
    #[error("missing webhook secret")]
    MissingSecret,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("event processing failed: {0}")]
    ProcessingFailed(String),
}

impl WebhookError {
    /// Map webhook error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookError::InvalidSignature(_) => 401,
            WebhookError::MissingSignature => 401,
            WebhookError::MissingSecret => 500,
            WebhookError::MalformedPayload(_) => 400,
            WebhookError::ProcessingFailed(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(is_transient(&GatewayError::Http("timed out".into())));
        assert!(is_transient(&GatewayError::Api {
            message: "server error".into(),
            http_status: Some(503),
        }));
        assert!(!is_transient(&GatewayError::Api {
            message: "invalid key".into(),
            http_status: Some(401),
        }));
        assert!(!is_transient(&GatewayError::Precondition("bad amount")));
        assert!(!is_transient(&GatewayError::MissingCredentials));
    }
}
