// Minimal Paystack DTOs and helper types
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmountError {
    #[error("amount must be a finite number")]
    NotFinite,
    #[error("amount must be positive")]
    NotPositive,
}

/// Convert an amount in major currency units to the gateway's minor unit.
/// The conversion is deterministic: multiply by 100, round half away from zero.
pub fn to_minor_units(amount_major: f64) -> Result<i64, AmountError> {
    if !amount_major.is_finite() {
        return Err(AmountError::NotFinite);
    }
    if amount_major <= 0.0 {
        return Err(AmountError::NotPositive);
    }
    Ok((amount_major * 100.0).round() as i64)
}

// Precondition helpers enforced at the API boundary
pub fn require_positive_minor_units(amount_minor: i64) -> Result<(), AmountError> {
    if amount_minor <= 0 {
        return Err(AmountError::NotPositive);
    }
    Ok(())
}

/// Parameters for `POST /transaction/initialize`. The reference doubles as
/// the idempotency/correlation key shared with the booking row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub email: String,
    pub amount_minor: i64,
    pub currency: String,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Hosted-checkout handle returned by a successful `initialize` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedCheckout {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Failed,
    Abandoned,
    Pending,
    Unknown,
}

impl From<&str> for TransactionStatus {
    fn from(s: &str) -> Self {
        match s {
            "success" => TransactionStatus::Success,
            "failed" | "reversed" => TransactionStatus::Failed,
            "abandoned" => TransactionStatus::Abandoned,
            "pending" | "ongoing" | "processing" | "queued" => TransactionStatus::Pending,
            _ => TransactionStatus::Unknown,
        }
    }
}

/// Ground-truth transaction state from `GET /transaction/verify/:reference`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedTransaction {
    pub reference: String,
    pub status: TransactionStatus,
    pub amount_minor: i64,
    pub currency: String,
    /// Full provider payload, kept for operator inspection.
    pub raw: serde_json::Value,
}

// Paystack REST envelope: { status: bool, message, data }
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeData {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyData {
    pub status: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub gateway_response: Option<String>,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

// Webhook event envelope: { event: "charge.success", data: {...} }
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeEventData {
    pub reference: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
}
