//! Contact-form intake.
//!
//! The stored submission is the durable record of intent; the notification
//! relay to the hosted email API is best-effort and its failures are
//! swallowed after logging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Subject is required"))]
    pub subject: String,
    #[validate(custom = "validate_message_length")]
    pub message: String,
}

fn validate_message_length(message: &str) -> Result<(), ValidationError> {
    let len = message.chars().count();
    if len < 10 {
        let mut err = ValidationError::new("message_too_short");
        err.message = Some("Message is too short (minimum 10 characters)".into());
        return Err(err);
    }
    if len > 5000 {
        let mut err = ValidationError::new("message_too_long");
        err.message = Some("Message is too long (maximum 5000 characters)".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

/// Validate and durably store a submission.
pub fn record_submission(
    store: &Store,
    req: &ContactRequest,
) -> Result<ContactMessage, SubmissionError> {
    req.validate()?;
    let message = ContactMessage {
        id: Uuid::new_v4(),
        name: req.name.clone(),
        email: req.email.clone(),
        phone: req.phone.clone(),
        subject: req.subject.clone(),
        message: req.message.clone(),
        received_at: Utc::now(),
    };
    store.record_contact(&message)?;
    debug!(id = %message.id, "contact submission stored");
    Ok(message)
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("{0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Best-effort notification to the hosted email API. The submission is
/// already durable, so delivery failure is logged and swallowed.
pub async fn relay_notification(http: &reqwest::Client, notify_url: &str, msg: &ContactMessage) {
    match http.post(notify_url).json(msg).send().await {
        Ok(resp) if resp.status().is_success() => {
            debug!(id = %msg.id, "contact notification relayed");
        }
        Ok(resp) => {
            warn!(
                id = %msg.id,
                status = resp.status().as_u16(),
                "contact notification relay rejected"
            );
        }
        Err(e) => {
            warn!(id = %msg.id, error = %e, "contact notification relay failed");
        }
    }
}
