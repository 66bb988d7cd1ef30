// Gateway webhook handling with signature verification and event processing.
// The webhook is one of the two trusted write paths (the other is the
// operator-triggered verification); both funnel into the same idempotent
// settlement transition.

use tracing::{debug, info, instrument, warn};

use crate::booking::reconcile;
use crate::booking_counter_inc;
use crate::paystack::errors::WebhookError;
use crate::paystack::types::{ChargeEventData, GatewayEvent};
use crate::store::{Store, StoreError};

/// Main webhook handler - verifies signature and processes the event
#[instrument(skip(payload, headers, webhook_secret, store))]
pub async fn handle_webhook(
    payload: &[u8],
    headers: &http::HeaderMap,
    webhook_secret: &str,
    store: &Store,
) -> Result<(), WebhookError> {
    verify_signature(payload, headers, webhook_secret)?;

    let evt: GatewayEvent = serde_json::from_slice(payload)
        .map_err(|e| WebhookError::MalformedPayload(format!("JSON parse error: {}", e)))?;

    booking_counter_inc!("gateway.webhook.received", "event" => &evt.event);

    process_event(&evt, store).await
}

/// Verify the gateway signature: HMAC-SHA512 of the raw body with the secret
/// key, hex-encoded in the `x-paystack-signature` header.
pub fn verify_signature(
    payload: &[u8],
    headers: &http::HeaderMap,
    webhook_secret: &str,
) -> Result<(), WebhookError> {
    if webhook_secret.is_empty() {
        return Err(WebhookError::MissingSecret);
    }

    let signature = headers
        .get("x-paystack-signature")
        .ok_or(WebhookError::MissingSignature)?
        .to_str()
        .map_err(|e| WebhookError::InvalidSignature(format!("Invalid header encoding: {}", e)))?;

    use hmac::{Hmac, Mac};
    use sha2::Sha512;

    type HmacSha512 = Hmac<Sha512>;

    let mut mac = HmacSha512::new_from_slice(webhook_secret.as_bytes())
        .map_err(|e| WebhookError::InvalidSignature(format!("HMAC init error: {}", e)))?;
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison to prevent timing attacks
    let signature_valid = expected.as_bytes().len() == signature.as_bytes().len()
        && expected
            .as_bytes()
            .iter()
            .zip(signature.as_bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0;

    if !signature_valid {
        return Err(WebhookError::InvalidSignature(
            "Signature mismatch".to_string(),
        ));
    }

    debug!("webhook signature verified");
    Ok(())
}

/// Process a verified event and dispatch to the appropriate handler
pub async fn process_event(evt: &GatewayEvent, store: &Store) -> Result<(), WebhookError> {
    match evt.event.as_str() {
        "charge.success" => {
            handle_charge_success(evt, store)?;
            booking_counter_inc!("gateway.webhook.processed", "event" => "charge.success");
        }
        "charge.failed" => {
            handle_charge_failed(evt, store)?;
            booking_counter_inc!("gateway.webhook.processed", "event" => "charge.failed");
        }
        other => {
            info!(event = %other, "ignoring unsupported gateway event");
            booking_counter_inc!("gateway.webhook.ignored", "event" => other);
        }
    }
    Ok(())
}

fn parse_charge(evt: &GatewayEvent) -> Result<ChargeEventData, WebhookError> {
    serde_json::from_value(evt.data.clone())
        .map_err(|e| WebhookError::MalformedPayload(format!("Failed to parse charge data: {}", e)))
}

fn handle_charge_success(evt: &GatewayEvent, store: &Store) -> Result<(), WebhookError> {
    let charge = parse_charge(evt)?;

    info!(
        reference = %charge.reference,
        amount_minor = charge.amount,
        currency = %charge.currency,
        "charge succeeded"
    );

    let booking = match store.get_booking(&charge.reference) {
        Ok(Some(b)) => b,
        Ok(None) => {
            // Ack anyway: re-delivery cannot create the booking, and the
            // operator verify path remains available.
            warn!(reference = %charge.reference, "charge notification for unknown reference");
            return Ok(());
        }
        Err(e) => return Err(processing_failed(e)),
    };

    reconcile::apply_successful_charge(store, &charge.reference, booking.amount_minor, charge.amount)
        .map(|outcome| {
            debug!(reference = %charge.reference, outcome = ?outcome, "charge settled");
        })
        .map_err(processing_failed)
}

fn handle_charge_failed(evt: &GatewayEvent, store: &Store) -> Result<(), WebhookError> {
    let charge = parse_charge(evt)?;

    warn!(
        reference = %charge.reference,
        status = %charge.status,
        "charge failed"
    );

    match store.mark_payment_failed(&charge.reference) {
        Ok(status) => {
            debug!(reference = %charge.reference, stored = %status, "failure recorded");
            Ok(())
        }
        Err(StoreError::BookingNotFound(r)) => {
            warn!(reference = %r, "failed-charge notification for unknown reference");
            Ok(())
        }
        Err(e) => Err(processing_failed(e)),
    }
}

fn processing_failed(e: StoreError) -> WebhookError {
    WebhookError::ProcessingFailed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{BookingStatus, PaymentStatus};
    use crate::testutil::{mem_store, sample_booking, sample_room};
    use serde_json::json;

    fn sign(payload: &[u8], secret: &str) -> String {
        use hmac::{Hmac, Mac};
        use sha2::Sha512;
        type HmacSha512 = Hmac<Sha512>;

        let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn signed_headers(payload: &[u8], secret: &str) -> http::HeaderMap {
        let mut headers = http::HeaderMap::new();
        headers.insert("x-paystack-signature", sign(payload, secret).parse().unwrap());
        headers
    }

    #[test]
    fn signature_roundtrip() {
        let payload = br#"{"event":"charge.success","data":{}}"#;
        let secret = "sk_test_secret";

        let headers = signed_headers(payload, secret);
        assert!(verify_signature(payload, &headers, secret).is_ok());
    }

    #[test]
    fn invalid_signature_is_rejected() {
        let payload = br#"{"event":"charge.success","data":{}}"#;
        let mut headers = http::HeaderMap::new();
        headers.insert(
            "x-paystack-signature",
            "00".repeat(64).parse().unwrap(),
        );
        assert!(matches!(
            verify_signature(payload, &headers, "sk_test_secret"),
            Err(WebhookError::InvalidSignature(_))
        ));
    }

    #[test]
    fn missing_signature_is_rejected() {
        let headers = http::HeaderMap::new();
        assert!(matches!(
            verify_signature(b"{}", &headers, "sk_test_secret"),
            Err(WebhookError::MissingSignature)
        ));
    }

    #[test]
    fn missing_secret_is_a_server_error() {
        let headers = http::HeaderMap::new();
        assert!(matches!(
            verify_signature(b"{}", &headers, ""),
            Err(WebhookError::MissingSecret)
        ));
        assert_eq!(WebhookError::MissingSecret.status_code(), 500);
    }

    #[tokio::test]
    async fn charge_success_confirms_booking_idempotently() {
        let store = mem_store();
        store.upsert_room(&sample_room(1, true)).unwrap();
        let booking = sample_booking("HB-HOOK0001", 1);
        let amount = booking.amount_minor;
        store.insert_booking(&booking).unwrap();

        let evt = GatewayEvent {
            event: "charge.success".to_string(),
            data: json!({
                "reference": "HB-HOOK0001",
                "status": "success",
                "amount": amount,
                "currency": "NGN",
            }),
        };

        process_event(&evt, &store).await.unwrap();
        let row = store.get_booking("HB-HOOK0001").unwrap().unwrap();
        assert_eq!(row.payment_status, PaymentStatus::Paid);
        assert_eq!(row.booking_status, BookingStatus::Confirmed);

        // Duplicate delivery changes nothing
        process_event(&evt, &store).await.unwrap();
        let row = store.get_booking("HB-HOOK0001").unwrap().unwrap();
        assert_eq!(row.booking_status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn unknown_reference_is_acknowledged() {
        let store = mem_store();
        let evt = GatewayEvent {
            event: "charge.success".to_string(),
            data: json!({
                "reference": "HB-GHOST001",
                "status": "success",
                "amount": 100,
                "currency": "NGN",
            }),
        };
        assert!(process_event(&evt, &store).await.is_ok());
    }

    #[tokio::test]
    async fn unsupported_events_are_ignored() {
        let store = mem_store();
        let evt = GatewayEvent {
            event: "transfer.success".to_string(),
            data: json!({}),
        };
        assert!(process_event(&evt, &store).await.is_ok());
    }
}
