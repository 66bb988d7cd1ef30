//! Booking initiation: durable pending row first, hosted checkout second.
//!
//! The ordering is the point. A booking row is written before the payer is
//! ever redirected, so any later gateway callback or verification with the
//! reference always has a record to reconcile against.

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

use crate::booking::{reference, Booking, BookingStatus, Guest, PaymentStatus};
use crate::booking_counter_inc;
use crate::paystack::errors::GatewayError;
use crate::paystack::types::{to_minor_units, AmountError, InitializeRequest};
use crate::paystack::PaymentGateway;
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum InitiationError {
    #[error("{0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("check-out must be after check-in")]
    InvalidDates,
    #[error("{0}")]
    InvalidAmount(#[from] AmountError),
    #[error("room {0} not found")]
    RoomNotFound(u32),
    #[error("room {0} is not available")]
    RoomUnavailable(u32),
    #[error("could not allocate a unique booking reference")]
    ReferenceGenerationFailed,
    #[error("payment initialization failed: {0}")]
    PaymentInitializationFailed(#[source] GatewayError),
    #[error(transparent)]
    Store(StoreError),
}

// Store errors flow through untouched, except the collision signal which the
// retry loop consumes before it can escape.
impl From<StoreError> for InitiationError {
    fn from(e: StoreError) -> Self {
        InitiationError::Store(e)
    }
}

/// Guest-supplied booking intent. The total amount is computed server-side
/// from the room's rate and never taken from this payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BookingIntent {
    #[validate(length(min = 1, max = 120))]
    pub guest_name: String,
    #[validate(email)]
    pub guest_email: String,
    #[serde(default)]
    pub guest_phone: Option<String>,
    pub room_id: u32,
    pub check_in: chrono::NaiveDate,
    pub check_out: chrono::NaiveDate,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct InitiatedBooking {
    pub reference: String,
    pub authorization_url: String,
}

/// Create a pending booking and obtain a hosted-checkout URL.
///
/// `amount_major` is the computed stay total in major currency units; the
/// deterministic minor-unit conversion happens here, at the gateway boundary.
pub async fn initiate(
    store: &Store,
    gateway: &dyn PaymentGateway,
    currency: &str,
    callback_url: Option<&str>,
    intent: &BookingIntent,
    amount_major: f64,
) -> Result<InitiatedBooking, InitiationError> {
    initiate_with(
        store,
        gateway,
        currency,
        callback_url,
        intent,
        amount_major,
        reference::generate,
    )
    .await
}

pub(crate) async fn initiate_with(
    store: &Store,
    gateway: &dyn PaymentGateway,
    currency: &str,
    callback_url: Option<&str>,
    intent: &BookingIntent,
    amount_major: f64,
    mut next_reference: impl FnMut() -> String,
) -> Result<InitiatedBooking, InitiationError> {
    intent.validate()?;
    if intent.check_in >= intent.check_out {
        return Err(InitiationError::InvalidDates);
    }
    let amount_minor = to_minor_units(amount_major)?;

    let room = store
        .get_room(intent.room_id)?
        .ok_or(InitiationError::RoomNotFound(intent.room_id))?;
    // Courtesy pre-check only. The authoritative claim is the
    // compare-and-swap at confirmation time.
    if !room.available {
        return Err(InitiationError::RoomUnavailable(intent.room_id));
    }

    let booking = write_pending_row(store, currency, intent, amount_minor, &mut next_reference)?;

    info!(
        reference = %booking.reference,
        room_id = booking.room_id,
        amount_minor = booking.amount_minor,
        "pending booking recorded"
    );
    booking_counter_inc!("booking.initiated");

    let init = InitializeRequest {
        email: booking.guest.email.clone(),
        amount_minor: booking.amount_minor,
        currency: booking.currency.clone(),
        reference: booking.reference.clone(),
        callback_url: callback_url.map(str::to_string),
        metadata: HashMap::from([
            ("room_id".to_string(), booking.room_id.to_string()),
            ("check_in".to_string(), booking.check_in.to_string()),
            ("check_out".to_string(), booking.check_out.to_string()),
        ]),
    };

    match gateway.initialize(init).await {
        Ok(checkout) => Ok(InitiatedBooking {
            reference: booking.reference,
            authorization_url: checkout.authorization_url,
        }),
        Err(e) => {
            // The pending row stays behind; the booking is retryable or
            // abandonable by reference, never silently discarded.
            warn!(
                reference = %booking.reference,
                error = %e,
                "gateway initialization failed; pending booking retained"
            );
            booking_counter_inc!("booking.initiation_failed");
            Err(InitiationError::PaymentInitializationFailed(e))
        }
    }
}

/// Write the pending row, regenerating the reference once on collision.
fn write_pending_row(
    store: &Store,
    currency: &str,
    intent: &BookingIntent,
    amount_minor: i64,
    next_reference: &mut impl FnMut() -> String,
) -> Result<Booking, InitiationError> {
    for _attempt in 0..2 {
        let booking = Booking {
            reference: next_reference(),
            room_id: intent.room_id,
            guest: Guest {
                name: intent.guest_name.clone(),
                email: intent.guest_email.clone(),
                phone: intent.guest_phone.clone(),
            },
            check_in: intent.check_in,
            check_out: intent.check_out,
            amount_minor,
            currency: currency.to_string(),
            payment_status: PaymentStatus::Pending,
            booking_status: BookingStatus::Pending,
            created_at: chrono::Utc::now(),
        };
        match store.insert_booking(&booking) {
            Ok(()) => return Ok(booking),
            Err(StoreError::DuplicateReference(r)) => {
                warn!(reference = %r, "booking reference collision, regenerating");
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(InitiationError::ReferenceGenerationFailed)
}
