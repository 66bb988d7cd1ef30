//! Payment completion reconciliation.
//!
//! Two operations with different trust levels, deliberately kept as two
//! interfaces:
//!
//! * [`check_booking_status`] serves the payer's browser after the hosted
//!   checkout redirect. It is a pure read over the booking store and a
//!   routing decision; it never writes and never trusts the reference to
//!   assert payment success.
//! * [`verify_payment`] is the credential-gated server-side operation that
//!   asks the gateway for ground truth and is the only path allowed to move
//!   a booking out of `pending`.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::booking::{BookingStatus, PaymentStatus};
use crate::booking_counter_inc;
use crate::paystack::errors::GatewayError;
use crate::paystack::types::TransactionStatus;
use crate::paystack::PaymentGateway;
use crate::store::{SettleOutcome, Store, StoreError};

/// Routing decision for the browser-side status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum BookingCheck {
    /// No booking carries this reference; route to the generic bookings view.
    Unknown,
    /// The gateway's authoritative confirmation has not landed yet (or the
    /// payment failed); route to the pending/bookings view.
    Pending(BookingSummary),
    /// Paid and confirmed; safe to show the success view.
    Confirmed(BookingSummary),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingSummary {
    pub reference: String,
    pub room_id: u32,
    pub payment_status: PaymentStatus,
    pub booking_status: BookingStatus,
}

/// Browser-facing status check. Idempotent and total: repeated calls with no
/// intervening state change yield the same decision, and unknown references
/// are an answer, not an error.
pub fn check_booking_status(store: &Store, reference: &str) -> Result<BookingCheck, StoreError> {
    let Some(booking) = store.get_booking(reference)? else {
        return Ok(BookingCheck::Unknown);
    };
    let summary = BookingSummary {
        reference: booking.reference.clone(),
        room_id: booking.room_id,
        payment_status: booking.payment_status,
        booking_status: booking.booking_status,
    };
    if booking.payment_status == PaymentStatus::Paid
        && booking.booking_status == BookingStatus::Confirmed
    {
        Ok(BookingCheck::Confirmed(summary))
    } else {
        Ok(BookingCheck::Pending(summary))
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("no booking for reference {0}")]
    UnknownReference(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a verification pass actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Confirmed,
    AlreadyConfirmed,
    /// Payment settled but the room could not be claimed; operator follow-up
    /// (refund or relocation) required.
    RoomUnavailable,
    /// Gateway amount disagreed with the booking amount; no transition.
    AmountMismatch,
    MarkedFailed,
    StillPending,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub reference: String,
    pub gateway_status: TransactionStatus,
    pub gateway_amount_minor: i64,
    pub outcome: VerificationOutcome,
}

/// Server-side verification against the gateway's ground truth. Requires the
/// secret credential and is therefore never reachable from the browser. The
/// gateway call is not auto-retried; an operator re-triggers explicitly.
pub async fn verify_payment(
    store: &Store,
    gateway: &dyn PaymentGateway,
    reference: &str,
) -> Result<VerificationReport, ReconcileError> {
    let booking = store
        .get_booking(reference)?
        .ok_or_else(|| ReconcileError::UnknownReference(reference.to_string()))?;

    let tx = gateway.verify(reference).await?;

    let outcome = match tx.status {
        TransactionStatus::Success => {
            apply_successful_charge(store, reference, booking.amount_minor, tx.amount_minor)?
        }
        TransactionStatus::Failed | TransactionStatus::Abandoned => {
            match store.mark_payment_failed(reference)? {
                PaymentStatus::Paid => VerificationOutcome::AlreadyConfirmed,
                _ => {
                    info!(reference = %reference, status = ?tx.status, "payment marked failed");
                    booking_counter_inc!("booking.payment_failed");
                    VerificationOutcome::MarkedFailed
                }
            }
        }
        TransactionStatus::Pending | TransactionStatus::Unknown => {
            VerificationOutcome::StillPending
        }
    };

    Ok(VerificationReport {
        reference: reference.to_string(),
        gateway_status: tx.status,
        gateway_amount_minor: tx.amount_minor,
        outcome,
    })
}

/// Shared trusted transition for a successful charge, used by both the
/// verification endpoint and the gateway webhook. Idempotent: an already
/// confirmed booking is left untouched, so duplicate notifications are
/// harmless.
pub fn apply_successful_charge(
    store: &Store,
    reference: &str,
    expected_amount_minor: i64,
    charged_amount_minor: i64,
) -> Result<VerificationOutcome, StoreError> {
    if charged_amount_minor != expected_amount_minor {
        warn!(
            reference = %reference,
            expected = expected_amount_minor,
            charged = charged_amount_minor,
            "charged amount disagrees with booking amount; refusing to confirm"
        );
        booking_counter_inc!("booking.amount_mismatch");
        return Ok(VerificationOutcome::AmountMismatch);
    }

    match store.settle_paid_booking(reference)? {
        SettleOutcome::Confirmed => {
            info!(reference = %reference, "booking confirmed");
            booking_counter_inc!("booking.confirmed");
            Ok(VerificationOutcome::Confirmed)
        }
        SettleOutcome::AlreadyConfirmed => Ok(VerificationOutcome::AlreadyConfirmed),
        SettleOutcome::RoomUnavailable => {
            warn!(
                reference = %reference,
                "payment settled but room already claimed; operator follow-up required"
            );
            booking_counter_inc!("booking.room_conflict");
            Ok(VerificationOutcome::RoomUnavailable)
        }
    }
}
