// Booking domain module

pub mod availability;
pub mod initiation;
pub mod reconcile;
pub mod reference;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guest {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A booking row. Append-only: cancellation is a status transition, and the
/// reference is reused verbatim as the payment gateway's transaction
/// reference — it is the join key between the two systems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub reference: String,
    /// Explicit foreign key to the room row.
    pub room_id: u32,
    pub guest: Guest,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub amount_minor: i64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub booking_status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Cross-field invariant: a booking is never confirmed unless paid.
    pub fn is_consistent(&self) -> bool {
        self.booking_status != BookingStatus::Confirmed
            || self.payment_status == PaymentStatus::Paid
    }

    /// Whether the stay still occupies the room on `day` or later.
    /// A stay spans `[check_in, check_out)`, so the check-out day itself
    /// is free.
    pub fn occupies_on_or_after(&self, day: NaiveDate) -> bool {
        self.check_out > day
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: u32,
    pub category: String,
    pub nightly_rate_minor: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounted_rate_minor: Option<i64>,
    pub available: bool,
    pub capacity: u32,
    pub size_sqm: u32,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl Room {
    /// The rate the guest actually pays per night.
    pub fn effective_rate_minor(&self) -> i64 {
        self.discounted_rate_minor.unwrap_or(self.nightly_rate_minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(payment: PaymentStatus, status: BookingStatus) -> Booking {
        Booking {
            reference: "HB-TEST0001".to_string(),
            room_id: 3,
            guest: Guest {
                name: "Ada Obi".to_string(),
                email: "ada@example.com".to_string(),
                phone: None,
            },
            check_in: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2026, 3, 13).unwrap(),
            amount_minor: 4_500_000,
            currency: "NGN".to_string(),
            payment_status: payment,
            booking_status: status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Paid).unwrap(),
            "\"paid\""
        );
        assert_eq!(
            serde_json::to_string(&BookingStatus::Confirmed).unwrap(),
            "\"confirmed\""
        );
        let s: BookingStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(s, BookingStatus::Cancelled);
    }

    #[test]
    fn confirmed_requires_paid() {
        assert!(booking(PaymentStatus::Paid, BookingStatus::Confirmed).is_consistent());
        assert!(booking(PaymentStatus::Pending, BookingStatus::Pending).is_consistent());
        assert!(!booking(PaymentStatus::Pending, BookingStatus::Confirmed).is_consistent());
        assert!(!booking(PaymentStatus::Failed, BookingStatus::Confirmed).is_consistent());
    }

    #[test]
    fn stay_span_excludes_checkout_day() {
        let b = booking(PaymentStatus::Paid, BookingStatus::Confirmed);
        assert!(b.occupies_on_or_after(NaiveDate::from_ymd_opt(2026, 3, 12).unwrap()));
        assert!(!b.occupies_on_or_after(NaiveDate::from_ymd_opt(2026, 3, 13).unwrap()));
    }

    #[test]
    fn discounted_rate_wins_when_present() {
        let mut room = Room {
            id: 1,
            category: "Deluxe".to_string(),
            nightly_rate_minor: 1_500_000,
            discounted_rate_minor: None,
            available: true,
            capacity: 2,
            size_sqm: 32,
            amenities: vec![],
            images: vec![],
        };
        assert_eq!(room.effective_rate_minor(), 1_500_000);
        room.discounted_rate_minor = Some(1_200_000);
        assert_eq!(room.effective_rate_minor(), 1_200_000);
    }
}
