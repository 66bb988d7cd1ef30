//! Shared test fixtures: an in-memory store and a scriptable gateway.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Mutex;

use crate::booking::initiation::BookingIntent;
use crate::booking::{Booking, BookingStatus, Guest, PaymentStatus, Room};
use crate::paystack::errors::GatewayError;
use crate::paystack::types::{AuthorizedCheckout, InitializeRequest, VerifiedTransaction};
use crate::paystack::PaymentGateway;
use crate::store::Store;

pub fn mem_store() -> Store {
    Store::open_in_memory().expect("in-memory store")
}

pub fn sample_room(id: u32, available: bool) -> Room {
    Room {
        id,
        category: "Deluxe".to_string(),
        nightly_rate_minor: 1_500_000,
        discounted_rate_minor: None,
        available,
        capacity: 2,
        size_sqm: 32,
        amenities: vec!["wifi".to_string(), "breakfast".to_string()],
        images: vec![],
    }
}

pub fn sample_booking(reference: &str, room_id: u32) -> Booking {
    Booking {
        reference: reference.to_string(),
        room_id,
        guest: Guest {
            name: "Ada Obi".to_string(),
            email: "ada@example.com".to_string(),
            phone: Some("+2348012345678".to_string()),
        },
        check_in: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
        check_out: NaiveDate::from_ymd_opt(2026, 3, 13).unwrap(),
        amount_minor: 4_500_000,
        currency: "NGN".to_string(),
        payment_status: PaymentStatus::Pending,
        booking_status: BookingStatus::Pending,
        created_at: chrono::Utc::now(),
    }
}

pub fn intent_for(room_id: u32) -> BookingIntent {
    BookingIntent {
        guest_name: "Ada Obi".to_string(),
        guest_email: "ada@example.com".to_string(),
        guest_phone: None,
        room_id,
        check_in: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
        check_out: NaiveDate::from_ymd_opt(2026, 3, 13).unwrap(),
    }
}

/// Scriptable gateway double. Records `initialize` calls so tests can assert
/// on the wire amount and reference.
pub struct MockGateway {
    pub fail_initialize: bool,
    pub verify_response: Option<VerifiedTransaction>,
    pub initialize_calls: Mutex<Vec<InitializeRequest>>,
}

impl MockGateway {
    pub fn succeeding() -> Self {
        Self {
            fail_initialize: false,
            verify_response: None,
            initialize_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_initialize() -> Self {
        Self {
            fail_initialize: true,
            ..Self::succeeding()
        }
    }

    pub fn verifying(tx: VerifiedTransaction) -> Self {
        Self {
            verify_response: Some(tx),
            ..Self::succeeding()
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initialize(
        &self,
        req: InitializeRequest,
    ) -> Result<AuthorizedCheckout, GatewayError> {
        if self.fail_initialize {
            return Err(GatewayError::Http("connection refused".to_string()));
        }
        let checkout = AuthorizedCheckout {
            authorization_url: format!("https://checkout.example/{}", req.reference),
            access_code: format!("AC_{}", req.reference),
            reference: req.reference.clone(),
        };
        self.initialize_calls
            .lock()
            .expect("initialize_calls lock")
            .push(req);
        Ok(checkout)
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError> {
        match &self.verify_response {
            Some(tx) => {
                let mut tx = tx.clone();
                tx.reference = reference.to_string();
                Ok(tx)
            }
            None => Err(GatewayError::Http("verify not scripted".to_string())),
        }
    }
}
