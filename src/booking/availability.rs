//! Scheduled availability reset.
//!
//! Scans confirmed bookings whose stay has ended and flips the referenced
//! rooms back to available, unless another confirmed booking still holds the
//! room. The join runs over the booking's explicit `room_id` foreign key.
//!
//! The job is idempotent and convergent: re-running it with no newly
//! completed bookings writes nothing, and a crash between the scan and the
//! writes is healed by the next run because check-out dates never move.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::booking::BookingStatus;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize)]
pub struct ResetReport {
    /// Rooms whose flag actually changed this run.
    pub updated_rooms: Vec<u32>,
}

pub fn run_reset(store: &Store, today: NaiveDate) -> Result<ResetReport, StoreError> {
    let bookings = store.list_bookings()?;

    let mut candidates: BTreeSet<u32> = BTreeSet::new();
    let mut still_held: BTreeSet<u32> = BTreeSet::new();
    for b in &bookings {
        if b.booking_status != BookingStatus::Confirmed {
            continue;
        }
        if b.check_out < today {
            candidates.insert(b.room_id);
        }
        if b.occupies_on_or_after(today) {
            still_held.insert(b.room_id);
        }
    }

    let mut updated_rooms = Vec::new();
    for room_id in candidates {
        if still_held.contains(&room_id) {
            debug!(room_id, "room still held by an ongoing or upcoming stay");
            continue;
        }
        match store.set_room_available(room_id, true) {
            Ok(true) => updated_rooms.push(room_id),
            Ok(false) => {}
            Err(StoreError::RoomNotFound(id)) => {
                // Dangling foreign key; skip rather than abort the sweep
                warn!(room_id = id, "completed booking references a missing room");
            }
            // Store failures abort the run. Rooms already flipped stay
            // flipped; the update is convergent, not atomic.
            Err(e) => return Err(e),
        }
    }

    if updated_rooms.is_empty() {
        debug!("availability reset: nothing to do");
    } else {
        info!(rooms = ?updated_rooms, "availability reset released rooms");
    }

    Ok(ResetReport { updated_rooms })
}
