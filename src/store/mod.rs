//! Durable store for bookings, rooms and contact messages.
//!
//! Rows are JSON-encoded into redb tables. The store is the single seam to
//! persistence: every status transition with an invariant attached happens
//! here, inside one write transaction.

use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::booking::{Booking, BookingStatus, PaymentStatus, Room};
use crate::contact::ContactMessage;

/// Key: booking reference. Value: serialized Booking JSON.
const BOOKINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("bookings");
/// Key: room id. Value: serialized Room JSON.
const ROOMS_TABLE: TableDefinition<u32, &[u8]> = TableDefinition::new("rooms");
/// Key: submission id. Value: serialized ContactMessage JSON.
const CONTACTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("contact_messages");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("row codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("booking reference already exists: {0}")]
    DuplicateReference(String),
    #[error("booking {0} not found")]
    BookingNotFound(String),
    #[error("room {0} not found")]
    RoomNotFound(u32),
}

/// Result of the confirm-if-available compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Room was still available; booking is now paid and confirmed.
    Confirmed,
    /// Booking was already confirmed; nothing changed.
    AlreadyConfirmed,
    /// Payment recorded, but the room could not be claimed. Needs operator
    /// resolution (refund or relocation).
    RoomUnavailable,
}

#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Create a new database or open an existing one.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::init(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self, StoreError> {
        // Create tables up front so read transactions never race table creation
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(BOOKINGS_TABLE)?;
            let _ = write_txn.open_table(ROOMS_TABLE)?;
            let _ = write_txn.open_table(CONTACTS_TABLE)?;
        }
        write_txn.commit()?;

        tracing::info!("store initialized with bookings, rooms and contact tables");

        Ok(Self { db: Arc::new(db) })
    }

    // ---- bookings ----

    /// Insert a fresh booking row. Fails on a reference collision so the
    /// caller can regenerate.
    pub fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        debug_assert!(booking.is_consistent());
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(BOOKINGS_TABLE)?;
            let exists = table.get(booking.reference.as_str())?.is_some();
            if exists {
                return Err(StoreError::DuplicateReference(booking.reference.clone()));
            }
            table.insert(booking.reference.as_str(), encode(booking)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_booking(&self, reference: &str) -> Result<Option<Booking>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BOOKINGS_TABLE)?;
        match table.get(reference)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_bookings(&self) -> Result<Vec<Booking>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BOOKINGS_TABLE)?;
        let mut out = Vec::new();
        for row in table.iter()? {
            let (_, value) = row?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    /// The only path that turns a booking `confirmed`: inside one write
    /// transaction, mark the payment paid and claim the room with a
    /// compare-and-swap on its availability flag. A booking that lost the
    /// room stays paid-but-pending for operator resolution; a cancelled
    /// booking is never re-confirmed.
    pub fn settle_paid_booking(&self, reference: &str) -> Result<SettleOutcome, StoreError> {
        let txn = self.db.begin_write()?;
        let outcome;
        {
            let mut bookings = txn.open_table(BOOKINGS_TABLE)?;
            let mut rooms = txn.open_table(ROOMS_TABLE)?;

            let mut booking: Booking = {
                let guard = bookings
                    .get(reference)?
                    .ok_or_else(|| StoreError::BookingNotFound(reference.to_string()))?;
                decode(guard.value())?
            };

            if booking.booking_status == BookingStatus::Confirmed {
                outcome = SettleOutcome::AlreadyConfirmed;
            } else {
                booking.payment_status = PaymentStatus::Paid;

                let room: Option<Room> = {
                    match rooms.get(booking.room_id)? {
                        Some(guard) => Some(decode(guard.value())?),
                        None => None,
                    }
                };

                match room {
                    Some(mut room)
                        if room.available && booking.booking_status == BookingStatus::Pending =>
                    {
                        room.available = false;
                        booking.booking_status = BookingStatus::Confirmed;
                        rooms.insert(booking.room_id, encode(&room)?.as_slice())?;
                        outcome = SettleOutcome::Confirmed;
                    }
                    _ => {
                        outcome = SettleOutcome::RoomUnavailable;
                    }
                }

                debug_assert!(booking.is_consistent());
                bookings.insert(reference, encode(&booking)?.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(outcome)
    }

    /// Record a failed/abandoned payment. A payment that already settled is
    /// never downgraded; returns the status actually stored.
    pub fn mark_payment_failed(&self, reference: &str) -> Result<PaymentStatus, StoreError> {
        let txn = self.db.begin_write()?;
        let stored;
        {
            let mut bookings = txn.open_table(BOOKINGS_TABLE)?;
            let mut booking: Booking = {
                let guard = bookings
                    .get(reference)?
                    .ok_or_else(|| StoreError::BookingNotFound(reference.to_string()))?;
                decode(guard.value())?
            };

            if booking.payment_status == PaymentStatus::Paid {
                stored = PaymentStatus::Paid;
            } else {
                booking.payment_status = PaymentStatus::Failed;
                stored = PaymentStatus::Failed;
                debug_assert!(booking.is_consistent());
                bookings.insert(reference, encode(&booking)?.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(stored)
    }

    // ---- rooms ----

    pub fn upsert_room(&self, room: &Room) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ROOMS_TABLE)?;
            table.insert(room.id, encode(room)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_room(&self, id: u32) -> Result<Option<Room>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ROOMS_TABLE)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ROOMS_TABLE)?;
        let mut out = Vec::new();
        for row in table.iter()? {
            let (_, value) = row?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    /// Set the availability flag. Returns whether the stored value changed,
    /// so idempotent callers can report an empty write set.
    pub fn set_room_available(&self, id: u32, available: bool) -> Result<bool, StoreError> {
        let txn = self.db.begin_write()?;
        let changed;
        {
            let mut table = txn.open_table(ROOMS_TABLE)?;
            let mut room: Room = {
                let guard = table
                    .get(id)?
                    .ok_or(StoreError::RoomNotFound(id))?;
                decode(guard.value())?
            };
            changed = room.available != available;
            if changed {
                room.available = available;
                table.insert(id, encode(&room)?.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(changed)
    }

    // ---- contact messages ----

    pub fn record_contact(&self, message: &ContactMessage) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CONTACTS_TABLE)?;
            let key = message.id.to_string();
            table.insert(key.as_str(), encode(message)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sample_booking, sample_room};

    #[test]
    fn booking_roundtrip_and_duplicate() {
        let store = Store::open_in_memory().unwrap();
        let booking = sample_booking("HB-AAAA1111", 1);
        store.insert_booking(&booking).unwrap();

        let loaded = store.get_booking("HB-AAAA1111").unwrap().unwrap();
        assert_eq!(loaded.room_id, 1);
        assert_eq!(loaded.payment_status, PaymentStatus::Pending);

        let err = store.insert_booking(&booking).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateReference(r) if r == "HB-AAAA1111"));

        assert!(store.get_booking("HB-MISSING").unwrap().is_none());
    }

    #[test]
    fn settle_claims_room_exactly_once() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_room(&sample_room(7, true)).unwrap();
        store.insert_booking(&sample_booking("HB-FIRST001", 7)).unwrap();
        store.insert_booking(&sample_booking("HB-SECND002", 7)).unwrap();

        // First paid booking wins the room
        assert_eq!(
            store.settle_paid_booking("HB-FIRST001").unwrap(),
            SettleOutcome::Confirmed
        );
        let winner = store.get_booking("HB-FIRST001").unwrap().unwrap();
        assert_eq!(winner.payment_status, PaymentStatus::Paid);
        assert_eq!(winner.booking_status, BookingStatus::Confirmed);
        assert!(!store.get_room(7).unwrap().unwrap().available);

        // Re-settling the winner is a no-op
        assert_eq!(
            store.settle_paid_booking("HB-FIRST001").unwrap(),
            SettleOutcome::AlreadyConfirmed
        );

        // A second paid booking for the same room is recorded but not confirmed
        assert_eq!(
            store.settle_paid_booking("HB-SECND002").unwrap(),
            SettleOutcome::RoomUnavailable
        );
        let loser = store.get_booking("HB-SECND002").unwrap().unwrap();
        assert_eq!(loser.payment_status, PaymentStatus::Paid);
        assert_eq!(loser.booking_status, BookingStatus::Pending);
    }

    #[test]
    fn failed_payment_never_downgrades_paid() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_room(&sample_room(2, true)).unwrap();
        store.insert_booking(&sample_booking("HB-PAYME003", 2)).unwrap();

        assert_eq!(
            store.mark_payment_failed("HB-PAYME003").unwrap(),
            PaymentStatus::Failed
        );
        assert_eq!(
            store
                .get_booking("HB-PAYME003")
                .unwrap()
                .unwrap()
                .booking_status,
            BookingStatus::Pending
        );

        // Settle, then a late failure notification must not clobber it
        store.settle_paid_booking("HB-PAYME003").unwrap();
        assert_eq!(
            store.mark_payment_failed("HB-PAYME003").unwrap(),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn availability_write_reports_change() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_room(&sample_room(4, false)).unwrap();

        assert!(store.set_room_available(4, true).unwrap());
        // Second write is a no-op
        assert!(!store.set_room_available(4, true).unwrap());

        assert!(matches!(
            store.set_room_available(99, true),
            Err(StoreError::RoomNotFound(99))
        ));
    }
}
