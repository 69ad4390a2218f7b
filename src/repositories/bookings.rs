use super::RepositoryError;
use crate::models::bookings::Booking;
use crate::storage::Store;

#[derive(Clone)]
pub struct BookingRepository {
    store: Store,
}

impl BookingRepository {
    pub fn new(store: Store) -> Self {
        BookingRepository { store }
    }

    pub fn insert_booking(&self, booking: &Booking) -> Result<(), RepositoryError> {
        self.store.insert_booking(booking)?;
        Ok(())
    }

    // ISO date and 24h time strings order lexicographically, newest first.
    pub fn history_for_user(&self, user_id: &str) -> Result<Vec<Booking>, RepositoryError> {
        let mut bookings: Vec<Booking> = self
            .store
            .load_bookings()?
            .into_iter()
            .filter(|b| b.user_id == user_id)
            .collect();
        bookings.sort_by(|a, b| {
            (b.date.as_str(), b.time.as_str()).cmp(&(a.date.as_str(), a.time.as_str()))
        });
        Ok(bookings)
    }
}
