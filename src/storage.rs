use std::fs;
use std::io;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::bookings::Booking;
use crate::models::users::User;

const USERS_FILE: &str = "users.json";
const BOOKINGS_FILE: &str = "bookings.json";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not read {file}: {source}")]
    Read { file: String, source: io::Error },
    #[error("could not write {file}: {source}")]
    Write { file: String, source: io::Error },
    #[error("corrupt data in {file}: {source}")]
    Corrupt {
        file: String,
        source: serde_json::Error,
    },
}

/// File-backed record store: one JSON document per collection, plus the
/// persisted session mirror. Assumes a single logical writer.
#[derive(Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::Write {
            file: dir.display().to_string(),
            source: e,
        })?;
        Ok(Store { dir })
    }

    pub fn load_users(&self) -> Result<Vec<User>, StorageError> {
        self.read_collection(USERS_FILE)
    }

    pub fn save_users(&self, users: &[User]) -> Result<(), StorageError> {
        self.write_json(USERS_FILE, users)
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        Ok(self.load_users()?.into_iter().find(|u| u.id == id))
    }

    pub fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut users = self.load_users()?;
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => *slot = user.clone(),
            None => users.push(user.clone()),
        }
        self.save_users(&users)
    }

    pub fn load_bookings(&self) -> Result<Vec<Booking>, StorageError> {
        self.read_collection(BOOKINGS_FILE)
    }

    pub fn save_bookings(&self, bookings: &[Booking]) -> Result<(), StorageError> {
        self.write_json(BOOKINGS_FILE, bookings)
    }

    pub fn insert_booking(&self, booking: &Booking) -> Result<(), StorageError> {
        let mut bookings = self.load_bookings()?;
        bookings.push(booking.clone());
        self.save_bookings(&bookings)
    }

    pub fn load_session(&self) -> Result<Option<User>, StorageError> {
        let path = self.dir.join(SESSION_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| StorageError::Read {
            file: SESSION_FILE.to_string(),
            source: e,
        })?;
        let user = serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
            file: SESSION_FILE.to_string(),
            source: e,
        })?;
        Ok(Some(user))
    }

    pub fn save_session(&self, user: &User) -> Result<(), StorageError> {
        self.write_json(SESSION_FILE, user)
    }

    pub fn clear_session(&self) -> Result<(), StorageError> {
        match fs::remove_file(self.dir.join(SESSION_FILE)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Write {
                file: SESSION_FILE.to_string(),
                source: e,
            }),
        }
    }

    // Missing files read as empty collections; unreadable or unparsable
    // files surface as errors instead of silently resetting the data.
    fn read_collection<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StorageError> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&path).map_err(|e| StorageError::Read {
            file: file.to_string(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
            file: file.to_string(),
            source: e,
        })
    }

    fn write_json<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Corrupt {
            file: file.to_string(),
            source: e,
        })?;
        fs::write(self.dir.join(file), bytes).map_err(|e| StorageError::Write {
            file: file.to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bookings::BookingStatus;

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            name: "Ana".to_string(),
            email: email.to_string(),
            password_salt: "salt".to_string(),
            password_hash: "hash".to_string(),
            referral_code: format!("ANA{id}"),
            loyalty_points: 0,
            referred_by_code: None,
            referrals_made: Vec::new(),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    fn booking(id: &str) -> Booking {
        Booking {
            id: id.to_string(),
            user_id: "u1".to_string(),
            user_name: "Ana".to_string(),
            service_id: "classic-cut".to_string(),
            service_name: "Corte Clásico".to_string(),
            price_in_cents: 1500,
            date: "2026-09-01".to_string(),
            time: "10:30".to_string(),
            referral_code_used: None,
            points_earned: 15,
            status: BookingStatus::Confirmed,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert!(store.load_users().unwrap().is_empty());
        assert!(store.load_bookings().unwrap().is_empty());
        assert!(store.load_session().unwrap().is_none());
    }

    #[test]
    fn round_trips_collections_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let users = vec![user("u1", "a@b.com"), user("u2", "c@d.com")];
        store.save_users(&users).unwrap();
        let loaded = store.load_users().unwrap();
        assert_eq!(
            loaded.iter().map(|u| u.id.as_str()).collect::<Vec<_>>(),
            vec!["u1", "u2"]
        );

        store.save_bookings(&[booking("b1"), booking("b2")]).unwrap();
        let loaded = store.load_bookings().unwrap();
        assert_eq!(
            loaded.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
            vec!["b1", "b2"]
        );
    }

    #[test]
    fn upsert_replaces_by_id_and_appends_new() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let mut ana = user("u1", "a@b.com");
        store.upsert_user(&ana).unwrap();
        ana.loyalty_points = 70;
        store.upsert_user(&ana).unwrap();
        store.upsert_user(&user("u2", "c@d.com")).unwrap();

        let users = store.load_users().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].loyalty_points, 70);
    }

    #[test]
    fn insert_booking_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store.insert_booking(&booking("b1")).unwrap();
        store.insert_booking(&booking("b2")).unwrap();
        assert_eq!(store.load_bookings().unwrap().len(), 2);
    }

    #[test]
    fn session_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store.save_session(&user("u1", "a@b.com")).unwrap();
        assert_eq!(store.load_session().unwrap().unwrap().id, "u1");

        store.clear_session().unwrap();
        assert!(store.load_session().unwrap().is_none());
        // clearing an absent session is fine
        store.clear_session().unwrap();
    }

    #[test]
    fn corrupt_collection_is_an_error_not_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("users.json"), b"{not json").unwrap();

        match store.load_users() {
            Err(StorageError::Corrupt { file, .. }) => assert_eq!(file, "users.json"),
            other => panic!("expected corrupt error, got {other:?}"),
        }
    }
}
