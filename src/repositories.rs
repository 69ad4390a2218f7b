use crate::storage::StorageError;

pub mod bookings;
pub mod users;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("this email address is already registered")]
    DuplicateEmail,
    #[error("password must be at least {0} characters long")]
    WeakPassword(usize),
    #[error("wrong email or password")]
    InvalidCredentials,
    #[error("booking is missing required fields: {0}")]
    IncompleteBooking(String),
    #[error("unknown service: {0}")]
    UnknownService(String),
    #[error("unknown reward: {0}")]
    UnknownReward(String),
    #[error("{needed} points needed, only {available} available")]
    InsufficientPoints { needed: u32, available: u32 },
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("storage unavailable: {0}")]
    Storage(#[from] StorageError),
}
