use chrono::{DateTime, Utc};

use super::domain::{DocumentType, NotificationId, NotificationRecord, UserId, Vehicle, VehicleId};

/// Read access to vehicle snapshots.
pub trait VehicleStore: Send + Sync {
    fn list_all(&self) -> Result<Vec<Vehicle>, RepositoryError>;
    fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Vehicle>, RepositoryError>;
}

/// Storage abstraction for reminder records.
pub trait NotificationStore: Send + Sync {
    /// Whether a record for the same user, vehicle and document was created at or after
    /// `created_after`.
    fn exists(
        &self,
        user_id: &UserId,
        vehicle_id: &VehicleId,
        document: DocumentType,
        created_after: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
    fn insert(&self, record: NotificationRecord) -> Result<(), RepositoryError>;
    /// Newest first, at most `limit` records.
    fn list_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, RepositoryError>;
    /// Flips `is_read` on one of the caller's unread records. `NotFound` when nothing
    /// changed: unknown id, another user's record, or a record already read.
    fn mark_read(&self, user_id: &UserId, id: &NotificationId) -> Result<(), RepositoryError>;
}

/// Resolves delivery addresses for account holders.
pub trait UserDirectory: Send + Sync {
    /// `Ok(None)` when the user no longer exists.
    fn email(&self, user_id: &UserId) -> Result<Option<String>, DirectoryError>;
}

/// Outbound delivery hook (e-mail adapters, test doubles).
pub trait Notifier: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Maps a bearer token to the account it was issued for.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, bearer_token: &str) -> Result<UserId, AuthError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("mail delivery is not configured")]
    NotConfigured,
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer credentials")]
    MissingCredentials,
    #[error("could not validate credentials")]
    InvalidToken,
}
