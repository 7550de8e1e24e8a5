use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::compliance::domain::{
    DocumentType, NotificationId, NotificationRecord, UserId, Vehicle, VehicleId,
};
use crate::workflows::compliance::repository::{
    AuthError, Authenticator, DirectoryError, NotificationStore, Notifier, NotifyError,
    RepositoryError, UserDirectory, VehicleStore,
};
use crate::workflows::compliance::windows::ExpiryWindows;
use crate::workflows::compliance::ExpiryMonitor;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 10, 6, 0, 0).unwrap()
}

pub(super) fn days(count: i64) -> Duration {
    Duration::days(count)
}

pub(super) fn vehicle(id: &str, user: &str) -> Vehicle {
    Vehicle::new(id, user, format!("REG-{id}"))
}

#[derive(Default)]
pub(super) struct MemoryVehicles {
    vehicles: Mutex<Vec<Vehicle>>,
}

impl MemoryVehicles {
    pub(super) fn with(vehicles: Vec<Vehicle>) -> Self {
        Self {
            vehicles: Mutex::new(vehicles),
        }
    }
}

impl VehicleStore for MemoryVehicles {
    fn list_all(&self) -> Result<Vec<Vehicle>, RepositoryError> {
        Ok(self.vehicles.lock().expect("vehicles mutex poisoned").clone())
    }

    fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Vehicle>, RepositoryError> {
        let guard = self.vehicles.lock().expect("vehicles mutex poisoned");
        Ok(guard
            .iter()
            .filter(|vehicle| &vehicle.user_id == user_id)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableVehicles;

impl VehicleStore for UnavailableVehicles {
    fn list_all(&self) -> Result<Vec<Vehicle>, RepositoryError> {
        Err(RepositoryError::Unavailable("vehicle store offline".to_string()))
    }

    fn list_by_user(&self, _user_id: &UserId) -> Result<Vec<Vehicle>, RepositoryError> {
        Err(RepositoryError::Unavailable("vehicle store offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifications {
    records: Mutex<Vec<NotificationRecord>>,
    fail_exists: AtomicBool,
    fail_insert: AtomicBool,
}

impl MemoryNotifications {
    pub(super) fn records(&self) -> Vec<NotificationRecord> {
        self.records.lock().expect("records mutex poisoned").clone()
    }

    pub(super) fn seed(&self, record: NotificationRecord) {
        self.records
            .lock()
            .expect("records mutex poisoned")
            .push(record);
    }

    pub(super) fn fail_exists(&self, enabled: bool) {
        self.fail_exists.store(enabled, Ordering::SeqCst);
    }

    pub(super) fn fail_insert(&self, enabled: bool) {
        self.fail_insert.store(enabled, Ordering::SeqCst);
    }
}

impl NotificationStore for MemoryNotifications {
    fn exists(
        &self,
        user_id: &UserId,
        vehicle_id: &VehicleId,
        document: DocumentType,
        created_after: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("lookup timed out".to_string()));
        }
        let guard = self.records.lock().expect("records mutex poisoned");
        Ok(guard.iter().any(|record| {
            &record.user_id == user_id
                && &record.vehicle_id == vehicle_id
                && record.notification_type == document
                && record.created_at >= created_after
        }))
    }

    fn insert(&self, record: NotificationRecord) -> Result<(), RepositoryError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write rejected".to_string()));
        }
        self.seed(record);
        Ok(())
    }

    fn list_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("records mutex poisoned");
        let mut records: Vec<_> = guard
            .iter()
            .filter(|record| &record.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    fn mark_read(&self, user_id: &UserId, id: &NotificationId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("records mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|record| &record.id == id && &record.user_id == user_id && !record.is_read)
            .ok_or(RepositoryError::NotFound)?;
        record.is_read = true;
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    emails: HashMap<UserId, String>,
}

impl MemoryDirectory {
    pub(super) fn with_user(mut self, user: &str, email: &str) -> Self {
        self.emails
            .insert(UserId(user.to_string()), email.to_string());
        self
    }
}

impl UserDirectory for MemoryDirectory {
    fn email(&self, user_id: &UserId) -> Result<Option<String>, DirectoryError> {
        Ok(self.emails.get(user_id).cloned())
    }
}

pub(super) struct UnavailableDirectory;

impl UserDirectory for UnavailableDirectory {
    fn email(&self, _user_id: &UserId) -> Result<Option<String>, DirectoryError> {
        Err(DirectoryError::Unavailable("directory offline".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SentMail {
    pub(super) to: String,
    pub(super) subject: String,
    pub(super) body: String,
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    sent: Mutex<Vec<SentMail>>,
    unconfigured: AtomicBool,
}

impl RecordingNotifier {
    pub(super) fn unconfigured() -> Self {
        let notifier = Self::default();
        notifier.unconfigured.store(true, Ordering::SeqCst);
        notifier
    }

    pub(super) fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("mail mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        if self.unconfigured.load(Ordering::SeqCst) {
            return Err(NotifyError::NotConfigured);
        }
        self.sent.lock().expect("mail mutex poisoned").push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub(super) struct StaticTokens {
    tokens: HashMap<String, UserId>,
}

impl StaticTokens {
    pub(super) fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            tokens: entries
                .iter()
                .map(|(token, user)| (token.to_string(), UserId(user.to_string())))
                .collect(),
        }
    }
}

impl Authenticator for StaticTokens {
    fn authenticate(&self, bearer_token: &str) -> Result<UserId, AuthError> {
        self.tokens
            .get(bearer_token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

pub(super) type TestMonitor =
    ExpiryMonitor<MemoryVehicles, MemoryNotifications, MemoryDirectory, RecordingNotifier>;

pub(super) struct Harness {
    pub(super) monitor: TestMonitor,
    pub(super) notifications: Arc<MemoryNotifications>,
    pub(super) notifier: Arc<RecordingNotifier>,
}

pub(super) fn harness(vehicles: Vec<Vehicle>, directory: MemoryDirectory) -> Harness {
    harness_with_notifier(vehicles, directory, RecordingNotifier::default())
}

pub(super) fn harness_with_notifier(
    vehicles: Vec<Vehicle>,
    directory: MemoryDirectory,
    notifier: RecordingNotifier,
) -> Harness {
    let notifications = Arc::new(MemoryNotifications::default());
    let notifier = Arc::new(notifier);
    let monitor = ExpiryMonitor::new(
        Arc::new(MemoryVehicles::with(vehicles)),
        notifications.clone(),
        Arc::new(directory),
        notifier.clone(),
        ExpiryWindows::default(),
    );

    Harness {
        monitor,
        notifications,
        notifier,
    }
}

pub(super) fn owner_directory() -> MemoryDirectory {
    MemoryDirectory::default()
        .with_user("user-1", "owner@fleet.example")
        .with_user("user-2", "second@fleet.example")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
