use chrono::{DateTime, Utc};
use fleet_compliance::config::MailConfig;
use fleet_compliance::workflows::compliance::import::parse_timestamp;
use fleet_compliance::workflows::compliance::{
    AuthError, Authenticator, DirectoryError, DocumentType, FleetImport, NotificationId,
    NotificationRecord, NotificationStore, Notifier, NotifyError, OutgoingMail, RepositoryError,
    UserDirectory, UserId, Vehicle, VehicleId, VehicleStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryVehicleStore {
    vehicles: Arc<Mutex<BTreeMap<VehicleId, Vehicle>>>,
}

impl InMemoryVehicleStore {
    pub(crate) fn with_vehicles(vehicles: Vec<Vehicle>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.vehicles.lock().expect("vehicle mutex poisoned");
            for vehicle in vehicles {
                guard.insert(vehicle.id.clone(), vehicle);
            }
        }
        store
    }
}

impl VehicleStore for InMemoryVehicleStore {
    fn list_all(&self) -> Result<Vec<Vehicle>, RepositoryError> {
        let guard = self.vehicles.lock().expect("vehicle mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Vehicle>, RepositoryError> {
        let guard = self.vehicles.lock().expect("vehicle mutex poisoned");
        Ok(guard
            .values()
            .filter(|vehicle| &vehicle.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationStore {
    records: Arc<Mutex<Vec<NotificationRecord>>>,
}

impl InMemoryNotificationStore {
    pub(crate) fn records(&self) -> Vec<NotificationRecord> {
        self.records.lock().expect("notification mutex poisoned").clone()
    }
}

impl NotificationStore for InMemoryNotificationStore {
    fn exists(
        &self,
        user_id: &UserId,
        vehicle_id: &VehicleId,
        document: DocumentType,
        created_after: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("notification mutex poisoned");
        Ok(guard.iter().any(|record| {
            &record.user_id == user_id
                && &record.vehicle_id == vehicle_id
                && record.notification_type == document
                && record.created_at >= created_after
        }))
    }

    fn insert(&self, record: NotificationRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("notification mutex poisoned");
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record);
        Ok(())
    }

    fn list_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("notification mutex poisoned");
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
        let mut guard = self.records.lock().expect("notification mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|record| &record.id == id && &record.user_id == user_id && !record.is_read)
            .ok_or(RepositoryError::NotFound)?;
        record.is_read = true;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUserDirectory {
    emails: Arc<BTreeMap<UserId, String>>,
}

impl InMemoryUserDirectory {
    pub(crate) fn new(emails: BTreeMap<UserId, String>) -> Self {
        Self {
            emails: Arc::new(emails),
        }
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn email(&self, user_id: &UserId) -> Result<Option<String>, DirectoryError> {
        Ok(self.emails.get(user_id).cloned())
    }
}

/// Splits an imported fleet into the stores the service runs on.
pub(crate) fn stores_from_import(
    import: FleetImport,
) -> (InMemoryVehicleStore, InMemoryUserDirectory) {
    (
        InMemoryVehicleStore::with_vehicles(import.vehicles),
        InMemoryUserDirectory::new(import.contacts),
    )
}

/// Composes reminder e-mails without sending them, for scan replays.
#[derive(Clone)]
pub(crate) struct DryRunNotifier {
    config: MailConfig,
    outbox: Arc<Mutex<Vec<OutgoingMail>>>,
}

impl DryRunNotifier {
    pub(crate) fn new(config: MailConfig) -> Self {
        Self {
            config,
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn composed(&self) -> Vec<OutgoingMail> {
        self.outbox.lock().expect("outbox mutex poisoned").clone()
    }
}

impl Notifier for DryRunNotifier {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let mail = OutgoingMail::compose(&self.config, to, subject, body)?;
        info!(to = %mail.to, subject = %mail.subject, "dry run; reminder e-mail not sent");
        self.outbox.lock().expect("outbox mutex poisoned").push(mail);
        Ok(())
    }
}

/// Bearer tokens issued out of band, loaded as `token:user_id` pairs.
#[derive(Default, Clone)]
pub(crate) struct StaticTokenAuthenticator {
    tokens: Arc<HashMap<String, UserId>>,
}

impl StaticTokenAuthenticator {
    /// Parses `token:user_id` pairs separated by commas; malformed pairs are ignored.
    pub(crate) fn parse(raw: &str) -> Self {
        let tokens = raw
            .split(',')
            .filter_map(|pair| pair.split_once(':'))
            .map(|(token, user)| (token.trim(), user.trim()))
            .filter(|(token, user)| !token.is_empty() && !user.is_empty())
            .map(|(token, user)| (token.to_string(), UserId(user.to_string())))
            .collect();

        Self {
            tokens: Arc::new(tokens),
        }
    }

    pub(crate) fn from_env() -> Self {
        std::env::var("APP_API_TOKENS")
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn authenticate(&self, bearer_token: &str) -> Result<UserId, AuthError> {
        self.tokens
            .get(bearer_token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| {
        format!("failed to parse '{raw}' as an RFC 3339 timestamp or YYYY-MM-DD date")
    })
}
