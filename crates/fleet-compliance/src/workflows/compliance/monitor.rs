use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{DocumentType, NotificationRecord, Vehicle};
use super::repository::{
    NotificationStore, Notifier, RepositoryError, UserDirectory, VehicleStore,
};
use super::windows::{days_left, ExpiryWindows};

/// Scans every vehicle for documents about to lapse and records one reminder per
/// (vehicle, document) per cool-down window.
pub struct ExpiryMonitor<V, N, U, S> {
    vehicles: Arc<V>,
    notifications: Arc<N>,
    users: Arc<U>,
    notifier: Arc<S>,
    windows: ExpiryWindows,
}

/// Counters describing a single scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub vehicles_scanned: usize,
    pub vehicles_skipped: usize,
    pub reminders_created: usize,
    pub duplicates_suppressed: usize,
    pub delivery_failures: usize,
    pub store_failures: usize,
    pub created: Vec<NotificationRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("failed to load vehicles for expiry scan: {0}")]
    Vehicles(#[from] RepositoryError),
}

enum Outcome {
    Created(NotificationRecord),
    Duplicate,
    NotDue,
    StoreFailure,
}

impl<V, N, U, S> ExpiryMonitor<V, N, U, S>
where
    V: VehicleStore + 'static,
    N: NotificationStore + 'static,
    U: UserDirectory + 'static,
    S: Notifier + 'static,
{
    pub fn new(
        vehicles: Arc<V>,
        notifications: Arc<N>,
        users: Arc<U>,
        notifier: Arc<S>,
        windows: ExpiryWindows,
    ) -> Self {
        Self {
            vehicles,
            notifications,
            users,
            notifier,
            windows,
        }
    }

    pub fn windows(&self) -> ExpiryWindows {
        self.windows
    }

    /// Run one pass over the full fleet as of `now`.
    pub fn scan(&self, now: DateTime<Utc>) -> Result<ScanReport, MonitorError> {
        info!(%now, "running scheduled expiry check");

        let vehicles = self.vehicles.list_all()?;
        let mut report = ScanReport::default();

        for vehicle in &vehicles {
            self.scan_vehicle(vehicle, now, &mut report);
        }

        info!(
            vehicles = report.vehicles_scanned,
            skipped = report.vehicles_skipped,
            created = report.reminders_created,
            suppressed = report.duplicates_suppressed,
            delivery_failures = report.delivery_failures,
            store_failures = report.store_failures,
            "expiry check completed"
        );
        Ok(report)
    }

    fn scan_vehicle(&self, vehicle: &Vehicle, now: DateTime<Utc>, report: &mut ScanReport) {
        let email = match self.users.email(&vehicle.user_id) {
            Ok(Some(email)) => email,
            Ok(None) => {
                warn!(
                    vehicle_id = %vehicle.id,
                    user_id = %vehicle.user_id,
                    "vehicle owner not found; skipping vehicle"
                );
                report.vehicles_skipped += 1;
                return;
            }
            Err(err) => {
                warn!(
                    vehicle_id = %vehicle.id,
                    user_id = %vehicle.user_id,
                    error = %err,
                    "owner lookup failed; skipping vehicle"
                );
                report.vehicles_skipped += 1;
                return;
            }
        };

        report.vehicles_scanned += 1;

        for (document, expiry) in vehicle.tracked_expiries() {
            match self.remind(vehicle, document, expiry, now) {
                Outcome::Created(record) => {
                    report.reminders_created += 1;
                    if let Err(err) = self.notifier.send(&email, &record.title, &record.message) {
                        report.delivery_failures += 1;
                        warn!(
                            vehicle_id = %vehicle.id,
                            doc_type = %document,
                            error = %err,
                            "reminder stored but e-mail delivery failed"
                        );
                    }
                    report.created.push(record);
                }
                Outcome::Duplicate => report.duplicates_suppressed += 1,
                Outcome::StoreFailure => report.store_failures += 1,
                Outcome::NotDue => {}
            }
        }
    }

    fn remind(
        &self,
        vehicle: &Vehicle,
        document: DocumentType,
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Outcome {
        if !self.windows.is_due_for_reminder(expiry, now) {
            return Outcome::NotDue;
        }

        let cutoff = self.windows.dedup_cutoff(now);
        match self
            .notifications
            .exists(&vehicle.user_id, &vehicle.id, document, cutoff)
        {
            Ok(true) => {
                debug!(vehicle_id = %vehicle.id, doc_type = %document, "reminder already sent");
                return Outcome::Duplicate;
            }
            Ok(false) => {}
            Err(err) => {
                warn!(
                    vehicle_id = %vehicle.id,
                    doc_type = %document,
                    error = %err,
                    "dedup lookup failed; abandoning document"
                );
                return Outcome::StoreFailure;
            }
        }

        let record =
            NotificationRecord::expiry_reminder(vehicle, document, days_left(expiry, now), now);
        if let Err(err) = self.notifications.insert(record.clone()) {
            warn!(
                vehicle_id = %vehicle.id,
                doc_type = %document,
                error = %err,
                "failed to persist reminder; abandoning document"
            );
            return Outcome::StoreFailure;
        }

        debug!(
            vehicle_id = %vehicle.id,
            doc_type = %document,
            notification_id = %record.id,
            "reminder created"
        );
        Outcome::Created(record)
    }
}
