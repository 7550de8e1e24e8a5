//! Vehicle document expiry tracking: reminder scans, dashboards, and the inbox API.
//!
//! Every collaborator (vehicle and notification stores, the user directory, the mail
//! notifier, the authenticator, the clock) is injected through a trait so scans can be
//! replayed against fake stores and a manual clock.

pub mod clock;
pub mod dashboard;
pub mod domain;
pub mod import;
pub mod mail;
pub mod monitor;
pub mod repository;
pub mod router;
pub mod scheduler;
pub mod windows;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dashboard::{summarize, DashboardAggregator, DashboardStats, OverdueBreakdown};
pub use domain::{DocumentType, NotificationId, NotificationRecord, UserId, Vehicle, VehicleId};
pub use import::{FleetImport, FleetImportError, FleetImporter};
pub use mail::OutgoingMail;
pub use monitor::{ExpiryMonitor, MonitorError, ScanReport};
pub use repository::{
    AuthError, Authenticator, DirectoryError, NotificationStore, Notifier, NotifyError,
    RepositoryError, UserDirectory, VehicleStore,
};
pub use router::{compliance_router, ComplianceApi, NOTIFICATION_PAGE_LIMIT};
pub use scheduler::{ExpiryScan, ExpiryScheduler};
pub use windows::{days_left, ExpiryStatus, ExpiryWindows};
