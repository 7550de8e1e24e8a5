use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{DocumentType, UserId, Vehicle};
use super::repository::{RepositoryError, VehicleStore};
use super::windows::{ExpiryStatus, ExpiryWindows};

/// Overdue counts broken down by monitored document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueBreakdown {
    pub road_tax: usize,
    pub insurance: usize,
    pub puc: usize,
}

impl OverdueBreakdown {
    fn increment(&mut self, document: DocumentType) {
        match document {
            DocumentType::RoadTax => self.road_tax += 1,
            DocumentType::Insurance => self.insurance += 1,
            DocumentType::Puc => self.puc += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.road_tax + self.insurance + self.puc
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_vehicles: usize,
    pub expiring_this_month: usize,
    pub overdue: OverdueBreakdown,
}

/// Point-in-time summary of a fleet. Fitness expiries are not counted.
pub fn summarize(
    vehicles: &[Vehicle],
    now: DateTime<Utc>,
    windows: &ExpiryWindows,
) -> DashboardStats {
    let mut stats = DashboardStats {
        total_vehicles: vehicles.len(),
        ..DashboardStats::default()
    };

    for (document, expiry) in vehicles.iter().flat_map(|vehicle| vehicle.tracked_expiries()) {
        match windows.classify(expiry, now) {
            ExpiryStatus::Overdue => stats.overdue.increment(document),
            ExpiryStatus::ExpiringSoon => stats.expiring_this_month += 1,
            ExpiryStatus::Later => {}
        }
    }

    stats
}

pub struct DashboardAggregator<V> {
    vehicles: Arc<V>,
    windows: ExpiryWindows,
}

impl<V> DashboardAggregator<V>
where
    V: VehicleStore + 'static,
{
    pub fn new(vehicles: Arc<V>, windows: ExpiryWindows) -> Self {
        Self { vehicles, windows }
    }

    pub fn stats(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<DashboardStats, RepositoryError> {
        let vehicles = self.vehicles.list_by_user(user_id)?;
        Ok(summarize(&vehicles, now, &self.windows))
    }
}
