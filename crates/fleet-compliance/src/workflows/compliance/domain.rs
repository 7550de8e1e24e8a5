use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for account holders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Identifier wrapper for registered vehicles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

/// Identifier wrapper for persisted notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Statutory documents watched by the expiry monitor and the dashboard.
///
/// Fitness certificates are stored on [`Vehicle`] but are not part of this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    RoadTax,
    Insurance,
    Puc,
}

impl DocumentType {
    pub const fn monitored() -> [Self; 3] {
        [Self::RoadTax, Self::Insurance, Self::Puc]
    }

    /// Title-cased key, as shown in reminder titles.
    pub const fn label(self) -> &'static str {
        match self {
            Self::RoadTax => "Road Tax",
            Self::Insurance => "Insurance",
            Self::Puc => "Puc",
        }
    }

    /// Lower-case wording used inside reminder sentences.
    pub const fn phrase(self) -> &'static str {
        match self {
            Self::RoadTax => "road tax",
            Self::Insurance => "insurance",
            Self::Puc => "puc",
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::RoadTax => "road_tax",
            Self::Insurance => "insurance",
            Self::Puc => "puc",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Vehicle snapshot as held by the vehicle store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub user_id: UserId,
    pub registration_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub road_tax_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub insurance_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub puc_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fitness_expiry: Option<DateTime<Utc>>,
}

impl Vehicle {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        registration_number: impl Into<String>,
    ) -> Self {
        Self {
            id: VehicleId(id.into()),
            user_id: UserId(user_id.into()),
            registration_number: registration_number.into(),
            vehicle_type: None,
            manufacturer: None,
            model: None,
            road_tax_expiry: None,
            insurance_expiry: None,
            puc_expiry: None,
            fitness_expiry: None,
        }
    }

    pub fn expiry(&self, document: DocumentType) -> Option<DateTime<Utc>> {
        match document {
            DocumentType::RoadTax => self.road_tax_expiry,
            DocumentType::Insurance => self.insurance_expiry,
            DocumentType::Puc => self.puc_expiry,
        }
    }

    pub fn with_expiry(mut self, document: DocumentType, expiry: DateTime<Utc>) -> Self {
        match document {
            DocumentType::RoadTax => self.road_tax_expiry = Some(expiry),
            DocumentType::Insurance => self.insurance_expiry = Some(expiry),
            DocumentType::Puc => self.puc_expiry = Some(expiry),
        }
        self
    }

    /// Monitored documents that carry an expiry, in scan order.
    pub fn tracked_expiries(&self) -> impl Iterator<Item = (DocumentType, DateTime<Utc>)> + '_ {
        DocumentType::monitored()
            .into_iter()
            .filter_map(|document| self.expiry(document).map(|expiry| (document, expiry)))
    }
}

/// Persisted reminder shown in the user's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub user_id: UserId,
    pub vehicle_id: VehicleId,
    pub notification_type: DocumentType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Build the "expiring soon" reminder for one vehicle document.
    pub fn expiry_reminder(
        vehicle: &Vehicle,
        document: DocumentType,
        days_left: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            user_id: vehicle.user_id.clone(),
            vehicle_id: vehicle.id.clone(),
            notification_type: document,
            title: format!("{} Expiring Soon", document.label()),
            message: format!(
                "Vehicle {} {} expires in {} days",
                vehicle.registration_number,
                document.phrase(),
                days_left
            ),
            is_read: false,
            created_at,
        }
    }
}
