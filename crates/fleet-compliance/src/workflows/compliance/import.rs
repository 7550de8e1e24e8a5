use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use super::domain::{UserId, Vehicle, VehicleId};

#[derive(Debug, thiserror::Error)]
pub enum FleetImportError {
    #[error("failed to read fleet export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid fleet CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: '{value}' in column {column} is not an RFC 3339 timestamp or YYYY-MM-DD date")]
    InvalidTimestamp {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("line {line}: vehicle '{vehicle_id}' listed twice")]
    DuplicateVehicle { line: u64, vehicle_id: String },
}

/// Vehicles and owner contacts loaded from a fleet export.
#[derive(Debug, Clone, Default)]
pub struct FleetImport {
    pub vehicles: Vec<Vehicle>,
    pub contacts: BTreeMap<UserId, String>,
}

pub struct FleetImporter;

impl FleetImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<FleetImport, FleetImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<FleetImport, FleetImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut import = FleetImport::default();
        let mut seen = HashSet::new();

        for record in csv_reader.deserialize::<FleetRow>() {
            let row = record?;
            // Header is line 1.
            let line = import.vehicles.len() as u64 + 2;

            if !seen.insert(row.vehicle_id.clone()) {
                return Err(FleetImportError::DuplicateVehicle {
                    line,
                    vehicle_id: row.vehicle_id,
                });
            }

            let user_id = UserId(row.user_id.clone());
            if let Some(email) = row.email.clone() {
                import.contacts.insert(user_id.clone(), email);
            }

            let vehicle = Vehicle {
                id: VehicleId(row.vehicle_id.clone()),
                user_id,
                registration_number: row.registration_number.to_uppercase(),
                vehicle_type: row.vehicle_type.clone(),
                manufacturer: row.manufacturer.clone(),
                model: row.model.clone(),
                road_tax_expiry: timestamp(line, "road_tax_expiry", row.road_tax_expiry)?,
                insurance_expiry: timestamp(line, "insurance_expiry", row.insurance_expiry)?,
                puc_expiry: timestamp(line, "puc_expiry", row.puc_expiry)?,
                fitness_expiry: timestamp(line, "fitness_expiry", row.fitness_expiry)?,
            };
            import.vehicles.push(vehicle);
        }

        Ok(import)
    }
}

#[derive(Debug, Deserialize)]
struct FleetRow {
    vehicle_id: String,
    user_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    registration_number: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    vehicle_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    manufacturer: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    model: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    road_tax_expiry: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    insurance_expiry: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    puc_expiry: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    fitness_expiry: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn timestamp(
    line: u64,
    column: &'static str,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, FleetImportError> {
    match raw {
        None => Ok(None),
        Some(value) => match parse_timestamp(&value) {
            Some(parsed) => Ok(Some(parsed)),
            None => Err(FleetImportError::InvalidTimestamp {
                line,
                column,
                value,
            }),
        },
    }
}

/// Accepts RFC 3339, or naive date-times/dates which are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
