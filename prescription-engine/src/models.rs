use crate::error::PrescriptionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    #[default]
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl PrescriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Draft => "draft",
            PrescriptionStatus::Active => "active",
            PrescriptionStatus::Completed => "completed",
            PrescriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrescriptionStatus {
    type Err = PrescriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PrescriptionStatus::Draft),
            "active" => Ok(PrescriptionStatus::Active),
            "completed" => Ok(PrescriptionStatus::Completed),
            "cancelled" => Ok(PrescriptionStatus::Cancelled),
            other => Err(PrescriptionError::UnknownStatus(other.to_string())),
        }
    }
}

/// One medication line of a stored prescription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub medication_name: Option<String>,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
    pub quantity: Option<i32>,
    pub route: Option<String>,
    pub duration_days: Option<i32>,
    pub is_chronic: bool,
    pub is_prn: bool,
}

/// A stored prescription with its items, in item order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionSnapshot {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub status: PrescriptionStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub prescriber_name: Option<String>,
    pub items: Vec<ItemSnapshot>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn item(name: &str, dosage: &str) -> ItemSnapshot {
        ItemSnapshot {
            id: Uuid::new_v4(),
            medication_id: Uuid::new_v4(),
            medication_name: Some(name.to_string()),
            dosage: dosage.to_string(),
            frequency: "8/8h".to_string(),
            duration: "7 dias".to_string(),
            instructions: None,
            quantity: None,
            route: None,
            duration_days: None,
            is_chronic: false,
            is_prn: false,
        }
    }

    pub fn prescription(day: u32, items: Vec<ItemSnapshot>) -> PrescriptionSnapshot {
        PrescriptionSnapshot {
            id: Uuid::new_v4(),
            patient_id: Uuid::nil(),
            status: PrescriptionStatus::Active,
            notes: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
            valid_from: None,
            valid_until: None,
            prescriber_name: None,
            items,
        }
    }
}
