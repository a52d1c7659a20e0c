use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoseUnit {
    Mg,
    Ml,
    Pastilla,
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoseUnit::Mg => write!(f, "mg"),
            DoseUnit::Ml => write!(f, "ml"),
            DoseUnit::Pastilla => write!(f, "pastilla"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicationStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Weeks,
    Months,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentDuration {
    pub amount: u32,
    pub unit: DurationUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: i64,
    pub name: String,
    pub dose_amount: String,
    pub dose_unit: DoseUnit,
    pub frequency_hours: u32,
    pub start_date: DateTime<Utc>,
    pub status: MedicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<TreatmentDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Medication {
    pub fn is_active(&self) -> bool {
        self.status == MedicationStatus::Active
    }

    /// "500mg", "1pastilla" — amount and unit as the dashboard shows them.
    pub fn dose_label(&self) -> String {
        format!("{}{}", self.dose_amount, self.dose_unit)
    }
}

/// Body of `POST /medications`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedication {
    pub name: String,
    pub dose_amount: String,
    pub dose_unit: DoseUnit,
    pub frequency_hours: u32,
    #[serde(default)]
    pub treatment: Option<TreatmentDuration>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DoseStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub medication: Medication,
    pub next_dose_time: DateTime<Utc>,
    pub status: DoseStatus,
}

/// Dashboard row for an active medication.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationSummary {
    pub medication: Medication,
    pub next_dose_time: DateTime<Utc>,
    pub frequency_label: &'static str,
    pub dose_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub medication: Medication,
    pub taken: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub name: String,
    pub dose_amount: String,
    pub dose_unit: DoseUnit,
    pub time: DateTime<Utc>,
    pub taken: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryDay {
    pub date: NaiveDate,
    pub entries: Vec<HistoryItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medication_uses_storage_field_names() {
        let json = r#"{
            "id": 1704067200000,
            "name": "Paracetamol",
            "doseAmount": "500",
            "doseUnit": "mg",
            "frequencyHours": 8,
            "startDate": "2024-01-01T00:00:00Z",
            "status": "active"
        }"#;
        let med: Medication = serde_json::from_str(json).unwrap();
        assert_eq!(med.dose_unit, DoseUnit::Mg);
        assert!(med.is_active());
        assert!(med.treatment.is_none());
        assert_eq!(med.dose_label(), "500mg");

        let out = serde_json::to_string(&med).unwrap();
        assert!(out.contains("\"frequencyHours\":8"));
        assert!(!out.contains("notes"));
    }

    #[test]
    fn test_new_medication_with_treatment() {
        let json = r#"{
            "name": "Ibuprofeno",
            "doseAmount": "1",
            "doseUnit": "pastilla",
            "frequencyHours": 12,
            "treatment": { "amount": 2, "unit": "weeks" },
            "notes": "Tomar después de las comidas"
        }"#;
        let req: NewMedication = serde_json::from_str(json).unwrap();
        assert_eq!(req.dose_unit, DoseUnit::Pastilla);
        assert_eq!(
            req.treatment,
            Some(TreatmentDuration {
                amount: 2,
                unit: DurationUnit::Weeks
            })
        );
    }

    #[test]
    fn test_unknown_dose_unit_rejected() {
        let json = r#"{"name":"x","doseAmount":"1","doseUnit":"gotas","frequencyHours":8}"#;
        assert!(serde_json::from_str::<NewMedication>(json).is_err());
    }
}
