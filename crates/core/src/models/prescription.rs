use crate::constants::PRESCRIPTIONS_COLLECTION;
use crate::store::Document;
use chrono::{DateTime, Utc};
use mindcare_uuid::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub therapist_id: RecordId,
    pub notes: String,
    pub file_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Prescription {
    const COLLECTION: &'static str = PRESCRIPTIONS_COLLECTION;

    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Clone, Debug)]
pub struct NewPrescription {
    pub patient_id: RecordId,
    pub notes: String,
    pub file_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PrescriptionUpdate {
    pub notes: Option<String>,
    pub file_url: Option<String>,
    pub is_active: Option<bool>,
}
