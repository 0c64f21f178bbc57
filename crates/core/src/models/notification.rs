use crate::constants::NOTIFICATIONS_COLLECTION;
use crate::store::Document;
use chrono::{DateTime, Utc};
use mindcare_uuid::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    UserRegistered,
    AssignedPatients,
    TherapistAssigned,
    UserUnassigned,
    TherapistUnassigned,
    NewMessage,
    NewPrescription,
    UpdatePrescription,
    NewAppointment,
    AppointmentUpdated,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserRegistered => "user_registered",
            Self::AssignedPatients => "assigned_patients",
            Self::TherapistAssigned => "therapist_assigned",
            Self::UserUnassigned => "user_unassigned",
            Self::TherapistUnassigned => "therapist_unassigned",
            Self::NewMessage => "new_message",
            Self::NewPrescription => "new_prescription",
            Self::UpdatePrescription => "update_prescription",
            Self::NewAppointment => "new_appointment",
            Self::AppointmentUpdated => "appointment_updated",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: RecordId,
    pub recipient_id: RecordId,
    pub kind: NotificationKind,
    pub message: String,
    pub meta: Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Document for Notification {
    const COLLECTION: &'static str = NOTIFICATIONS_COLLECTION;

    fn id(&self) -> RecordId {
        self.id
    }
}

/// A notification computed by the fan-out but not yet persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct NotificationDraft {
    pub recipient_id: RecordId,
    pub kind: NotificationKind,
    pub message: String,
    pub meta: Value,
}

impl NotificationDraft {
    pub fn into_notification(self, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id: RecordId::new(),
            recipient_id: self.recipient_id,
            kind: self.kind,
            message: self.message,
            meta: self.meta,
            read: false,
            created_at,
        }
    }
}
