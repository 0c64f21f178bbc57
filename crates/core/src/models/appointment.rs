use crate::constants::APPOINTMENTS_COLLECTION;
use crate::store::Document;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use mindcare_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Rescheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Allowed transitions:
    ///
    /// `scheduled | rescheduled -> rescheduled | completed | cancelled`.
    /// `completed` and `cancelled` are terminal. Setting the current status again is a no-op
    /// and is allowed for non-terminal states.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        match (self, next) {
            (Self::Completed | Self::Cancelled, _) => false,
            (_, Self::Scheduled) => *self == Self::Scheduled,
            _ => true,
        }
    }

    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "rescheduled" => Ok(Self::Rescheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(CoreError::InvalidInput(format!(
                "unknown appointment status '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Rescheduled => "rescheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleMeta {
    pub previous_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub rescheduled_by: RecordId,
    pub rescheduled_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub therapist_id: RecordId,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub reschedule: Option<RescheduleMeta>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn involves(&self, user_id: RecordId) -> bool {
        self.patient_id == user_id || self.therapist_id == user_id
    }
}

impl Document for Appointment {
    const COLLECTION: &'static str = APPOINTMENTS_COLLECTION;

    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Clone, Debug)]
pub struct NewAppointment {
    pub therapist_id: RecordId,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct AppointmentUpdate {
    pub status: Option<AppointmentStatus>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub reason: Option<String>,
}
