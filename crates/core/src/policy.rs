//! Access Policy Evaluator.
//!
//! [`decide`] maps an identity and an intended action to either an allow decision carrying the
//! [`RecordFilter`] to apply to result sets, or a denial. It performs no writes and consults the
//! roster only for therapist/patient-scoped actions.
//!
//! Denials come in two shapes:
//! - [`DenyReason::Forbidden`]: the caller's role or ownership does not permit the action.
//! - [`DenyReason::NotVisible`]: the target is outside the caller's scope. Transports render
//!   this exactly like a record that does not exist, so callers cannot probe for existence
//!   (for example a therapist asking for the mood logs of a patient not on their roster).

use crate::identity::{Identity, Role};
use crate::models::{Appointment, ChatThread, MoodLog, Notification, Prescription};
use crate::{CoreError, CoreResult};
use mindcare_uuid::RecordId;

/// Read-only roster view needed for therapist-scoped decisions.
pub trait RosterLookup {
    fn is_assigned(&self, therapist_id: RecordId, patient_id: RecordId) -> CoreResult<bool>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    Forbidden,
    NotVisible,
}

/// Restriction an allow decision places on the records a caller may see.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordFilter {
    Unrestricted,
    /// Records whose patient is the given id.
    Patient(RecordId),
    /// Records of the given patient with the active flag set.
    ActiveForPatient(RecordId),
    /// Records whose therapist is the given id.
    Therapist(RecordId),
    /// Records where the given id is either the patient or the therapist.
    Participant(RecordId),
    /// Records addressed to the given id.
    Recipient(RecordId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow(RecordFilter),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    /// Converts a denial into the matching error: `Forbidden` or `NotFound`.
    pub fn into_filter(self) -> CoreResult<RecordFilter> {
        match self {
            Decision::Allow(filter) => Ok(filter),
            Decision::Deny(DenyReason::Forbidden) => Err(CoreError::Forbidden),
            Decision::Deny(DenyReason::NotVisible) => Err(CoreError::NotFound),
        }
    }
}

/// Ownership metadata a [`RecordFilter`] is evaluated against.
pub trait Scoped {
    fn patient_id(&self) -> Option<RecordId> {
        None
    }

    fn therapist_id(&self) -> Option<RecordId> {
        None
    }

    fn recipient_id(&self) -> Option<RecordId> {
        None
    }

    fn is_active(&self) -> bool {
        true
    }
}

impl RecordFilter {
    pub fn admits<T: Scoped>(&self, record: &T) -> bool {
        match *self {
            RecordFilter::Unrestricted => true,
            RecordFilter::Patient(id) => record.patient_id() == Some(id),
            RecordFilter::ActiveForPatient(id) => {
                record.patient_id() == Some(id) && record.is_active()
            }
            RecordFilter::Therapist(id) => record.therapist_id() == Some(id),
            RecordFilter::Participant(id) => {
                record.patient_id() == Some(id) || record.therapist_id() == Some(id)
            }
            RecordFilter::Recipient(id) => record.recipient_id() == Some(id),
        }
    }
}

impl Scoped for Appointment {
    fn patient_id(&self) -> Option<RecordId> {
        Some(self.patient_id)
    }

    fn therapist_id(&self) -> Option<RecordId> {
        Some(self.therapist_id)
    }
}

impl Scoped for MoodLog {
    fn patient_id(&self) -> Option<RecordId> {
        Some(self.patient_id)
    }
}

impl Scoped for Prescription {
    fn patient_id(&self) -> Option<RecordId> {
        Some(self.patient_id)
    }

    fn therapist_id(&self) -> Option<RecordId> {
        Some(self.therapist_id)
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

impl Scoped for ChatThread {
    fn patient_id(&self) -> Option<RecordId> {
        Some(self.patient_id)
    }

    fn therapist_id(&self) -> Option<RecordId> {
        Some(self.therapist_id)
    }
}

impl Scoped for Notification {
    fn recipient_id(&self) -> Option<RecordId> {
        Some(self.recipient_id)
    }
}

/// Everything a caller can ask the core to do.
#[derive(Clone, Copy, Debug)]
pub enum Action<'a> {
    CreateAppointment,
    ListAppointments,
    ReadAppointment(&'a Appointment),
    UpdateAppointment(&'a Appointment),
    CancelAppointment(&'a Appointment),

    CreateMoodLog { patient_id: RecordId },
    ReadOwnMoodLogs,
    ReadPatientMoodLogs { patient_id: RecordId },
    DeleteMoodLog(&'a MoodLog),

    CreatePrescription,
    UpdatePrescription(&'a Prescription),
    ReadOwnPrescriptions,
    ReadPatientPrescriptions { patient_id: RecordId },

    StartThread { recipient_role: Role },
    PostToThread(&'a ChatThread),
    ListThreads,
    ReadThread(&'a ChatThread),

    ManageContent,
    ReadContent,

    ManageUsers,
    ReadTherapistDirectory,
    ReadOwnProfile,
    UpdateOwnProfile,

    ManageAssignments,
    ReadRoster { therapist_id: RecordId },

    ListNotifications,
    ManageNotification(&'a Notification),

    UseCompanion,
}

const ALLOW_ALL: Decision = Decision::Allow(RecordFilter::Unrestricted);
const FORBIDDEN: Decision = Decision::Deny(DenyReason::Forbidden);
const NOT_VISIBLE: Decision = Decision::Deny(DenyReason::NotVisible);

/// Decide whether `identity` may perform `action`.
///
/// Errors only if the roster lookup itself fails.
pub fn decide(
    identity: &Identity,
    action: &Action<'_>,
    roster: &dyn RosterLookup,
) -> CoreResult<Decision> {
    use Role::*;

    let me = identity.id;
    let role = identity.role;

    let decision = match *action {
        Action::CreateAppointment => match role {
            Patient => Decision::Allow(RecordFilter::Patient(me)),
            Therapist | Admin => FORBIDDEN,
        },
        Action::ListAppointments => match role {
            Patient => Decision::Allow(RecordFilter::Patient(me)),
            Therapist => Decision::Allow(RecordFilter::Therapist(me)),
            Admin => ALLOW_ALL,
        },
        Action::ReadAppointment(appointment) => {
            if role == Admin || appointment.involves(me) {
                ALLOW_ALL
            } else {
                NOT_VISIBLE
            }
        }
        Action::UpdateAppointment(appointment) => {
            if role == Therapist && appointment.therapist_id == me {
                ALLOW_ALL
            } else {
                FORBIDDEN
            }
        }
        Action::CancelAppointment(appointment) => match role {
            Patient if appointment.patient_id == me => ALLOW_ALL,
            Therapist if appointment.therapist_id == me => ALLOW_ALL,
            _ => FORBIDDEN,
        },

        Action::CreateMoodLog { patient_id } => {
            if role == Patient && patient_id == me {
                Decision::Allow(RecordFilter::Patient(me))
            } else {
                FORBIDDEN
            }
        }
        Action::ReadOwnMoodLogs => match role {
            Patient => Decision::Allow(RecordFilter::Patient(me)),
            Therapist | Admin => FORBIDDEN,
        },
        Action::ReadPatientMoodLogs { patient_id } => match role {
            Admin => Decision::Allow(RecordFilter::Patient(patient_id)),
            Therapist => {
                if roster.is_assigned(me, patient_id)? {
                    Decision::Allow(RecordFilter::Patient(patient_id))
                } else {
                    NOT_VISIBLE
                }
            }
            Patient if patient_id == me => Decision::Allow(RecordFilter::Patient(me)),
            Patient => FORBIDDEN,
        },
        Action::DeleteMoodLog(log) => match role {
            Admin => ALLOW_ALL,
            Therapist => {
                if roster.is_assigned(me, log.patient_id)? {
                    ALLOW_ALL
                } else {
                    NOT_VISIBLE
                }
            }
            Patient => FORBIDDEN,
        },

        Action::CreatePrescription | Action::UpdatePrescription(_) => match role {
            Therapist => ALLOW_ALL,
            Patient | Admin => FORBIDDEN,
        },
        Action::ReadOwnPrescriptions => match role {
            Patient => Decision::Allow(RecordFilter::ActiveForPatient(me)),
            Therapist | Admin => FORBIDDEN,
        },
        Action::ReadPatientPrescriptions { patient_id } => match role {
            Therapist | Admin => Decision::Allow(RecordFilter::Patient(patient_id)),
            Patient if patient_id == me => Decision::Allow(RecordFilter::ActiveForPatient(me)),
            Patient => FORBIDDEN,
        },

        Action::StartThread { recipient_role } => match (role, recipient_role) {
            (Patient, Therapist) | (Therapist, Patient) => {
                Decision::Allow(RecordFilter::Participant(me))
            }
            _ => FORBIDDEN,
        },
        Action::PostToThread(thread) | Action::ReadThread(thread) => {
            if thread.has_participant(me) {
                Decision::Allow(RecordFilter::Participant(me))
            } else {
                NOT_VISIBLE
            }
        }
        Action::ListThreads => match role {
            Patient => Decision::Allow(RecordFilter::Patient(me)),
            Therapist => Decision::Allow(RecordFilter::Therapist(me)),
            Admin => FORBIDDEN,
        },

        Action::ManageContent => match role {
            Therapist | Admin => ALLOW_ALL,
            Patient => FORBIDDEN,
        },
        Action::ReadContent => ALLOW_ALL,

        Action::ManageUsers | Action::ManageAssignments => match role {
            Admin => ALLOW_ALL,
            Patient | Therapist => FORBIDDEN,
        },
        Action::ReadTherapistDirectory => ALLOW_ALL,
        Action::ReadOwnProfile | Action::UpdateOwnProfile => ALLOW_ALL,
        Action::ReadRoster { therapist_id } => match role {
            Admin => ALLOW_ALL,
            Therapist if therapist_id == me => Decision::Allow(RecordFilter::Therapist(me)),
            _ => FORBIDDEN,
        },

        Action::ListNotifications => Decision::Allow(RecordFilter::Recipient(me)),
        Action::ManageNotification(notification) => {
            if notification.recipient_id == me {
                Decision::Allow(RecordFilter::Recipient(me))
            } else {
                NOT_VISIBLE
            }
        }

        Action::UseCompanion => ALLOW_ALL,
    };

    Ok(decision)
}
