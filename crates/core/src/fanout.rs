//! Notification fan-out.
//!
//! [`fan_out`] turns a domain event into the notifications it implies. It is pure: events carry
//! every recipient id they need, so the mapping can be tested without a store. [`Notifier`]
//! persists the result and never lets a persistence failure reach the caller.

use crate::identity::Role;
use crate::models::{
    Appointment, ChatMessage, ChatThread, Notification, NotificationDraft, NotificationKind,
    Prescription, User,
};
use crate::store::{Collection, DocumentStore};
use chrono::Utc;
use mindcare_uuid::RecordId;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone, Copy, Debug)]
pub enum DomainEvent<'a> {
    UserRegistered {
        user: &'a User,
        admin_ids: &'a [RecordId],
    },
    /// A therapist's patient set was replaced.
    AssignmentChanged {
        therapist_id: RecordId,
        added: &'a [RecordId],
        removed: &'a [RecordId],
    },
    PatientUnassigned {
        therapist_id: RecordId,
        patient_id: RecordId,
    },
    MessageSent {
        thread: &'a ChatThread,
        message: &'a ChatMessage,
    },
    PrescriptionCreated(&'a Prescription),
    PrescriptionUpdated(&'a Prescription),
    AppointmentBooked(&'a Appointment),
    AppointmentUpdated {
        appointment: &'a Appointment,
        actor_id: RecordId,
    },
}

/// Compute the notifications implied by `event`.
pub fn fan_out(event: &DomainEvent<'_>) -> Vec<NotificationDraft> {
    match *event {
        DomainEvent::UserRegistered { user, admin_ids } => admin_ids
            .iter()
            .map(|&admin_id| NotificationDraft {
                recipient_id: admin_id,
                kind: NotificationKind::UserRegistered,
                message: format!("New {} registered: {}", user.role, user.display_name),
                meta: json!({ "user_id": user.id, "role": user.role }),
            })
            .collect(),

        DomainEvent::AssignmentChanged {
            therapist_id,
            added,
            removed,
        } => {
            let mut drafts = vec![NotificationDraft {
                recipient_id: therapist_id,
                kind: NotificationKind::AssignedPatients,
                message: match added.len() {
                    0 => "Your patient list has been updated".to_string(),
                    1 => "A new patient has been assigned to you".to_string(),
                    n => format!("{n} new patients have been assigned to you"),
                },
                meta: json!({ "patient_ids": added }),
            }];
            drafts.extend(added.iter().map(|&patient_id| NotificationDraft {
                recipient_id: patient_id,
                kind: NotificationKind::TherapistAssigned,
                message: "A therapist has been assigned to you".to_string(),
                meta: json!({ "therapist_id": therapist_id }),
            }));
            for &patient_id in removed {
                drafts.extend(unassigned(therapist_id, patient_id));
            }
            drafts
        }

        DomainEvent::PatientUnassigned {
            therapist_id,
            patient_id,
        } => unassigned(therapist_id, patient_id).to_vec(),

        DomainEvent::MessageSent { thread, message } => vec![NotificationDraft {
            recipient_id: thread.other_participant(message.sender_id),
            kind: NotificationKind::NewMessage,
            message: match message.sender_role {
                Role::Therapist => "New message from your therapist".to_string(),
                _ => "New message from a patient".to_string(),
            },
            meta: json!({ "thread_id": thread.id, "message_id": message.id }),
        }],

        DomainEvent::PrescriptionCreated(prescription) => vec![NotificationDraft {
            recipient_id: prescription.patient_id,
            kind: NotificationKind::NewPrescription,
            message: "A new prescription has been issued".to_string(),
            meta: json!({ "prescription_id": prescription.id }),
        }],

        DomainEvent::PrescriptionUpdated(prescription) => vec![NotificationDraft {
            recipient_id: prescription.patient_id,
            kind: NotificationKind::UpdatePrescription,
            message: "Your prescription has been updated".to_string(),
            meta: json!({
                "prescription_id": prescription.id,
                "is_active": prescription.is_active,
            }),
        }],

        DomainEvent::AppointmentBooked(appointment) => vec![NotificationDraft {
            recipient_id: appointment.therapist_id,
            kind: NotificationKind::NewAppointment,
            message: format!(
                "New appointment booked for {}",
                appointment.scheduled_at.to_rfc3339()
            ),
            meta: json!({ "appointment_id": appointment.id }),
        }],

        DomainEvent::AppointmentUpdated {
            appointment,
            actor_id,
        } => {
            let recipient_id = if actor_id == appointment.patient_id {
                appointment.therapist_id
            } else {
                appointment.patient_id
            };
            vec![NotificationDraft {
                recipient_id,
                kind: NotificationKind::AppointmentUpdated,
                message: format!("Your appointment is now {}", appointment.status),
                meta: json!({
                    "appointment_id": appointment.id,
                    "status": appointment.status,
                    "scheduled_at": appointment.scheduled_at,
                }),
            }]
        }
    }
}

fn unassigned(therapist_id: RecordId, patient_id: RecordId) -> [NotificationDraft; 2] {
    [
        NotificationDraft {
            recipient_id: therapist_id,
            kind: NotificationKind::UserUnassigned,
            message: "A patient has been removed from your list".to_string(),
            meta: json!({ "patient_id": patient_id }),
        },
        NotificationDraft {
            recipient_id: patient_id,
            kind: NotificationKind::TherapistUnassigned,
            message: "Your therapist assignment has ended".to_string(),
            meta: json!({ "therapist_id": therapist_id }),
        },
    ]
}

/// Persists fan-out results.
#[derive(Clone)]
pub struct Notifier {
    notifications: Collection<Notification>,
}

impl Notifier {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            notifications: Collection::new(store),
        }
    }

    /// Store every notification implied by `event` in one batch.
    ///
    /// Failures are logged and dropped; the triggering operation has already succeeded.
    pub fn publish(&self, event: &DomainEvent<'_>) {
        let drafts = fan_out(event);
        if drafts.is_empty() {
            return;
        }

        let created_at = Utc::now();
        let batch: Vec<Notification> = drafts
            .into_iter()
            .map(|draft| draft.into_notification(created_at))
            .collect();

        if let Err(err) = self.notifications.insert_many(&batch) {
            tracing::warn!(
                count = batch.len(),
                kind = %batch[0].kind,
                "failed to persist notifications: {err}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use crate::store::MemoryStore;
    use crate::{CoreError, CoreResult};
    use mindcare_types::{EmailAddress, NonEmptyText};
    use serde_json::Value;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: RecordId::new(),
            role,
            display_name: NonEmptyText::new("Sam").unwrap(),
            email: EmailAddress::parse("sam@example.com").unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    fn thread(patient_id: RecordId, therapist_id: RecordId) -> ChatThread {
        let now = Utc::now();
        ChatThread {
            id: RecordId::new(),
            patient_id,
            therapist_id,
            last_message: None,
            last_updated: now,
            created_at: now,
        }
    }

    #[test]
    fn registration_notifies_every_admin() {
        let patient = user(Role::Patient);
        let admins = [RecordId::new(), RecordId::new()];
        let drafts = fan_out(&DomainEvent::UserRegistered {
            user: &patient,
            admin_ids: &admins,
        });

        assert_eq!(drafts.len(), 2);
        assert!(drafts
            .iter()
            .all(|d| d.kind == NotificationKind::UserRegistered));
        assert_eq!(drafts[1].recipient_id, admins[1]);
    }

    #[test]
    fn assignment_notifies_therapist_new_and_dropped_patients() {
        let therapist_id = RecordId::new();
        let added = [RecordId::new()];
        let removed = [RecordId::new()];
        let drafts = fan_out(&DomainEvent::AssignmentChanged {
            therapist_id,
            added: &added,
            removed: &removed,
        });

        let kinds: Vec<_> = drafts.iter().map(|d| (d.recipient_id, d.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (therapist_id, NotificationKind::AssignedPatients),
                (added[0], NotificationKind::TherapistAssigned),
                (therapist_id, NotificationKind::UserUnassigned),
                (removed[0], NotificationKind::TherapistUnassigned),
            ]
        );
    }

    #[test]
    fn message_notifies_the_other_participant() {
        let patient_id = RecordId::new();
        let therapist_id = RecordId::new();
        let thread = thread(patient_id, therapist_id);
        let message = ChatMessage {
            id: RecordId::new(),
            thread_id: thread.id,
            sender_id: patient_id,
            sender_role: Role::Patient,
            text: NonEmptyText::new("hello").unwrap(),
            sent_at: Utc::now(),
        };

        let drafts = fan_out(&DomainEvent::MessageSent {
            thread: &thread,
            message: &message,
        });
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].recipient_id, therapist_id);
        assert_eq!(drafts[0].kind, NotificationKind::NewMessage);
    }

    #[test]
    fn appointment_update_notifies_the_other_side() {
        let now = Utc::now();
        let appointment = Appointment {
            id: RecordId::new(),
            patient_id: RecordId::new(),
            therapist_id: RecordId::new(),
            scheduled_at: now,
            status: AppointmentStatus::Cancelled,
            notes: None,
            reschedule: None,
            created_at: now,
            updated_at: now,
        };

        let drafts = fan_out(&DomainEvent::AppointmentUpdated {
            appointment: &appointment,
            actor_id: appointment.patient_id,
        });
        assert_eq!(drafts[0].recipient_id, appointment.therapist_id);
        assert!(drafts[0].message.contains("cancelled"));
    }

    struct BrokenStore;

    impl DocumentStore for BrokenStore {
        fn insert(&self, _: &str, _: RecordId, _: Value) -> CoreResult<()> {
            Err(CoreError::StoreLockPoisoned)
        }

        fn get(&self, _: &str, _: RecordId) -> CoreResult<Option<Value>> {
            Err(CoreError::StoreLockPoisoned)
        }

        fn list(&self, _: &str) -> CoreResult<Vec<Value>> {
            Err(CoreError::StoreLockPoisoned)
        }

        fn replace(&self, _: &str, _: RecordId, _: Value) -> CoreResult<bool> {
            Err(CoreError::StoreLockPoisoned)
        }

        fn remove(&self, _: &str, _: RecordId) -> CoreResult<bool> {
            Err(CoreError::StoreLockPoisoned)
        }
    }

    #[test]
    fn publish_swallows_store_failures() {
        let notifier = Notifier::new(Arc::new(BrokenStore));
        notifier.publish(&DomainEvent::PatientUnassigned {
            therapist_id: RecordId::new(),
            patient_id: RecordId::new(),
        });
    }

    #[test]
    fn publish_persists_drafts() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let notifier = Notifier::new(Arc::clone(&store));
        let patient_id = RecordId::new();
        notifier.publish(&DomainEvent::PatientUnassigned {
            therapist_id: RecordId::new(),
            patient_id,
        });

        let stored = Collection::<Notification>::new(store).all().unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored
            .iter()
            .any(|n| n.recipient_id == patient_id && !n.read));
    }
}
