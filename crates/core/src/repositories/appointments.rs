//! Appointment booking and lifecycle.
//!
//! Patients book; the appointment's therapist updates status, time and notes; either
//! participant may cancel. Status moves along [`AppointmentStatus::can_transition_to`] and a new
//! time always means `rescheduled`.

use super::assignments::AssignmentRegistry;
use super::require_user;
use crate::fanout::{DomainEvent, Notifier};
use crate::identity::{Identity, Role};
use crate::models::{
    Appointment, AppointmentStatus, AppointmentUpdate, NewAppointment, RescheduleMeta, User,
};
use crate::policy::{decide, Action};
use crate::store::{Collection, DocumentStore};
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use mindcare_uuid::RecordId;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppointmentService {
    appointments: Collection<Appointment>,
    users: Collection<User>,
    registry: AssignmentRegistry,
    notifier: Notifier,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn DocumentStore>, registry: AssignmentRegistry) -> Self {
        Self {
            appointments: Collection::new(Arc::clone(&store)),
            users: Collection::new(Arc::clone(&store)),
            registry,
            notifier: Notifier::new(store),
        }
    }

    /// Book an appointment with a therapist. The caller must be a patient.
    pub fn create(&self, caller: &Identity, new: NewAppointment) -> CoreResult<Appointment> {
        decide(caller, &Action::CreateAppointment, &self.registry)?.into_filter()?;
        require_user(&self.users, new.therapist_id, Role::Therapist)?;

        let now = Utc::now();
        ensure_future(new.scheduled_at, now)?;

        let appointment = Appointment {
            id: RecordId::new(),
            patient_id: caller.id,
            therapist_id: new.therapist_id,
            scheduled_at: new.scheduled_at,
            status: AppointmentStatus::Scheduled,
            notes: new.notes,
            reschedule: None,
            created_at: now,
            updated_at: now,
        };
        self.appointments.insert(&appointment)?;

        self.notifier
            .publish(&DomainEvent::AppointmentBooked(&appointment));
        Ok(appointment)
    }

    /// Appointments visible to the caller, soonest first.
    pub fn list(&self, caller: &Identity) -> CoreResult<Vec<Appointment>> {
        let filter = decide(caller, &Action::ListAppointments, &self.registry)?.into_filter()?;
        let mut appointments = self.appointments.find(|a| filter.admits(a))?;
        appointments.sort_by_key(|a| (a.scheduled_at, a.id));
        Ok(appointments)
    }

    pub fn get(&self, caller: &Identity, id: RecordId) -> CoreResult<Appointment> {
        let appointment = self.load(id)?;
        decide(caller, &Action::ReadAppointment(&appointment), &self.registry)?.into_filter()?;
        Ok(appointment)
    }

    /// Therapist-side update.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the caller is the appointment's therapist.
    /// - `InvalidInput` for a status move the lifecycle does not allow, a new time that is not
    ///   in the future or is combined with a status other than `rescheduled`, or a reason given
    ///   without a new time.
    pub fn update(
        &self,
        caller: &Identity,
        id: RecordId,
        update: AppointmentUpdate,
    ) -> CoreResult<Appointment> {
        let mut appointment = self.load(id)?;
        decide(caller, &Action::UpdateAppointment(&appointment), &self.registry)?
            .into_filter()?;

        let now = Utc::now();
        let new_time = update
            .scheduled_at
            .filter(|&at| at != appointment.scheduled_at);
        match new_time {
            Some(at) => ensure_future(at, now)?,
            None if update.reason.is_some() => {
                return Err(CoreError::InvalidInput(
                    "a reschedule reason needs a new scheduled_at".into(),
                ))
            }
            None => {}
        }

        let target = match (new_time, update.status) {
            (Some(_), None | Some(AppointmentStatus::Rescheduled)) => {
                Some(AppointmentStatus::Rescheduled)
            }
            (Some(_), Some(other)) => {
                return Err(CoreError::InvalidInput(format!(
                    "a new time implies rescheduled, not {other}"
                )))
            }
            (None, status) => status,
        };

        if let Some(next) = target {
            transition(&mut appointment, next)?;
        }
        if let Some(at) = new_time {
            appointment.reschedule = Some(RescheduleMeta {
                previous_at: appointment.scheduled_at,
                reason: update.reason,
                rescheduled_by: caller.id,
                rescheduled_at: now,
            });
            appointment.scheduled_at = at;
        }
        if let Some(notes) = update.notes {
            appointment.notes = Some(notes);
        }
        appointment.updated_at = now;

        self.save(&appointment)?;
        self.notifier.publish(&DomainEvent::AppointmentUpdated {
            appointment: &appointment,
            actor_id: caller.id,
        });
        Ok(appointment)
    }

    /// Cancel on behalf of either participant.
    pub fn cancel(&self, caller: &Identity, id: RecordId) -> CoreResult<Appointment> {
        let mut appointment = self.load(id)?;
        decide(caller, &Action::CancelAppointment(&appointment), &self.registry)?
            .into_filter()?;

        transition(&mut appointment, AppointmentStatus::Cancelled)?;
        appointment.updated_at = Utc::now();

        self.save(&appointment)?;
        self.notifier.publish(&DomainEvent::AppointmentUpdated {
            appointment: &appointment,
            actor_id: caller.id,
        });
        Ok(appointment)
    }

    fn load(&self, id: RecordId) -> CoreResult<Appointment> {
        self.appointments.get(id)?.ok_or(CoreError::NotFound)
    }

    fn save(&self, appointment: &Appointment) -> CoreResult<()> {
        if self.appointments.update(appointment)? {
            Ok(())
        } else {
            Err(CoreError::NotFound)
        }
    }
}

fn ensure_future(at: DateTime<Utc>, now: DateTime<Utc>) -> CoreResult<()> {
    if at <= now {
        return Err(CoreError::InvalidInput(
            "appointments must be scheduled in the future".into(),
        ));
    }
    Ok(())
}

fn transition(appointment: &mut Appointment, next: AppointmentStatus) -> CoreResult<()> {
    if !appointment.status.can_transition_to(next) {
        return Err(CoreError::InvalidInput(format!(
            "cannot move appointment from {} to {}",
            appointment.status, next
        )));
    }
    appointment.status = next;
    Ok(())
}
