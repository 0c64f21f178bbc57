//! Prescriptions issued by therapists.
//!
//! Patients only ever see their own active prescriptions. Therapists and admins see every
//! record of any patient, including inactive ones.

use super::assignments::AssignmentRegistry;
use super::{require_user, validate_http_url};
use crate::fanout::{DomainEvent, Notifier};
use crate::identity::{Identity, Role};
use crate::models::{NewPrescription, Prescription, PrescriptionUpdate, User};
use crate::policy::{decide, Action, RecordFilter};
use crate::store::{Collection, DocumentStore};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use mindcare_uuid::RecordId;
use std::sync::Arc;

#[derive(Clone)]
pub struct PrescriptionService {
    prescriptions: Collection<Prescription>,
    users: Collection<User>,
    registry: AssignmentRegistry,
    notifier: Notifier,
}

impl PrescriptionService {
    pub fn new(store: Arc<dyn DocumentStore>, registry: AssignmentRegistry) -> Self {
        Self {
            prescriptions: Collection::new(Arc::clone(&store)),
            users: Collection::new(Arc::clone(&store)),
            registry,
            notifier: Notifier::new(store),
        }
    }

    pub fn create(&self, caller: &Identity, new: NewPrescription) -> CoreResult<Prescription> {
        decide(caller, &Action::CreatePrescription, &self.registry)?.into_filter()?;
        require_user(&self.users, new.patient_id, Role::Patient)?;
        validate_http_url("file_url", new.file_url.as_deref())?;

        let now = Utc::now();
        let prescription = Prescription {
            id: RecordId::new(),
            patient_id: new.patient_id,
            therapist_id: caller.id,
            notes: new.notes,
            file_url: new.file_url,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.prescriptions.insert(&prescription)?;

        self.notifier
            .publish(&DomainEvent::PrescriptionCreated(&prescription));
        Ok(prescription)
    }

    pub fn update(
        &self,
        caller: &Identity,
        id: RecordId,
        update: PrescriptionUpdate,
    ) -> CoreResult<Prescription> {
        let mut prescription = self.prescriptions.get(id)?.ok_or(CoreError::NotFound)?;
        decide(caller, &Action::UpdatePrescription(&prescription), &self.registry)?
            .into_filter()?;
        validate_http_url("file_url", update.file_url.as_deref())?;

        if let Some(notes) = update.notes {
            prescription.notes = notes;
        }
        if let Some(file_url) = update.file_url {
            prescription.file_url = Some(file_url);
        }
        if let Some(is_active) = update.is_active {
            prescription.is_active = is_active;
        }
        prescription.updated_at = Utc::now();

        if !self.prescriptions.update(&prescription)? {
            return Err(CoreError::NotFound);
        }
        self.notifier
            .publish(&DomainEvent::PrescriptionUpdated(&prescription));
        Ok(prescription)
    }

    /// The calling patient's active prescriptions, newest first.
    pub fn list_own(&self, caller: &Identity) -> CoreResult<Vec<Prescription>> {
        let filter =
            decide(caller, &Action::ReadOwnPrescriptions, &self.registry)?.into_filter()?;
        self.scoped(filter)
    }

    pub fn list_for_patient(
        &self,
        caller: &Identity,
        patient_id: RecordId,
    ) -> CoreResult<Vec<Prescription>> {
        let filter = decide(
            caller,
            &Action::ReadPatientPrescriptions { patient_id },
            &self.registry,
        )?
        .into_filter()?;
        self.scoped(filter)
    }

    fn scoped(&self, filter: RecordFilter) -> CoreResult<Vec<Prescription>> {
        let mut prescriptions = self.prescriptions.find(|p| filter.admits(p))?;
        prescriptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(prescriptions)
    }
}
