//! Assignment Registry.
//!
//! The therapist↔patient roster is stored as one [`AssignmentEdge`] document per pair rather
//! than one document per therapist holding a patient array. Replacing a therapist's set only
//! touches the edges that change, and concurrent edits to different patients cannot overwrite
//! each other.
//!
//! A patient belongs to at most one therapist. Assigning a patient held elsewhere fails with
//! [`CoreError::AlreadyAssigned`].

use super::require_user;
use crate::fanout::{DomainEvent, Notifier};
use crate::identity::{Identity, Role};
use crate::models::{Assignment, AssignmentEdge, User};
use crate::policy::{decide, Action, RosterLookup};
use crate::store::{Collection, DocumentStore};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use mindcare_uuid::RecordId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct AssignmentRegistry {
    edges: Collection<AssignmentEdge>,
    users: Collection<User>,
    notifier: Notifier,
    // Held from the uniqueness check through the last edge write.
    edit_lock: Arc<Mutex<()>>,
}

impl AssignmentRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            edges: Collection::new(Arc::clone(&store)),
            users: Collection::new(Arc::clone(&store)),
            notifier: Notifier::new(store),
            edit_lock: Arc::new(Mutex::new(())),
        }
    }

    fn lock_edits(&self) -> CoreResult<MutexGuard<'_, ()>> {
        self.edit_lock
            .lock()
            .map_err(|_| CoreError::StoreLockPoisoned)
    }

    /// Replace the therapist's patient set with `patient_ids`.
    ///
    /// Edges missing from the new set are deleted and new ones inserted; edges present in both
    /// are left alone. The therapist is notified, as is every newly assigned or dropped patient.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the caller is an admin.
    /// - `NotFound` if the therapist or any patient id does not name a user of that role.
    /// - `AlreadyAssigned` if a patient is held by another therapist.
    pub fn assign(
        &self,
        caller: &Identity,
        therapist_id: RecordId,
        patient_ids: impl IntoIterator<Item = RecordId>,
    ) -> CoreResult<Assignment> {
        decide(caller, &Action::ManageAssignments, self)?.into_filter()?;

        require_user(&self.users, therapist_id, Role::Therapist)?;
        let wanted: BTreeSet<RecordId> = patient_ids.into_iter().collect();
        for &patient_id in &wanted {
            require_user(&self.users, patient_id, Role::Patient)?;
        }

        let guard = self.lock_edits()?;
        let edges = self.edges.all()?;
        if let Some(taken) = edges
            .iter()
            .find(|e| e.therapist_id != therapist_id && wanted.contains(&e.patient_id))
        {
            return Err(CoreError::AlreadyAssigned(taken.patient_id));
        }

        let current: BTreeSet<RecordId> = edges
            .iter()
            .filter(|e| e.therapist_id == therapist_id)
            .map(|e| e.patient_id)
            .collect();
        let added: Vec<RecordId> = wanted.difference(&current).copied().collect();
        let removed: Vec<RecordId> = current.difference(&wanted).copied().collect();

        for edge in edges
            .iter()
            .filter(|e| e.therapist_id == therapist_id && removed.contains(&e.patient_id))
        {
            self.edges.delete(edge.id)?;
        }

        let created_at = Utc::now();
        let new_edges: Vec<AssignmentEdge> = added
            .iter()
            .map(|&patient_id| AssignmentEdge {
                id: RecordId::new(),
                therapist_id,
                patient_id,
                created_at,
            })
            .collect();
        self.edges.insert_many(&new_edges)?;
        drop(guard);

        tracing::info!(
            %therapist_id,
            added = added.len(),
            removed = removed.len(),
            "assignment updated"
        );
        self.notifier.publish(&DomainEvent::AssignmentChanged {
            therapist_id,
            added: &added,
            removed: &removed,
        });

        Ok(Assignment {
            therapist_id,
            patient_ids: wanted,
        })
    }

    /// Remove one patient from a therapist's set.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the caller is an admin.
    /// - `NotFound` if the therapist has no assignment edges at all.
    /// - `NotAssigned` if the patient is not in the therapist's set.
    pub fn unassign(
        &self,
        caller: &Identity,
        therapist_id: RecordId,
        patient_id: RecordId,
    ) -> CoreResult<Assignment> {
        decide(caller, &Action::ManageAssignments, self)?.into_filter()?;

        let guard = self.lock_edits()?;
        let edges = self.edges.find(|e| e.therapist_id == therapist_id)?;
        if edges.is_empty() {
            return Err(CoreError::NotFound);
        }
        let edge = edges
            .iter()
            .find(|e| e.patient_id == patient_id)
            .ok_or(CoreError::NotAssigned)?;
        self.edges.delete(edge.id)?;
        drop(guard);

        tracing::info!(%therapist_id, %patient_id, "patient unassigned");
        self.notifier.publish(&DomainEvent::PatientUnassigned {
            therapist_id,
            patient_id,
        });

        Ok(Assignment::from_edges(
            therapist_id,
            edges.iter().filter(|e| e.patient_id != patient_id),
        ))
    }

    pub fn assigned_patients_of(&self, therapist_id: RecordId) -> CoreResult<BTreeSet<RecordId>> {
        Ok(self
            .edges
            .find(|e| e.therapist_id == therapist_id)?
            .into_iter()
            .map(|e| e.patient_id)
            .collect())
    }

    pub fn assigned_therapist_of(&self, patient_id: RecordId) -> CoreResult<Option<RecordId>> {
        Ok(self
            .edges
            .find_one(|e| e.patient_id == patient_id)?
            .map(|e| e.therapist_id))
    }

    /// The therapist's roster, visible to admins and to the therapist themself.
    pub fn roster(&self, caller: &Identity, therapist_id: RecordId) -> CoreResult<Assignment> {
        decide(caller, &Action::ReadRoster { therapist_id }, self)?.into_filter()?;
        Ok(Assignment {
            therapist_id,
            patient_ids: self.assigned_patients_of(therapist_id)?,
        })
    }

    /// Every therapist's roster. Admin only.
    pub fn list(&self, caller: &Identity) -> CoreResult<Vec<Assignment>> {
        decide(caller, &Action::ManageAssignments, self)?.into_filter()?;

        let mut by_therapist: BTreeMap<RecordId, BTreeSet<RecordId>> = BTreeMap::new();
        for edge in self.edges.all()? {
            by_therapist
                .entry(edge.therapist_id)
                .or_default()
                .insert(edge.patient_id);
        }
        Ok(by_therapist
            .into_iter()
            .map(|(therapist_id, patient_ids)| Assignment {
                therapist_id,
                patient_ids,
            })
            .collect())
    }

    /// Drop every edge the user takes part in, on either side. Returns the number removed.
    pub(crate) fn remove_user(&self, user_id: RecordId) -> CoreResult<usize> {
        let _guard = self.lock_edits()?;
        let removed = self
            .edges
            .delete_where(|e| e.therapist_id == user_id || e.patient_id == user_id)?;
        if removed > 0 {
            tracing::info!(%user_id, removed, "assignment edges removed");
        }
        Ok(removed)
    }
}

impl RosterLookup for AssignmentRegistry {
    fn is_assigned(&self, therapist_id: RecordId, patient_id: RecordId) -> CoreResult<bool> {
        Ok(self
            .edges
            .find_one(|e| e.therapist_id == therapist_id && e.patient_id == patient_id)?
            .is_some())
    }
}
