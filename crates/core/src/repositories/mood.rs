//! Patient mood logs.

use super::assignments::AssignmentRegistry;
use crate::identity::Identity;
use crate::models::{MoodLog, NewMoodLog};
use crate::policy::{decide, Action, RecordFilter};
use crate::store::{Collection, DocumentStore};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use mindcare_uuid::RecordId;
use std::sync::Arc;

#[derive(Clone)]
pub struct MoodLogService {
    logs: Collection<MoodLog>,
    registry: AssignmentRegistry,
}

impl MoodLogService {
    pub fn new(store: Arc<dyn DocumentStore>, registry: AssignmentRegistry) -> Self {
        Self {
            logs: Collection::new(store),
            registry,
        }
    }

    /// Record a mood entry for the calling patient.
    pub fn create(&self, caller: &Identity, entry: NewMoodLog) -> CoreResult<MoodLog> {
        decide(
            caller,
            &Action::CreateMoodLog {
                patient_id: caller.id,
            },
            &self.registry,
        )?
        .into_filter()?;
        entry.validate()?;

        let log = MoodLog {
            id: RecordId::new(),
            patient_id: caller.id,
            mood: entry.mood,
            notes: entry.notes,
            sleep_hours: entry.sleep_hours,
            energy_level: entry.energy_level,
            logged_at: Utc::now(),
        };
        self.logs.insert(&log)?;
        Ok(log)
    }

    /// The calling patient's own logs, newest first.
    pub fn list_own(&self, caller: &Identity) -> CoreResult<Vec<MoodLog>> {
        let filter = decide(caller, &Action::ReadOwnMoodLogs, &self.registry)?.into_filter()?;
        self.scoped(filter)
    }

    /// A patient's logs, for the patient, their assigned therapist or an admin.
    ///
    /// A therapist who does not hold the patient gets `NotFound`.
    pub fn list_for_patient(
        &self,
        caller: &Identity,
        patient_id: RecordId,
    ) -> CoreResult<Vec<MoodLog>> {
        let filter = decide(
            caller,
            &Action::ReadPatientMoodLogs { patient_id },
            &self.registry,
        )?
        .into_filter()?;
        self.scoped(filter)
    }

    /// Delete a log. Allowed for the patient's assigned therapist and admins, never the patient.
    pub fn delete(&self, caller: &Identity, id: RecordId) -> CoreResult<()> {
        let log = self.logs.get(id)?.ok_or(CoreError::NotFound)?;
        decide(caller, &Action::DeleteMoodLog(&log), &self.registry)?.into_filter()?;

        if !self.logs.delete(id)? {
            return Err(CoreError::NotFound);
        }
        tracing::info!(log_id = %id, deleted_by = %caller.id, "mood log deleted");
        Ok(())
    }

    fn scoped(&self, filter: RecordFilter) -> CoreResult<Vec<MoodLog>> {
        let mut logs = self.logs.find(|log| filter.admits(log))?;
        logs.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;
    use crate::models::{EnergyLevel, Mood};
    use crate::store::MemoryStore;
    use crate::test_support::seed_user;

    fn entry() -> NewMoodLog {
        NewMoodLog {
            mood: Mood::Calm,
            notes: Some("slept well".into()),
            sleep_hours: Some(8.0),
            energy_level: Some(EnergyLevel::new(7).unwrap()),
        }
    }

    #[test]
    fn only_patients_log_moods() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let therapist = seed_user(&store, Role::Therapist, "t@example.com");
        let service =
            MoodLogService::new(Arc::clone(&store), AssignmentRegistry::new(Arc::clone(&store)));

        assert!(matches!(
            service.create(&therapist, entry()),
            Err(CoreError::Forbidden)
        ));
    }

    #[test]
    fn invalid_entries_are_rejected_before_storage() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let patient = seed_user(&store, Role::Patient, "p@example.com");
        let service =
            MoodLogService::new(Arc::clone(&store), AssignmentRegistry::new(Arc::clone(&store)));

        let mut bad = entry();
        bad.sleep_hours = Some(30.0);
        assert!(matches!(
            service.create(&patient, bad),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(service.list_own(&patient).unwrap().is_empty());
    }

    #[test]
    fn own_logs_are_newest_first_and_private() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let patient = seed_user(&store, Role::Patient, "p@example.com");
        let other = seed_user(&store, Role::Patient, "q@example.com");
        let service =
            MoodLogService::new(Arc::clone(&store), AssignmentRegistry::new(Arc::clone(&store)));

        let first = service.create(&patient, entry()).unwrap();
        let second = service.create(&patient, entry()).unwrap();

        let own = service.list_own(&patient).unwrap();
        assert_eq!(own.len(), 2);
        assert!(own[0].logged_at >= own[1].logged_at);
        assert!(own.iter().any(|l| l.id == first.id));
        assert!(own.iter().any(|l| l.id == second.id));
        assert!(service.list_own(&other).unwrap().is_empty());
        assert!(matches!(
            service.list_for_patient(&other, patient.id),
            Err(CoreError::Forbidden)
        ));
    }

    #[test]
    fn delete_missing_log_is_not_found() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let admin = seed_user(&store, Role::Admin, "a@example.com");
        let service =
            MoodLogService::new(Arc::clone(&store), AssignmentRegistry::new(Arc::clone(&store)));

        assert!(matches!(
            service.delete(&admin, RecordId::new()),
            Err(CoreError::NotFound)
        ));
    }
}
