//! # MindCare Core
//!
//! Access control and record services for the MindCare mental-health backend.
//!
//! The crate answers three questions for every request:
//! - may this identity perform this action ([`policy::decide`]),
//! - which records may it see ([`policy::RecordFilter`]),
//! - who must be told about what just happened ([`fanout::fan_out`]).
//!
//! Records live behind the [`store::DocumentStore`] trait, with an in-memory backend for tests
//! and a sharded JSON file backend for deployments. [`CoreServices`] wires every service to one
//! store.
//!
//! **No API concerns**: token verification, HTTP routing and status codes belong in
//! `api-shared` and `api-rest`.

pub mod companion;
pub mod config;
pub mod constants;
pub mod error;
pub mod fanout;
pub mod identity;
pub mod models;
pub mod policy;
pub mod repositories;
pub mod store;

pub use config::CoreConfig;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use identity::{Identity, Role};
pub use mindcare_types::{EmailAddress, NonEmptyText, TextError};
pub use mindcare_uuid::RecordId;

use companion::{CompanionModel, CompanionService, OllamaModel};
use repositories::appointments::AppointmentService;
use repositories::assignments::AssignmentRegistry;
use repositories::chat::ChatService;
use repositories::content::ContentService;
use repositories::mood::MoodLogService;
use repositories::notifications::NotificationService;
use repositories::prescriptions::PrescriptionService;
use repositories::users::UserService;
use std::sync::Arc;
use store::DocumentStore;

/// Every record service, sharing one document store.
#[derive(Clone)]
pub struct CoreServices {
    pub users: UserService,
    pub assignments: AssignmentRegistry,
    pub appointments: AppointmentService,
    pub moods: MoodLogService,
    pub prescriptions: PrescriptionService,
    pub chat: ChatService,
    pub content: ContentService,
    pub notifications: NotificationService,
    pub companion: CompanionService,
}

impl CoreServices {
    pub fn new(store: Arc<dyn DocumentStore>, companion: Option<Arc<dyn CompanionModel>>) -> Self {
        let registry = AssignmentRegistry::new(Arc::clone(&store));
        Self {
            users: UserService::new(Arc::clone(&store), registry.clone()),
            appointments: AppointmentService::new(Arc::clone(&store), registry.clone()),
            moods: MoodLogService::new(Arc::clone(&store), registry.clone()),
            prescriptions: PrescriptionService::new(Arc::clone(&store), registry.clone()),
            chat: ChatService::new(Arc::clone(&store), registry.clone()),
            content: ContentService::new(Arc::clone(&store), registry.clone()),
            notifications: NotificationService::new(store, registry.clone()),
            companion: CompanionService::new(companion, Arc::new(registry.clone())),
            assignments: registry,
        }
    }

    /// Open the configured store and companion model.
    ///
    /// # Errors
    ///
    /// Returns `CoreError` if the file store directory cannot be created.
    pub fn from_config(cfg: &CoreConfig) -> CoreResult<Self> {
        let store = cfg.open_store()?;
        let companion = cfg
            .companion()
            .map(|c| Arc::new(OllamaModel::new(c)) as Arc<dyn CompanionModel>);
        Ok(Self::new(store, companion))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::{NewUser, User};
    use crate::store::Collection;
    use chrono::Utc;

    pub fn new_user(role: Role, email: &str) -> NewUser {
        NewUser {
            role,
            display_name: NonEmptyText::new(email.split('@').next().unwrap_or("user")).unwrap(),
            email: EmailAddress::parse(email).unwrap(),
        }
    }

    /// Insert a user directly and return its identity.
    pub fn seed_user(store: &Arc<dyn DocumentStore>, role: Role, email: &str) -> Identity {
        let new = new_user(role, email);
        let now = Utc::now();
        let user = User {
            id: RecordId::new(),
            role: new.role,
            display_name: new.display_name,
            email: new.email,
            created_at: now,
            updated_at: now,
        };
        Collection::<User>::new(Arc::clone(store))
            .insert(&user)
            .unwrap();
        user.identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Mood, NewMoodLog, NewPrescription, Notification, NotificationKind, PrescriptionUpdate,
        SendMessage,
    };
    use crate::constants::NOTIFICATIONS_COLLECTION;
    use crate::models::{ChatMessage, Prescription};
    use crate::store::{Collection, FileStore, MemoryStore};
    use crate::test_support::seed_user;
    use serde_json::Value;

    /// Delegates to a [`MemoryStore`] but refuses every notification write.
    struct NotificationsDown(MemoryStore);

    impl NotificationsDown {
        fn refuse(collection: &str) -> CoreResult<()> {
            if collection == NOTIFICATIONS_COLLECTION {
                return Err(CoreError::StoreLockPoisoned);
            }
            Ok(())
        }
    }

    impl DocumentStore for NotificationsDown {
        fn insert(&self, collection: &str, id: RecordId, doc: Value) -> CoreResult<()> {
            Self::refuse(collection)?;
            self.0.insert(collection, id, doc)
        }

        fn insert_many(&self, collection: &str, docs: Vec<(RecordId, Value)>) -> CoreResult<()> {
            Self::refuse(collection)?;
            self.0.insert_many(collection, docs)
        }

        fn get(&self, collection: &str, id: RecordId) -> CoreResult<Option<Value>> {
            self.0.get(collection, id)
        }

        fn list(&self, collection: &str) -> CoreResult<Vec<Value>> {
            self.0.list(collection)
        }

        fn replace(&self, collection: &str, id: RecordId, doc: Value) -> CoreResult<bool> {
            self.0.replace(collection, id, doc)
        }

        fn remove(&self, collection: &str, id: RecordId) -> CoreResult<bool> {
            self.0.remove(collection, id)
        }
    }

    struct World {
        store: Arc<dyn DocumentStore>,
        core: CoreServices,
        admin: Identity,
    }

    fn world_on(store: Arc<dyn DocumentStore>) -> World {
        let admin = seed_user(&store, Role::Admin, "admin@example.com");
        World {
            core: CoreServices::new(Arc::clone(&store), None),
            store,
            admin,
        }
    }

    fn world() -> World {
        world_on(Arc::new(MemoryStore::new()))
    }

    fn kinds_for(store: &Arc<dyn DocumentStore>, recipient: RecordId) -> Vec<NotificationKind> {
        Collection::<Notification>::new(Arc::clone(store))
            .find(|n| n.recipient_id == recipient)
            .unwrap()
            .into_iter()
            .map(|n| n.kind)
            .collect()
    }

    fn mood(mood: Mood) -> NewMoodLog {
        NewMoodLog {
            mood,
            notes: None,
            sleep_hours: None,
            energy_level: None,
        }
    }

    fn message_to(recipient: RecordId, text: &str) -> SendMessage {
        SendMessage {
            thread_id: None,
            recipient_id: Some(recipient),
            text: NonEmptyText::new(text).unwrap(),
        }
    }

    #[test]
    fn assign_makes_roster_and_reverse_lookup_agree() {
        let w = world();
        let t = seed_user(&w.store, Role::Therapist, "t@example.com");
        let p = seed_user(&w.store, Role::Patient, "p@example.com");

        w.core.assignments.assign(&w.admin, t.id, [p.id]).unwrap();

        assert!(w.core.assignments.assigned_patients_of(t.id).unwrap().contains(&p.id));
        assert_eq!(w.core.assignments.assigned_therapist_of(p.id).unwrap(), Some(t.id));
    }

    #[test]
    fn unassign_removes_patient_from_both_views() {
        let w = world();
        let t = seed_user(&w.store, Role::Therapist, "t@example.com");
        let p = seed_user(&w.store, Role::Patient, "p@example.com");
        w.core.assignments.assign(&w.admin, t.id, [p.id]).unwrap();

        w.core.assignments.unassign(&w.admin, t.id, p.id).unwrap();

        assert!(!w.core.assignments.assigned_patients_of(t.id).unwrap().contains(&p.id));
        assert_eq!(w.core.assignments.assigned_therapist_of(p.id).unwrap(), None);
    }

    #[test]
    fn mood_logs_visible_to_patient_and_assigned_therapist_only() {
        let w = world();
        let t = seed_user(&w.store, Role::Therapist, "t@example.com");
        let other = seed_user(&w.store, Role::Therapist, "o@example.com");
        let p = seed_user(&w.store, Role::Patient, "p@example.com");
        w.core.moods.create(&p, mood(Mood::Sad)).unwrap();

        assert_eq!(w.core.moods.list_for_patient(&p, p.id).unwrap().len(), 1);
        assert!(matches!(
            w.core.moods.list_for_patient(&t, p.id),
            Err(CoreError::NotFound)
        ));

        w.core.assignments.assign(&w.admin, t.id, [p.id]).unwrap();
        assert_eq!(w.core.moods.list_for_patient(&t, p.id).unwrap().len(), 1);
        assert!(matches!(
            w.core.moods.list_for_patient(&other, p.id),
            Err(CoreError::NotFound)
        ));
    }

    #[test]
    fn chat_thread_created_once_per_pair() {
        let w = world();
        let t = seed_user(&w.store, Role::Therapist, "t@example.com");
        let p = seed_user(&w.store, Role::Patient, "p@example.com");

        let first = w.core.chat.send(&p, message_to(t.id, "hi")).unwrap();
        let second = w.core.chat.send(&p, message_to(t.id, "again")).unwrap();

        assert_eq!(first.thread_id, second.thread_id);
        assert_eq!(w.core.chat.list_threads(&p).unwrap().len(), 1);
    }

    #[test]
    fn same_role_chat_is_forbidden_and_leaves_no_trace() {
        let w = world();
        let p1 = seed_user(&w.store, Role::Patient, "p1@example.com");
        let p2 = seed_user(&w.store, Role::Patient, "p2@example.com");

        assert!(matches!(
            w.core.chat.send(&p1, message_to(p2.id, "hey")),
            Err(CoreError::Forbidden)
        ));
        assert!(w.core.chat.list_threads(&p1).unwrap().is_empty());
        assert!(w.core.chat.list_threads(&p2).unwrap().is_empty());
        assert!(kinds_for(&w.store, p2.id).is_empty());
    }

    #[test]
    fn inactive_prescription_hidden_from_patient_only() {
        let w = world();
        let t = seed_user(&w.store, Role::Therapist, "t@example.com");
        let p = seed_user(&w.store, Role::Patient, "p@example.com");
        let rx = w
            .core
            .prescriptions
            .create(
                &t,
                NewPrescription {
                    patient_id: p.id,
                    notes: "melatonin 3mg".into(),
                    file_url: None,
                },
            )
            .unwrap();
        w.core
            .prescriptions
            .update(
                &t,
                rx.id,
                PrescriptionUpdate {
                    is_active: Some(false),
                    ..PrescriptionUpdate::default()
                },
            )
            .unwrap();

        assert!(w.core.prescriptions.list_own(&p).unwrap().is_empty());
        let issued = w.core.prescriptions.list_for_patient(&t, p.id).unwrap();
        assert_eq!(issued.len(), 1);
        assert!(!issued[0].is_active);
    }

    #[test]
    fn mood_log_delete_rules() {
        let w = world();
        let t = seed_user(&w.store, Role::Therapist, "t@example.com");
        let p = seed_user(&w.store, Role::Patient, "p@example.com");
        w.core.assignments.assign(&w.admin, t.id, [p.id]).unwrap();
        let first = w.core.moods.create(&p, mood(Mood::Angry)).unwrap();
        let second = w.core.moods.create(&p, mood(Mood::Calm)).unwrap();

        assert!(matches!(
            w.core.moods.delete(&p, first.id),
            Err(CoreError::Forbidden)
        ));
        w.core.moods.delete(&t, first.id).unwrap();
        w.core.moods.delete(&w.admin, second.id).unwrap();
        assert!(w.core.moods.list_own(&p).unwrap().is_empty());
    }

    #[test]
    fn reassignment_scenario_moves_mood_visibility() {
        let w = world();
        let p1 = seed_user(&w.store, Role::Patient, "p1@example.com");
        let t1 = seed_user(&w.store, Role::Therapist, "t1@example.com");
        let t2 = seed_user(&w.store, Role::Therapist, "t2@example.com");

        w.core.assignments.assign(&w.admin, t1.id, [p1.id]).unwrap();
        assert!(kinds_for(&w.store, t1.id).contains(&NotificationKind::AssignedPatients));
        assert!(kinds_for(&w.store, p1.id).contains(&NotificationKind::TherapistAssigned));

        w.core.moods.create(&p1, mood(Mood::Anxious)).unwrap();
        assert_eq!(w.core.moods.list_for_patient(&t1, p1.id).unwrap().len(), 1);
        assert!(matches!(
            w.core.moods.list_for_patient(&t2, p1.id),
            Err(CoreError::NotFound)
        ));

        w.core.assignments.unassign(&w.admin, t1.id, p1.id).unwrap();
        assert!(kinds_for(&w.store, t1.id).contains(&NotificationKind::UserUnassigned));
        assert!(kinds_for(&w.store, p1.id).contains(&NotificationKind::TherapistUnassigned));
        assert!(matches!(
            w.core.moods.list_for_patient(&t1, p1.id),
            Err(CoreError::NotFound)
        ));

        w.core.assignments.assign(&w.admin, t2.id, [p1.id]).unwrap();
        assert_eq!(w.core.moods.list_for_patient(&t2, p1.id).unwrap().len(), 1);
    }

    #[test]
    fn first_contact_chat_scenario() {
        let w = world();
        let p2 = seed_user(&w.store, Role::Patient, "p2@example.com");
        let t1 = seed_user(&w.store, Role::Therapist, "t1@example.com");

        w.core.chat.send(&p2, message_to(t1.id, "Hello, I'd like to talk")).unwrap();
        let thread_id = w.core.chat.list_threads(&t1).unwrap()[0].id;
        w.core
            .chat
            .send(
                &p2,
                SendMessage {
                    thread_id: Some(thread_id),
                    recipient_id: None,
                    text: NonEmptyText::new("Are you there?").unwrap(),
                },
            )
            .unwrap();

        assert_eq!(w.core.chat.list_threads(&p2).unwrap().len(), 1);
        assert_eq!(w.core.chat.messages(&t1, thread_id).unwrap().len(), 2);
        let t1_kinds = kinds_for(&w.store, t1.id);
        assert_eq!(t1_kinds.len(), 2);
        assert!(t1_kinds.iter().all(|k| *k == NotificationKind::NewMessage));
    }

    #[test]
    fn file_backed_services_persist_across_instances() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(FileStore::open(tmp.path()).unwrap());
        let w = world_on(Arc::clone(&store));
        let t = seed_user(&w.store, Role::Therapist, "t@example.com");
        let p = seed_user(&w.store, Role::Patient, "p@example.com");
        w.core.assignments.assign(&w.admin, t.id, [p.id]).unwrap();

        let reopened: Arc<dyn DocumentStore> = Arc::new(FileStore::open(tmp.path()).unwrap());
        let core = CoreServices::new(reopened, None);
        assert_eq!(core.assignments.assigned_therapist_of(p.id).unwrap(), Some(t.id));
        assert_eq!(core.notifications.list(&p).unwrap().len(), 1);
    }

    #[test]
    fn failed_notification_writes_do_not_fail_the_operation() {
        let w = world_on(Arc::new(NotificationsDown(MemoryStore::new())));
        let t = seed_user(&w.store, Role::Therapist, "t@example.com");
        let p = seed_user(&w.store, Role::Patient, "p@example.com");

        w.core.assignments.assign(&w.admin, t.id, [p.id]).unwrap();
        let sent = w.core.chat.send(&p, message_to(t.id, "Hello")).unwrap();
        let rx = w
            .core
            .prescriptions
            .create(
                &t,
                NewPrescription {
                    patient_id: p.id,
                    notes: "sertraline 50mg".into(),
                    file_url: None,
                },
            )
            .unwrap();

        let messages = Collection::<ChatMessage>::new(Arc::clone(&w.store))
            .all()
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, sent.id);
        assert_eq!(w.core.chat.messages(&t, sent.thread_id).unwrap().len(), 1);
        let stored_rx = Collection::<Prescription>::new(Arc::clone(&w.store))
            .get(rx.id)
            .unwrap();
        assert!(stored_rx.is_some());
        assert_eq!(w.core.assignments.assigned_therapist_of(p.id).unwrap(), Some(t.id));
        assert!(kinds_for(&w.store, t.id).is_empty());
        assert!(kinds_for(&w.store, p.id).is_empty());
    }
}
