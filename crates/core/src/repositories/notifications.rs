//! A recipient's own notifications.

use super::assignments::AssignmentRegistry;
use crate::identity::Identity;
use crate::models::Notification;
use crate::policy::{decide, Action};
use crate::store::{Collection, DocumentStore};
use crate::{CoreError, CoreResult};
use mindcare_uuid::RecordId;
use std::sync::Arc;

#[derive(Clone)]
pub struct NotificationService {
    notifications: Collection<Notification>,
    registry: AssignmentRegistry,
}

impl NotificationService {
    pub fn new(store: Arc<dyn DocumentStore>, registry: AssignmentRegistry) -> Self {
        Self {
            notifications: Collection::new(store),
            registry,
        }
    }

    /// The caller's notifications, newest first.
    pub fn list(&self, caller: &Identity) -> CoreResult<Vec<Notification>> {
        let filter = decide(caller, &Action::ListNotifications, &self.registry)?.into_filter()?;
        let mut notifications = self.notifications.find(|n| filter.admits(n))?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    pub fn mark_read(&self, caller: &Identity, id: RecordId) -> CoreResult<Notification> {
        let mut notification = self.notifications.get(id)?.ok_or(CoreError::NotFound)?;
        decide(caller, &Action::ManageNotification(&notification), &self.registry)?
            .into_filter()?;

        if !notification.read {
            notification.read = true;
            self.notifications.update(&notification)?;
        }
        Ok(notification)
    }

    /// Returns how many notifications changed.
    pub fn mark_all_read(&self, caller: &Identity) -> CoreResult<usize> {
        let filter = decide(caller, &Action::ListNotifications, &self.registry)?.into_filter()?;
        let mut changed = 0;
        for mut notification in self
            .notifications
            .find(|n| filter.admits(n) && !n.read)?
        {
            notification.read = true;
            if self.notifications.update(&notification)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Returns how many notifications were removed.
    pub fn delete_all(&self, caller: &Identity) -> CoreResult<usize> {
        let filter = decide(caller, &Action::ListNotifications, &self.registry)?.into_filter()?;
        self.notifications.delete_where(|n| filter.admits(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::{DomainEvent, Notifier};
    use crate::identity::Role;
    use crate::store::MemoryStore;
    use crate::test_support::seed_user;

    #[test]
    fn recipients_manage_only_their_own() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let therapist = seed_user(&store, Role::Therapist, "t@example.com");
        let patient = seed_user(&store, Role::Patient, "p@example.com");
        let service = NotificationService::new(
            Arc::clone(&store),
            AssignmentRegistry::new(Arc::clone(&store)),
        );
        Notifier::new(Arc::clone(&store)).publish(&DomainEvent::PatientUnassigned {
            therapist_id: therapist.id,
            patient_id: patient.id,
        });

        let mine = service.list(&patient).unwrap();
        assert_eq!(mine.len(), 1);
        assert!(matches!(
            service.mark_read(&therapist, mine[0].id),
            Err(CoreError::NotFound)
        ));
        assert!(service.mark_read(&patient, mine[0].id).unwrap().read);

        assert_eq!(service.mark_all_read(&therapist).unwrap(), 1);
        assert_eq!(service.mark_all_read(&therapist).unwrap(), 0);

        assert_eq!(service.delete_all(&patient).unwrap(), 1);
        assert!(service.list(&patient).unwrap().is_empty());
        assert_eq!(service.list(&therapist).unwrap().len(), 1);
    }
}
