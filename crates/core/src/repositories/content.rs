//! Self-help content library.

use super::assignments::AssignmentRegistry;
use super::validate_http_url;
use crate::identity::Identity;
use crate::models::{normalise_tags, Content, ContentQuery, ContentUpdate, NewContent};
use crate::policy::{decide, Action};
use crate::store::{Collection, DocumentStore};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use mindcare_uuid::RecordId;
use std::sync::Arc;

#[derive(Clone)]
pub struct ContentService {
    content: Collection<Content>,
    registry: AssignmentRegistry,
}

impl ContentService {
    pub fn new(store: Arc<dyn DocumentStore>, registry: AssignmentRegistry) -> Self {
        Self {
            content: Collection::new(store),
            registry,
        }
    }

    pub fn create(&self, caller: &Identity, new: NewContent) -> CoreResult<Content> {
        decide(caller, &Action::ManageContent, &self.registry)?.into_filter()?;
        validate_http_url("url", new.url.as_deref())?;

        let now = Utc::now();
        let content = Content {
            id: RecordId::new(),
            title: new.title,
            content_type: new.content_type,
            url: new.url,
            tags: normalise_tags(new.tags),
            description: new.description,
            owner_id: caller.id,
            created_at: now,
            updated_at: now,
        };
        self.content.insert(&content)?;
        Ok(content)
    }

    /// Listing with optional type and tag filters, newest first.
    pub fn list(&self, caller: &Identity, query: &ContentQuery) -> CoreResult<Vec<Content>> {
        decide(caller, &Action::ReadContent, &self.registry)?.into_filter()?;
        let mut items = self.content.find(|c| query.matches(c))?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    pub fn get(&self, caller: &Identity, id: RecordId) -> CoreResult<Content> {
        decide(caller, &Action::ReadContent, &self.registry)?.into_filter()?;
        self.content.get(id)?.ok_or(CoreError::NotFound)
    }

    pub fn update(
        &self,
        caller: &Identity,
        id: RecordId,
        update: ContentUpdate,
    ) -> CoreResult<Content> {
        decide(caller, &Action::ManageContent, &self.registry)?.into_filter()?;
        validate_http_url("url", update.url.as_deref())?;
        let mut content = self.content.get(id)?.ok_or(CoreError::NotFound)?;

        if let Some(title) = update.title {
            content.title = title;
        }
        if let Some(content_type) = update.content_type {
            content.content_type = content_type;
        }
        if let Some(url) = update.url {
            content.url = Some(url);
        }
        if let Some(tags) = update.tags {
            content.tags = normalise_tags(tags);
        }
        if let Some(description) = update.description {
            content.description = Some(description);
        }
        content.updated_at = Utc::now();

        if !self.content.update(&content)? {
            return Err(CoreError::NotFound);
        }
        Ok(content)
    }

    pub fn delete(&self, caller: &Identity, id: RecordId) -> CoreResult<()> {
        decide(caller, &Action::ManageContent, &self.registry)?.into_filter()?;
        if !self.content.delete(id)? {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;
    use crate::models::ContentType;
    use crate::store::MemoryStore;
    use crate::test_support::seed_user;
    use mindcare_types::NonEmptyText;

    fn article(title: &str, tags: &[&str]) -> NewContent {
        NewContent {
            title: NonEmptyText::new(title).unwrap(),
            content_type: ContentType::Article,
            url: Some("https://example.com/read".into()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: None,
        }
    }

    #[test]
    fn patients_read_but_do_not_manage() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let patient = seed_user(&store, Role::Patient, "p@example.com");
        let therapist = seed_user(&store, Role::Therapist, "t@example.com");
        let service =
            ContentService::new(Arc::clone(&store), AssignmentRegistry::new(Arc::clone(&store)));

        assert!(matches!(
            service.create(&patient, article("Breathing", &[])),
            Err(CoreError::Forbidden)
        ));
        let created = service
            .create(&therapist, article("Breathing", &["Anxiety"]))
            .unwrap();
        assert_eq!(service.get(&patient, created.id).unwrap().tags, ["anxiety"]);
        assert!(matches!(
            service.delete(&patient, created.id),
            Err(CoreError::Forbidden)
        ));
    }

    #[test]
    fn listing_filters_by_type_and_tag() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let admin = seed_user(&store, Role::Admin, "a@example.com");
        let service =
            ContentService::new(Arc::clone(&store), AssignmentRegistry::new(Arc::clone(&store)));

        service
            .create(&admin, article("Sleep hygiene", &["sleep"]))
            .unwrap();
        service
            .create(
                &admin,
                NewContent {
                    content_type: ContentType::Exercise,
                    ..article("Box breathing", &["anxiety", "breathing"])
                },
            )
            .unwrap();

        let exercises = service
            .list(
                &admin,
                &ContentQuery {
                    content_type: Some(ContentType::Exercise),
                    tag: None,
                },
            )
            .unwrap();
        assert_eq!(exercises.len(), 1);

        let sleep = service
            .list(
                &admin,
                &ContentQuery {
                    content_type: None,
                    tag: Some("SLEEP".into()),
                },
            )
            .unwrap();
        assert_eq!(sleep[0].title.as_str(), "Sleep hygiene");
        assert_eq!(service.list(&admin, &ContentQuery::default()).unwrap().len(), 2);
    }

    #[test]
    fn update_and_delete() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let therapist = seed_user(&store, Role::Therapist, "t@example.com");
        let service =
            ContentService::new(Arc::clone(&store), AssignmentRegistry::new(Arc::clone(&store)));
        let created = service.create(&therapist, article("Draft", &[])).unwrap();

        let updated = service
            .update(
                &therapist,
                created.id,
                ContentUpdate {
                    title: Some(NonEmptyText::new("Final").unwrap()),
                    ..ContentUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title.as_str(), "Final");

        service.delete(&therapist, created.id).unwrap();
        assert!(matches!(
            service.get(&therapist, created.id),
            Err(CoreError::NotFound)
        ));
    }
}
