//! User accounts.
//!
//! Registration creates patients and therapists; admins are created by the operator through
//! [`UserService::create_user`]. Email addresses are unique. Deleting a user removes their
//! assignment edges but leaves every other record they took part in.

use super::assignments::AssignmentRegistry;
use crate::fanout::{DomainEvent, Notifier};
use crate::identity::{Identity, Role};
use crate::models::{NewUser, ProfileUpdate, TherapistListing, User, UserUpdate};
use crate::policy::{decide, Action};
use crate::store::{Collection, DocumentStore};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use mindcare_types::EmailAddress;
use mindcare_uuid::RecordId;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct UserService {
    users: Collection<User>,
    registry: AssignmentRegistry,
    notifier: Notifier,
    // Serialises the email uniqueness check with the write that claims the address.
    email_lock: Arc<Mutex<()>>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>, registry: AssignmentRegistry) -> Self {
        Self {
            users: Collection::new(Arc::clone(&store)),
            registry,
            notifier: Notifier::new(store),
            email_lock: Arc::new(Mutex::new(())),
        }
    }

    fn lock_emails(&self) -> CoreResult<MutexGuard<'_, ()>> {
        self.email_lock
            .lock()
            .map_err(|_| CoreError::StoreLockPoisoned)
    }

    /// Public self-registration. Every admin is notified of the new account.
    ///
    /// # Errors
    ///
    /// - `Forbidden` when asked to create an admin.
    /// - `Conflict` when the email address is already registered.
    pub fn register(&self, new_user: NewUser) -> CoreResult<User> {
        if new_user.role == Role::Admin {
            return Err(CoreError::Forbidden);
        }
        let user = self.insert_user(new_user)?;

        let admin_ids: Vec<RecordId> = self
            .users
            .find(|u| u.role == Role::Admin)?
            .into_iter()
            .map(|u| u.id)
            .collect();
        self.notifier.publish(&DomainEvent::UserRegistered {
            user: &user,
            admin_ids: &admin_ids,
        });
        Ok(user)
    }

    /// Operator-side account creation, any role, no notifications.
    pub fn create_user(&self, new_user: NewUser) -> CoreResult<User> {
        self.insert_user(new_user)
    }

    fn insert_user(&self, new_user: NewUser) -> CoreResult<User> {
        let _guard = self.lock_emails()?;
        self.ensure_email_free(&new_user.email, None)?;

        let now = Utc::now();
        let user = User {
            id: RecordId::new(),
            role: new_user.role,
            display_name: new_user.display_name,
            email: new_user.email,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(&user)?;

        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    fn ensure_email_free(&self, email: &EmailAddress, except: Option<RecordId>) -> CoreResult<()> {
        let taken = self
            .users
            .find_one(|u| &u.email == email && Some(u.id) != except)?
            .is_some();
        if taken {
            return Err(CoreError::Conflict(format!(
                "email {email} is already registered"
            )));
        }
        Ok(())
    }

    /// All users, oldest first. Admin only.
    pub fn list(&self, caller: &Identity) -> CoreResult<Vec<User>> {
        decide(caller, &Action::ManageUsers, &self.registry)?.into_filter()?;
        let mut users = self.users.all()?;
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users)
    }

    pub fn get(&self, caller: &Identity, id: RecordId) -> CoreResult<User> {
        decide(caller, &Action::ManageUsers, &self.registry)?.into_filter()?;
        self.users.get(id)?.ok_or(CoreError::NotFound)
    }

    /// Admin update by id. A role change drops the user's assignment edges.
    pub fn update(&self, caller: &Identity, id: RecordId, update: UserUpdate) -> CoreResult<User> {
        decide(caller, &Action::ManageUsers, &self.registry)?.into_filter()?;
        let guard = self.lock_emails()?;
        let mut user = self.users.get(id)?.ok_or(CoreError::NotFound)?;

        if let Some(email) = update.email {
            self.ensure_email_free(&email, Some(id))?;
            user.email = email;
        }
        if let Some(display_name) = update.display_name {
            user.display_name = display_name;
        }
        let role_changed = matches!(update.role, Some(role) if role != user.role);
        if let Some(role) = update.role {
            user.role = role;
        }
        user.updated_at = Utc::now();

        if !self.users.update(&user)? {
            return Err(CoreError::NotFound);
        }
        drop(guard);
        if role_changed {
            tracing::info!(user_id = %user.id, role = %user.role, "user role changed");
            self.registry.remove_user(user.id)?;
        }
        Ok(user)
    }

    /// Admin delete by id. Other records referencing the user are kept.
    pub fn delete(&self, caller: &Identity, id: RecordId) -> CoreResult<()> {
        decide(caller, &Action::ManageUsers, &self.registry)?.into_filter()?;
        if !self.users.delete(id)? {
            return Err(CoreError::NotFound);
        }
        self.registry.remove_user(id)?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Every therapist's public listing, ordered by name.
    pub fn therapist_directory(&self, caller: &Identity) -> CoreResult<Vec<TherapistListing>> {
        decide(caller, &Action::ReadTherapistDirectory, &self.registry)?.into_filter()?;
        let mut listings: Vec<TherapistListing> = self
            .users
            .find(|u| u.role == Role::Therapist)?
            .iter()
            .map(TherapistListing::from)
            .collect();
        listings.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(listings)
    }

    pub fn me(&self, caller: &Identity) -> CoreResult<User> {
        decide(caller, &Action::ReadOwnProfile, &self.registry)?.into_filter()?;
        self.users.get(caller.id)?.ok_or(CoreError::NotFound)
    }

    pub fn update_me(&self, caller: &Identity, update: ProfileUpdate) -> CoreResult<User> {
        decide(caller, &Action::UpdateOwnProfile, &self.registry)?.into_filter()?;
        let _guard = self.lock_emails()?;
        let mut user = self.users.get(caller.id)?.ok_or(CoreError::NotFound)?;

        if let Some(email) = update.email {
            self.ensure_email_free(&email, Some(user.id))?;
            user.email = email;
        }
        if let Some(display_name) = update.display_name {
            user.display_name = display_name;
        }
        user.updated_at = Utc::now();

        if !self.users.update(&user)? {
            return Err(CoreError::NotFound);
        }
        Ok(user)
    }

    /// Current identity of a user id, if the account still exists.
    ///
    /// Used by transports after verifying a token, so a deleted or re-roled user cannot act on
    /// a stale credential.
    pub fn identity_of(&self, id: RecordId) -> CoreResult<Option<Identity>> {
        Ok(self.users.get(id)?.map(|u| u.identity()))
    }

    /// Look a user up by email. Operator use only.
    pub fn find_by_email(&self, email: &EmailAddress) -> CoreResult<Option<User>> {
        self.users.find_one(|u| &u.email == email)
    }
}
