use crate::constants::USERS_COLLECTION;
use crate::identity::{Identity, Role};
use crate::store::Document;
use chrono::{DateTime, Utc};
use mindcare_types::{EmailAddress, NonEmptyText};
use mindcare_uuid::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub role: Role,
    pub display_name: NonEmptyText,
    pub email: EmailAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.role)
    }
}

impl Document for User {
    const COLLECTION: &'static str = USERS_COLLECTION;

    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub role: Role,
    pub display_name: NonEmptyText,
    pub email: EmailAddress,
}

/// Fields a user may change on their own profile. Identity is implicit; there is no id here.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<NonEmptyText>,
    pub email: Option<EmailAddress>,
}

/// Admin update of any user by id.
#[derive(Clone, Debug, Default)]
pub struct UserUpdate {
    pub display_name: Option<NonEmptyText>,
    pub email: Option<EmailAddress>,
    pub role: Option<Role>,
}

/// Public therapist directory entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TherapistListing {
    pub id: RecordId,
    pub display_name: NonEmptyText,
}

impl From<&User> for TherapistListing {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name.clone(),
        }
    }
}
