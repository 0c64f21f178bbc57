//! Record services.
//!
//! Each service owns typed [`Collection`](crate::store::Collection)s over a shared
//! [`DocumentStore`](crate::store::DocumentStore). Every operation takes the caller's
//! [`Identity`](crate::Identity), asks the policy evaluator for a decision and applies the
//! resulting filter to what it reads.

pub mod appointments;
pub mod assignments;
pub mod chat;
pub mod content;
pub mod mood;
pub mod notifications;
pub mod prescriptions;
pub mod users;

use crate::identity::Role;
use crate::models::User;
use crate::store::Collection;
use crate::{CoreError, CoreResult};
use mindcare_uuid::RecordId;

/// Load a user and check its role. A missing user or a role mismatch is `NotFound`.
pub(crate) fn require_user(
    users: &Collection<User>,
    id: RecordId,
    role: Role,
) -> CoreResult<User> {
    users
        .get(id)?
        .filter(|user| user.role == role)
        .ok_or(CoreError::NotFound)
}

/// Accept `None` or an absolute `http`/`https` URL with a host.
pub(crate) fn validate_http_url(field: &str, url: Option<&str>) -> CoreResult<()> {
    let Some(raw) = url else {
        return Ok(());
    };
    let valid = reqwest::Url::parse(raw).is_ok_and(|parsed| {
        matches!(parsed.scheme(), "http" | "https")
            && parsed.host_str().is_some_and(|host| !host.is_empty())
    });
    if !valid {
        return Err(CoreError::InvalidInput(format!(
            "{field} must be an http(s) URL with a host"
        )));
    }
    Ok(())
}
