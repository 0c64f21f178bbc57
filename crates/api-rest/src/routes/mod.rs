//! Route handlers, one module per resource.

pub(crate) mod appointments;
pub(crate) mod assignments;
pub(crate) mod chat;
pub(crate) mod companion;
pub(crate) mod content;
pub(crate) mod health;
pub(crate) mod moods;
pub(crate) mod notifications;
pub(crate) mod prescriptions;
pub(crate) mod users;

use crate::error::ApiResult;
use mindcare_core::RecordId;

/// Parse a path segment into a record id; malformed ids are a validation error.
pub(crate) fn record_id(raw: &str) -> ApiResult<RecordId> {
    Ok(RecordId::parse(raw).map_err(mindcare_core::CoreError::from)?)
}
