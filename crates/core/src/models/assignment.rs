use crate::constants::ASSIGNMENTS_COLLECTION;
use crate::store::Document;
use chrono::{DateTime, Utc};
use mindcare_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One therapist→patient edge of the roster.
///
/// The roster is stored as independent edges rather than one set-valued document per therapist,
/// so concurrent edits touching different patients cannot overwrite each other.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentEdge {
    pub id: RecordId,
    pub therapist_id: RecordId,
    pub patient_id: RecordId,
    pub created_at: DateTime<Utc>,
}

impl Document for AssignmentEdge {
    const COLLECTION: &'static str = ASSIGNMENTS_COLLECTION;

    fn id(&self) -> RecordId {
        self.id
    }
}

/// A therapist's current roster, derived from their edges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub therapist_id: RecordId,
    pub patient_ids: BTreeSet<RecordId>,
}

impl Assignment {
    pub fn from_edges<'a>(
        therapist_id: RecordId,
        edges: impl IntoIterator<Item = &'a AssignmentEdge>,
    ) -> Self {
        Self {
            therapist_id,
            patient_ids: edges
                .into_iter()
                .filter(|edge| edge.therapist_id == therapist_id)
                .map(|edge| edge.patient_id)
                .collect(),
        }
    }
}
