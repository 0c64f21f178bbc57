use crate::constants::{CHAT_MESSAGES_COLLECTION, CHAT_THREADS_COLLECTION};
use crate::identity::Role;
use crate::store::Document;
use chrono::{DateTime, Utc};
use mindcare_types::NonEmptyText;
use mindcare_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// Conversation between exactly one patient and one therapist.
///
/// At most one thread exists per `(patient_id, therapist_id)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatThread {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub therapist_id: RecordId,
    pub last_message: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ChatThread {
    pub fn has_participant(&self, user_id: RecordId) -> bool {
        self.patient_id == user_id || self.therapist_id == user_id
    }

    /// The participant who is not `user_id`.
    pub fn other_participant(&self, user_id: RecordId) -> RecordId {
        if self.patient_id == user_id {
            self.therapist_id
        } else {
            self.patient_id
        }
    }
}

impl Document for ChatThread {
    const COLLECTION: &'static str = CHAT_THREADS_COLLECTION;

    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: RecordId,
    pub thread_id: RecordId,
    pub sender_id: RecordId,
    pub sender_role: Role,
    pub text: NonEmptyText,
    pub sent_at: DateTime<Utc>,
}

impl Document for ChatMessage {
    const COLLECTION: &'static str = CHAT_MESSAGES_COLLECTION;

    fn id(&self) -> RecordId {
        self.id
    }
}

/// A message send request.
///
/// Either `thread_id` (append to an existing thread) or `recipient_id` (first message to a
/// counterpart, creating the thread if none exists) must be given. When both are present the
/// thread id wins.
#[derive(Clone, Debug)]
pub struct SendMessage {
    pub thread_id: Option<RecordId>,
    pub recipient_id: Option<RecordId>,
    pub text: NonEmptyText,
}
