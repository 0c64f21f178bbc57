//! Patient↔therapist messaging.
//!
//! A thread is created by the first message between a patient and a therapist and reused for
//! every later message between them. Message timestamps are strictly increasing within a
//! thread so listing order is stable.

use super::assignments::AssignmentRegistry;
use crate::constants::{MAX_MESSAGE_CHARS, MESSAGE_PREVIEW_CHARS};
use crate::fanout::{DomainEvent, Notifier};
use crate::identity::{Identity, Role};
use crate::models::{ChatMessage, ChatThread, SendMessage, User};
use crate::policy::{decide, Action};
use crate::store::{Collection, DocumentStore};
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Duration, Utc};
use mindcare_uuid::RecordId;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct ChatService {
    threads: Collection<ChatThread>,
    messages: Collection<ChatMessage>,
    users: Collection<User>,
    registry: AssignmentRegistry,
    notifier: Notifier,
    // Serialises thread lookup-or-create and message stamping.
    send_lock: Arc<Mutex<()>>,
}

impl ChatService {
    pub fn new(store: Arc<dyn DocumentStore>, registry: AssignmentRegistry) -> Self {
        Self {
            threads: Collection::new(Arc::clone(&store)),
            messages: Collection::new(Arc::clone(&store)),
            users: Collection::new(Arc::clone(&store)),
            registry,
            notifier: Notifier::new(store),
            send_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Send a message, starting a thread with `recipient_id` if none exists yet.
    ///
    /// # Errors
    ///
    /// - `Forbidden` when starting a thread between anything but one patient and one therapist.
    ///   Nothing is created in that case.
    /// - `NotFound` for an unknown recipient, an unknown thread, or a thread the caller is not
    ///   part of.
    /// - `InvalidInput` when neither a thread nor a recipient is given, or the text is too long.
    pub fn send(&self, caller: &Identity, request: SendMessage) -> CoreResult<ChatMessage> {
        if request.text.as_str().chars().count() > MAX_MESSAGE_CHARS {
            return Err(CoreError::InvalidInput(format!(
                "messages are limited to {MAX_MESSAGE_CHARS} characters"
            )));
        }

        let _guard = self
            .send_lock
            .lock()
            .map_err(|_| CoreError::StoreLockPoisoned)?;

        let mut thread = match (request.thread_id, request.recipient_id) {
            (Some(thread_id), _) => {
                let thread = self.threads.get(thread_id)?.ok_or(CoreError::NotFound)?;
                decide(caller, &Action::PostToThread(&thread), &self.registry)?.into_filter()?;
                thread
            }
            (None, Some(recipient_id)) => self.thread_with(caller, recipient_id)?,
            (None, None) => {
                return Err(CoreError::InvalidInput(
                    "either thread_id or recipient_id is required".into(),
                ))
            }
        };

        let sent_at = self.next_timestamp(thread.id)?;
        let message = ChatMessage {
            id: RecordId::new(),
            thread_id: thread.id,
            sender_id: caller.id,
            sender_role: caller.role,
            text: request.text,
            sent_at,
        };
        self.messages.insert(&message)?;

        thread.last_message = Some(preview(message.text.as_str()));
        thread.last_updated = sent_at;
        self.threads.update(&thread)?;

        self.notifier.publish(&DomainEvent::MessageSent {
            thread: &thread,
            message: &message,
        });
        Ok(message)
    }

    fn thread_with(&self, caller: &Identity, recipient_id: RecordId) -> CoreResult<ChatThread> {
        let recipient = self.users.get(recipient_id)?.ok_or(CoreError::NotFound)?;
        decide(
            caller,
            &Action::StartThread {
                recipient_role: recipient.role,
            },
            &self.registry,
        )?
        .into_filter()?;

        let (patient_id, therapist_id) = match caller.role {
            Role::Patient => (caller.id, recipient.id),
            _ => (recipient.id, caller.id),
        };

        if let Some(existing) = self
            .threads
            .find_one(|t| t.patient_id == patient_id && t.therapist_id == therapist_id)?
        {
            return Ok(existing);
        }

        let now = Utc::now();
        let thread = ChatThread {
            id: RecordId::new(),
            patient_id,
            therapist_id,
            last_message: None,
            last_updated: now,
            created_at: now,
        };
        self.threads.insert(&thread)?;
        tracing::info!(thread_id = %thread.id, "chat thread started");
        Ok(thread)
    }

    fn next_timestamp(&self, thread_id: RecordId) -> CoreResult<DateTime<Utc>> {
        let now = Utc::now();
        let last = self
            .messages
            .find(|m| m.thread_id == thread_id)?
            .into_iter()
            .map(|m| m.sent_at)
            .max();
        Ok(match last {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        })
    }

    /// The caller's threads, most recently active first. Admins have no threads.
    pub fn list_threads(&self, caller: &Identity) -> CoreResult<Vec<ChatThread>> {
        let filter = decide(caller, &Action::ListThreads, &self.registry)?.into_filter()?;
        let mut threads = self.threads.find(|t| filter.admits(t))?;
        threads.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(threads)
    }

    /// Messages of a thread in send order. Participants only.
    pub fn messages(&self, caller: &Identity, thread_id: RecordId) -> CoreResult<Vec<ChatMessage>> {
        let thread = self.threads.get(thread_id)?.ok_or(CoreError::NotFound)?;
        decide(caller, &Action::ReadThread(&thread), &self.registry)?.into_filter()?;

        let mut messages = self.messages.find(|m| m.thread_id == thread_id)?;
        messages.sort_by_key(|m| (m.sent_at, m.id));
        Ok(messages)
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(MESSAGE_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
