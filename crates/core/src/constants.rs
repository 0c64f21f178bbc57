//! Constants used throughout the MindCare core crate.

/// Default directory for the file-backed document store.
pub const DEFAULT_DATA_DIR: &str = "mindcare_data";

/// Filename of each stored document inside its sharded directory.
pub const DOCUMENT_FILENAME: &str = "document.json";

/// Collection names.
pub const USERS_COLLECTION: &str = "users";
pub const ASSIGNMENTS_COLLECTION: &str = "assignments";
pub const APPOINTMENTS_COLLECTION: &str = "appointments";
pub const MOOD_LOGS_COLLECTION: &str = "mood_logs";
pub const PRESCRIPTIONS_COLLECTION: &str = "prescriptions";
pub const CHAT_THREADS_COLLECTION: &str = "chat_threads";
pub const CHAT_MESSAGES_COLLECTION: &str = "chat_messages";
pub const CONTENT_COLLECTION: &str = "content";
pub const NOTIFICATIONS_COLLECTION: &str = "notifications";

/// Maximum characters kept in a thread's `last_message` preview and message notifications.
pub const MESSAGE_PREVIEW_CHARS: usize = 80;

/// Maximum characters in a single chat or companion message.
pub const MAX_MESSAGE_CHARS: usize = 4_000;

/// Default Ollama-compatible model used by the chat companion.
pub const DEFAULT_COMPANION_MODEL: &str = "llama3";

/// Default companion request timeout.
pub const DEFAULT_COMPANION_TIMEOUT_SECS: u64 = 60;
