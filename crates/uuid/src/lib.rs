//! Record identifiers and sharded-path utilities.
//!
//! Every MindCare record (users, appointments, mood logs, threads, ...) is keyed by a
//! [`RecordId`]: a UUID v4 held in *canonical* form, **32 lowercase hexadecimal characters**
//! with no hyphens.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Identifiers supplied from outside (path segments, request bodies, CLI arguments) must already
//! be canonical; [`RecordId::parse`] rejects hyphenated or uppercase forms rather than
//! normalising them.
//!
//! ## Sharded directory layout
//! The file-backed document store keeps each record under
//! `<collection_dir>/<id[0..2]>/<id[2..4]>/<id>/`, which keeps directory fan-out small.

mod service;

pub use service::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
