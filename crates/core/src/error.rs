use mindcare_types::TextError;
use mindcare_uuid::UuidError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("patient is not assigned to this therapist")]
    NotAssigned,
    #[error("patient {0} is already assigned to another therapist")]
    AlreadyAssigned(mindcare_uuid::RecordId),
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] UuidError),
    #[error("invalid text: {0}")]
    InvalidText(#[from] TextError),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write document: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read document: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove document: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize document: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize document: {0}")]
    Deserialization(serde_json::Error),
    #[error("document store lock poisoned")]
    StoreLockPoisoned,

    #[error("companion model error: {0}")]
    Companion(String),
}

/// Coarse classification of a [`CoreError`], used by transports to choose a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    Internal,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Unauthenticated => ErrorKind::Unauthenticated,
            CoreError::Forbidden => ErrorKind::Forbidden,
            CoreError::NotFound => ErrorKind::NotFound,
            CoreError::NotAssigned
            | CoreError::InvalidInput(_)
            | CoreError::InvalidId(_)
            | CoreError::InvalidText(_) => ErrorKind::Validation,
            CoreError::AlreadyAssigned(_) | CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::StorageDirCreation(_)
            | CoreError::FileWrite(_)
            | CoreError::FileRead(_)
            | CoreError::FileRemove(_)
            | CoreError::Serialization(_)
            | CoreError::Deserialization(_)
            | CoreError::StoreLockPoisoned
            | CoreError::Companion(_) => ErrorKind::Internal,
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_classify_as_validation() {
        let err = CoreError::from(UuidError::InvalidInput("x".into()));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(CoreError::NotAssigned.kind(), ErrorKind::Validation);
        assert_eq!(CoreError::from(TextError::Empty).kind(), ErrorKind::Validation);
    }

    #[test]
    fn storage_errors_classify_as_internal() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(CoreError::FileWrite(io).kind(), ErrorKind::Internal);
        assert_eq!(CoreError::StoreLockPoisoned.kind(), ErrorKind::Internal);
    }
}
