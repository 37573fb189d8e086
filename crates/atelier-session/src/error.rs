//! Error types for the session lifecycle.

use atelier_core::error::AtelierError;

/// Errors from the session lifecycle controller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<AtelierError> for SessionError {
    fn from(err: AtelierError) -> Self {
        match err {
            AtelierError::Serialization(msg) => SessionError::Serialization(msg),
            other => SessionError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = SessionError::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "storage error: disk full");
    }

    #[test]
    fn test_from_atelier_error() {
        let err: SessionError = AtelierError::Storage("connection lost".to_string()).into();
        assert!(matches!(err, SessionError::Storage(_)));
        assert!(err.to_string().contains("connection lost"));

        let err: SessionError = AtelierError::Serialization("bad blob".to_string()).into();
        assert!(matches!(err, SessionError::Serialization(_)));
    }
}
