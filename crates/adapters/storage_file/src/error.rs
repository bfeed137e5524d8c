//! Storage-specific error type wrapping file system errors.

use std::path::PathBuf;

use tinyhub_domain::error::TinyHubError;

/// Errors originating from the file storage layer.
#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    /// Reading, writing or renaming the state file failed.
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state file does not hold exactly one mask value.
    #[error("{path} holds {actual} bytes, expected {expected}")]
    Truncated {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
}

impl From<FileStoreError> for TinyHubError {
    fn from(err: FileStoreError) -> Self {
        Self::Storage(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_truncated_error() {
        let err = FileStoreError::Truncated {
            path: PathBuf::from("window_state"),
            expected: 4,
            actual: 2,
        };
        assert_eq!(err.to_string(), "window_state holds 2 bytes, expected 4");
    }

    #[test]
    fn should_convert_to_storage_error() {
        let err: TinyHubError = FileStoreError::Io {
            path: PathBuf::from("window_state"),
            source: std::io::Error::other("boom"),
        }
        .into();
        assert!(matches!(err, TinyHubError::Storage(_)));
    }
}
