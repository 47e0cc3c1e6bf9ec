use std::path::PathBuf;

pub type Result<T, E = LemmatizerError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum LemmatizerError {
    // only "memory" and "disk" are accepted
    #[error("invalid storage mode '{0}', expected 'memory' or 'disk'")]
    InvalidStorageMode(String),

    #[error("lemma data is unavailable at '{}': {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },

    #[error("malformed corpus document '{}': {msg}", path.display())]
    MalformedCorpus { path: PathBuf, msg: String },

    #[error("invalid index file '{}': {msg}", path.display())]
    InvalidIndex { path: PathBuf, msg: String },

    #[cfg(feature = "download")]
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),
}

impl LemmatizerError {
    pub(crate) fn data_unavailable<P, S>(path: P, reason: S) -> Self
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        Self::DataUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_corpus<P, S>(path: P, msg: S) -> Self
    where
        P: Into<PathBuf>,
        S: ToString,
    {
        Self::MalformedCorpus {
            path: path.into(),
            msg: msg.to_string(),
        }
    }

    pub(crate) fn invalid_index<P, S>(path: P, msg: S) -> Self
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        Self::InvalidIndex {
            path: path.into(),
            msg: msg.into(),
        }
    }
}

/// Failures of the archive fetch performed when local data is missing.
#[cfg(feature = "download")]
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_storage_mode_message_names_the_mode() {
        let err = LemmatizerError::InvalidStorageMode("cloud".to_string());
        assert_eq!(
            err.to_string(),
            "invalid storage mode 'cloud', expected 'memory' or 'disk'"
        );
    }

    #[test]
    fn test_data_unavailable_message_contains_path() {
        let err = LemmatizerError::data_unavailable("/tmp/lemmas", "not found");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/lemmas"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_io_error_converts() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(LemmatizerError::Io(_))));
    }
}
