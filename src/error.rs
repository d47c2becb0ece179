use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("article not found: {0}")]
    ArticleNotFound(String),

    #[error("article not found: {0}")]
    IdNotFound(i64),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_messages_carry_the_key() {
        let err = Error::ArticleNotFound("Anarchism".to_string());
        assert_eq!(err.to_string(), "article not found: Anarchism");

        let err = Error::IdNotFound(42);
        assert_eq!(err.to_string(), "article not found: 42");
    }

    #[test]
    fn open_file_reports_path_and_cause() {
        let err = Error::OpenFile {
            path: PathBuf::from("/dump/missing.bz2"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let msg = err.to_string();
        assert!(msg.contains("/dump/missing.bz2"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
