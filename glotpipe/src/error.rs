//! All error types for the glotpipe crate.
//!
//! Configuration errors are raised before any side effect. External-call
//! errors abort the running lane. "Nothing to commit" is not an error; see
//! [`crate::vcs::CommitOutcome`].

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on `{path}`: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("TOML configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("prefix `{prefix}` is used by both `{first}` and `{second}`")]
    DuplicatePrefix {
        prefix: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("key `{key}` is produced by both `{first}` and `{second}`")]
    PrefixCollision {
        key: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("locale `{0}` is not in the locale table")]
    UnmappedLocale(String),

    #[error("invalid locale table: {0}")]
    InvalidLocaleTable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}: {message}")]
    RemoteStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("`{command}` failed: {message}")]
    Tool { command: String, message: String },
}

impl Error {
    /// Creates a parse error for the given origin (usually a path).
    pub fn parse(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path it happened on.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// True for errors detected before any side effect was performed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::Toml(_)
                | Error::DuplicatePrefix { .. }
                | Error::PrefixCollision { .. }
                | Error::UnmappedLocale(_)
                | Error::InvalidLocaleTable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_unmapped_locale_error() {
        let error = Error::UnmappedLocale("xx".to_string());
        assert_eq!(error.to_string(), "locale `xx` is not in the locale table");
        assert!(error.is_configuration());
    }

    #[test]
    fn test_duplicate_prefix_error() {
        let error = Error::DuplicatePrefix {
            prefix: "x.".to_string(),
            first: PathBuf::from("a.strings"),
            second: PathBuf::from("b.strings"),
        };
        assert_eq!(
            error.to_string(),
            "prefix `x.` is used by both `a.strings` and `b.strings`"
        );
        assert!(error.is_configuration());
    }

    #[test]
    fn test_file_error_keeps_path() {
        let error = Error::file(
            "missing.strings",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(error.to_string().contains("missing.strings"));
        assert!(!error.is_configuration());
    }

    #[test]
    fn test_tool_error_is_not_configuration() {
        let error = Error::Tool {
            command: "deliver".to_string(),
            message: "exit status 1".to_string(),
        };
        assert_eq!(error.to_string(), "`deliver` failed: exit status 1");
        assert!(!error.is_configuration());
    }

    #[test]
    fn test_parse_error() {
        let error = Error::parse("fr.po", "unterminated string");
        assert_eq!(error.to_string(), "parse error in fr.po: unterminated string");
    }
}
