//! Errors raised while reading, fetching and caching API documents
//!
//! Every [`Error`] carries an [`ErrorCode`] so callers can tell a missing
//! document from a malformed one without matching on message text, plus
//! optional context and a hint for fixing the problem.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable codes for document errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Any other I/O failure
    IoError = 2000,
    /// The document does not exist
    FileNotFound = 2001,
    /// The document exists but cannot be read
    PermissionDenied = 2002,
    /// The document is not a YAML (or JSON) mapping
    ConfigParseError = 3002,
    /// A remote document could not be retrieved
    FetchError = 4000,
    /// A persisted cache entry could not be decoded
    CacheCorrupted = 5001,
}

impl ErrorCode {
    /// Numeric value of the code
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Document error with code, context and an optional fix hint
#[derive(Error, Debug)]
pub struct Error {
    /// What went wrong, for programmatic handling
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Where it went wrong
    pub context: Option<String>,
    /// How to fix it
    pub suggestion: Option<String>,
    /// Underlying cause
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {ctx}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {suggestion}")?;
        }
        Ok(())
    }
}

impl Error {
    /// Error with `code` and `message`
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Attach context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attach a fix hint
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach the underlying cause
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether the error only means the document is absent
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::FileNotFound
    }

    /// A document path that does not exist
    pub fn file_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::FileNotFound,
            format!("File not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Check the config directory and the document names")
    }

    /// A document whose top level is unusable
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigParseError, message)
            .with_suggestion("API documents must be YAML mappings of names to endpoint definitions")
    }

    /// A remote document that could not be retrieved
    pub fn fetch(locator: &str, message: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::FetchError,
            format!("Failed to fetch {locator}: {message}"),
        )
    }

    /// A persisted cache entry that no longer decodes
    pub fn cache_corrupted(key: &str, source: serde_json::Error) -> Self {
        Self::new(ErrorCode::CacheCorrupted, format!("Unreadable cache entry {key}"))
            .with_source(source)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("JSON parse error: {err}"))
            .with_source(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("YAML parse error: {err}"))
            .with_source(err)
    }
}

/// Attach context to any result whose error converts into [`Error`]
pub trait ResultExt<T> {
    /// Convert the error and record where it happened
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
