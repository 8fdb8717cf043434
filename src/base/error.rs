//! Domain error kinds.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the stores, the reload path and command authorization.
///
/// Load failures (`SourceNotFound`, `Io`, `Parse`) are recoverable: the caller keeps the
/// previous state. `InvariantViolation` is a defect and is logged at error severity.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
    #[error("`{command}` is restricted to administrators ({user} is not one)")]
    AuthorizationDenied { command: String, user: String },
}

impl EngineError {
    /// Maps an I/O error on `path`, turning `NotFound` into [`EngineError::SourceNotFound`].
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();

        if source.kind() == std::io::ErrorKind::NotFound {
            Self::SourceNotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// Short, user-facing description that does not leak internal detail.
    pub fn user_message(&self) -> String {
        match self {
            Self::SourceNotFound(path) => format!("`{}` was not found", file_name(path)),
            Self::Io { path, .. } => format!("`{}` could not be read", file_name(path)),
            Self::Parse { path, .. } => format!("`{}` is malformed", file_name(path)),
            Self::InvariantViolation(_) => "an internal error occurred".to_string(),
            Self::AuthorizationDenied { command, .. } => format!("`{command}` is restricted to administrators"),
        }
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}
