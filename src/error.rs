//! Error types for the investigation-stream library.

use std::fmt;
use std::io;

/// The result type for investigation-stream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when running an agent or moving its events around.
///
/// The stream interpreter never produces these; malformed upstream chunks
/// are reported as data instead.
#[derive(Debug)]
pub enum Error {
    /// The agent CLI binary was not found in PATH.
    BinaryNotFound {
        /// The name of the binary that was not found.
        cli_name: String,
    },
    /// The required API key environment variable is not set.
    ApiKeyMissing {
        /// The name of the environment variable that should be set.
        env_var: String,
    },
    /// Failed to spawn the agent process.
    SpawnFailed {
        /// The underlying IO error.
        source: io::Error,
    },
    /// Session resume failed because no session ID is available.
    NoSessionId,
    /// The event receiver was already consumed or disconnected.
    ReceiverDisconnected,
    /// Reading or writing a file or stream failed.
    Io {
        /// What was being done when the error occurred.
        context: String,
        /// The underlying IO error.
        source: io::Error,
    },
    /// Encoding or decoding JSON failed.
    Json {
        /// What was being encoded or decoded.
        context: String,
        /// The underlying serde_json error.
        source: serde_json::Error,
    },
    /// A session store lock was poisoned by a panicking writer.
    StorePoisoned,
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BinaryNotFound { cli_name } => {
                write!(f, "Agent binary not found in PATH: {cli_name}")
            }
            Self::ApiKeyMissing { env_var } => {
                write!(f, "API key environment variable not set: {env_var}")
            }
            Self::SpawnFailed { source } => {
                write!(f, "Failed to spawn agent process: {source}")
            }
            Self::NoSessionId => {
                write!(f, "Cannot resume session: no session ID available")
            }
            Self::ReceiverDisconnected => {
                write!(f, "Event receiver disconnected")
            }
            Self::Io { context, source } => {
                write!(f, "I/O error while {context}: {source}")
            }
            Self::Json { context, source } => {
                write!(f, "JSON error while {context}: {source}")
            }
            Self::StorePoisoned => {
                write!(f, "Session store lock poisoned")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SpawnFailed { source } | Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}
