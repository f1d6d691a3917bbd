//! Error types for the reconciliation engine.

use crate::kind::Capability;
use crate::task::TaskState;
use thiserror::Error;

/// Result type for engine operations.
pub type SqueezerResult<T> = Result<T, SqueezerError>;

/// Errors that can occur while reconciling an entity.
#[derive(Error, Debug)]
pub enum SqueezerError {
    /// The entity kind does not support the requested operation.
    #[error("{}", capability_message(.kind, .capability))]
    Capability {
        /// Human readable name of the entity kind.
        kind: &'static str,
        /// The missing capability.
        capability: Capability,
    },

    /// A referenced entity could not be resolved.
    #[error("{0} not found")]
    NotFound(String),

    /// The requested `state` is not understood by the entity kind.
    #[error("invalid state ({0}) for entity")]
    InvalidStateRequest(String),

    /// A required caller-supplied value was not provided.
    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    /// A server-side task ended in the `failed` state.
    #[error("task failed to complete ({href}): {description}")]
    TaskFailed {
        /// Reference of the failed task.
        href: String,
        /// Error description reported by the server.
        description: String,
    },

    /// A server-side task ended in a terminal state other than the requested one.
    #[error("task {href} did not reach {expected} state (ended {actual})")]
    TaskStateMismatch {
        /// Reference of the task.
        href: String,
        /// The state that was awaited.
        expected: TaskState,
        /// The terminal state actually reached.
        actual: TaskState,
    },

    /// Failure at the transport boundary (network, HTTP status, decoding).
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// HTTP status, when the server answered.
        status: Option<u16>,
    },

    /// The server answered with a payload lacking a required field.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Reading a local payload failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The poll deadline elapsed before the task became terminal.
    #[error("timed out waiting for task {0}")]
    Timeout(String),

    /// Polling was aborted through the cancellation token.
    #[error("operation cancelled")]
    Cancelled,
}

fn capability_message(kind: &str, capability: &Capability) -> String {
    match capability {
        Capability::Update => format!("this {kind} is immutable"),
        other => format!("this {kind} is not {}", other.adjective()),
    }
}

impl SqueezerError {
    /// Creates a capability error.
    pub fn capability(kind: &'static str, capability: Capability) -> Self {
        Self::Capability { kind, capability }
    }

    /// Creates a transport error without an HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status: None,
        }
    }

    /// Creates a transport error carrying the HTTP status the server answered with.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Returns the HTTP status of a transport error.
    pub fn status(&self) -> Option<u16> {
        match self {
            SqueezerError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns true for errors the engine raises deliberately.
    ///
    /// Domain errors are reported with their message only; everything else is
    /// unexpected and carries a diagnostic trace.
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            SqueezerError::Transport { .. } | SqueezerError::Protocol(_) | SqueezerError::Io(_)
        )
    }
}
