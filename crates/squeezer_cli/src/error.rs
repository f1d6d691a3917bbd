//! Errors raised before the engine runs.

use squeezer_core::SqueezerError;
use thiserror::Error;

/// Setup failures: bad arguments, unreadable files, client construction.
#[derive(Error, Debug)]
pub enum CliError {
    /// Arguments that parse but do not make sense together.
    #[error("{0}")]
    Usage(String),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// A local file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine rejected a setting.
    #[error(transparent)]
    Engine(#[from] SqueezerError),
}
