use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// I/O failures on the worker's FIFO endpoints.
///
/// These are transport faults: surfaced to the caller of the failing
/// operation and never retried here.
#[derive(Debug, Error)]
pub enum FifoError {
    #[error("failed to open {} for {mode}: {source}", path.display())]
    Open {
        path: PathBuf,
        mode: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to write to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to close {}: {source}", path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A command run by the worker failed.
///
/// Any of these reaching [`Session::execute`](crate::Session::execute) is
/// turned into a nack for the host.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Fifo(#[from] FifoError),

    /// The command line could not be understood.
    #[error("invalid command: {message}")]
    Invalid { message: String },

    /// The command ran and reported failure.
    #[error("command failed: {message}")]
    Failed { message: String },
}

impl CommandError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Host-side driver errors.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to create FIFO {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open FIFO {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ack FIFO read failed: {0}")]
    Read(#[source] io::Error),

    #[error("data FIFO write failed: {0}")]
    Write(#[source] io::Error),

    /// The worker closed the ack FIFO before sending a full token.
    #[error("ack FIFO closed before a token was received")]
    Closed,

    #[error("invalid acknowledgment token {0:?}")]
    InvalidToken(String),

    /// The worker reported that the last command failed.
    #[error("worker command failed (received nck)")]
    Nack,

    #[error("no acknowledgment within {0:?}")]
    Timeout(Duration),
}
