//! fifolink: command/acknowledgment protocol over named pipes.
//!
//! A host process drives a worker process over two FIFOs:
//!
//! - **ack FIFO**: written by the worker, read by the host. Carries one fixed
//!   3-byte [`Token`] per command (`ack` on success, `nck` on failure).
//! - **data FIFO**: written by the host, read by the worker. Carries
//!   newline-delimited text.
//!
//! The worker side lives in [`Session`] (lifecycle) and [`channel`] (the two
//! endpoints). The host side is in [`host`].

pub mod channel;
pub mod config;
mod error;
#[cfg(unix)]
pub mod host;
mod interceptor;
mod session;
mod token;

pub use channel::{AckChannel, DataChannel};
pub use config::{HostConfig, LogConfig, LogFormat};
pub use error::{CommandError, FifoError, HostError};
pub use session::Session;
pub use token::{TOKEN_LEN, Token};
