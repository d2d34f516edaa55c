//! Acknowledgment tokens.
//!
//! The ack FIFO has no framing: every message is exactly [`TOKEN_LEN`] bytes,
//! so the host can do a blocking fixed-size read and stay in lock-step.

use std::fmt;

use crate::error::HostError;

/// Length of every token on the ack FIFO.
pub const TOKEN_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// Command completed.
    Ack,
    /// Command failed.
    Nack,
}

impl Token {
    pub const fn as_bytes(&self) -> &'static [u8; TOKEN_LEN] {
        match self {
            Self::Ack => b"ack",
            Self::Nack => b"nck",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::Nack => "nck",
        }
    }

    /// Decode a token read by the host.
    pub fn parse(bytes: &[u8; TOKEN_LEN]) -> Result<Self, HostError> {
        match bytes {
            b"ack" => Ok(Self::Ack),
            b"nck" => Ok(Self::Nack),
            other => Err(HostError::InvalidToken(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
