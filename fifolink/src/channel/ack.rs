use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::FifoError;
use crate::token::Token;

/// Write end of the ack FIFO.
///
/// Holding an `AckChannel` means the handle is open; [`close`](Self::close)
/// consumes it.
#[derive(Debug)]
pub struct AckChannel {
    path: PathBuf,
    file: File,
}

impl AckChannel {
    /// Open the FIFO at `path` for writing only.
    ///
    /// Blocks until the host has the read end open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FifoError> {
        let path = path.as_ref().to_path_buf();
        tracing::trace!(path = %path.display(), "Opening ack FIFO");

        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|source| FifoError::Open {
                path: path.clone(),
                mode: "writing",
                source,
            })?;

        tracing::debug!(path = %path.display(), "Ack FIFO open");
        Ok(Self { path, file })
    }

    pub fn write_ack(&mut self) -> Result<(), FifoError> {
        self.write_token(Token::Ack)
    }

    pub fn write_nack(&mut self) -> Result<(), FifoError> {
        self.write_token(Token::Nack)
    }

    /// Write one token and flush it.
    ///
    /// `File` is unbuffered, so the 3 bytes go out in a single write(2). That
    /// is atomic on a pipe (well under PIPE_BUF), so the host never sees a
    /// partial token.
    pub fn write_token(&mut self, token: Token) -> Result<(), FifoError> {
        self.file
            .write_all(token.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|source| FifoError::Write {
                path: self.path.clone(),
                source,
            })?;
        tracing::trace!(%token, "Wrote token");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close the handle.
    pub fn close(mut self) -> Result<(), FifoError> {
        self.file.flush().map_err(|source| FifoError::Close {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "Ack FIFO closed");
        Ok(())
    }
}
