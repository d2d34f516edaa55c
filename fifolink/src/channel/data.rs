use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::FifoError;

/// Read end of the data FIFO.
#[derive(Debug)]
pub struct DataChannel {
    path: PathBuf,
    reader: BufReader<File>,
}

impl DataChannel {
    /// Open the FIFO at `path` for reading only.
    ///
    /// Blocks until the host has the write end open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FifoError> {
        let path = path.as_ref().to_path_buf();
        tracing::trace!(path = %path.display(), "Opening data FIFO");

        let file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(|source| FifoError::Open {
                path: path.clone(),
                mode: "reading",
                source,
            })?;

        tracing::debug!(path = %path.display(), "Data FIFO open");
        Ok(Self {
            path,
            reader: BufReader::new(file),
        })
    }

    /// Read one line, including its trailing `\n`.
    ///
    /// Blocks until the host writes a full line or closes its end. Returns an
    /// empty string at end-of-stream; the last line may lack a newline if the
    /// host closed mid-line.
    pub fn read_line(&mut self) -> Result<String, FifoError> {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .map_err(|source| FifoError::Read {
                path: self.path.clone(),
                source,
            })?;

        if n == 0 {
            tracing::debug!(path = %self.path.display(), "Data FIFO reached end of stream");
        } else {
            tracing::trace!(bytes = n, "Read data line");
        }
        Ok(line)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn close(self) {
        tracing::debug!(path = %self.path.display(), "Data FIFO closed");
    }
}
