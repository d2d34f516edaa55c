//! Host side of the protocol.
//!
//! The host creates both FIFOs, keeps the read end of the ack FIFO and the
//! write end of the data FIFO, and hands the paths to the worker over its own
//! control path (stdin, command line, ...).
//!
//! FIFO path format: `{fifo_root}/fifolink-{pid}-{uuid}/{ack,data}.fifo`
//!
//! On Linux both ends are opened read-write. That never blocks and never
//! fails for lack of a peer, so the host can open its ends before the worker
//! exists. The cost is that the host does not see EOF when the worker dies;
//! [`HostConfig::ack_timeout`] covers that.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::SinkExt;
use nix::sys::stat::Mode;
use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;
use tokio_util::codec::{FramedWrite, LinesCodec, LinesCodecError};

use crate::config::HostConfig;
use crate::error::HostError;
use crate::token::{TOKEN_LEN, Token};

/// Create a FIFO at `path`, readable and writable by the owner only.
pub fn create_fifo(path: impl AsRef<Path>) -> Result<(), HostError> {
    let path = path.as_ref();
    nix::unistd::mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR).map_err(|e| HostError::Create {
        path: path.to_path_buf(),
        source: io::Error::from(e),
    })?;
    tracing::trace!(path = %path.display(), "Created FIFO");
    Ok(())
}

fn pipe_options() -> pipe::OpenOptions {
    #[allow(unused_mut)]
    let mut options = pipe::OpenOptions::new();
    #[cfg(target_os = "linux")]
    options.read_write(true);
    options
}

/// Scratch directory holding one session's FIFOs. Removed on drop.
#[derive(Debug)]
pub struct FifoDir {
    dir: PathBuf,
}

impl FifoDir {
    pub fn create(root: impl AsRef<Path>) -> Result<Self, HostError> {
        let dir = root.as_ref().join(format!(
            "fifolink-{}-{}",
            std::process::id(),
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(&dir).map_err(|source| HostError::Create {
            path: dir.clone(),
            source,
        })?;
        tracing::debug!(dir = %dir.display(), "Created FIFO directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn ack_path(&self) -> PathBuf {
        self.dir.join("ack.fifo")
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join("data.fifo")
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.dir.exists() {
            tracing::debug!(dir = %self.dir.display(), "Cleaning up FIFO directory");
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl Drop for FifoDir {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            tracing::warn!(error = %e, "Failed to clean up FIFO directory");
        }
    }
}

/// Read end of the ack FIFO.
#[derive(Debug)]
pub struct AckReceiver {
    path: PathBuf,
    rx: pipe::Receiver,
    timeout: Option<Duration>,
}

impl AckReceiver {
    /// Create the FIFO at `path` and open it. Must run inside a tokio runtime.
    pub fn create(path: impl AsRef<Path>, timeout: Option<Duration>) -> Result<Self, HostError> {
        create_fifo(&path)?;
        Self::open(path, timeout)
    }

    /// Open an existing FIFO. Must run inside a tokio runtime.
    pub fn open(path: impl AsRef<Path>, timeout: Option<Duration>) -> Result<Self, HostError> {
        let path = path.as_ref().to_path_buf();
        let rx = pipe_options()
            .open_receiver(&path)
            .map_err(|source| HostError::Open {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "Ack receiver open");
        Ok(Self { path, rx, timeout })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the worker writes one full token.
    pub async fn read_token(&mut self) -> Result<Token, HostError> {
        let mut buf = [0u8; TOKEN_LEN];
        let read = self.rx.read_exact(&mut buf);

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| HostError::Timeout(limit))?,
            None => read.await,
        };

        match result {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(HostError::Closed),
            Err(e) => return Err(HostError::Read(e)),
        }

        let token = Token::parse(&buf)?;
        tracing::trace!(%token, "Received token");
        Ok(token)
    }

    /// Wait for the outcome of the last command.
    ///
    /// `nck` becomes [`HostError::Nack`].
    pub async fn wait_for_ack(&mut self) -> Result<(), HostError> {
        match self.read_token().await? {
            Token::Ack => Ok(()),
            Token::Nack => {
                tracing::warn!(path = %self.path.display(), "Worker reported command failure");
                Err(HostError::Nack)
            }
        }
    }
}

/// Write end of the data FIFO.
#[derive(Debug)]
pub struct DataSender {
    path: PathBuf,
    writer: FramedWrite<pipe::Sender, LinesCodec>,
}

impl DataSender {
    /// Create the FIFO at `path` and open it. Must run inside a tokio runtime.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, HostError> {
        create_fifo(&path)?;
        Self::open(path)
    }

    /// Open an existing FIFO. Must run inside a tokio runtime.
    ///
    /// Outside Linux this fails with `ENXIO` until the worker has the read
    /// end open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let path = path.as_ref().to_path_buf();
        let tx = pipe_options()
            .open_sender(&path)
            .map_err(|source| HostError::Open {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "Data sender open");
        Ok(Self {
            path,
            writer: FramedWrite::new(tx, LinesCodec::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Send one line. The `\n` terminator is added here.
    pub async fn send_line(&mut self, line: &str) -> Result<(), HostError> {
        check_line(line)?;
        self.writer.send(line).await.map_err(codec_error)?;
        tracing::trace!(bytes = line.len() + 1, "Sent data line");
        Ok(())
    }

    /// Send several lines and flush once at the end.
    ///
    /// Every line is checked before any is buffered, so a rejected batch
    /// sends nothing.
    pub async fn send_lines<I, S>(&mut self, lines: I) -> Result<(), HostError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<S> = lines.into_iter().collect();
        for line in &lines {
            let line: &str = line.as_ref();
            check_line(line)?;
        }
        for line in &lines {
            let line: &str = line.as_ref();
            self.writer.feed(line).await.map_err(codec_error)?;
        }
        SinkExt::<&str>::flush(&mut self.writer)
            .await
            .map_err(codec_error)?;
        tracing::trace!(lines = lines.len(), "Sent data lines");
        Ok(())
    }

    /// Flush and close. Once drained, the worker's next read returns end of
    /// stream.
    pub async fn close(mut self) -> Result<(), HostError> {
        SinkExt::<&str>::close(&mut self.writer)
            .await
            .map_err(codec_error)?;
        tracing::debug!(path = %self.path.display(), "Data sender closed");
        Ok(())
    }
}

fn check_line(line: &str) -> Result<(), HostError> {
    if line.contains('\n') {
        return Err(HostError::Write(io::Error::new(
            io::ErrorKind::InvalidInput,
            "data line must not contain a newline",
        )));
    }
    Ok(())
}

fn codec_error(e: LinesCodecError) -> HostError {
    match e {
        LinesCodecError::Io(e) => HostError::Write(e),
        LinesCodecError::MaxLineLengthExceeded => HostError::Write(io::Error::new(
            io::ErrorKind::InvalidInput,
            "data line too long",
        )),
    }
}

/// Both host endpoints for one session, in their own [`FifoDir`].
#[derive(Debug)]
pub struct HostChannels {
    ack: AckReceiver,
    data: Option<DataSender>,
    // Dropped last so the FIFOs outlive the open handles.
    dir: FifoDir,
}

impl HostChannels {
    /// Create the directory and the ack FIFO. Must run inside a tokio runtime.
    pub fn create(config: &HostConfig) -> Result<Self, HostError> {
        let dir = FifoDir::create(&config.fifo_root)?;
        let ack = AckReceiver::create(dir.ack_path(), config.ack_timeout)?;
        Ok(Self {
            ack,
            data: None,
            dir,
        })
    }

    /// Path to hand to the worker's `on_traversal_start`.
    pub fn ack_path(&self) -> &Path {
        self.ack.path()
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn ack(&mut self) -> &mut AckReceiver {
        &mut self.ack
    }

    pub async fn wait_for_ack(&mut self) -> Result<(), HostError> {
        self.ack.wait_for_ack().await
    }

    /// Create and open the data FIFO, returning the path to hand to the
    /// worker's `initialize_data_fifo`. Reuses the existing sender if open.
    pub fn open_data(&mut self) -> Result<PathBuf, HostError> {
        if let Some(data) = &self.data {
            return Ok(data.path().to_path_buf());
        }
        let path = self.dir.data_path();
        if !path.exists() {
            create_fifo(&path)?;
        }
        let sender = DataSender::open(&path)?;
        self.data = Some(sender);
        Ok(path)
    }

    /// The open data sender, if [`open_data`](Self::open_data) was called.
    pub fn data(&mut self) -> Option<&mut DataSender> {
        self.data.as_mut()
    }

    /// Close the data sender so the worker sees end of stream. The FIFO
    /// itself stays and can be reopened.
    pub async fn close_data(&mut self) -> Result<(), HostError> {
        match self.data.take() {
            Some(data) => data.close().await,
            None => Ok(()),
        }
    }
}
