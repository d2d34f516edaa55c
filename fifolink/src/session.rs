//! Worker session: owns the ack and data channels for one host session.
//!
//! Lifecycle, per channel kind:
//!
//! ```text
//! ack:  closed --on_traversal_start--> open --close_tool--> closed
//! data: closed --initialize_data_fifo--> open --close_data_fifo--> closed
//! ```
//!
//! Misuse (opening an open channel, closing or using a closed one) is a
//! programming error in the driver and panics. Transport failures are
//! returned as [`FifoError`].

use std::fmt;
use std::path::Path;

use crate::channel::{AckChannel, DataChannel};
use crate::error::FifoError;
use crate::interceptor::{self, Interceptor, Outcome};
use crate::token::Token;

#[derive(Debug, Default)]
pub struct Session {
    ack: Option<AckChannel>,
    data: Option<DataChannel>,
    interceptor: Interceptor,
    /// Set when the running command wrote a token itself.
    signalled: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the ack FIFO and install the failure interceptor.
    ///
    /// # Panics
    ///
    /// If the ack FIFO is already open.
    pub fn on_traversal_start(&mut self, ack_fifo: impl AsRef<Path>) -> Result<(), FifoError> {
        assert!(
            self.ack.is_none(),
            "ack FIFO already open: close_tool must be called before a new session starts"
        );

        // The interceptor reports on the ack FIFO, so the channel comes first.
        let ack = self.ack.insert(AckChannel::open(ack_fifo)?);
        self.interceptor.install(ack);
        tracing::info!(path = %ack.path().display(), "Session started");
        Ok(())
    }

    /// Hook for the end of a successful session. Intentionally does nothing;
    /// the interceptor stays installed until [`close_tool`](Self::close_tool).
    pub fn on_traversal_success(&mut self) {
        tracing::debug!("Session completed successfully");
    }

    /// Close the ack FIFO.
    ///
    /// # Panics
    ///
    /// If the ack FIFO is not open.
    pub fn close_tool(&mut self) -> Result<(), FifoError> {
        let Some(ack) = self.ack.take() else {
            panic!("close_tool called but the ack FIFO is not open");
        };
        self.interceptor.uninstall();
        ack.close()?;
        tracing::info!("Session closed");
        Ok(())
    }

    /// Open the data FIFO for reading.
    ///
    /// # Panics
    ///
    /// If the data FIFO is already open.
    pub fn initialize_data_fifo(&mut self, data_fifo: impl AsRef<Path>) -> Result<(), FifoError> {
        assert!(
            self.data.is_none(),
            "data FIFO already open: close_data_fifo must be called first"
        );
        self.data = Some(DataChannel::open(data_fifo)?);
        Ok(())
    }

    /// # Panics
    ///
    /// If the data FIFO is not open.
    pub fn close_data_fifo(&mut self) {
        let Some(data) = self.data.take() else {
            panic!("close_data_fifo called but the data FIFO is not open");
        };
        data.close();
    }

    /// Read one line from the data FIFO; empty at end of stream.
    ///
    /// # Panics
    ///
    /// If the data FIFO is not open.
    pub fn read_data_fifo(&mut self) -> Result<String, FifoError> {
        match self.data.as_mut() {
            Some(data) => data.read_line(),
            None => panic!("read_data_fifo called but the data FIFO is not open"),
        }
    }

    /// Explicitly acknowledge the current command.
    ///
    /// # Panics
    ///
    /// If the ack FIFO is not open.
    pub fn send_ack(&mut self) -> Result<(), FifoError> {
        self.send(Token::Ack)
    }

    /// Explicitly report failure of the current command.
    ///
    /// # Panics
    ///
    /// If the ack FIFO is not open.
    pub fn send_nack(&mut self) -> Result<(), FifoError> {
        self.send(Token::Nack)
    }

    fn send(&mut self, token: Token) -> Result<(), FifoError> {
        let Some(ack) = self.ack.as_mut() else {
            panic!("cannot send {token}: the ack FIFO is not open");
        };
        ack.write_token(token)?;
        self.signalled = true;
        Ok(())
    }

    pub fn is_ack_open(&self) -> bool {
        self.ack.is_some()
    }

    pub fn is_data_open(&self) -> bool {
        self.data.is_some()
    }

    /// Whether failures of [`execute`](Self::execute)d commands are
    /// reported to the host as `nck`.
    pub fn is_interceptor_installed(&self) -> bool {
        self.interceptor.is_installed()
    }

    /// Run one command and report its outcome to the host.
    ///
    /// Exactly one token is written per command, as long as the ack FIFO is
    /// open when the command finishes:
    ///
    /// - `Ok`: `ack`, unless the command already sent a token itself.
    /// - `Err`: `nck` (when the interceptor is installed), then the error is
    ///   returned.
    /// - panic: `nck` (when the interceptor is installed), then the panic
    ///   resumes unwinding.
    ///
    /// For panics the panic hook output comes first and `nck` second: the hook
    /// runs at the panic site, before the boundary regains control.
    pub fn execute<T, E, F>(&mut self, command: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<FifoError> + fmt::Display,
    {
        self.signalled = false;

        match interceptor::run_guarded(|| command(&mut *self)) {
            Outcome::Returned(Ok(value)) => {
                self.finish(Token::Ack)?;
                Ok(value)
            }
            Outcome::Returned(Err(e)) => {
                tracing::error!(error = %e, "Command failed");
                self.report_failure();
                Err(e)
            }
            Outcome::Panicked(payload) => {
                tracing::error!(
                    panic = interceptor::panic_message(payload.as_ref()),
                    "Command panicked"
                );
                self.report_failure();
                std::panic::resume_unwind(payload)
            }
        }
    }

    fn report_failure(&mut self) {
        if !self.interceptor.is_installed() {
            tracing::warn!("No failure interceptor installed, host is not notified");
            self.signalled = false;
            return;
        }
        // The failure itself is what the caller sees; a broken ack FIFO on top
        // of it can only be logged.
        if let Err(e) = self.finish(Token::Nack) {
            tracing::error!(error = %e, "Failed to send nck");
        }
    }

    fn finish(&mut self, token: Token) -> Result<(), FifoError> {
        if std::mem::take(&mut self.signalled) {
            tracing::trace!(%token, "Command already signalled, not sending");
            return Ok(());
        }
        match self.ack.as_mut() {
            Some(ack) => ack.write_token(token),
            None => {
                tracing::trace!(%token, "No ack FIFO open, token not sent");
                Ok(())
            }
        }
    }
}
