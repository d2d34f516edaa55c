//! Failure interception for command execution.
//!
//! Without it, a command that fails never writes a token and the host blocks
//! forever on the ack FIFO. Instead of a process-wide hook, every command runs
//! inside a scoped boundary ([`Session::execute`](crate::Session::execute))
//! that turns an escaping error or panic into a nack and then hands the
//! failure back to its default path.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::channel::AckChannel;

/// Whether failures are converted into nacks.
///
/// Installing requires a reference to the open [`AckChannel`], so the
/// interceptor can never be armed with no channel to report on.
#[derive(Debug, Default)]
pub(crate) struct Interceptor {
    installed: bool,
}

impl Interceptor {
    pub fn install(&mut self, channel: &AckChannel) {
        self.installed = true;
        tracing::debug!(path = %channel.path().display(), "Failure interceptor installed");
    }

    pub fn uninstall(&mut self) {
        if self.installed {
            self.installed = false;
            tracing::debug!("Failure interceptor removed");
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

/// Result of running a command inside the boundary.
pub(crate) enum Outcome<T> {
    Returned(T),
    Panicked(Box<dyn Any + Send + 'static>),
}

/// Run `f`, catching a panic instead of unwinding past the caller.
///
/// The default panic hook still runs first, so the panic message and any
/// backtrace are printed as usual.
pub(crate) fn run_guarded<T>(f: impl FnOnce() -> T) -> Outcome<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Outcome::Returned(value),
        Err(payload) => Outcome::Panicked(payload),
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
