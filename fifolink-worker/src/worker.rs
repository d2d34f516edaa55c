//! Worker command loop.
//!
//! Reads [`WorkerRequest`]s from the control input (stdin), runs each one
//! through [`Session::execute`] and writes command output (data lines) to
//! stdout. Tokens go to the ack FIFO, never to stdout.
//!
//! A failed command is reported to the host as `nck` and the loop carries on.
//! A panicking command is reported the same way and then takes the process
//! down through the normal panic path.

use std::io::{BufRead, Write};

use anyhow::Context;
use fifolink::{CommandError, Session};

use crate::protocol::WorkerRequest;

/// Run until `shutdown` or end of input, then close whatever is still open.
pub fn run_worker<R, W>(session: &mut Session, mut input: R, output: &mut W) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
{
    tracing::info!("Worker ready for commands");

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = input
            .read_until(b'\n', &mut buf)
            .context("failed to read control input")?;
        if n == 0 {
            tracing::debug!("Control input closed");
            break;
        }

        let request = parse_request(&buf);
        let request = match request {
            None => continue,
            Some(Ok(WorkerRequest::Shutdown)) => {
                tracing::info!("Shutdown requested");
                break;
            }
            Some(request) => request,
        };

        // A malformed line still gets a token, otherwise the host would wait
        // forever for one.
        let result = session.execute(|session| {
            let request = request?;
            handle_request(session, request, output)
        });
        if let Err(e) = result {
            tracing::debug!(error = %e, "Continuing after failed command");
        }
    }

    if session.is_data_open() {
        session.close_data_fifo();
    }
    if session.is_ack_open() {
        session.close_tool().context("failed to close ack FIFO")?;
    }

    tracing::info!("Worker exiting");
    Ok(())
}

/// Decode one raw control line. `None` for blank lines.
fn parse_request(raw: &[u8]) -> Option<Result<WorkerRequest, CommandError>> {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => return Some(Err(CommandError::invalid(format!("not UTF-8: {e}")))),
    };
    if line.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(line).map_err(|e| CommandError::invalid(e.to_string())))
}

fn handle_request<W: Write>(
    session: &mut Session,
    request: WorkerRequest,
    output: &mut W,
) -> Result<(), CommandError> {
    tracing::trace!(?request, "Handling request");

    match request {
        WorkerRequest::OnTraversalStart { ack_fifo } => session.on_traversal_start(ack_fifo)?,
        WorkerRequest::InitializeDataFifo { data_fifo } => {
            session.initialize_data_fifo(data_fifo)?
        }
        WorkerRequest::ReadData { lines } => {
            for _ in 0..lines {
                let line = session.read_data_fifo()?;
                if line.is_empty() {
                    tracing::debug!("Data FIFO drained before all requested lines arrived");
                    break;
                }
                output
                    .write_all(line.as_bytes())
                    .map_err(|e| CommandError::failed(format!("failed to write output: {e}")))?;
            }
            output
                .flush()
                .map_err(|e| CommandError::failed(format!("failed to flush output: {e}")))?;
        }
        WorkerRequest::SendAck => session.send_ack()?,
        WorkerRequest::SendNack => session.send_nack()?,
        WorkerRequest::OnTraversalSuccess => session.on_traversal_success(),
        WorkerRequest::CloseDataFifo => session.close_data_fifo(),
        WorkerRequest::CloseTool => session.close_tool()?,
        WorkerRequest::Fail { message } => return Err(CommandError::failed(message)),
        WorkerRequest::Shutdown => {}
    }
    Ok(())
}
