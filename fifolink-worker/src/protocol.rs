//! Control messages from host to worker, one JSON object per stdin line.
//!
//! ```json
//! {"type": "on_traversal_start", "ack_fifo": "/tmp/fifolink-1/ack.fifo"}
//! {"type": "initialize_data_fifo", "data_fifo": "/tmp/fifolink-1/data.fifo"}
//! {"type": "read_data", "lines": 3}
//! {"type": "close_tool"}
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Open the ack FIFO and install the failure interceptor.
    OnTraversalStart { ack_fifo: PathBuf },

    InitializeDataFifo { data_fifo: PathBuf },

    /// Read up to `lines` lines from the data FIFO and echo them to stdout.
    ReadData {
        #[serde(default = "default_lines")]
        lines: usize,
    },

    SendAck,
    SendNack,
    OnTraversalSuccess,
    CloseDataFifo,

    /// Close the ack FIFO. No token follows, the channel is gone.
    CloseTool,

    /// Fail on purpose, for exercising the host's nck handling.
    Fail { message: String },

    /// Stop reading commands. No token follows.
    Shutdown,
}

fn default_lines() -> usize {
    1
}
