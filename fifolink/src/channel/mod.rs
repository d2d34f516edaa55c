//! Worker-side FIFO endpoints.
//!
//! - **ack**: write-only, carries [`Token`](crate::Token)s to the host
//! - **data**: read-only, carries newline-delimited lines from the host
//!
//! Both only open existing pipes. Creating them is the host's job.

mod ack;
mod data;

pub use ack::AckChannel;
pub use data::DataChannel;
