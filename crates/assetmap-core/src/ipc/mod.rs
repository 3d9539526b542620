//! Local IPC transport to the backend command surface.
//!
//! Uses length-prefixed JSON-RPC 2.0 over TCP. Replies answer requests by
//! id; progress events arrive as notifications on the `export-progress`
//! channel and are published to the progress bus.

pub mod client;
pub mod protocol;

pub use client::IpcClient;
pub use protocol::{Incoming, IpcError, IpcRequest};
