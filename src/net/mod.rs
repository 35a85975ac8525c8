//! Networking - binary protocol plus client and server transports
//!
//! Everything here is single-threaded and poll-driven: sockets run in
//! non-blocking mode and every potentially blocking call returns a
//! distinguishable "would block" outcome instead of suspending the caller.

use std::io;

use thiserror::Error;

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{ClientContext, ClientState};
pub use protocol::{Header, Message, MessageType};
pub use server::{ServerContext, ServerState};

/// Default TCP port
pub const DEFAULT_PORT: u16 = 5555;
/// Maximum simultaneous peers
pub const MAX_CLIENTS: usize = 2;
/// Wire buffer size in bytes; every message must fit in one buffer
pub const BUFFER_SIZE: usize = 1024;
/// Heartbeat interval in milliseconds
pub const HEARTBEAT_INTERVAL_MS: u64 = 1000;
/// Bounded readiness wait inside the server poll (milliseconds)
pub const POLL_TIMEOUT_MS: u64 = 10;
/// Bounded readiness wait inside the client receive (milliseconds)
pub const RECV_POLL_MS: u64 = 5;

/// Transport and codec error taxonomy.
///
/// Soft conditions (would-block on send or receive) never surface here; they
/// are logged and swallowed at the call site. Everything below is either a
/// hard failure for the operation or for the connection itself.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("network initialization failed: {0}")]
    Init(#[source] io::Error),

    #[error("connection failed: {0}")]
    Connect(#[source] io::Error),

    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    #[error("receive failed: {0}")]
    Recv(#[source] io::Error),

    #[error("peer timed out")]
    Timeout,

    #[error("peer disconnected")]
    Disconnected,

    #[error("invalid message: {0}")]
    InvalidMessage(#[from] ProtoError),

    #[error("server is full")]
    ServerFull,

    #[error("no peers received the message")]
    NoRecipients,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Codec-level failures, kept distinct so callers can tell a short read from
/// actual corruption.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
    #[error("serialize buffer too small (needed {needed}, available {available})")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("truncated message (declared {declared}, available {available})")]
    Truncated { declared: usize, available: usize },

    #[error("nonsensical size field {0}")]
    BadSize(u32),

    #[error("unknown message type {0}")]
    UnknownType(u32),

    #[error("checksum mismatch (header {expected:#06x}, computed {computed:#06x})")]
    ChecksumMismatch { expected: u16, computed: u16 },

    #[error("payload too short for {msg_type:?} ({available} bytes)")]
    ShortPayload {
        msg_type: MessageType,
        available: usize,
    },
}
