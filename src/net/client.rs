//! Client transport - the joining side of a match
//!
//! A thin connection wrapper over one non-blocking TCP stream. The session
//! loop drives it by calling [`ClientContext::receive`] and
//! [`ClientContext::check_liveness`] once per tick; nothing in here blocks
//! for longer than the bounded receive poll.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::net::protocol::{self, Message, RejectReason, HEADER_SIZE, PROTOCOL_VERSION};
use crate::net::{NetError, BUFFER_SIZE, HEARTBEAT_INTERVAL_MS, RECV_POLL_MS};

/// Connection lifecycle, driven by receive/cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// Client-side connection state
pub struct ClientContext {
    stream: Option<TcpStream>,
    state: ClientState,
    player_id: Option<u32>,
    /// Bytes read off the socket but not yet parsed into a full message
    pending: Vec<u8>,
    last_received: Instant,
    heartbeat_interval: Duration,
}

impl ClientContext {
    pub fn new() -> Self {
        Self {
            stream: None,
            state: ClientState::Disconnected,
            player_id: None,
            pending: Vec::with_capacity(BUFFER_SIZE),
            last_received: Instant::now(),
            heartbeat_interval: Duration::from_millis(HEARTBEAT_INTERVAL_MS),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Slot id assigned by the server, known once the handshake completes
    pub fn player_id(&self) -> Option<u32> {
        self.player_id
    }

    pub fn is_connected(&self) -> bool {
        self.state == ClientState::Connected
    }

    /// Open the connection and send the handshake request.
    ///
    /// The stream goes non-blocking immediately after connect; the accept (or
    /// reject) arrives through [`receive`](Self::receive) on a later tick.
    pub fn connect<A: ToSocketAddrs>(&mut self, addr: A) -> Result<(), NetError> {
        let stream = TcpStream::connect(addr).map_err(NetError::Connect)?;
        stream.set_nodelay(true).map_err(NetError::Connect)?;
        stream.set_nonblocking(true).map_err(NetError::Connect)?;
        info!(peer = ?stream.peer_addr().ok(), "connected, requesting session");

        self.stream = Some(stream);
        self.state = ClientState::Connecting;
        self.player_id = None;
        self.pending.clear();
        self.last_received = Instant::now();

        self.send(&Message::ConnectRequest {
            protocol_version: PROTOCOL_VERSION,
        })
    }

    /// Serialize and write one message.
    ///
    /// A would-block on write means the kernel buffer is full; the message is
    /// dropped with a warning, which is safe because every outbound message
    /// is either periodic or best-effort.
    pub fn send(&mut self, message: &Message) -> Result<(), NetError> {
        let stream = self.stream.as_mut().ok_or(NetError::Disconnected)?;

        let mut buf = [0u8; BUFFER_SIZE];
        let len = protocol::serialize(message, &mut buf)?;

        match stream.write(&buf[..len]) {
            Ok(written) if written == len => Ok(()),
            Ok(written) => {
                warn!(written, len, "short write, message dropped");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                warn!("send would block, message dropped");
                Ok(())
            }
            Err(err) => Err(NetError::Send(err)),
        }
    }

    /// Poll for one inbound message, waiting at most the bounded receive
    /// window. Returns `Ok(None)` when nothing arrived.
    ///
    /// Handshake replies are folded in here: `ConnectAccept` assigns the
    /// player id and completes the connection, `ConnectReject` fails it.
    pub fn receive(&mut self) -> Result<Option<Message>, NetError> {
        if let Some(message) = self.take_pending_message()? {
            return self.dispatch(message).map(Some);
        }

        self.fill_pending()?;
        if self.pending.is_empty() {
            // One bounded wait, then a second look. This is the poll analogue
            // of a select() with a short timeout.
            thread::sleep(Duration::from_millis(RECV_POLL_MS));
            self.fill_pending()?;
        }

        match self.take_pending_message()? {
            Some(message) => self.dispatch(message).map(Some),
            None => Ok(None),
        }
    }

    /// Shorten the heartbeat window; the default matches the wire policy
    pub fn set_heartbeat_interval(&mut self, interval: Duration) {
        self.heartbeat_interval = interval;
    }

    /// Heartbeat policy: proactively ping after two quiet intervals and
    /// restart the quiet window, declare the server gone after three.
    ///
    /// The restart means a client whose pings keep going out never times
    /// out on its own; only a send failure or true silence past 3x does.
    pub fn check_liveness(&mut self) -> Result<(), NetError> {
        if self.stream.is_none() {
            return Ok(());
        }
        let quiet = self.last_received.elapsed();

        if quiet > self.heartbeat_interval * 3 {
            warn!(?quiet, "server timed out");
            self.drop_stream();
            return Err(NetError::Timeout);
        }
        if quiet > self.heartbeat_interval * 2 {
            debug!("sending proactive heartbeat");
            self.send(&Message::Heartbeat)?;
            self.last_received = Instant::now();
        }
        Ok(())
    }

    /// Best-effort goodbye, then tear the connection down
    pub fn cleanup(&mut self) {
        if self.stream.is_some() && self.state != ClientState::Disconnected {
            self.state = ClientState::Disconnecting;
            if let Err(err) = self.send(&Message::Disconnect) {
                debug!(%err, "disconnect notice not delivered");
            }
        }
        self.drop_stream();
        info!("client connection closed");
    }

    fn drop_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.state = ClientState::Disconnected;
        self.player_id = None;
        self.pending.clear();
    }

    /// Non-blocking read of whatever the socket has, appended to `pending`
    fn fill_pending(&mut self) -> Result<(), NetError> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(NetError::Disconnected),
        };

        let mut chunk = [0u8; BUFFER_SIZE];
        match stream.read(&mut chunk) {
            Ok(0) => {
                info!("server closed the connection");
                self.drop_stream();
                Err(NetError::Disconnected)
            }
            Ok(read) => {
                self.pending.extend_from_slice(&chunk[..read]);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(err) => {
                self.drop_stream();
                Err(NetError::Recv(err))
            }
        }
    }

    /// Parse and drain one complete message from the front of `pending`
    fn take_pending_message(&mut self) -> Result<Option<Message>, NetError> {
        if self.pending.len() < HEADER_SIZE {
            return Ok(None);
        }
        let header = protocol::read_header(&self.pending);
        if !protocol::validate(&header) {
            self.pending.clear();
            return Err(NetError::InvalidMessage(crate::net::ProtoError::BadSize(
                header.msg_size,
            )));
        }
        let msg_size = header.msg_size as usize;
        if self.pending.len() < msg_size {
            return Ok(None);
        }

        let message = protocol::deserialize(&self.pending[..msg_size])?;
        self.pending.drain(..msg_size);
        self.last_received = Instant::now();
        Ok(Some(message))
    }

    fn dispatch(&mut self, message: Message) -> Result<Message, NetError> {
        match &message {
            Message::ConnectAccept { player_id } => {
                self.player_id = Some(*player_id);
                self.state = ClientState::Connected;
                info!(player_id, "session accepted");
            }
            Message::ConnectReject { reason } => {
                warn!(?reason, "session rejected");
                self.drop_stream();
                return match reason {
                    RejectReason::ServerFull => Err(NetError::ServerFull),
                    RejectReason::VersionMismatch => Err(NetError::InvalidArgument(
                        "protocol version mismatch".to_string(),
                    )),
                };
            }
            Message::Disconnect => {
                info!("server ended the session");
                self.drop_stream();
                return Err(NetError::Disconnected);
            }
            _ => {}
        }
        Ok(message)
    }
}

impl Default for ClientContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_client_is_disconnected() {
        let client = ClientContext::new();
        assert_eq!(client.state(), ClientState::Disconnected);
        assert_eq!(client.player_id(), None);
        assert!(!client.is_connected());
    }

    #[test]
    fn send_without_stream_fails() {
        let mut client = ClientContext::new();
        assert!(matches!(
            client.send(&Message::Heartbeat),
            Err(NetError::Disconnected)
        ));
    }

    #[test]
    fn liveness_is_quiet_without_a_stream() {
        let mut client = ClientContext::new();
        assert!(client.check_liveness().is_ok());
    }
}
