//! Server transport - the hosting side of a match
//!
//! One non-blocking listener plus a fixed slot arena of peers. The peer id a
//! client sees is its slot index; slots are reused after eviction, so ids are
//! only unique among live peers. All socket work happens inside
//! [`ServerContext::poll_messages`], called once per tick by the host loop.

use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use arrayvec::ArrayVec;
use tracing::{debug, info, warn};

use crate::net::protocol::{
    self, Message, PlayerInputData, RejectReason, HEADER_SIZE, PROTOCOL_VERSION,
};
use crate::net::{NetError, BUFFER_SIZE, HEARTBEAT_INTERVAL_MS, MAX_CLIENTS, POLL_TIMEOUT_MS};

/// Server lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Listening,
    Running,
    Shutdown,
}

/// One connected (or handshaking) peer
struct Peer {
    stream: TcpStream,
    addr: SocketAddr,
    /// Bytes read off the socket but not yet parsed into a full message
    pending: Vec<u8>,
    last_received: Instant,
    last_sent: Instant,
    /// Handshake completed; only accepted peers get broadcasts
    accepted: bool,
    /// Most recent input snapshot from this peer
    last_input: Option<PlayerInputData>,
}

impl Peer {
    fn new(stream: TcpStream, addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            stream,
            addr,
            pending: Vec::with_capacity(BUFFER_SIZE),
            last_received: now,
            last_sent: now,
            accepted: false,
            last_input: None,
        }
    }
}

/// Server-side connection table and listener
pub struct ServerContext {
    listener: Option<TcpListener>,
    peers: [Option<Peer>; MAX_CLIENTS],
    state: ServerState,
    heartbeat_interval: Duration,
}

impl ServerContext {
    pub fn new() -> Self {
        Self {
            listener: None,
            peers: [const { None }; MAX_CLIENTS],
            state: ServerState::Idle,
            heartbeat_interval: Duration::from_millis(HEARTBEAT_INTERVAL_MS),
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Live peers, handshaking included
    pub fn peer_count(&self) -> usize {
        self.peers.iter().filter(|slot| slot.is_some()).count()
    }

    /// Most recent input snapshot from a peer, if any arrived
    pub fn last_input(&self, id: u32) -> Option<&PlayerInputData> {
        self.peers
            .get(id as usize)
            .and_then(|slot| slot.as_ref())
            .and_then(|peer| peer.last_input.as_ref())
    }

    /// Bound port, available once `init` succeeds; port 0 binds ephemeral
    pub fn local_port(&self) -> Option<u16> {
        self.listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
            .map(|addr| addr.port())
    }

    /// Shorten the heartbeat window; the default matches the wire policy
    pub fn set_heartbeat_interval(&mut self, interval: Duration) {
        self.heartbeat_interval = interval;
    }

    /// Bind the listener and put it in non-blocking mode
    pub fn init(&mut self, port: u16) -> Result<(), NetError> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).map_err(NetError::Init)?;
        listener.set_nonblocking(true).map_err(NetError::Init)?;
        info!(addr = ?listener.local_addr().ok(), "server bound");
        self.listener = Some(listener);
        Ok(())
    }

    /// Begin accepting connections
    pub fn start(&mut self) -> Result<(), NetError> {
        if self.listener.is_none() {
            return Err(NetError::InvalidArgument(
                "start called before init".to_string(),
            ));
        }
        self.state = ServerState::Listening;
        info!("server listening");
        Ok(())
    }

    /// Take at most one pending connection off the listener.
    ///
    /// A connection with no free slot is refused with a best-effort
    /// `ConnectReject` before being dropped. Returns the new peer's slot id.
    pub fn accept(&mut self) -> Result<Option<u32>, NetError> {
        let listener = match self.listener.as_ref() {
            Some(listener) => listener,
            None => return Ok(None),
        };

        let (stream, addr) = match listener.accept() {
            Ok(pair) => pair,
            Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
            Err(err) => return Err(NetError::Recv(err)),
        };

        let Some(slot) = self.peers.iter().position(|slot| slot.is_none()) else {
            warn!(%addr, "connection refused, table full");
            refuse(stream, RejectReason::ServerFull);
            return Err(NetError::ServerFull);
        };

        stream.set_nodelay(true).map_err(NetError::Init)?;
        stream.set_nonblocking(true).map_err(NetError::Init)?;
        info!(%addr, slot, "peer connected");
        self.peers[slot] = Some(Peer::new(stream, addr));
        if self.state == ServerState::Listening {
            self.state = ServerState::Running;
        }
        Ok(Some(slot as u32))
    }

    /// One full poll cycle: accept, then one bounded read per ready peer in
    /// slot order. Handshake and liveness messages are consumed internally;
    /// everything else is returned tagged with the sender's slot id.
    ///
    /// Sleeps the poll timeout when nothing was ready, so an idle host loop
    /// stays off the CPU.
    pub fn poll_messages(&mut self) -> Result<Vec<(u32, Message)>, NetError> {
        match self.accept() {
            Ok(_) | Err(NetError::ServerFull) => {}
            Err(err) => return Err(err),
        }

        let mut events = Vec::new();
        let mut had_data = false;
        let mut evict: ArrayVec<usize, MAX_CLIENTS> = ArrayVec::new();

        for slot in 0..MAX_CLIENTS {
            {
                let Some(peer) = self.peers[slot].as_mut() else {
                    continue;
                };
                match fill_pending(peer) {
                    Ok(read) => had_data |= read,
                    Err(()) => {
                        evict.push(slot);
                        continue;
                    }
                }
            }

            loop {
                // Re-borrow each turn; handling a message may touch the table.
                let next = match self.peers[slot].as_mut() {
                    Some(peer) => take_pending_message(peer),
                    None => break,
                };
                match next {
                    Ok(Some(message)) => {
                        if self.handle_peer_message(slot, message, &mut events) {
                            evict.push(slot);
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        warn!(slot, %err, "dropping malformed message");
                        break;
                    }
                }
            }
        }

        for slot in evict {
            self.remove_peer(slot, "connection lost");
        }

        if !had_data && events.is_empty() {
            thread::sleep(Duration::from_millis(POLL_TIMEOUT_MS));
        }
        Ok(events)
    }

    /// Returns true when the peer must be removed
    fn handle_peer_message(
        &mut self,
        slot: usize,
        message: Message,
        events: &mut Vec<(u32, Message)>,
    ) -> bool {
        match message {
            Message::ConnectRequest { protocol_version } => {
                if protocol_version != PROTOCOL_VERSION {
                    warn!(slot, protocol_version, "version mismatch, rejecting");
                    if let Err(err) = self.send_to(
                        slot as u32,
                        &Message::ConnectReject {
                            reason: RejectReason::VersionMismatch,
                        },
                    ) {
                        debug!(slot, %err, "reject not delivered");
                    }
                    return true;
                }
                if let Err(err) = self.send_to(
                    slot as u32,
                    &Message::ConnectAccept {
                        player_id: slot as u32,
                    },
                ) {
                    warn!(slot, %err, "accept not delivered");
                    return true;
                }
                if let Some(peer) = self.peers[slot].as_mut() {
                    peer.accepted = true;
                }
                info!(slot, "peer accepted");
                false
            }
            Message::PlayerInput(input) => {
                if let Some(peer) = self.peers[slot].as_mut() {
                    peer.last_input = Some(input);
                }
                events.push((slot as u32, Message::PlayerInput(input)));
                false
            }
            Message::Heartbeat => {
                // Liveness bookkeeping already happened on receipt.
                false
            }
            Message::Disconnect => {
                info!(slot, "peer said goodbye");
                true
            }
            other => {
                events.push((slot as u32, other));
                false
            }
        }
    }

    /// Send one message to every accepted peer; soft failures are skipped,
    /// hard failures drop the peer. Returns the number of deliveries, or
    /// [`NetError::NoRecipients`] when the message reached nobody.
    pub fn broadcast(&mut self, message: &Message) -> Result<usize, NetError> {
        let mut buf = [0u8; BUFFER_SIZE];
        let len = protocol::serialize(message, &mut buf)?;

        let mut delivered = 0usize;
        for slot in 0..MAX_CLIENTS {
            let Some(peer) = self.peers[slot].as_mut() else {
                continue;
            };
            if !peer.accepted {
                continue;
            }
            match write_frame(peer, &buf[..len]) {
                Ok(()) => delivered += 1,
                Err(()) => self.remove_peer(slot, "write failed"),
            }
        }
        if delivered == 0 {
            return Err(NetError::NoRecipients);
        }
        Ok(delivered)
    }

    /// Send one message to one peer by slot id
    pub fn send_to(&mut self, id: u32, message: &Message) -> Result<(), NetError> {
        let mut buf = [0u8; BUFFER_SIZE];
        let len = protocol::serialize(message, &mut buf)?;

        let peer = self
            .peers
            .get_mut(id as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or_else(|| NetError::InvalidArgument(format!("no peer in slot {id}")))?;

        if write_frame(peer, &buf[..len]).is_err() {
            self.remove_peer(id as usize, "write failed");
            return Err(NetError::Disconnected);
        }
        Ok(())
    }

    /// Heartbeat sweep: ping quiet peers after two intervals, evict after
    /// three. Returns the number of peers evicted.
    pub fn check_heartbeats(&mut self) -> usize {
        let mut evict: ArrayVec<usize, MAX_CLIENTS> = ArrayVec::new();

        for slot in 0..MAX_CLIENTS {
            let Some(peer) = self.peers[slot].as_mut() else {
                continue;
            };
            let quiet = peer.last_received.elapsed();

            if quiet > self.heartbeat_interval * 3 {
                warn!(slot, ?quiet, "peer timed out");
                evict.push(slot);
            } else if quiet > self.heartbeat_interval * 2
                && peer.last_sent.elapsed() > self.heartbeat_interval
            {
                debug!(slot, "pinging quiet peer");
                let mut buf = [0u8; HEADER_SIZE];
                if let Ok(len) = protocol::serialize(&Message::Heartbeat, &mut buf) {
                    if write_frame(peer, &buf[..len]).is_err() {
                        evict.push(slot);
                    }
                }
            }
        }

        let evicted = evict.len();
        for slot in evict {
            self.remove_peer(slot, "heartbeat timeout");
        }
        evicted
    }

    /// Notify peers, drop every connection, and close the listener
    pub fn cleanup(&mut self) {
        if let Err(err) = self.broadcast(&Message::Disconnect) {
            debug!(%err, "shutdown notice not delivered");
        }
        for slot in 0..MAX_CLIENTS {
            if self.peers[slot].is_some() {
                self.remove_peer(slot, "server shutdown");
            }
        }
        self.listener = None;
        self.state = ServerState::Shutdown;
        info!("server shut down");
    }

    fn remove_peer(&mut self, slot: usize, why: &str) {
        if let Some(peer) = self.peers[slot].take() {
            info!(slot, addr = %peer.addr, why, "peer removed");
            let _ = peer.stream.shutdown(Shutdown::Both);
        }
    }
}

impl Default for ServerContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort reject on a stream we are about to drop
fn refuse(mut stream: TcpStream, reason: RejectReason) {
    let mut buf = [0u8; HEADER_SIZE + 1];
    if let Ok(len) = protocol::serialize(&Message::ConnectReject { reason }, &mut buf) {
        let _ = stream.write(&buf[..len]);
    }
    let _ = stream.shutdown(Shutdown::Both);
}

/// Non-blocking read into the peer's pending buffer.
///
/// `Ok(true)` when bytes arrived, `Ok(false)` on would-block, `Err(())` when
/// the peer is gone.
fn fill_pending(peer: &mut Peer) -> Result<bool, ()> {
    let mut chunk = [0u8; BUFFER_SIZE];
    match peer.stream.read(&mut chunk) {
        Ok(0) => Err(()),
        Ok(read) => {
            peer.pending.extend_from_slice(&chunk[..read]);
            Ok(true)
        }
        Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(false),
        Err(err) => {
            warn!(addr = %peer.addr, %err, "read failed");
            Err(())
        }
    }
}

/// Parse and drain one complete message from the peer's pending buffer
fn take_pending_message(peer: &mut Peer) -> Result<Option<Message>, NetError> {
    if peer.pending.len() < HEADER_SIZE {
        return Ok(None);
    }
    let header = protocol::read_header(&peer.pending);
    if !protocol::validate(&header) {
        peer.pending.clear();
        return Err(NetError::InvalidMessage(crate::net::ProtoError::BadSize(
            header.msg_size,
        )));
    }
    let msg_size = header.msg_size as usize;
    if peer.pending.len() < msg_size {
        return Ok(None);
    }

    let message = protocol::deserialize(&peer.pending[..msg_size])?;
    peer.pending.drain(..msg_size);
    peer.last_received = Instant::now();
    Ok(Some(message))
}

/// Write one serialized frame; soft failures drop the frame, hard failures
/// report the peer as gone
fn write_frame(peer: &mut Peer, frame: &[u8]) -> Result<(), ()> {
    match peer.stream.write(frame) {
        Ok(written) if written == frame.len() => {
            peer.last_sent = Instant::now();
            Ok(())
        }
        Ok(written) => {
            warn!(addr = %peer.addr, written, len = frame.len(), "short write, frame dropped");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::WouldBlock => {
            warn!(addr = %peer.addr, "send would block, frame dropped");
            Ok(())
        }
        Err(err) => {
            warn!(addr = %peer.addr, %err, "write failed");
            Err(())
        }
    }
}
