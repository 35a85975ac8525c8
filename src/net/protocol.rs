//! Protocol module - binary wire format shared by client and server
//!
//! Every message starts with a 10-byte header:
//!
//! ```text
//! [msg_size: u32][msg_type: u32][checksum: u16]   (all big-endian)
//! ```
//!
//! followed by a fixed-layout payload selected by `msg_type`. The checksum
//! covers the payload bytes only, never the header; a corrupted size field is
//! caught by the size-vs-buffer bound check instead. Interoperability depends
//! on both asymmetries, so neither may be "fixed".

use tracing::warn;

use crate::net::ProtoError;
use crate::types::{BOARD_CELLS, KEY_COUNT};

/// Header size on the wire, in bytes
pub const HEADER_SIZE: usize = 10;

/// Protocol version carried in connection requests
pub const PROTOCOL_VERSION: u32 = 1;

/// Wire message types; 0 is reserved as invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    ConnectRequest = 1,
    ConnectAccept = 2,
    ConnectReject = 3,
    GameState = 4,
    PlayerInput = 5,
    Heartbeat = 6,
    Disconnect = 7,
    GameEvent = 8,
}

impl MessageType {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::ConnectRequest),
            2 => Some(Self::ConnectAccept),
            3 => Some(Self::ConnectReject),
            4 => Some(Self::GameState),
            5 => Some(Self::PlayerInput),
            6 => Some(Self::Heartbeat),
            7 => Some(Self::Disconnect),
            8 => Some(Self::GameEvent),
            _ => None,
        }
    }

    /// Fixed payload size for this type
    pub fn payload_size(self) -> usize {
        match self {
            Self::ConnectRequest => 4,
            Self::ConnectAccept => 4,
            Self::ConnectReject => 1,
            Self::GameState => 4 + 4 + BOARD_CELLS + 1,
            Self::PlayerInput => KEY_COUNT + KEY_COUNT + 4,
            Self::Heartbeat | Self::Disconnect => 0,
            Self::GameEvent => 1 + 4,
        }
    }
}

/// Why a connection request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectReason {
    ServerFull = 0,
    VersionMismatch = 1,
}

impl RejectReason {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::VersionMismatch,
            _ => Self::ServerFull,
        }
    }
}

/// Out-of-band game events pushed by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GameEventKind {
    LinesCleared = 0,
    GameOver = 1,
    MatchEnded = 2,
}

impl GameEventKind {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::GameOver,
            2 => Self::MatchEnded,
            _ => Self::LinesCleared,
        }
    }
}

/// Full-state snapshot pushed by the server every tick
#[derive(Debug, Clone, PartialEq)]
pub struct GameStateData {
    /// Elapsed game time in seconds
    pub game_time: f32,
    /// Authoritative score
    pub score: u32,
    /// Full board cell buffer (0 = empty, kind + 1 = occupied)
    pub board: [u8; BOARD_CELLS],
    /// Next-piece wire index
    pub next_piece: u8,
}

/// Key-state snapshot sent by the client every tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerInputData {
    pub keys: [u8; KEY_COUNT],
    pub prev_keys: [u8; KEY_COUNT],
    /// Client-side timestamp in seconds
    pub timestamp: f32,
}

/// Tagged wire message; exactly one payload shape is reachable per type
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    ConnectRequest { protocol_version: u32 },
    ConnectAccept { player_id: u32 },
    ConnectReject { reason: RejectReason },
    GameState(GameStateData),
    PlayerInput(PlayerInputData),
    Heartbeat,
    Disconnect,
    GameEvent { event: GameEventKind, value: u32 },
}

impl Message {
    pub fn msg_type(&self) -> MessageType {
        match self {
            Message::ConnectRequest { .. } => MessageType::ConnectRequest,
            Message::ConnectAccept { .. } => MessageType::ConnectAccept,
            Message::ConnectReject { .. } => MessageType::ConnectReject,
            Message::GameState(_) => MessageType::GameState,
            Message::PlayerInput(_) => MessageType::PlayerInput,
            Message::Heartbeat => MessageType::Heartbeat,
            Message::Disconnect => MessageType::Disconnect,
            Message::GameEvent { .. } => MessageType::GameEvent,
        }
    }

    /// Total serialized size, header included
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.msg_type().payload_size()
    }
}

/// Message header as read off the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total message size, header + payload
    pub msg_size: u32,
    /// Raw message type
    pub msg_type: u32,
    /// Payload checksum
    pub checksum: u16,
}

/// Build a header for a payload of the given size; the checksum is filled in
/// at serialize time
pub fn make_header(msg_type: MessageType, payload_size: usize) -> Header {
    Header {
        msg_size: (HEADER_SIZE + payload_size) as u32,
        msg_type: msg_type as u32,
        checksum: 0,
    }
}

/// XOR-rotating 16-bit checksum.
///
/// Bytes are folded in 4-byte groups, even offsets shifted into the high
/// byte; the 1-3 trailing bytes keep the same parity rule. This is a
/// corruption heuristic, not a cryptographic guarantee: two flips in
/// matching positions cancel out.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u16 = 0;

    let mut chunks = data.chunks_exact(4);
    for group in &mut chunks {
        sum ^= (group[0] as u16) << 8;
        sum ^= group[1] as u16;
        sum ^= (group[2] as u16) << 8;
        sum ^= group[3] as u16;
    }
    for (i, &byte) in chunks.remainder().iter().enumerate() {
        if i % 2 == 0 {
            sum ^= (byte as u16) << 8;
        } else {
            sum ^= byte as u16;
        }
    }

    sum
}

/// Structural validation of a received header.
///
/// The type must be in range and the declared size must cover the type's
/// fixed payload. Heartbeat and disconnect carry no payload; trailing bytes
/// on those two are logged and tolerated (padding policy), never fatal.
pub fn validate(header: &Header) -> bool {
    let Some(msg_type) = MessageType::from_u32(header.msg_type) else {
        warn!(raw = header.msg_type, "invalid message type");
        return false;
    };

    let min_size = (HEADER_SIZE + msg_type.payload_size()) as u32;
    match msg_type {
        MessageType::Heartbeat | MessageType::Disconnect => {
            if header.msg_size != min_size {
                warn!(
                    ?msg_type,
                    size = header.msg_size,
                    "empty-payload message carries extra data"
                );
            }
            header.msg_size >= HEADER_SIZE as u32
        }
        _ => {
            if header.msg_size < min_size {
                warn!(?msg_type, size = header.msg_size, min_size, "message too small");
                return false;
            }
            true
        }
    }
}

/// Serialize a message into `buffer`, returning the number of bytes written.
///
/// Fails without touching the header area when the buffer cannot hold the
/// whole message. The checksum is computed over the payload bytes only.
pub fn serialize(message: &Message, buffer: &mut [u8]) -> Result<usize, ProtoError> {
    let total = message.wire_size();
    if buffer.len() < total {
        return Err(ProtoError::BufferTooSmall {
            needed: total,
            available: buffer.len(),
        });
    }

    let payload_len = write_payload(message, &mut buffer[HEADER_SIZE..total]);
    debug_assert_eq!(payload_len, total - HEADER_SIZE);

    let sum = checksum(&buffer[HEADER_SIZE..total]);
    buffer[0..4].copy_from_slice(&(total as u32).to_be_bytes());
    buffer[4..8].copy_from_slice(&(message.msg_type() as u32).to_be_bytes());
    buffer[8..10].copy_from_slice(&sum.to_be_bytes());

    Ok(total)
}

/// Parse one message from the front of `buffer`.
///
/// Rejects short reads, truncated messages, unknown types, and checksum
/// mismatches with distinct errors.
pub fn deserialize(buffer: &[u8]) -> Result<Message, ProtoError> {
    if buffer.len() < HEADER_SIZE {
        return Err(ProtoError::Truncated {
            declared: HEADER_SIZE,
            available: buffer.len(),
        });
    }

    let header = read_header(buffer);
    let msg_size = header.msg_size as usize;

    if msg_size < HEADER_SIZE {
        return Err(ProtoError::BadSize(header.msg_size));
    }
    if msg_size > buffer.len() {
        return Err(ProtoError::Truncated {
            declared: msg_size,
            available: buffer.len(),
        });
    }

    let msg_type =
        MessageType::from_u32(header.msg_type).ok_or(ProtoError::UnknownType(header.msg_type))?;

    let payload = &buffer[HEADER_SIZE..msg_size];
    let computed = checksum(payload);
    if computed != header.checksum {
        return Err(ProtoError::ChecksumMismatch {
            expected: header.checksum,
            computed,
        });
    }

    if payload.len() < msg_type.payload_size() {
        return Err(ProtoError::ShortPayload {
            msg_type,
            available: payload.len(),
        });
    }

    Ok(read_payload(msg_type, payload))
}

/// Read the fixed header fields off the front of a buffer
pub fn read_header(buffer: &[u8]) -> Header {
    Header {
        msg_size: u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]),
        msg_type: u32::from_be_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]),
        checksum: u16::from_be_bytes([buffer[8], buffer[9]]),
    }
}

fn write_payload(message: &Message, out: &mut [u8]) -> usize {
    match message {
        Message::ConnectRequest { protocol_version } => {
            out[0..4].copy_from_slice(&protocol_version.to_be_bytes());
            4
        }
        Message::ConnectAccept { player_id } => {
            out[0..4].copy_from_slice(&player_id.to_be_bytes());
            4
        }
        Message::ConnectReject { reason } => {
            out[0] = *reason as u8;
            1
        }
        Message::GameState(state) => {
            out[0..4].copy_from_slice(&state.game_time.to_bits().to_be_bytes());
            out[4..8].copy_from_slice(&state.score.to_be_bytes());
            out[8..8 + BOARD_CELLS].copy_from_slice(&state.board);
            out[8 + BOARD_CELLS] = state.next_piece;
            8 + BOARD_CELLS + 1
        }
        Message::PlayerInput(input) => {
            out[0..KEY_COUNT].copy_from_slice(&input.keys);
            out[KEY_COUNT..2 * KEY_COUNT].copy_from_slice(&input.prev_keys);
            out[2 * KEY_COUNT..2 * KEY_COUNT + 4]
                .copy_from_slice(&input.timestamp.to_bits().to_be_bytes());
            2 * KEY_COUNT + 4
        }
        Message::Heartbeat | Message::Disconnect => 0,
        Message::GameEvent { event, value } => {
            out[0] = *event as u8;
            out[1..5].copy_from_slice(&value.to_be_bytes());
            5
        }
    }
}

fn read_payload(msg_type: MessageType, payload: &[u8]) -> Message {
    match msg_type {
        MessageType::ConnectRequest => Message::ConnectRequest {
            protocol_version: u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]),
        },
        MessageType::ConnectAccept => Message::ConnectAccept {
            player_id: u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]),
        },
        MessageType::ConnectReject => Message::ConnectReject {
            reason: RejectReason::from_u8(payload[0]),
        },
        MessageType::GameState => {
            let game_time = f32::from_bits(u32::from_be_bytes([
                payload[0], payload[1], payload[2], payload[3],
            ]));
            let score = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
            let mut board = [0u8; BOARD_CELLS];
            board.copy_from_slice(&payload[8..8 + BOARD_CELLS]);
            Message::GameState(GameStateData {
                game_time,
                score,
                board,
                next_piece: payload[8 + BOARD_CELLS],
            })
        }
        MessageType::PlayerInput => {
            let mut keys = [0u8; KEY_COUNT];
            let mut prev_keys = [0u8; KEY_COUNT];
            keys.copy_from_slice(&payload[0..KEY_COUNT]);
            prev_keys.copy_from_slice(&payload[KEY_COUNT..2 * KEY_COUNT]);
            let timestamp = f32::from_bits(u32::from_be_bytes([
                payload[2 * KEY_COUNT],
                payload[2 * KEY_COUNT + 1],
                payload[2 * KEY_COUNT + 2],
                payload[2 * KEY_COUNT + 3],
            ]));
            Message::PlayerInput(PlayerInputData {
                keys,
                prev_keys,
                timestamp,
            })
        }
        MessageType::Heartbeat => Message::Heartbeat,
        MessageType::Disconnect => Message::Disconnect,
        MessageType::GameEvent => Message::GameEvent {
            event: GameEventKind::from_u8(payload[0]),
            value: u32::from_be_bytes([payload[1], payload[2], payload[3], payload[4]]),
        },
    }
}
