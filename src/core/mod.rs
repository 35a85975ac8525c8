//! Core game logic - pure, deterministic, and I/O free
//!
//! - [`board`]: 10x20 grid with collision detection and line clearing
//! - [`piece`]: shape tables, movement, and rotation with wall kicks
//! - [`rng`]: deterministic piece generation
//! - [`game`]: authoritative simulation tying the pieces together
//!
//! Both ends of a match run this module against the same inputs; it must
//! produce bit-identical results on the server and on every client.

pub mod board;
pub mod game;
pub mod piece;
pub mod rng;

pub use board::Board;
pub use game::{Game, TickOutcome};
pub use piece::Piece;
pub use rng::PieceRng;
