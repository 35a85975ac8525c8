//! Deterministic piece generation
//!
//! A small LCG (Numerical Recipes constants) keeps piece selection
//! reproducible from a seed. The server owns the only live generator; clients
//! never draw pieces, they are told the next kind in each state snapshot.

use crate::types::{PieceKind, PIECE_KIND_COUNT};

/// Seedable pseudo-random piece picker
#[derive(Debug, Clone)]
pub struct PieceRng {
    state: u32,
}

impl PieceRng {
    /// Create a generator; a zero seed is bumped to 1 to avoid a stuck state
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Draw the next piece kind, uniformly over the seven kinds
    pub fn next_kind(&mut self) -> PieceKind {
        let index = (self.next_u32() % PIECE_KIND_COUNT as u32) as u8;
        PieceKind::from_index(index).unwrap_or(PieceKind::I)
    }
}
