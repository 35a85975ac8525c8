//! Piece module - tetromino shapes, movement, and rotation with wall kicks
//!
//! Rotation states are not computed geometrically at runtime; each (kind,
//! rotation) pair is looked up in a fixed shape table so every rotation state
//! matches the reference layout exactly. The O piece deliberately repeats the
//! same 2x2 layout in all four slots, which is why the table cannot be
//! replaced by a uniform 90-degree transform.

use crate::core::board::Board;
use crate::types::{PieceKind, RotateDirection, PIECE_KIND_COUNT, PIECE_SIZE};

/// 4x4 occupancy matrix for one rotation state (0 = empty)
pub type PieceMatrix = [[u8; PIECE_SIZE]; PIECE_SIZE];

/// Number of wall-kick candidates tried per rotation
pub const KICK_TESTS: usize = 5;

/// Shape table indexed by (kind, rotation); kind order matches the wire order
#[rustfmt::skip]
const SHAPES: [[PieceMatrix; 4]; PIECE_KIND_COUNT] = [
    // I
    [
        [[0,0,0,0],
         [1,1,1,1],
         [0,0,0,0],
         [0,0,0,0]],
        [[0,0,1,0],
         [0,0,1,0],
         [0,0,1,0],
         [0,0,1,0]],
        [[0,0,0,0],
         [0,0,0,0],
         [1,1,1,1],
         [0,0,0,0]],
        [[0,1,0,0],
         [0,1,0,0],
         [0,1,0,0],
         [0,1,0,0]],
    ],
    // O
    [
        [[0,1,1,0],
         [0,1,1,0],
         [0,0,0,0],
         [0,0,0,0]],
        [[0,1,1,0],
         [0,1,1,0],
         [0,0,0,0],
         [0,0,0,0]],
        [[0,1,1,0],
         [0,1,1,0],
         [0,0,0,0],
         [0,0,0,0]],
        [[0,1,1,0],
         [0,1,1,0],
         [0,0,0,0],
         [0,0,0,0]],
    ],
    // S
    [
        [[0,1,1,0],
         [1,1,0,0],
         [0,0,0,0],
         [0,0,0,0]],
        [[0,1,0,0],
         [0,1,1,0],
         [0,0,1,0],
         [0,0,0,0]],
        [[0,0,0,0],
         [0,1,1,0],
         [1,1,0,0],
         [0,0,0,0]],
        [[1,0,0,0],
         [1,1,0,0],
         [0,1,0,0],
         [0,0,0,0]],
    ],
    // Z
    [
        [[1,1,0,0],
         [0,1,1,0],
         [0,0,0,0],
         [0,0,0,0]],
        [[0,0,1,0],
         [0,1,1,0],
         [0,1,0,0],
         [0,0,0,0]],
        [[0,0,0,0],
         [1,1,0,0],
         [0,1,1,0],
         [0,0,0,0]],
        [[0,1,0,0],
         [1,1,0,0],
         [1,0,0,0],
         [0,0,0,0]],
    ],
    // J
    [
        [[1,0,0,0],
         [1,1,1,0],
         [0,0,0,0],
         [0,0,0,0]],
        [[0,1,1,0],
         [0,1,0,0],
         [0,1,0,0],
         [0,0,0,0]],
        [[0,0,0,0],
         [1,1,1,0],
         [0,0,1,0],
         [0,0,0,0]],
        [[0,1,0,0],
         [0,1,0,0],
         [1,1,0,0],
         [0,0,0,0]],
    ],
    // L
    [
        [[0,0,1,0],
         [1,1,1,0],
         [0,0,0,0],
         [0,0,0,0]],
        [[0,1,0,0],
         [0,1,0,0],
         [0,1,1,0],
         [0,0,0,0]],
        [[0,0,0,0],
         [1,1,1,0],
         [1,0,0,0],
         [0,0,0,0]],
        [[1,1,0,0],
         [0,1,0,0],
         [0,1,0,0],
         [0,0,0,0]],
    ],
    // T
    [
        [[0,1,0,0],
         [1,1,1,0],
         [0,0,0,0],
         [0,0,0,0]],
        [[0,1,0,0],
         [0,1,1,0],
         [0,1,0,0],
         [0,0,0,0]],
        [[0,0,0,0],
         [1,1,1,0],
         [0,1,0,0],
         [0,0,0,0]],
        [[0,1,0,0],
         [1,1,0,0],
         [0,1,0,0],
         [0,0,0,0]],
    ],
];

/// Wall-kick candidates for J/L/S/Z/O/T, indexed by the originating rotation.
///
/// The first candidate is always the plain rotation with no offset.
#[rustfmt::skip]
const WALL_KICKS: [[(i32, i32); KICK_TESTS]; 4] = [
    /* 0 */ [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
    /* 1 */ [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
    /* 2 */ [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
    /* 3 */ [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
];

/// Wall-kick candidates for the I piece
#[rustfmt::skip]
const WALL_KICKS_I: [[(i32, i32); KICK_TESTS]; 4] = [
    /* 0 */ [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)],
    /* 1 */ [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)],
    /* 2 */ [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)],
    /* 3 */ [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)],
];

/// Initial (x, y) per kind; y = -1 spawns the piece one row above the board
const INITIAL_POSITIONS: [(i32, i32); PIECE_KIND_COUNT] = [
    (3, -1), // I
    (4, -1), // O
    (4, -1), // S
    (4, -1), // Z
    (4, -1), // J
    (4, -1), // L
    (4, -1), // T
];

/// Shape table lookup, used by the renderer for the next-piece preview
pub fn shape(kind: PieceKind, rotation: u8) -> &'static PieceMatrix {
    &SHAPES[kind.index()][(rotation as usize) % 4]
}

/// An active tetromino: kind, current rotation matrix, and board position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceKind,
    matrix: PieceMatrix,
    pub x: i32,
    pub y: i32,
    pub rotation: u8,
}

impl Piece {
    /// Create a piece at its kind's initial position, rotation 0
    pub fn spawn(kind: PieceKind) -> Self {
        let (x, y) = INITIAL_POSITIONS[kind.index()];
        Self {
            kind,
            matrix: SHAPES[kind.index()][0],
            x,
            y,
            rotation: 0,
        }
    }

    /// The occupancy matrix for the current rotation
    pub fn matrix(&self) -> &PieceMatrix {
        &self.matrix
    }

    /// Reload the matrix from the shape table for the current rotation
    fn set_shape(&mut self) {
        self.matrix = SHAPES[self.kind.index()][self.rotation as usize];
    }

    /// Tentatively translate by (dx, dy); reverts the position on collision.
    ///
    /// Returns true when the move was kept.
    pub fn try_move(&mut self, board: &Board, dx: i32, dy: i32) -> bool {
        self.x += dx;
        self.y += dy;
        if board.check_collision(self) {
            self.x -= dx;
            self.y -= dy;
            return false;
        }
        true
    }

    /// Rotate with wall-kick resolution.
    ///
    /// Tries five offset candidates (from the I table or the shared table,
    /// keyed by the originating rotation) and keeps the first non-colliding
    /// one. When all five collide, the piece is restored bit-identically and
    /// false is returned.
    pub fn rotate(&mut self, board: &Board, direction: RotateDirection) -> bool {
        let original = *self;

        self.rotation = match direction {
            RotateDirection::Clockwise => (self.rotation + 1) % 4,
            RotateDirection::CounterClockwise => (self.rotation + 3) % 4,
        };
        self.set_shape();

        let kicks = if self.kind == PieceKind::I {
            &WALL_KICKS_I[original.rotation as usize]
        } else {
            &WALL_KICKS[original.rotation as usize]
        };

        for &(dx, dy) in kicks {
            self.x = original.x + dx;
            self.y = original.y + dy;
            if !board.check_collision(self) {
                return true;
            }
        }

        *self = original;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_positions_match_table() {
        let i = Piece::spawn(PieceKind::I);
        assert_eq!((i.x, i.y), (3, -1));
        assert_eq!(i.rotation, 0);

        for kind in [
            PieceKind::O,
            PieceKind::S,
            PieceKind::Z,
            PieceKind::J,
            PieceKind::L,
            PieceKind::T,
        ] {
            let p = Piece::spawn(kind);
            assert_eq!((p.x, p.y), (4, -1), "{:?}", kind);
        }
    }

    #[test]
    fn every_rotation_state_has_four_cells() {
        for kind in PieceKind::ALL {
            for rotation in 0..4 {
                let count: u8 = SHAPES[kind.index()][rotation]
                    .iter()
                    .flatten()
                    .sum();
                assert_eq!(count, 4, "{:?} rotation {}", kind, rotation);
            }
        }
    }

    #[test]
    fn o_piece_shape_is_rotation_invariant() {
        let o = PieceKind::O.index();
        for rotation in 1..4 {
            assert_eq!(SHAPES[o][rotation], SHAPES[o][0]);
        }
    }

    #[test]
    fn first_kick_candidate_is_zero_offset() {
        for from in 0..4 {
            assert_eq!(WALL_KICKS[from][0], (0, 0));
            assert_eq!(WALL_KICKS_I[from][0], (0, 0));
        }
    }

    #[test]
    fn four_rotations_return_to_original() {
        let board = Board::standard();
        for kind in PieceKind::ALL {
            let mut piece = Piece::spawn(kind);
            piece.y = 5; // Clear of the spawn row so no kick is needed.
            let original = piece;
            for _ in 0..4 {
                assert!(piece.rotate(&board, RotateDirection::Clockwise));
            }
            assert_eq!(piece, original, "{:?}", kind);
        }
    }

    #[test]
    fn failed_rotation_restores_the_piece_exactly() {
        // Fill the board, then carve a pocket exactly matching the T's
        // current cells so every kick candidate lands on occupied cells.
        let mut board = Board::standard();
        let full = vec![1u8; board.width() * board.height()];
        assert!(board.load(&full));

        let mut piece = Piece::spawn(PieceKind::T);
        piece.x = 3;
        piece.y = 8;
        let mut pocket = full.clone();
        for my in 0..PIECE_SIZE {
            for mx in 0..PIECE_SIZE {
                if piece.matrix()[my][mx] != 0 {
                    let bx = (piece.x + mx as i32) as usize;
                    let by = (piece.y + my as i32) as usize;
                    pocket[by * board.width() + bx] = 0;
                }
            }
        }
        assert!(board.load(&pocket));
        assert!(!board.check_collision(&piece));

        let before = piece;
        assert!(!piece.rotate(&board, RotateDirection::Clockwise));
        assert_eq!(piece, before);
    }

    #[test]
    fn move_reverts_position_on_collision() {
        let board = Board::standard();
        let mut piece = Piece::spawn(PieceKind::T);
        piece.x = 0;
        piece.y = 5;
        // T at x=0 occupies columns 0..3; moving left must fail.
        let before = piece;
        assert!(!piece.try_move(&board, -1, 0));
        assert_eq!(piece, before);
        assert!(piece.try_move(&board, 1, 0));
        assert_eq!(piece.x, 1);
    }
}
