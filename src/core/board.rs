//! Board module - manages the game grid
//!
//! The board is a width x height grid stored as a single contiguous byte
//! buffer in row-major order. A cell holds 0 when empty, otherwise the
//! locking piece's kind + 1. The piece currently in play is never baked into
//! the buffer until it locks.

use crate::core::piece::Piece;
use crate::types::{BOARD_HEIGHT, BOARD_WIDTH, PIECE_SIZE};

/// The game board with exclusively owned cell storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl Board {
    /// Create a new empty board of the given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    /// Standard 10x20 playfield
    pub fn standard() -> Self {
        Self::new(BOARD_WIDTH, BOARD_HEIGHT)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Read-only view of the cell buffer (row-major)
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Cell at (x, y); `None` when out of bounds
    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || x >= self.width as i32 || y < 0 || y >= self.height as i32 {
            return None;
        }
        Some(self.cells[y as usize * self.width + x as usize])
    }

    /// Reset every cell to empty
    pub fn reset(&mut self) {
        self.cells.fill(0);
    }

    /// Overwrite the whole buffer from a received snapshot.
    ///
    /// Returns false (leaving the board untouched) on a length mismatch.
    pub fn load(&mut self, snapshot: &[u8]) -> bool {
        if snapshot.len() != self.cells.len() {
            return false;
        }
        self.cells.copy_from_slice(snapshot);
        true
    }

    /// Test whether the piece overlaps walls, the floor, or settled blocks.
    ///
    /// Cells above the visible top (y < 0) only collide with the side walls,
    /// so pieces may enter the board from off-screen.
    pub fn check_collision(&self, piece: &Piece) -> bool {
        for y in 0..PIECE_SIZE {
            for x in 0..PIECE_SIZE {
                if piece.matrix()[y][x] == 0 {
                    continue;
                }
                let bx = piece.x + x as i32;
                let by = piece.y + y as i32;

                if bx < 0 || bx >= self.width as i32 || by >= self.height as i32 {
                    return true;
                }
                if by >= 0 && self.cells[by as usize * self.width + bx as usize] != 0 {
                    return true;
                }
            }
        }
        false
    }

    /// Bake the piece into the cell buffer as kind + 1.
    ///
    /// Cells that fall outside the board are skipped; a freshly spawned piece
    /// still has rows above the visible top.
    pub fn place_piece(&mut self, piece: &Piece) {
        let value = piece.kind.cell_value();
        for y in 0..PIECE_SIZE {
            for x in 0..PIECE_SIZE {
                if piece.matrix()[y][x] == 0 {
                    continue;
                }
                let bx = piece.x + x as i32;
                let by = piece.y + y as i32;
                if bx >= 0 && bx < self.width as i32 && by >= 0 && by < self.height as i32 {
                    self.cells[by as usize * self.width + bx as usize] = value;
                }
            }
        }
    }

    /// Remove every full row and compact the rest downward.
    ///
    /// Single bottom-to-top pass with a shrinking write cursor; surviving
    /// rows keep their relative order. Returns the number of rows removed.
    pub fn clear_lines(&mut self) -> usize {
        let mut cleared = 0usize;
        let mut dest_row = self.height as i32 - 1;

        for src_row in (0..self.height as i32).rev() {
            let start = src_row as usize * self.width;
            let full = self.cells[start..start + self.width].iter().all(|&c| c != 0);

            if full {
                cleared += 1;
            } else {
                if dest_row != src_row {
                    let dest = dest_row as usize * self.width;
                    self.cells.copy_within(start..start + self.width, dest);
                }
                dest_row -= 1;
            }
        }

        // Vacated rows at the top become empty.
        for y in 0..cleared {
            let start = y * self.width;
            self.cells[start..start + self.width].fill(0);
        }

        cleared
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PieceKind;

    fn fill_row(board: &mut Board, y: usize, value: u8) {
        for x in 0..board.width() {
            board.cells[y * BOARD_WIDTH + x] = value;
        }
    }

    #[test]
    fn new_board_is_empty() {
        let board = Board::standard();
        assert_eq!(board.width(), BOARD_WIDTH);
        assert_eq!(board.height(), BOARD_HEIGHT);
        assert!(board.cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn get_out_of_bounds_is_none() {
        let board = Board::standard();
        assert_eq!(board.get(-1, 0), None);
        assert_eq!(board.get(0, -1), None);
        assert_eq!(board.get(BOARD_WIDTH as i32, 0), None);
        assert_eq!(board.get(0, BOARD_HEIGHT as i32), None);
        assert_eq!(board.get(0, 0), Some(0));
    }

    #[test]
    fn load_rejects_wrong_length() {
        let mut board = Board::standard();
        assert!(!board.load(&[1u8; 10]));
        assert!(board.cells().iter().all(|&c| c == 0));

        let snapshot = vec![3u8; BOARD_WIDTH * BOARD_HEIGHT];
        assert!(board.load(&snapshot));
        assert_eq!(board.get(0, 0), Some(3));
    }

    #[test]
    fn piece_inside_empty_board_never_collides() {
        use crate::core::piece::Piece;

        let board = Board::standard();
        let mut piece = Piece::spawn(PieceKind::T);
        piece.x = 3;
        piece.y = 8;
        assert!(!board.check_collision(&piece));
    }

    #[test]
    fn piece_below_the_floor_always_collides() {
        use crate::core::piece::Piece;

        let board = Board::standard();
        let mut piece = Piece::spawn(PieceKind::O);
        piece.y = BOARD_HEIGHT as i32 - 1;
        assert!(board.check_collision(&piece));
    }

    #[test]
    fn rows_above_the_top_ignore_board_contents() {
        use crate::core::piece::Piece;

        let mut board = Board::standard();
        for y in 0..BOARD_HEIGHT {
            fill_row(&mut board, y, 1);
        }
        // The I bar occupies matrix row 1; at y = -2 that lands on board
        // row -1, above the visible top.
        let mut piece = Piece::spawn(PieceKind::I);
        piece.y = -2;
        assert!(!board.check_collision(&piece));
    }

    #[test]
    fn clear_lines_single_bottom_row() {
        let mut board = Board::standard();
        fill_row(&mut board, BOARD_HEIGHT - 1, PieceKind::T.cell_value());

        assert_eq!(board.clear_lines(), 1);
        assert!(board.cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn clear_lines_preserves_survivor_order() {
        let mut board = Board::standard();
        // Bottom-up: full, marker A, full, marker B.
        fill_row(&mut board, 19, 1);
        board.cells[18 * BOARD_WIDTH] = 5;
        fill_row(&mut board, 17, 2);
        board.cells[16 * BOARD_WIDTH + 3] = 6;

        assert_eq!(board.clear_lines(), 2);
        // Marker A lands on the bottom row, marker B directly above it.
        assert_eq!(board.get(0, 19), Some(5));
        assert_eq!(board.get(3, 18), Some(6));
        assert_eq!(board.get(0, 17), Some(0));
    }

    #[test]
    fn clear_lines_empty_board_clears_nothing() {
        let mut board = Board::standard();
        assert_eq!(board.clear_lines(), 0);
    }
}
