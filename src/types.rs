//! Core types shared across the application
//! This module contains pure data types with no external dependencies

/// Board dimensions
pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;
pub const BOARD_CELLS: usize = BOARD_WIDTH * BOARD_HEIGHT;

/// Tetromino matrix size (4x4)
pub const PIECE_SIZE: usize = 4;

/// Game timing constants (in milliseconds)
pub const TICK_MS: u32 = 16;
pub const INITIAL_FALL_DELAY_MS: u32 = 1000;
pub const MIN_FALL_DELAY_MS: u32 = 100;
pub const LEVEL_SPEED_REDUCTION_MS: u32 = 50;
pub const LINES_PER_LEVEL: u32 = 10;

/// Line clear scoring (1..=4 lines)
pub const LINE_SCORES: [u32; 5] = [0, 100, 300, 500, 800];
pub const COMBO_BONUS: u32 = 50;
pub const INITIAL_LEVEL: u32 = 1;

/// Number of tracked keys in an input snapshot
pub const KEY_COUNT: usize = 9;

/// Tetromino piece kinds, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    S,
    Z,
    J,
    L,
    T,
}

/// Number of piece kinds
pub const PIECE_KIND_COUNT: usize = 7;

impl PieceKind {
    /// All kinds in wire order
    pub const ALL: [PieceKind; PIECE_KIND_COUNT] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
        PieceKind::T,
    ];

    /// Stable wire index (0..7)
    pub fn index(self) -> usize {
        match self {
            PieceKind::I => 0,
            PieceKind::O => 1,
            PieceKind::S => 2,
            PieceKind::Z => 3,
            PieceKind::J => 4,
            PieceKind::L => 5,
            PieceKind::T => 6,
        }
    }

    /// Inverse of [`PieceKind::index`]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Value baked into a board cell when this piece locks
    pub fn cell_value(self) -> u8 {
        self.index() as u8 + 1
    }
}

/// Rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateDirection {
    Clockwise,
    CounterClockwise,
}

/// Player commands, one per tracked key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    MoveLeft,
    MoveRight,
    RotateCw,
    RotateCcw,
    SoftDrop,
    HardDrop,
    Hold,
    Pause,
    Quit,
}

impl PlayerCommand {
    /// All commands in key-slot order (index into an input snapshot)
    pub const ALL: [PlayerCommand; KEY_COUNT] = [
        PlayerCommand::MoveLeft,
        PlayerCommand::MoveRight,
        PlayerCommand::RotateCw,
        PlayerCommand::RotateCcw,
        PlayerCommand::SoftDrop,
        PlayerCommand::HardDrop,
        PlayerCommand::Hold,
        PlayerCommand::Pause,
        PlayerCommand::Quit,
    ];

    /// Key slot for this command
    pub fn slot(self) -> usize {
        match self {
            PlayerCommand::MoveLeft => 0,
            PlayerCommand::MoveRight => 1,
            PlayerCommand::RotateCw => 2,
            PlayerCommand::RotateCcw => 3,
            PlayerCommand::SoftDrop => 4,
            PlayerCommand::HardDrop => 5,
            PlayerCommand::Hold => 6,
            PlayerCommand::Pause => 7,
            PlayerCommand::Quit => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piece_kind_index_roundtrip() {
        for kind in PieceKind::ALL {
            assert_eq!(PieceKind::from_index(kind.index() as u8), Some(kind));
        }
        assert_eq!(PieceKind::from_index(7), None);
    }

    #[test]
    fn cell_values_are_nonzero_and_distinct() {
        let mut seen = [false; 8];
        for kind in PieceKind::ALL {
            let v = kind.cell_value() as usize;
            assert!(v >= 1 && v <= 7);
            assert!(!seen[v], "duplicate cell value {}", v);
            seen[v] = true;
        }
    }

    #[test]
    fn command_slots_cover_all_keys() {
        for (i, cmd) in PlayerCommand::ALL.iter().enumerate() {
            assert_eq!(cmd.slot(), i);
        }
    }
}
