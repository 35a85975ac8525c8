//! Game module - the authoritative single-board simulation
//!
//! Owns the board, the active and next pieces, scoring, and gravity timing.
//! The server runs the only live instance; a client keeps one as a passive
//! mirror that is overwritten by every received snapshot.

use tracing::debug;

use crate::core::board::Board;
use crate::core::piece::Piece;
use crate::core::rng::PieceRng;
use crate::types::{
    PieceKind, PlayerCommand, RotateDirection, COMBO_BONUS, INITIAL_FALL_DELAY_MS, INITIAL_LEVEL,
    LEVEL_SPEED_REDUCTION_MS, LINES_PER_LEVEL, LINE_SCORES, MIN_FALL_DELAY_MS,
};

/// Complete simulation state for one player's board
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    current: Piece,
    next_kind: PieceKind,
    rng: PieceRng,
    score: u32,
    level: u32,
    lines_cleared: u32,
    combo: u32,
    fall_timer_ms: u32,
    elapsed_ms: u32,
    paused: bool,
    game_over: bool,
}

/// What a lock event produced, reported to the caller for replication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    pub locked: bool,
    pub lines_cleared: usize,
    pub game_over: bool,
}

impl Game {
    /// Create a fresh game seeded for deterministic piece order
    pub fn new(seed: u32) -> Self {
        let mut rng = PieceRng::new(seed);
        let current = Piece::spawn(rng.next_kind());
        let next_kind = rng.next_kind();
        Self {
            board: Board::standard(),
            current,
            next_kind,
            rng,
            score: 0,
            level: INITIAL_LEVEL,
            lines_cleared: 0,
            combo: 0,
            fall_timer_ms: 0,
            elapsed_ms: 0,
            paused: false,
            game_over: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current(&self) -> &Piece {
        &self.current
    }

    pub fn next_kind(&self) -> PieceKind {
        self.next_kind
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines_cleared
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    /// Elapsed play time in seconds, as carried in state snapshots
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed_ms as f32 / 1000.0
    }

    /// Milliseconds between gravity steps at the current level
    fn fall_delay_ms(&self) -> u32 {
        INITIAL_FALL_DELAY_MS
            .saturating_sub(self.level.saturating_sub(1) * LEVEL_SPEED_REDUCTION_MS)
            .max(MIN_FALL_DELAY_MS)
    }

    /// Apply one player command to the active piece
    pub fn apply_command(&mut self, command: PlayerCommand) -> TickOutcome {
        if self.game_over {
            return TickOutcome::default();
        }
        if self.paused && command != PlayerCommand::Pause {
            return TickOutcome::default();
        }

        match command {
            PlayerCommand::MoveLeft => {
                self.current.try_move(&self.board, -1, 0);
            }
            PlayerCommand::MoveRight => {
                self.current.try_move(&self.board, 1, 0);
            }
            PlayerCommand::RotateCw => {
                self.current.rotate(&self.board, RotateDirection::Clockwise);
            }
            PlayerCommand::RotateCcw => {
                self.current
                    .rotate(&self.board, RotateDirection::CounterClockwise);
            }
            PlayerCommand::SoftDrop => {
                if !self.current.try_move(&self.board, 0, 1) {
                    return self.lock_current();
                }
            }
            PlayerCommand::HardDrop => {
                while self.current.try_move(&self.board, 0, 1) {}
                return self.lock_current();
            }
            PlayerCommand::Pause => {
                self.paused = !self.paused;
            }
            PlayerCommand::Hold | PlayerCommand::Quit => {}
        }
        TickOutcome::default()
    }

    /// Advance the simulation by `delta_ms` of wall time
    pub fn tick(&mut self, delta_ms: u32) -> TickOutcome {
        if self.game_over || self.paused {
            return TickOutcome::default();
        }

        self.elapsed_ms += delta_ms;
        self.fall_timer_ms += delta_ms;

        let mut outcome = TickOutcome::default();
        if self.fall_timer_ms >= self.fall_delay_ms() {
            self.fall_timer_ms = 0;
            if !self.current.try_move(&self.board, 0, 1) {
                outcome = self.lock_current();
            }
        }
        outcome
    }

    /// Bake the active piece, clear lines, score, and spawn the next piece
    fn lock_current(&mut self) -> TickOutcome {
        self.board.place_piece(&self.current);
        let cleared = self.board.clear_lines();

        if cleared > 0 {
            self.score += LINE_SCORES[cleared.min(4)] + self.combo * COMBO_BONUS;
            self.combo += 1;
            self.lines_cleared += cleared as u32;
            self.level = INITIAL_LEVEL + self.lines_cleared / LINES_PER_LEVEL;
            debug!(cleared, score = self.score, level = self.level, "lines cleared");
        } else {
            self.combo = 0;
        }

        self.current = Piece::spawn(self.next_kind);
        self.next_kind = self.rng.next_kind();

        if self.board.check_collision(&self.current) {
            self.game_over = true;
            debug!(score = self.score, "game over: spawn blocked");
        }

        TickOutcome {
            locked: true,
            lines_cleared: cleared,
            game_over: self.game_over,
        }
    }

    /// Board cells with the falling piece baked in, as carried in state
    /// snapshots and drawn by the renderer
    pub fn snapshot_cells(&self) -> [u8; crate::types::BOARD_CELLS] {
        let mut cells = [0u8; crate::types::BOARD_CELLS];
        cells.copy_from_slice(self.board.cells());

        let matrix = self.current.matrix();
        let value = self.current.kind.cell_value();
        for (my, row) in matrix.iter().enumerate() {
            for (mx, &occupied) in row.iter().enumerate() {
                if occupied == 0 {
                    continue;
                }
                let bx = self.current.x + mx as i32;
                let by = self.current.y + my as i32;
                if bx < 0 || by < 0 {
                    continue;
                }
                let (bx, by) = (bx as usize, by as usize);
                if bx < self.board.width() && by < self.board.height() {
                    cells[by * self.board.width() + bx] = value;
                }
            }
        }
        cells
    }

    /// Overwrite the replicated fields from an authoritative snapshot.
    ///
    /// Full-state overwrite, never a merge; this is the whole client-side
    /// reconciliation policy.
    pub fn apply_snapshot(&mut self, score: u32, cells: &[u8], next_kind: PieceKind) {
        self.score = score;
        self.board.load(cells);
        self.next_kind = next_kind;
    }
}
