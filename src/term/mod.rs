//! Terminal renderer.
//!
//! Full redraw once per tick via queued crossterm commands, flushed in one
//! write. The playfield is small enough that diffing is not worth the
//! bookkeeping here.

use std::io::{self, Write};

use anyhow::Result;
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal, QueueableCommand,
};

use crate::core::piece::shape;
use crate::types::{PieceKind, BOARD_HEIGHT, BOARD_WIDTH};

/// Everything one frame needs; both sides of a match can fill this in
pub struct Frame<'a> {
    /// Row-major cell buffer with the falling piece already baked in
    pub cells: &'a [u8],
    pub next: PieceKind,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    /// One-line connection or match status under the sidebar
    pub status: &'a str,
}

pub struct TerminalRenderer {
    stdout: io::Stdout,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
        }
    }

    pub fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.stdout.queue(terminal::EnterAlternateScreen)?;
        self.stdout.queue(cursor::Hide)?;
        self.stdout.flush()?;
        Ok(())
    }

    pub fn exit(&mut self) -> Result<()> {
        self.stdout.queue(ResetColor)?;
        self.stdout.queue(cursor::Show)?;
        self.stdout.queue(terminal::LeaveAlternateScreen)?;
        self.stdout.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn draw(&mut self, frame: &Frame) -> Result<()> {
        self.stdout
            .queue(terminal::Clear(terminal::ClearType::All))?;

        // Playfield with a one-character border, two columns per cell.
        self.stdout.queue(cursor::MoveTo(0, 0))?;
        self.stdout.queue(SetForegroundColor(Color::DarkGrey))?;
        self.stdout
            .queue(Print(format!("+{}+", "-".repeat(BOARD_WIDTH * 2))))?;

        for y in 0..BOARD_HEIGHT {
            self.stdout.queue(cursor::MoveTo(0, y as u16 + 1))?;
            self.stdout.queue(SetForegroundColor(Color::DarkGrey))?;
            self.stdout.queue(Print("|"))?;
            for x in 0..BOARD_WIDTH {
                self.draw_cell(frame.cells[y * BOARD_WIDTH + x])?;
            }
            self.stdout.queue(SetForegroundColor(Color::DarkGrey))?;
            self.stdout.queue(Print("|"))?;
        }

        self.stdout
            .queue(cursor::MoveTo(0, BOARD_HEIGHT as u16 + 1))?;
        self.stdout.queue(SetForegroundColor(Color::DarkGrey))?;
        self.stdout
            .queue(Print(format!("+{}+", "-".repeat(BOARD_WIDTH * 2))))?;

        // Sidebar to the right of the playfield.
        let sx = (BOARD_WIDTH * 2 + 4) as u16;
        self.stdout.queue(ResetColor)?;
        self.stdout.queue(cursor::MoveTo(sx, 1))?;
        self.stdout.queue(Print(format!("score {}", frame.score)))?;
        self.stdout.queue(cursor::MoveTo(sx, 2))?;
        self.stdout.queue(Print(format!("level {}", frame.level)))?;
        self.stdout.queue(cursor::MoveTo(sx, 3))?;
        self.stdout.queue(Print(format!("lines {}", frame.lines)))?;

        self.stdout.queue(cursor::MoveTo(sx, 5))?;
        self.stdout.queue(Print("next"))?;
        let preview = shape(frame.next, 0);
        for (my, row) in preview.iter().enumerate() {
            self.stdout.queue(cursor::MoveTo(sx, 6 + my as u16))?;
            for &occupied in row.iter() {
                if occupied != 0 {
                    self.draw_cell(frame.next.cell_value())?;
                } else {
                    self.stdout.queue(Print("  "))?;
                }
            }
        }

        self.stdout.queue(ResetColor)?;
        self.stdout.queue(cursor::MoveTo(sx, 11))?;
        self.stdout.queue(Print(frame.status))?;

        self.stdout.flush()?;
        Ok(())
    }

    fn draw_cell(&mut self, value: u8) -> Result<()> {
        if value == 0 {
            self.stdout.queue(Print("  "))?;
        } else {
            self.stdout.queue(SetForegroundColor(cell_color(value)))?;
            self.stdout.queue(Print("[]"))?;
        }
        Ok(())
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn cell_color(value: u8) -> Color {
    match value.checked_sub(1).and_then(PieceKind::from_index) {
        Some(PieceKind::I) => Color::Cyan,
        Some(PieceKind::O) => Color::Yellow,
        Some(PieceKind::S) => Color::Green,
        Some(PieceKind::Z) => Color::Red,
        Some(PieceKind::J) => Color::Blue,
        Some(PieceKind::L) => Color::White,
        Some(PieceKind::T) => Color::Magenta,
        None => Color::Grey,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_piece_value_has_a_color() {
        for kind in PieceKind::ALL {
            assert_ne!(cell_color(kind.cell_value()), Color::Grey);
        }
        // Out-of-range values fall back instead of panicking.
        assert_eq!(cell_color(0), Color::Grey);
        assert_eq!(cell_color(200), Color::Grey);
    }
}
