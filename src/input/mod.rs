//! Key-state input for terminal environments.
//!
//! Terminals deliver key presses as discrete events with no reliable release
//! notification, so the poller treats each tick's drained events as the keys
//! "down" for that tick. The resulting snapshot doubles as the wire payload:
//! the current and previous key arrays travel verbatim in player input
//! messages, and edge detection (down now, up before) picks the commands to
//! apply locally.

use std::time::Duration;

use arrayvec::ArrayVec;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};

use crate::types::{PlayerCommand, KEY_COUNT};

/// Key states for one tick plus the tick before
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub keys: [u8; KEY_COUNT],
    pub prev: [u8; KEY_COUNT],
}

impl InputSnapshot {
    /// True when the command's key is down this tick
    pub fn held(&self, command: PlayerCommand) -> bool {
        self.keys[command.slot()] != 0
    }

    /// True on the tick the command's key went down
    pub fn pressed(&self, command: PlayerCommand) -> bool {
        let slot = command.slot();
        self.keys[slot] != 0 && self.prev[slot] == 0
    }

    /// Commands newly pressed this tick, in key-slot order
    pub fn commands(&self) -> ArrayVec<PlayerCommand, KEY_COUNT> {
        let mut out = ArrayVec::new();
        for command in PlayerCommand::ALL {
            if self.pressed(command) {
                out.push(command);
            }
        }
        out
    }
}

/// Drains crossterm events once per tick into key-state snapshots
#[derive(Debug, Default)]
pub struct InputPoller {
    last: [u8; KEY_COUNT],
}

impl InputPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain all pending key events without blocking and build this tick's
    /// snapshot
    pub fn poll(&mut self) -> std::io::Result<InputSnapshot> {
        let mut keys = [0u8; KEY_COUNT];

        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                if let Some(command) = map_key(&key) {
                    keys[command.slot()] = 1;
                }
            }
        }

        let snapshot = InputSnapshot {
            keys,
            prev: self.last,
        };
        self.last = keys;
        Ok(snapshot)
    }
}

/// Keyboard layout: arrows plus the usual letters
fn map_key(key: &KeyEvent) -> Option<PlayerCommand> {
    match key.code {
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(PlayerCommand::MoveLeft),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(PlayerCommand::MoveRight),
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(PlayerCommand::RotateCw),
        KeyCode::Char('z') | KeyCode::Char('Z') => Some(PlayerCommand::RotateCcw),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(PlayerCommand::SoftDrop),
        KeyCode::Char(' ') => Some(PlayerCommand::HardDrop),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(PlayerCommand::Hold),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(PlayerCommand::Pause),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(PlayerCommand::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(keys: &[PlayerCommand], prev: &[PlayerCommand]) -> InputSnapshot {
        let mut s = InputSnapshot::default();
        for &c in keys {
            s.keys[c.slot()] = 1;
        }
        for &c in prev {
            s.prev[c.slot()] = 1;
        }
        s
    }

    #[test]
    fn pressed_is_edge_triggered() {
        let s = snapshot(&[PlayerCommand::MoveLeft], &[]);
        assert!(s.pressed(PlayerCommand::MoveLeft));
        assert!(s.held(PlayerCommand::MoveLeft));

        // Still down on the next tick: held but not pressed.
        let s = snapshot(&[PlayerCommand::MoveLeft], &[PlayerCommand::MoveLeft]);
        assert!(!s.pressed(PlayerCommand::MoveLeft));
        assert!(s.held(PlayerCommand::MoveLeft));
    }

    #[test]
    fn commands_come_out_in_slot_order() {
        let s = snapshot(&[PlayerCommand::HardDrop, PlayerCommand::MoveLeft], &[]);
        assert_eq!(
            s.commands().as_slice(),
            &[PlayerCommand::MoveLeft, PlayerCommand::HardDrop]
        );
    }

    #[test]
    fn empty_snapshot_yields_no_commands() {
        assert!(InputSnapshot::default().commands().is_empty());
    }
}
