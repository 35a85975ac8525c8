//! Simulation behavior both ends of a match rely on.

use multris::core::Game;
use multris::types::{PlayerCommand, INITIAL_FALL_DELAY_MS};

/// Two simulations fed identical inputs must stay bit-identical; this is
/// what makes a replayed seed meaningful across machines.
#[test]
fn same_seed_and_inputs_give_identical_state() {
    let script = [
        PlayerCommand::MoveLeft,
        PlayerCommand::RotateCw,
        PlayerCommand::HardDrop,
        PlayerCommand::MoveRight,
        PlayerCommand::MoveRight,
        PlayerCommand::SoftDrop,
        PlayerCommand::HardDrop,
        PlayerCommand::RotateCcw,
        PlayerCommand::HardDrop,
    ];

    let mut a = Game::new(2024);
    let mut b = Game::new(2024);
    for command in script {
        a.apply_command(command);
        b.apply_command(command);
        a.tick(17);
        b.tick(17);
    }

    assert_eq!(a.score(), b.score());
    assert_eq!(a.next_kind(), b.next_kind());
    assert_eq!(a.snapshot_cells(), b.snapshot_cells());
}

#[test]
fn snapshot_cells_include_the_falling_piece() {
    let mut game = Game::new(5);
    // Let gravity pull the piece fully on-screen first.
    for _ in 0..4 {
        game.tick(INITIAL_FALL_DELAY_MS);
    }

    let baked: usize = game
        .snapshot_cells()
        .iter()
        .filter(|&&c| c != 0)
        .count();
    let settled: usize = game.board().cells().iter().filter(|&&c| c != 0).count();
    assert_eq!(baked, settled + 4);
}

#[test]
fn snapshot_application_mirrors_the_host() {
    let mut host = Game::new(77);
    host.apply_command(PlayerCommand::HardDrop);
    host.apply_command(PlayerCommand::HardDrop);

    let mut mirror = Game::new(0);
    let cells = host.snapshot_cells();
    mirror.apply_snapshot(host.score(), &cells, host.next_kind());

    assert_eq!(mirror.score(), host.score());
    assert_eq!(mirror.next_kind(), host.next_kind());
    assert_eq!(mirror.board().cells(), &cells[..]);
}

#[test]
fn level_stays_flat_without_clears() {
    let mut game = Game::new(1);
    assert_eq!(game.level(), 1);
    // A game that never clears stays at level 1 no matter how long it runs.
    for _ in 0..50 {
        game.tick(INITIAL_FALL_DELAY_MS);
    }
    assert_eq!(game.level(), 1);
}
