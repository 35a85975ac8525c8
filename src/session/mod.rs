//! Session loops - solo play, hosting, and joining.
//!
//! The host owns the only live simulation and broadcasts a full snapshot
//! every tick; a joined client sends its key state, mirrors whatever the
//! host says, and renders a read-only view. Both loops run single-threaded
//! on one clock.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::clock::GameClock;
use crate::core::Game;
use crate::input::InputPoller;
use crate::net::protocol::{GameEventKind, GameStateData, Message, PlayerInputData};
use crate::net::{ClientContext, NetError, ServerContext};
use crate::term::{Frame, TerminalRenderer};
use crate::types::{PieceKind, PlayerCommand, TICK_MS};

use std::time::{Duration, Instant};

/// How long a joining client waits for the host's handshake reply
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Match configuration
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub host: String,
    pub port: u16,
    /// Piece sequence seed; defaults to a clock-derived value
    pub seed: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: crate::net::DEFAULT_PORT,
            seed: clock_seed(),
        }
    }
}

impl MatchConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        use std::env;

        let host = env::var("MULTRIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("MULTRIS_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(crate::net::DEFAULT_PORT);
        let seed = env::var("MULTRIS_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(clock_seed);

        Self { host, port, seed }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn clock_seed() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(1)
}

/// Local single-player match, no networking
pub fn solo(seed: u32) -> Result<()> {
    let mut renderer = TerminalRenderer::new();
    renderer.enter()?;
    let result = run_solo(&mut renderer, seed);
    let _ = renderer.exit();
    result
}

/// Authoritative match: simulate locally, replicate to connected peers
pub fn host(port: u16, seed: u32) -> Result<()> {
    let mut server = ServerContext::new();
    server.init(port).context("binding listener")?;
    server.start()?;

    let mut renderer = TerminalRenderer::new();
    renderer.enter()?;
    let result = run_host(&mut renderer, &mut server, seed);
    let _ = renderer.exit();
    server.cleanup();
    result
}

/// Thin client: send inputs, mirror the host's snapshots
pub fn join(addr: &str) -> Result<()> {
    let mut client = ClientContext::new();
    client.connect(addr).context("connecting to host")?;

    // The accept (or reject) comes back through the normal receive path.
    let deadline = Instant::now() + CONNECT_TIMEOUT;
    while !client.is_connected() {
        if Instant::now() > deadline {
            client.cleanup();
            anyhow::bail!("host did not answer the handshake");
        }
        if let Err(err) = client.receive() {
            client.cleanup();
            return Err(anyhow::Error::new(err).context("handshake refused"));
        }
    }
    info!(player_id = ?client.player_id(), "joined match");

    let mut renderer = TerminalRenderer::new();
    renderer.enter()?;
    let result = run_join(&mut renderer, &mut client);
    let _ = renderer.exit();
    client.cleanup();
    result
}

fn run_solo(renderer: &mut TerminalRenderer, seed: u32) -> Result<()> {
    let mut game = Game::new(seed);
    let mut input = InputPoller::new();
    let mut clock = GameClock::new();

    loop {
        let delta = clock.delta_ms();

        let snapshot = input.poll()?;
        if snapshot.pressed(PlayerCommand::Quit) {
            break;
        }
        for command in snapshot.commands() {
            game.apply_command(command);
        }
        game.tick(delta);

        let status = if game.is_over() {
            "game over (q to exit)"
        } else if game.is_paused() {
            "paused"
        } else {
            "solo"
        };
        draw_game(renderer, &game, status)?;
        clock.throttle(TICK_MS);
    }
    Ok(())
}

fn run_host(renderer: &mut TerminalRenderer, server: &mut ServerContext, seed: u32) -> Result<()> {
    let mut game = Game::new(seed);
    let mut input = InputPoller::new();
    let mut clock = GameClock::new();
    let mut announced_over = false;

    loop {
        let delta = clock.delta_ms();

        for (peer, message) in server.poll_messages()? {
            // Peer inputs are recorded on the slot; nothing else is expected
            // from clients mid-match.
            if !matches!(message, Message::PlayerInput(_)) {
                debug!(peer, ?message, "unexpected message from peer");
            }
        }
        let evicted = server.check_heartbeats();
        if evicted > 0 {
            warn!(evicted, "peers dropped during match");
        }

        let snapshot = input.poll()?;
        if snapshot.pressed(PlayerCommand::Quit) {
            break;
        }
        let mut cleared = 0usize;
        for command in snapshot.commands() {
            cleared += game.apply_command(command).lines_cleared;
        }
        cleared += game.tick(delta).lines_cleared;

        if cleared > 0 {
            replicate(
                server,
                &Message::GameEvent {
                    event: GameEventKind::LinesCleared,
                    value: cleared as u32,
                },
            )?;
        }
        if game.is_over() && !announced_over {
            announced_over = true;
            replicate(
                server,
                &Message::GameEvent {
                    event: GameEventKind::GameOver,
                    value: game.score(),
                },
            )?;
        }

        replicate(
            server,
            &Message::GameState(GameStateData {
                game_time: game.elapsed_secs(),
                score: game.score(),
                board: game.snapshot_cells(),
                next_piece: game.next_kind().index() as u8,
            }),
        )?;

        let status = if game.is_over() {
            "game over (q to exit)".to_string()
        } else {
            format!("hosting, {} peer(s)", server.peer_count())
        };
        draw_game(renderer, &game, &status)?;
        clock.throttle(TICK_MS);
    }

    replicate(
        server,
        &Message::GameEvent {
            event: GameEventKind::MatchEnded,
            value: game.score(),
        },
    )?;
    Ok(())
}

/// Broadcast for the host loop: an empty peer table is a normal condition
/// before anyone joins, not a fault
fn replicate(server: &mut ServerContext, message: &Message) -> Result<()> {
    match server.broadcast(message) {
        Ok(_) | Err(NetError::NoRecipients) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn run_join(renderer: &mut TerminalRenderer, client: &mut ClientContext) -> Result<()> {
    // Passive mirror; the seed is irrelevant because every replicated field
    // is overwritten by snapshots.
    let mut game = Game::new(0);
    let mut input = InputPoller::new();
    let mut clock = GameClock::new();
    let mut status = String::from("connected");

    'outer: loop {
        let snapshot = input.poll()?;
        if snapshot.pressed(PlayerCommand::Quit) {
            break;
        }
        if let Err(err) = client.send(&Message::PlayerInput(PlayerInputData {
            keys: snapshot.keys,
            prev_keys: snapshot.prev,
            timestamp: clock.elapsed_secs(),
        })) {
            warn!(%err, "send failed, leaving match");
            break;
        }

        loop {
            match client.receive() {
                Ok(Some(Message::GameState(state))) => {
                    let next = PieceKind::from_index(state.next_piece).unwrap_or(PieceKind::I);
                    game.apply_snapshot(state.score, &state.board, next);
                }
                Ok(Some(Message::GameEvent { event, value })) => match event {
                    GameEventKind::LinesCleared => {
                        status = format!("host cleared {value} line(s)");
                    }
                    GameEventKind::GameOver => {
                        status = format!("game over, final score {value}");
                    }
                    GameEventKind::MatchEnded => {
                        info!(score = value, "match ended by host");
                        break 'outer;
                    }
                },
                Ok(Some(other)) => debug!(?other, "ignoring message"),
                Ok(None) => break,
                Err(NetError::Disconnected) | Err(NetError::Timeout) => {
                    warn!("connection to host lost");
                    break 'outer;
                }
                Err(err) => return Err(err.into()),
            }
        }

        if let Err(err) = client.check_liveness() {
            warn!(%err, "liveness check failed");
            break;
        }

        draw_mirror(renderer, &game, &status)?;
        clock.throttle(TICK_MS);
    }
    Ok(())
}

fn draw_game(renderer: &mut TerminalRenderer, game: &Game, status: &str) -> Result<()> {
    renderer.draw(&Frame {
        cells: &game.snapshot_cells(),
        next: game.next_kind(),
        score: game.score(),
        level: game.level(),
        lines: game.lines(),
        status,
    })
}

/// Mirror view: the snapshot board already has the falling piece baked in,
/// so it is drawn straight from the board buffer
fn draw_mirror(renderer: &mut TerminalRenderer, game: &Game, status: &str) -> Result<()> {
    renderer.draw(&Frame {
        cells: game.board().cells(),
        next: game.next_kind(),
        score: game.score(),
        level: game.level(),
        lines: game.lines(),
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_the_wire_port() {
        let config = MatchConfig {
            seed: 1,
            ..MatchConfig::default()
        };
        assert_eq!(config.port, crate::net::DEFAULT_PORT);
        assert_eq!(config.addr(), format!("127.0.0.1:{}", config.port));
    }

    #[test]
    fn config_from_env_is_constructible() {
        let config = MatchConfig::from_env();
        assert!(!config.host.is_empty());
    }
}
