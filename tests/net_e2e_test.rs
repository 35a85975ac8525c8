//! Loopback end-to-end exercise of the client and server transports.
//!
//! Both ends are non-blocking, so one test thread can drive them by
//! alternating polls. Servers bind port 0 to stay independent of whatever
//! else runs on the machine.

use std::time::{Duration, Instant};

use multris::net::protocol::{GameStateData, Message, PlayerInputData};
use multris::net::{ClientContext, NetError, ServerContext, ServerState};
use multris::types::{BOARD_CELLS, KEY_COUNT};

const STEP_LIMIT: usize = 200;

fn start_server() -> (ServerContext, u16) {
    let mut server = ServerContext::new();
    server.init(0).unwrap();
    server.start().unwrap();
    let port = server.local_port().unwrap();
    (server, port)
}

fn connect(server: &mut ServerContext) -> ClientContext {
    let port = server.local_port().unwrap();
    let mut client = ClientContext::new();
    client.connect(("127.0.0.1", port)).unwrap();

    for _ in 0..STEP_LIMIT {
        server.poll_messages().unwrap();
        client.receive().unwrap();
        if client.is_connected() {
            return client;
        }
    }
    panic!("handshake did not complete");
}

#[test]
fn handshake_assigns_slot_zero() {
    let (mut server, _port) = start_server();
    assert_eq!(server.state(), ServerState::Listening);

    let client = connect(&mut server);
    assert_eq!(client.player_id(), Some(0));
    assert_eq!(server.peer_count(), 1);
    assert_eq!(server.state(), ServerState::Running);
}

#[test]
fn broadcast_reaches_the_client_intact() {
    let (mut server, _port) = start_server();
    let mut client = connect(&mut server);

    let mut board = [0u8; BOARD_CELLS];
    board[BOARD_CELLS - 1] = 7;
    let sent = GameStateData {
        game_time: 1.5,
        score: 300,
        board,
        next_piece: 4,
    };
    server.broadcast(&Message::GameState(sent.clone())).unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        assert!(Instant::now() < deadline, "snapshot never arrived");
        match client.receive().unwrap() {
            Some(Message::GameState(received)) => {
                assert_eq!(received, sent);
                break;
            }
            _ => continue,
        }
    }
}

#[test]
fn player_input_lands_on_the_peer_slot() {
    let (mut server, _port) = start_server();
    let mut client = connect(&mut server);

    let mut keys = [0u8; KEY_COUNT];
    keys[0] = 1;
    client
        .send(&Message::PlayerInput(PlayerInputData {
            keys,
            prev_keys: [0; KEY_COUNT],
            timestamp: 0.5,
        }))
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        assert!(Instant::now() < deadline, "input never arrived");
        let events = server.poll_messages().unwrap();
        if events
            .iter()
            .any(|(_, m)| matches!(m, Message::PlayerInput(_)))
        {
            break;
        }
    }
    assert_eq!(server.last_input(0).unwrap().keys, keys);
}

#[test]
fn broadcast_with_no_peers_is_an_error() {
    let (mut server, _port) = start_server();
    assert!(matches!(
        server.broadcast(&Message::Heartbeat),
        Err(NetError::NoRecipients)
    ));

    // With a peer connected the same call reports one delivery.
    let _client = connect(&mut server);
    assert_eq!(server.broadcast(&Message::Heartbeat).unwrap(), 1);
}

#[test]
fn proactive_pings_keep_a_quiet_connection_alive() {
    let (mut server, _port) = start_server();
    let mut client = connect(&mut server);
    client.set_heartbeat_interval(Duration::from_millis(50));

    // The server stays silent; the client must ride its own 2x pings well
    // past the 3x window without declaring a timeout.
    let deadline = Instant::now() + Duration::from_millis(400);
    while Instant::now() < deadline {
        client.check_liveness().unwrap();
        server.poll_messages().unwrap();
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(client.is_connected());
    // The pings also count as peer activity on the server side.
    server.set_heartbeat_interval(Duration::from_millis(50));
    assert_eq!(server.check_heartbeats(), 0);
}

#[test]
fn silent_peer_is_evicted_after_three_intervals() {
    let (mut server, _port) = start_server();
    let _client = connect(&mut server);
    server.set_heartbeat_interval(Duration::from_millis(30));

    // Quiet well past three intervals, then sweep.
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(server.check_heartbeats(), 1);
    assert_eq!(server.peer_count(), 0);
}

#[test]
fn second_slot_fills_then_table_refuses() {
    let (mut server, _port) = start_server();
    let _a = connect(&mut server);
    let b = connect(&mut server);
    assert_eq!(b.player_id(), Some(1));
    assert_eq!(server.peer_count(), 2);

    // Third connection gets refused; the client sees the rejection as an
    // error from receive once the reject frame lands.
    let port = server.local_port().unwrap();
    let mut c = ClientContext::new();
    c.connect(("127.0.0.1", port)).unwrap();

    let mut rejected = false;
    for _ in 0..STEP_LIMIT {
        let _ = server.poll_messages();
        match c.receive() {
            Err(_) => {
                rejected = true;
                break;
            }
            Ok(_) => continue,
        }
    }
    assert!(rejected, "third client was not refused");
    assert_eq!(server.peer_count(), 2);
}

#[test]
fn client_disconnect_frees_the_slot() {
    let (mut server, _port) = start_server();
    let mut client = connect(&mut server);

    client.cleanup();
    let deadline = Instant::now() + Duration::from_secs(2);
    while server.peer_count() > 0 {
        assert!(Instant::now() < deadline, "slot never freed");
        server.poll_messages().unwrap();
    }
}
