//! Hot-path micro-benchmarks: the per-tick wire work and line clearing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use multris::core::Board;
use multris::net::protocol::{checksum, deserialize, serialize, GameStateData, Message};
use multris::types::{BOARD_CELLS, BOARD_HEIGHT, BOARD_WIDTH};

fn snapshot_message() -> Message {
    let mut board = [0u8; BOARD_CELLS];
    for (i, cell) in board.iter_mut().enumerate() {
        *cell = (i % 8) as u8;
    }
    Message::GameState(GameStateData {
        game_time: 42.5,
        score: 123_456,
        board,
        next_piece: 6,
    })
}

fn bench_checksum(c: &mut Criterion) {
    let payload = [0x5Au8; 209];
    c.bench_function("checksum_snapshot_payload", |b| {
        b.iter(|| checksum(black_box(&payload)))
    });
}

fn bench_snapshot_codec(c: &mut Criterion) {
    let msg = snapshot_message();
    let mut buf = [0u8; 512];

    c.bench_function("serialize_game_state", |b| {
        b.iter(|| serialize(black_box(&msg), black_box(&mut buf)).unwrap())
    });

    let len = serialize(&msg, &mut buf).unwrap();
    c.bench_function("deserialize_game_state", |b| {
        b.iter(|| deserialize(black_box(&buf[..len])).unwrap())
    });
}

fn bench_clear_lines(c: &mut Criterion) {
    // Worst realistic case: alternating full and one-gap rows.
    let mut template = vec![0u8; BOARD_CELLS];
    for y in 0..BOARD_HEIGHT {
        for x in 0..BOARD_WIDTH {
            template[y * BOARD_WIDTH + x] = if y % 2 == 0 && x == 0 { 0 } else { 1 };
        }
    }

    c.bench_function("clear_lines_half_full", |b| {
        b.iter_batched(
            || {
                let mut board = Board::standard();
                board.load(&template);
                board
            },
            |mut board| black_box(board.clear_lines()),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_checksum,
    bench_snapshot_codec,
    bench_clear_lines
);
criterion_main!(benches);
