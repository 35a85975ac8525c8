//! Multris entrypoint.
//!
//! Modes: `multris` or `multris solo` for local play, `multris host` to run
//! the authoritative side, `multris join [addr]` to connect to one.
//! `MULTRIS_HOST`, `MULTRIS_PORT`, and `MULTRIS_SEED` override the defaults;
//! `RUST_LOG` controls log verbosity (logs go to stderr so the playfield on
//! stdout stays intact).

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use multris::session::{self, MatchConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = MatchConfig::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        None | Some("solo") => session::solo(config.seed),
        Some("host") => session::host(config.port, config.seed),
        Some("join") => {
            let addr = args.get(1).cloned().unwrap_or_else(|| config.addr());
            session::join(&addr)
        }
        Some(other) => {
            eprintln!("unknown mode: {other}");
            eprintln!("usage: multris [solo | host | join [addr]]");
            std::process::exit(2);
        }
    }
}
