//! Multris: a two-player falling-block game replicated over TCP.
//!
//! The host runs the authoritative simulation ([`core`]) and pushes full
//! state snapshots over a small binary protocol ([`net`]); a joined client
//! mirrors those snapshots and sends back its key state. [`session`] ties
//! the loops together with terminal I/O from [`input`] and [`term`].

pub mod clock;
pub mod core;
pub mod input;
pub mod net;
pub mod session;
pub mod term;
pub mod types;
