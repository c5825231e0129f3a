//! Per-connection state: which role a socket is playing in which session.
//!
//! The spec's "connection registry" component (spec.md §2, §4.2) is not a
//! shared table here — per the design note in spec.md §9 ("a cleaner shape
//! is a connection-local record ... held by whatever layer owns the
//! connection"), it is carried as connection-local state inside the
//! WebSocket task (`ws.rs`), which is the layer that owns the socket.

/// What a live connection is, once it has completed its join handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Host,
    Player(String),
}
