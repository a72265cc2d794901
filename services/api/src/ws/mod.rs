//! Practice WebSocket
//!
//! - `protocol`: the JSON messages exchanged with the browser.
//! - `session`: the connection lifecycle and the runtime that drives the
//!   practice state machine.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
