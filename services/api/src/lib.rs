//! Oratoria API Library Crate
//!
//! This library contains everything the web service is made of: configuration,
//! database access, the access gate, API handlers, the practice WebSocket and
//! routing. The `api` binary is a thin wrapper around this library.

pub mod auth;
pub mod config;
pub mod db;
pub mod extractors;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;

#[cfg(test)]
pub(crate) mod test_support;
