//! Library crate for wackamole-back: the room/session engine plus its HTTP and
//! WebSocket surface, exposed for the binaries and integration tests.

pub mod config;
pub mod dto;
mod error;
pub mod routes;
pub mod services;
pub mod state;
