//! # rivulet-client
//!
//! Async client for the rivulet binary protocol.
//!
//! This crate provides:
//! - Plain TCP and TLS transports
//! - A session engine that serializes request/response exchanges
//! - A typed API for stream, topic and message commands

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod tls;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::Client;
pub use config::{ConnectionConfig, TlsConfig};
pub use error::ClientError;
pub use session::{Credentials, Session, SessionState};
pub use transport::Transport;
