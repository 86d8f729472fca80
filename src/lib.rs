//! # rivulet
//!
//! Client for the binary TCP protocol of a message-streaming server.
//!
//! This crate re-exports the two library crates of the workspace:
//! - [`protocol`]: identifiers, frames, request payloads and response decoders
//! - [`client`]: the session engine and the high-level command client

pub use rivulet_client as client;
pub use rivulet_protocol as protocol;

pub use rivulet_client::{
    Client, ClientError, ConnectionConfig, Credentials, Session, SessionState,
};
pub use rivulet_protocol::{Identifier, Message, Partitioning};
