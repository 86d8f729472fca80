//! # rivulet-protocol
//!
//! Binary wire protocol used by rivulet to talk to a message-streaming server.
//!
//! This crate provides:
//! - Primitive codec: bounds-checked reader, length-prefixed strings
//! - Tagged identifiers (numeric id or name)
//! - Request/response framing with length validation
//! - Request payload encoders for every supported command
//! - Response decoders (streams, topics, partitions, identity, message batches)
//! - Server error codes
//!
//! All integers on the wire are little-endian.

pub mod codec;
pub mod command;
pub mod error;
pub mod frame;
pub mod identifier;
pub mod message;
pub mod models;
pub mod request;

pub use codec::{WireDecode, WireEncode, WireReader};
pub use command::Command;
pub use error::{ErrorCode, ProtocolError, ValidationError};
pub use frame::{RequestFrame, ResponseFrame, REQUEST_HEADER_SIZE, RESPONSE_HEADER_SIZE};
pub use identifier::Identifier;
pub use message::{
    Consumer, Message, MessageHeader, Partitioning, PollingStrategy, MESSAGE_HEADER_SIZE,
};
pub use models::{
    CompressionAlgorithm, IdentityInfo, MaxTopicSize, MessageExpiry, Partition, PolledMessages,
    Stream, StreamDetails, Topic, TopicDetails,
};
pub use request::Request;

/// Status code of a successful response.
pub const SUCCESS_STATUS: u32 = 0;

/// Default TCP address of the server.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8090";

/// Maximum frame payload size (64 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;

/// Maximum byte length of names, usernames and passwords (one-byte length prefix).
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum number of partitions a topic can be created with.
pub const MAX_PARTITIONS_COUNT: u32 = 1000;
