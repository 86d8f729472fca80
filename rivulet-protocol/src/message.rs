//! Message envelopes and the selectors that route and poll them.
//!
//! Envelope layout (64-byte header, then payload, then user headers):
//!
//! ```text
//! +----------+------+--------+-----------+------------------+
//! | checksum |  id  | offset | timestamp | origin_timestamp |
//! |    8     |  16  |   8    |     8     |        8         |
//! +----------+------+--------+-----------+------------------+
//! | user_headers_length | payload_length | reserved |
//! |          4          |       4        |    8     |
//! +---------------------+----------------+----------+
//! | payload (payload_length) | user headers (user_headers_length) |
//! +--------------------------+------------------------------------+
//! ```
//!
//! `checksum`, `offset` and `timestamp` are assigned by the server; the
//! client sends zeros.

use crate::codec::{check_len, WireDecode, WireEncode, WireReader};
use crate::error::{ProtocolError, ValidationError};
use crate::identifier::Identifier;
use bytes::{BufMut, Bytes, BytesMut};
use chrono::Utc;
use uuid::Uuid;

/// Size of the fixed envelope header.
pub const MESSAGE_HEADER_SIZE: usize = 64;

/// Fixed-layout header preceding every message payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
    pub checksum: u64,
    pub id: u128,
    pub offset: u64,
    pub timestamp: u64,
    /// Microseconds since the Unix epoch at which the producer built the message.
    pub origin_timestamp: u64,
    pub user_headers_length: u32,
    pub payload_length: u32,
    pub reserved: u64,
}

impl MessageHeader {
    fn put(&self, buf: &mut BytesMut) {
        buf.put_u64_le(self.checksum);
        buf.put_u128_le(self.id);
        buf.put_u64_le(self.offset);
        buf.put_u64_le(self.timestamp);
        buf.put_u64_le(self.origin_timestamp);
        buf.put_u32_le(self.user_headers_length);
        buf.put_u32_le(self.payload_length);
        buf.put_u64_le(self.reserved);
    }
}

impl WireDecode for MessageHeader {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            checksum: reader.u64("message.checksum")?,
            id: reader.u128("message.id")?,
            offset: reader.u64("message.offset")?,
            timestamp: reader.u64("message.timestamp")?,
            origin_timestamp: reader.u64("message.origin_timestamp")?,
            user_headers_length: reader.u32("message.user_headers_length")?,
            payload_length: reader.u32("message.payload_length")?,
            reserved: reader.u64("message.reserved")?,
        })
    }
}

/// One message: header, payload and opaque user headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub payload: Bytes,
    pub user_headers: Bytes,
}

impl Message {
    /// Creates a message with a random 128-bit id and the current time as
    /// its origin timestamp.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self::with_id(Uuid::new_v4().as_u128(), payload)
    }

    /// Creates a message with an explicit id.
    pub fn with_id(id: u128, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            header: MessageHeader {
                id,
                origin_timestamp: Utc::now().timestamp_micros().max(0) as u64,
                payload_length: payload.len() as u32,
                ..MessageHeader::default()
            },
            payload,
            user_headers: Bytes::new(),
        }
    }

    /// Attaches pre-encoded user headers.
    pub fn with_user_headers(mut self, user_headers: impl Into<Bytes>) -> Self {
        self.user_headers = user_headers.into();
        self.header.user_headers_length = self.user_headers.len() as u32;
        self
    }

    pub fn id(&self) -> u128 {
        self.header.id
    }

    /// Size of this envelope on the wire.
    pub fn encoded_len(&self) -> usize {
        MESSAGE_HEADER_SIZE + self.payload.len() + self.user_headers.len()
    }

    /// Checks that the header lengths match the bytes actually carried.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.payload.is_empty() {
            return Err(ValidationError::EmptyValue {
                field: "message.payload",
            });
        }
        check_len("message.payload", &self.payload, u32::MAX as usize)?;
        if self.header.payload_length as usize != self.payload.len() {
            return Err(ValidationError::EnvelopeLengthMismatch {
                field: "message.payload",
                declared: self.header.payload_length,
                actual: self.payload.len(),
            });
        }
        if self.header.user_headers_length as usize != self.user_headers.len() {
            return Err(ValidationError::EnvelopeLengthMismatch {
                field: "message.user_headers",
                declared: self.header.user_headers_length,
                actual: self.user_headers.len(),
            });
        }
        Ok(())
    }
}

impl WireEncode for Message {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        self.validate()?;
        buf.reserve(self.encoded_len());
        self.header.put(buf);
        buf.put_slice(&self.payload);
        buf.put_slice(&self.user_headers);
        Ok(())
    }
}

impl WireDecode for Message {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let header = MessageHeader::decode(reader)?;
        let payload = reader.bytes(header.payload_length as usize, "message.payload")?;
        let user_headers =
            reader.bytes(header.user_headers_length as usize, "message.user_headers")?;
        Ok(Self {
            header,
            payload: Bytes::copy_from_slice(payload),
            user_headers: Bytes::copy_from_slice(user_headers),
        })
    }
}

const BALANCED_KIND: u8 = 1;
const PARTITION_ID_KIND: u8 = 2;
const MESSAGES_KEY_KIND: u8 = 3;

/// Selects the partition a batch of messages is appended to.
///
/// Wire layout: `[kind: u8][length: u8][value]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partitioning {
    /// The server picks a partition (round-robin).
    Balanced,
    /// A specific partition.
    PartitionId(u32),
    /// The partition is derived from a hash of the key (1..=255 bytes).
    MessagesKey(Bytes),
}

impl Partitioning {
    pub fn balanced() -> Self {
        Partitioning::Balanced
    }

    pub fn partition_id(id: u32) -> Self {
        Partitioning::PartitionId(id)
    }

    pub fn messages_key(key: impl Into<Bytes>) -> Result<Self, ValidationError> {
        let key = key.into();
        Self::check_key(&key)?;
        Ok(Partitioning::MessagesKey(key))
    }

    fn check_key(key: &[u8]) -> Result<(), ValidationError> {
        if key.is_empty() {
            return Err(ValidationError::EmptyValue {
                field: "messages_key",
            });
        }
        check_len("messages_key", key, crate::MAX_NAME_LENGTH)
    }
}

impl Default for Partitioning {
    fn default() -> Self {
        Partitioning::Balanced
    }
}

impl WireEncode for Partitioning {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        match self {
            Partitioning::Balanced => {
                buf.put_u8(BALANCED_KIND);
                buf.put_u8(0);
            }
            Partitioning::PartitionId(id) => {
                buf.put_u8(PARTITION_ID_KIND);
                buf.put_u8(4);
                buf.put_u32_le(*id);
            }
            Partitioning::MessagesKey(key) => {
                Self::check_key(key)?;
                buf.put_u8(MESSAGES_KEY_KIND);
                buf.put_u8(key.len() as u8);
                buf.put_slice(key);
            }
        }
        Ok(())
    }
}

impl WireDecode for Partitioning {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let kind = reader.u8("partitioning.kind")?;
        let length = reader.u8("partitioning.length")?;
        let invalid = || ProtocolError::UnknownDiscriminant {
            field: "partitioning.length",
            value: length as u64,
        };
        match kind {
            BALANCED_KIND if length == 0 => Ok(Partitioning::Balanced),
            PARTITION_ID_KIND if length == 4 => Ok(Partitioning::PartitionId(
                reader.u32("partitioning.value")?,
            )),
            MESSAGES_KEY_KIND if length > 0 => {
                let key = reader.bytes(length as usize, "partitioning.value")?;
                Ok(Partitioning::MessagesKey(Bytes::copy_from_slice(key)))
            }
            BALANCED_KIND | PARTITION_ID_KIND | MESSAGES_KEY_KIND => Err(invalid()),
            other => Err(ProtocolError::UnknownDiscriminant {
                field: "partitioning.kind",
                value: other as u64,
            }),
        }
    }
}

/// Where a poll starts reading.
///
/// Wire layout: `[kind: u8][value: u64]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollingStrategy {
    Offset(u64),
    /// Microseconds since the Unix epoch.
    Timestamp(u64),
    First,
    Last,
    /// Continue after the consumer's stored offset.
    Next,
}

impl PollingStrategy {
    fn kind_and_value(&self) -> (u8, u64) {
        match self {
            PollingStrategy::Offset(offset) => (1, *offset),
            PollingStrategy::Timestamp(ts) => (2, *ts),
            PollingStrategy::First => (3, 0),
            PollingStrategy::Last => (4, 0),
            PollingStrategy::Next => (5, 0),
        }
    }
}

impl WireEncode for PollingStrategy {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        let (kind, value) = self.kind_and_value();
        buf.put_u8(kind);
        buf.put_u64_le(value);
        Ok(())
    }
}

impl WireDecode for PollingStrategy {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let kind = reader.u8("strategy.kind")?;
        let value = reader.u64("strategy.value")?;
        match kind {
            1 => Ok(PollingStrategy::Offset(value)),
            2 => Ok(PollingStrategy::Timestamp(value)),
            3 => Ok(PollingStrategy::First),
            4 => Ok(PollingStrategy::Last),
            5 => Ok(PollingStrategy::Next),
            other => Err(ProtocolError::UnknownDiscriminant {
                field: "strategy.kind",
                value: other as u64,
            }),
        }
    }
}

/// The consumer on whose behalf messages are polled.
///
/// Wire layout: `[kind: u8][identifier]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consumer {
    Individual(Identifier),
    Group(Identifier),
}

impl Default for Consumer {
    fn default() -> Self {
        Consumer::Individual(Identifier::Numeric(0))
    }
}

impl WireEncode for Consumer {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        let (kind, id) = match self {
            Consumer::Individual(id) => (1, id),
            Consumer::Group(id) => (2, id),
        };
        buf.put_u8(kind);
        id.encode(buf)
    }
}

impl WireDecode for Consumer {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        match reader.u8("consumer.kind")? {
            1 => Ok(Consumer::Individual(Identifier::decode(reader)?)),
            2 => Ok(Consumer::Group(Identifier::decode(reader)?)),
            other => Err(ProtocolError::UnknownDiscriminant {
                field: "consumer.kind",
                value: other as u64,
            }),
        }
    }
}
