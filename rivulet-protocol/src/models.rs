//! Records decoded from successful response payloads.
//!
//! Every decoder is a pure function of its input: it reads the fixed field
//! layout, fails with [`ProtocolError::MalformedData`] on truncated input and
//! never reads past the supplied buffer. List responses carry no count field;
//! records are read until the payload is exhausted.
//!
//! Each record also implements [`WireEncode`] so tests and mock servers can
//! build response fixtures.

use crate::codec::{put_str8, WireDecode, WireEncode, WireReader};
use crate::error::{ProtocolError, ValidationError};
use crate::message::{Message, MESSAGE_HEADER_SIZE};
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compression applied by the server to a topic's messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionAlgorithm {
    #[default]
    None,
    Gzip,
}

impl CompressionAlgorithm {
    pub fn as_code(&self) -> u8 {
        match self {
            CompressionAlgorithm::None => 1,
            CompressionAlgorithm::Gzip => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, ProtocolError> {
        match code {
            1 => Ok(CompressionAlgorithm::None),
            2 => Ok(CompressionAlgorithm::Gzip),
            other => Err(ProtocolError::UnknownDiscriminant {
                field: "compression",
                value: other as u64,
            }),
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionAlgorithm::None => write!(f, "none"),
            CompressionAlgorithm::Gzip => write!(f, "gzip"),
        }
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionAlgorithm::None),
            "gzip" => Ok(CompressionAlgorithm::Gzip),
            other => Err(format!("unknown compression algorithm: {}", other)),
        }
    }
}

/// How long messages in a topic are retained.
///
/// On the wire: 0 = server default, `u64::MAX` = never expire, anything else
/// is a duration in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageExpiry {
    #[default]
    ServerDefault,
    NeverExpire,
    ExpireAfter(u64),
}

impl MessageExpiry {
    pub fn from_micros(value: u64) -> Self {
        match value {
            0 => MessageExpiry::ServerDefault,
            u64::MAX => MessageExpiry::NeverExpire,
            micros => MessageExpiry::ExpireAfter(micros),
        }
    }

    pub fn as_micros(&self) -> u64 {
        match self {
            MessageExpiry::ServerDefault => 0,
            MessageExpiry::NeverExpire => u64::MAX,
            MessageExpiry::ExpireAfter(micros) => *micros,
        }
    }
}

impl fmt::Display for MessageExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageExpiry::ServerDefault => write!(f, "server_default"),
            MessageExpiry::NeverExpire => write!(f, "never_expire"),
            MessageExpiry::ExpireAfter(micros) => write!(f, "{}us", micros),
        }
    }
}

/// Accepts `default`, `never` or a number of microseconds.
impl FromStr for MessageExpiry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" | "server_default" => Ok(MessageExpiry::ServerDefault),
            "never" | "never_expire" => Ok(MessageExpiry::NeverExpire),
            other => other
                .trim_end_matches("us")
                .parse::<u64>()
                .map(MessageExpiry::from_micros)
                .map_err(|_| format!("invalid message expiry: {}", s)),
        }
    }
}

/// Upper bound on a topic's total size.
///
/// On the wire: 0 = server default, `u64::MAX` = unlimited, anything else is
/// a size in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxTopicSize {
    #[default]
    ServerDefault,
    Unlimited,
    Bytes(u64),
}

impl MaxTopicSize {
    pub fn from_bytes_count(value: u64) -> Self {
        match value {
            0 => MaxTopicSize::ServerDefault,
            u64::MAX => MaxTopicSize::Unlimited,
            bytes => MaxTopicSize::Bytes(bytes),
        }
    }

    pub fn as_bytes_count(&self) -> u64 {
        match self {
            MaxTopicSize::ServerDefault => 0,
            MaxTopicSize::Unlimited => u64::MAX,
            MaxTopicSize::Bytes(bytes) => *bytes,
        }
    }
}

impl fmt::Display for MaxTopicSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxTopicSize::ServerDefault => write!(f, "server_default"),
            MaxTopicSize::Unlimited => write!(f, "unlimited"),
            MaxTopicSize::Bytes(bytes) => write!(f, "{} B", bytes),
        }
    }
}

/// Accepts `default`, `unlimited` or a number of bytes.
impl FromStr for MaxTopicSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" | "server_default" => Ok(MaxTopicSize::ServerDefault),
            "unlimited" => Ok(MaxTopicSize::Unlimited),
            other => other
                .parse::<u64>()
                .map(MaxTopicSize::from_bytes_count)
                .map_err(|_| format!("invalid max topic size: {}", s)),
        }
    }
}

fn created_at_utc(micros: u64) -> Option<DateTime<Utc>> {
    i64::try_from(micros)
        .ok()
        .and_then(DateTime::from_timestamp_micros)
}

/// Identity returned by a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityInfo {
    pub user_id: u32,
}

impl WireEncode for IdentityInfo {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        buf.put_u32_le(self.user_id);
        Ok(())
    }
}

impl WireDecode for IdentityInfo {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            user_id: reader.u32("identity.user_id")?,
        })
    }
}

/// Stream header, as returned in stream lists and at the start of
/// [`StreamDetails`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: u32,
    /// Microseconds since the Unix epoch.
    pub created_at: u64,
    pub topics_count: u32,
    pub size: u64,
    pub messages_count: u64,
    pub name: String,
}

impl Stream {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        created_at_utc(self.created_at)
    }
}

impl WireEncode for Stream {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        buf.put_u32_le(self.id);
        buf.put_u64_le(self.created_at);
        buf.put_u32_le(self.topics_count);
        buf.put_u64_le(self.size);
        buf.put_u64_le(self.messages_count);
        put_str8(buf, "stream.name", &self.name)
    }
}

impl WireDecode for Stream {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: reader.u32("stream.id")?,
            created_at: reader.u64("stream.created_at")?,
            topics_count: reader.u32("stream.topics_count")?,
            size: reader.u64("stream.size")?,
            messages_count: reader.u64("stream.messages_count")?,
            name: reader.str8("stream.name")?,
        })
    }
}

/// A stream header followed by the headers of its topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDetails {
    #[serde(flatten)]
    pub stream: Stream,
    pub topics: Vec<Topic>,
}

impl WireEncode for StreamDetails {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        self.stream.encode(buf)?;
        for topic in &self.topics {
            topic.encode(buf)?;
        }
        Ok(())
    }
}

impl WireDecode for StreamDetails {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let stream = Stream::decode(reader)?;
        let mut topics = Vec::new();
        while !reader.is_empty() {
            topics.push(Topic::decode(reader)?);
        }
        Ok(Self { stream, topics })
    }
}

/// Topic header, as returned in topic lists and at the start of
/// [`TopicDetails`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: u32,
    /// Microseconds since the Unix epoch.
    pub created_at: u64,
    pub partitions_count: u32,
    pub message_expiry: MessageExpiry,
    pub compression: CompressionAlgorithm,
    pub max_topic_size: MaxTopicSize,
    pub replication_factor: u8,
    pub size: u64,
    pub messages_count: u64,
    pub name: String,
}

impl Topic {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        created_at_utc(self.created_at)
    }
}

impl WireEncode for Topic {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        buf.put_u32_le(self.id);
        buf.put_u64_le(self.created_at);
        buf.put_u32_le(self.partitions_count);
        buf.put_u64_le(self.message_expiry.as_micros());
        buf.put_u8(self.compression.as_code());
        buf.put_u64_le(self.max_topic_size.as_bytes_count());
        buf.put_u8(self.replication_factor);
        buf.put_u64_le(self.size);
        buf.put_u64_le(self.messages_count);
        put_str8(buf, "topic.name", &self.name)
    }
}

impl WireDecode for Topic {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: reader.u32("topic.id")?,
            created_at: reader.u64("topic.created_at")?,
            partitions_count: reader.u32("topic.partitions_count")?,
            message_expiry: MessageExpiry::from_micros(reader.u64("topic.message_expiry")?),
            compression: CompressionAlgorithm::from_code(reader.u8("topic.compression")?)?,
            max_topic_size: MaxTopicSize::from_bytes_count(reader.u64("topic.max_topic_size")?),
            replication_factor: reader.u8("topic.replication_factor")?,
            size: reader.u64("topic.size")?,
            messages_count: reader.u64("topic.messages_count")?,
            name: reader.str8("topic.name")?,
        })
    }
}

/// A topic header followed by its partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDetails {
    #[serde(flatten)]
    pub topic: Topic,
    pub partitions: Vec<Partition>,
}

impl WireEncode for TopicDetails {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        self.topic.encode(buf)?;
        for partition in &self.partitions {
            partition.encode(buf)?;
        }
        Ok(())
    }
}

impl WireDecode for TopicDetails {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let topic = Topic::decode(reader)?;
        let mut partitions = Vec::new();
        while !reader.is_empty() {
            partitions.push(Partition::decode(reader)?);
        }
        Ok(Self { topic, partitions })
    }
}

/// Size of an encoded [`Partition`].
pub const PARTITION_SIZE: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub id: u32,
    pub created_at: u64,
    pub segments_count: u32,
    pub current_offset: u64,
    pub size: u64,
    pub messages_count: u64,
}

impl WireEncode for Partition {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        buf.put_u32_le(self.id);
        buf.put_u64_le(self.created_at);
        buf.put_u32_le(self.segments_count);
        buf.put_u64_le(self.current_offset);
        buf.put_u64_le(self.size);
        buf.put_u64_le(self.messages_count);
        Ok(())
    }
}

impl WireDecode for Partition {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: reader.u32("partition.id")?,
            created_at: reader.u64("partition.created_at")?,
            segments_count: reader.u32("partition.segments_count")?,
            current_offset: reader.u64("partition.current_offset")?,
            size: reader.u64("partition.size")?,
            messages_count: reader.u64("partition.messages_count")?,
        })
    }
}

/// A batch of messages returned by a poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolledMessages {
    pub partition_id: u32,
    pub current_offset: u64,
    pub messages: Vec<Message>,
}

impl WireEncode for PolledMessages {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        buf.put_u32_le(self.partition_id);
        buf.put_u64_le(self.current_offset);
        buf.put_u32_le(self.messages.len() as u32);
        for message in &self.messages {
            message.encode(buf)?;
        }
        Ok(())
    }
}

impl WireDecode for PolledMessages {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let partition_id = reader.u32("polled.partition_id")?;
        let current_offset = reader.u64("polled.current_offset")?;
        let count = reader.u32("polled.count")?;
        // Every envelope is at least one header long.
        let capacity = (count as usize).min(reader.remaining() / MESSAGE_HEADER_SIZE);
        let mut messages = Vec::with_capacity(capacity);
        for _ in 0..count {
            messages.push(Message::decode(reader)?);
        }
        Ok(Self {
            partition_id,
            current_offset,
            messages,
        })
    }
}

/// Decodes a stream list response.
pub fn decode_streams(payload: &[u8]) -> Result<Vec<Stream>, ProtocolError> {
    decode_all(payload)
}

/// Decodes a topic list response.
pub fn decode_topics(payload: &[u8]) -> Result<Vec<Topic>, ProtocolError> {
    decode_all(payload)
}

fn decode_all<T: WireDecode>(payload: &[u8]) -> Result<Vec<T>, ProtocolError> {
    let mut reader = WireReader::new(payload);
    let mut items = Vec::new();
    while !reader.is_empty() {
        items.push(T::decode(&mut reader)?);
    }
    Ok(items)
}
