//! Request payloads for every supported command.
//!
//! Each request validates its own fields while encoding, so an invalid
//! request fails with a [`ValidationError`] before any byte reaches the
//! transport. Decoding is provided for mock servers and benchmarks.

use crate::codec::{put_str32, put_str8, WireDecode, WireEncode, WireReader};
use crate::command::Command;
use crate::error::{ProtocolError, ValidationError};
use crate::identifier::Identifier;
use crate::message::{Consumer, Message, Partitioning, PollingStrategy};
use crate::models::{CompressionAlgorithm, MaxTopicSize, MessageExpiry};
use crate::MAX_PARTITIONS_COUNT;
use bytes::{BufMut, BytesMut};
use std::fmt;

/// A request payload bound to the command that carries it.
pub trait Request: WireEncode {
    const COMMAND: Command;
}

macro_rules! empty_request {
    ($(#[$meta:meta])* $name:ident => $command:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Request for $name {
            const COMMAND: Command = Command::$command;
        }

        impl WireEncode for $name {
            fn encode(&self, _buf: &mut BytesMut) -> Result<(), ValidationError> {
                Ok(())
            }
        }

        impl WireDecode for $name {
            fn decode(_reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
                Ok($name)
            }
        }
    };
}

macro_rules! stream_request {
    ($(#[$meta:meta])* $name:ident => $command:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub stream_id: Identifier,
        }

        impl Request for $name {
            const COMMAND: Command = Command::$command;
        }

        impl WireEncode for $name {
            fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
                self.stream_id.encode(buf)
            }
        }

        impl WireDecode for $name {
            fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
                Ok(Self {
                    stream_id: Identifier::decode(reader)?,
                })
            }
        }
    };
}

macro_rules! topic_request {
    ($(#[$meta:meta])* $name:ident => $command:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub stream_id: Identifier,
            pub topic_id: Identifier,
        }

        impl Request for $name {
            const COMMAND: Command = Command::$command;
        }

        impl WireEncode for $name {
            fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
                self.stream_id.encode(buf)?;
                self.topic_id.encode(buf)
            }
        }

        impl WireDecode for $name {
            fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
                Ok(Self {
                    stream_id: Identifier::decode(reader)?,
                    topic_id: Identifier::decode(reader)?,
                })
            }
        }
    };
}

empty_request!(Ping => Ping);
empty_request!(LogoutUser => LogoutUser);
empty_request!(
    /// Lists all streams.
    GetStreams => GetStreams
);

stream_request!(GetStream => GetStream);
stream_request!(DeleteStream => DeleteStream);
stream_request!(
    /// Deletes all messages of every topic in the stream, keeping the topics.
    PurgeStream => PurgeStream
);
stream_request!(
    /// Lists the topics of a stream.
    GetTopics => GetTopics
);

topic_request!(GetTopic => GetTopic);
topic_request!(DeleteTopic => DeleteTopic);
topic_request!(PurgeTopic => PurgeTopic);

/// Authenticates the session.
///
/// `version` and `context` are optional client metadata and may be empty.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginUser {
    pub username: String,
    pub password: String,
    pub version: String,
    pub context: String,
}

impl fmt::Debug for LoginUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("version", &self.version)
            .field("context", &self.context)
            .finish()
    }
}

impl Request for LoginUser {
    const COMMAND: Command = Command::LoginUser;
}

impl WireEncode for LoginUser {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        put_str8(buf, "username", &self.username)?;
        put_str8(buf, "password", &self.password)?;
        put_str32(buf, &self.version);
        put_str32(buf, &self.context);
        Ok(())
    }
}

impl WireDecode for LoginUser {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            username: reader.str8("username")?,
            password: reader.str8("password")?,
            version: reader.str32("version")?,
            context: reader.str32("context")?,
        })
    }
}

/// Creates a stream. A `stream_id` of 0 lets the server assign one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStream {
    pub stream_id: u32,
    pub name: String,
}

impl Request for CreateStream {
    const COMMAND: Command = Command::CreateStream;
}

impl WireEncode for CreateStream {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        buf.put_u32_le(self.stream_id);
        put_str8(buf, "stream_name", &self.name)
    }
}

impl WireDecode for CreateStream {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            stream_id: reader.u32("stream_id")?,
            name: reader.str8("stream_name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStream {
    pub stream_id: Identifier,
    pub name: String,
}

impl Request for UpdateStream {
    const COMMAND: Command = Command::UpdateStream;
}

impl WireEncode for UpdateStream {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        self.stream_id.encode(buf)?;
        put_str8(buf, "stream_name", &self.name)
    }
}

impl WireDecode for UpdateStream {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            stream_id: Identifier::decode(reader)?,
            name: reader.str8("stream_name")?,
        })
    }
}

/// Creates a topic. A `topic_id` of 0 lets the server assign one; a
/// `replication_factor` of 0 leaves it unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTopic {
    pub stream_id: Identifier,
    pub topic_id: u32,
    pub partitions_count: u32,
    pub compression: CompressionAlgorithm,
    pub message_expiry: MessageExpiry,
    pub max_topic_size: MaxTopicSize,
    pub replication_factor: u8,
    pub name: String,
}

impl CreateTopic {
    pub fn new(stream_id: Identifier, topic_id: u32, partitions_count: u32, name: &str) -> Self {
        Self {
            stream_id,
            topic_id,
            partitions_count,
            compression: CompressionAlgorithm::default(),
            message_expiry: MessageExpiry::default(),
            max_topic_size: MaxTopicSize::default(),
            replication_factor: 0,
            name: name.to_string(),
        }
    }
}

impl Request for CreateTopic {
    const COMMAND: Command = Command::CreateTopic;
}

impl WireEncode for CreateTopic {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        if self.partitions_count > MAX_PARTITIONS_COUNT {
            return Err(ValidationError::TooManyPartitions {
                count: self.partitions_count,
                max: MAX_PARTITIONS_COUNT,
            });
        }
        self.stream_id.encode(buf)?;
        buf.put_u32_le(self.topic_id);
        buf.put_u32_le(self.partitions_count);
        buf.put_u8(self.compression.as_code());
        buf.put_u64_le(self.message_expiry.as_micros());
        buf.put_u64_le(self.max_topic_size.as_bytes_count());
        buf.put_u8(self.replication_factor);
        put_str8(buf, "topic_name", &self.name)
    }
}

impl WireDecode for CreateTopic {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            stream_id: Identifier::decode(reader)?,
            topic_id: reader.u32("topic_id")?,
            partitions_count: reader.u32("partitions_count")?,
            compression: CompressionAlgorithm::from_code(reader.u8("compression")?)?,
            message_expiry: MessageExpiry::from_micros(reader.u64("message_expiry")?),
            max_topic_size: MaxTopicSize::from_bytes_count(reader.u64("max_topic_size")?),
            replication_factor: reader.u8("replication_factor")?,
            name: reader.str8("topic_name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTopic {
    pub stream_id: Identifier,
    pub topic_id: Identifier,
    pub compression: CompressionAlgorithm,
    pub message_expiry: MessageExpiry,
    pub max_topic_size: MaxTopicSize,
    pub replication_factor: u8,
    pub name: String,
}

impl Request for UpdateTopic {
    const COMMAND: Command = Command::UpdateTopic;
}

impl WireEncode for UpdateTopic {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        self.stream_id.encode(buf)?;
        self.topic_id.encode(buf)?;
        buf.put_u8(self.compression.as_code());
        buf.put_u64_le(self.message_expiry.as_micros());
        buf.put_u64_le(self.max_topic_size.as_bytes_count());
        buf.put_u8(self.replication_factor);
        put_str8(buf, "topic_name", &self.name)
    }
}

impl WireDecode for UpdateTopic {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            stream_id: Identifier::decode(reader)?,
            topic_id: Identifier::decode(reader)?,
            compression: CompressionAlgorithm::from_code(reader.u8("compression")?)?,
            message_expiry: MessageExpiry::from_micros(reader.u64("message_expiry")?),
            max_topic_size: MaxTopicSize::from_bytes_count(reader.u64("max_topic_size")?),
            replication_factor: reader.u8("replication_factor")?,
            name: reader.str8("topic_name")?,
        })
    }
}

/// Appends a batch of messages to one partition of a topic.
///
/// The envelopes follow the partitioning selector back to back, with no
/// batch-level count or length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessages {
    pub stream_id: Identifier,
    pub topic_id: Identifier,
    pub partitioning: Partitioning,
    pub messages: Vec<Message>,
}

impl Request for SendMessages {
    const COMMAND: Command = Command::SendMessages;
}

impl WireEncode for SendMessages {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        if self.messages.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        self.stream_id.encode(buf)?;
        self.topic_id.encode(buf)?;
        self.partitioning.encode(buf)?;
        for message in &self.messages {
            message.encode(buf)?;
        }
        Ok(())
    }
}

impl WireDecode for SendMessages {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let stream_id = Identifier::decode(reader)?;
        let topic_id = Identifier::decode(reader)?;
        let partitioning = Partitioning::decode(reader)?;
        let mut messages = Vec::new();
        while !reader.is_empty() {
            messages.push(Message::decode(reader)?);
        }
        Ok(Self {
            stream_id,
            topic_id,
            partitioning,
            messages,
        })
    }
}

/// Reads up to `count` messages from a topic.
///
/// With `partition_id` unset the server picks the partition (consumer
/// groups). `auto_commit` stores the consumer offset after the read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollMessages {
    pub consumer: Consumer,
    pub stream_id: Identifier,
    pub topic_id: Identifier,
    pub partition_id: Option<u32>,
    pub strategy: PollingStrategy,
    pub count: u32,
    pub auto_commit: bool,
}

impl Request for PollMessages {
    const COMMAND: Command = Command::PollMessages;
}

impl WireEncode for PollMessages {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        self.consumer.encode(buf)?;
        self.stream_id.encode(buf)?;
        self.topic_id.encode(buf)?;
        match self.partition_id {
            Some(id) => {
                buf.put_u8(1);
                buf.put_u32_le(id);
            }
            None => {
                buf.put_u8(0);
                buf.put_u32_le(0);
            }
        }
        self.strategy.encode(buf)?;
        buf.put_u32_le(self.count);
        buf.put_u8(self.auto_commit as u8);
        Ok(())
    }
}

impl WireDecode for PollMessages {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let consumer = Consumer::decode(reader)?;
        let stream_id = Identifier::decode(reader)?;
        let topic_id = Identifier::decode(reader)?;
        let has_partition = reader.u8("partition_flag")?;
        let partition = reader.u32("partition_id")?;
        Ok(Self {
            consumer,
            stream_id,
            topic_id,
            partition_id: (has_partition != 0).then_some(partition),
            strategy: PollingStrategy::decode(reader)?,
            count: reader.u32("count")?,
            auto_commit: reader.u8("auto_commit")? != 0,
        })
    }
}
