//! Validation errors, protocol errors and server error codes.

use std::fmt;
use thiserror::Error;

/// Errors raised locally while building a request, before any byte is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is too long: {length} bytes (max {max})")]
    ValueTooLong {
        field: &'static str,
        length: usize,
        max: usize,
    },

    #[error("{field} must not be empty")]
    EmptyValue { field: &'static str },

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: u32 },

    #[error("too many partitions: {count} (max {max})")]
    TooManyPartitions { count: u32, max: u32 },

    #[error("message batch must not be empty")]
    EmptyBatch,

    #[error("{field} length mismatch: header declares {declared}, actual {actual}")]
    EnvelopeLengthMismatch {
        field: &'static str,
        declared: u32,
        actual: usize,
    },
}

/// Errors raised while decoding bytes received from the server.
///
/// Any of these means either side broke the wire contract; they are never
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed data: {field} needs {needed} bytes at offset {offset}, {remaining} remaining")]
    MalformedData {
        field: &'static str,
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("unknown identifier kind: {0}")]
    UnknownIdentifierKind(u8),

    #[error("invalid identifier length {length} for kind {kind}")]
    InvalidIdentifierLength { kind: u8, length: u8 },

    #[error("unknown {field} value: {value}")]
    UnknownDiscriminant { field: &'static str, value: u64 },

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("{count} trailing bytes after {field}")]
    TrailingBytes { field: &'static str, count: usize },

    #[error("frame length mismatch: declared {declared} bytes, got {actual}")]
    LengthMismatch { declared: u32, actual: usize },

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u32, max: u32 },

    #[error("unknown command code: {0}")]
    UnknownCommand(u32),
}

/// Error codes carried in the status field of a response frame.
///
/// The numeric values are part of the server's protocol contract. Codes this
/// client does not name are kept as [`ErrorCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Error,
    InvalidConfiguration,
    InvalidCommand,
    InvalidFormat,
    FeatureUnavailable,
    InvalidIdentifier,
    InvalidVersion,
    Disconnected,
    CannotEstablishConnection,
    ResourceNotFound,

    Unauthenticated,
    Unauthorized,
    InvalidCredentials,
    InvalidUsername,
    InvalidPassword,

    StreamIdNotFound,
    StreamNameNotFound,
    StreamIdAlreadyExists,
    StreamNameAlreadyExists,
    InvalidStreamName,

    TopicIdNotFound,
    TopicNameNotFound,
    TopicIdAlreadyExists,
    TopicNameAlreadyExists,
    InvalidTopicName,
    TooManyPartitions,

    Unknown(u32),
}

impl ErrorCode {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => ErrorCode::Error,
            2 => ErrorCode::InvalidConfiguration,
            3 => ErrorCode::InvalidCommand,
            4 => ErrorCode::InvalidFormat,
            5 => ErrorCode::FeatureUnavailable,
            6 => ErrorCode::InvalidIdentifier,
            7 => ErrorCode::InvalidVersion,
            8 => ErrorCode::Disconnected,
            9 => ErrorCode::CannotEstablishConnection,
            20 => ErrorCode::ResourceNotFound,
            40 => ErrorCode::Unauthenticated,
            41 => ErrorCode::Unauthorized,
            42 => ErrorCode::InvalidCredentials,
            43 => ErrorCode::InvalidUsername,
            44 => ErrorCode::InvalidPassword,
            1009 => ErrorCode::StreamIdNotFound,
            1010 => ErrorCode::StreamNameNotFound,
            1011 => ErrorCode::StreamIdAlreadyExists,
            1012 => ErrorCode::StreamNameAlreadyExists,
            1013 => ErrorCode::InvalidStreamName,
            2010 => ErrorCode::TopicIdNotFound,
            2011 => ErrorCode::TopicNameNotFound,
            2012 => ErrorCode::TopicIdAlreadyExists,
            2013 => ErrorCode::TopicNameAlreadyExists,
            2014 => ErrorCode::InvalidTopicName,
            2015 => ErrorCode::TooManyPartitions,
            other => ErrorCode::Unknown(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            ErrorCode::Error => 1,
            ErrorCode::InvalidConfiguration => 2,
            ErrorCode::InvalidCommand => 3,
            ErrorCode::InvalidFormat => 4,
            ErrorCode::FeatureUnavailable => 5,
            ErrorCode::InvalidIdentifier => 6,
            ErrorCode::InvalidVersion => 7,
            ErrorCode::Disconnected => 8,
            ErrorCode::CannotEstablishConnection => 9,
            ErrorCode::ResourceNotFound => 20,
            ErrorCode::Unauthenticated => 40,
            ErrorCode::Unauthorized => 41,
            ErrorCode::InvalidCredentials => 42,
            ErrorCode::InvalidUsername => 43,
            ErrorCode::InvalidPassword => 44,
            ErrorCode::StreamIdNotFound => 1009,
            ErrorCode::StreamNameNotFound => 1010,
            ErrorCode::StreamIdAlreadyExists => 1011,
            ErrorCode::StreamNameAlreadyExists => 1012,
            ErrorCode::InvalidStreamName => 1013,
            ErrorCode::TopicIdNotFound => 2010,
            ErrorCode::TopicNameNotFound => 2011,
            ErrorCode::TopicIdAlreadyExists => 2012,
            ErrorCode::TopicNameAlreadyExists => 2013,
            ErrorCode::InvalidTopicName => 2014,
            ErrorCode::TooManyPartitions => 2015,
            ErrorCode::Unknown(code) => *code,
        }
    }

    /// Returns whether this code reports a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ErrorCode::ResourceNotFound
                | ErrorCode::StreamIdNotFound
                | ErrorCode::StreamNameNotFound
                | ErrorCode::TopicIdNotFound
                | ErrorCode::TopicNameNotFound
        )
    }

    fn name(&self) -> &'static str {
        match self {
            ErrorCode::Error => "ERROR",
            ErrorCode::InvalidConfiguration => "INVALID_CONFIGURATION",
            ErrorCode::InvalidCommand => "INVALID_COMMAND",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::FeatureUnavailable => "FEATURE_UNAVAILABLE",
            ErrorCode::InvalidIdentifier => "INVALID_IDENTIFIER",
            ErrorCode::InvalidVersion => "INVALID_VERSION",
            ErrorCode::Disconnected => "DISCONNECTED",
            ErrorCode::CannotEstablishConnection => "CANNOT_ESTABLISH_CONNECTION",
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::InvalidUsername => "INVALID_USERNAME",
            ErrorCode::InvalidPassword => "INVALID_PASSWORD",
            ErrorCode::StreamIdNotFound => "STREAM_ID_NOT_FOUND",
            ErrorCode::StreamNameNotFound => "STREAM_NAME_NOT_FOUND",
            ErrorCode::StreamIdAlreadyExists => "STREAM_ID_ALREADY_EXISTS",
            ErrorCode::StreamNameAlreadyExists => "STREAM_NAME_ALREADY_EXISTS",
            ErrorCode::InvalidStreamName => "INVALID_STREAM_NAME",
            ErrorCode::TopicIdNotFound => "TOPIC_ID_NOT_FOUND",
            ErrorCode::TopicNameNotFound => "TOPIC_NAME_NOT_FOUND",
            ErrorCode::TopicIdAlreadyExists => "TOPIC_ID_ALREADY_EXISTS",
            ErrorCode::TopicNameAlreadyExists => "TOPIC_NAME_ALREADY_EXISTS",
            ErrorCode::InvalidTopicName => "INVALID_TOPIC_NAME",
            ErrorCode::TooManyPartitions => "TOO_MANY_PARTITIONS",
            ErrorCode::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
