//! Request and response framing.
//!
//! Request frame (client → server):
//!
//! ```text
//! +-------------+-------------+---------------------------+
//! |   length    |   command   |          payload          |
//! |   4 bytes   |   4 bytes   |   length - 4 bytes        |
//! +-------------+-------------+---------------------------+
//! ```
//!
//! `length` counts the command code plus the payload.
//!
//! Response frame (server → client):
//!
//! ```text
//! +-------------+-------------+---------------------------+
//! |   status    |   length    |          payload          |
//! |   4 bytes   |   4 bytes   |       length bytes        |
//! +-------------+-------------+---------------------------+
//! ```
//!
//! Status 0 is success; anything else is an [`ErrorCode`] and the payload, if
//! any, is not a domain object. Both headers are little-endian.

use crate::codec::WireEncode;
use crate::command::Command;
use crate::error::{ErrorCode, ProtocolError, ValidationError};
use crate::request::Request;
use crate::{MAX_PAYLOAD_SIZE, SUCCESS_STATUS};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the request header (length + command code).
pub const REQUEST_HEADER_SIZE: usize = 8;

/// Size of the response header (status + length).
pub const RESPONSE_HEADER_SIZE: usize = 8;

/// Size of the command code counted in the request length field.
const COMMAND_CODE_SIZE: u32 = 4;

/// An outbound command frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub command: Command,
    pub payload: Bytes,
}

impl RequestFrame {
    pub fn new(command: Command, payload: Bytes) -> Self {
        Self { command, payload }
    }

    /// Validates and encodes `request` into a frame for its command.
    pub fn from_request<R: Request>(request: &R) -> Result<Self, ValidationError> {
        Ok(Self::new(R::COMMAND, request.to_bytes()?))
    }

    /// Encodes the frame. Oversized payloads are rejected before any byte is
    /// produced.
    pub fn encode(&self) -> Result<BytesMut, ValidationError> {
        if self.payload.len() > MAX_PAYLOAD_SIZE as usize {
            return Err(ValidationError::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(REQUEST_HEADER_SIZE + self.payload.len());
        buf.put_u32_le(COMMAND_CODE_SIZE + self.payload.len() as u32);
        buf.put_u32_le(self.command.code());
        buf.put_slice(&self.payload);
        Ok(buf)
    }

    /// Decodes one request frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` if more data is needed. Used by test servers and
    /// benchmarks; the client itself only writes requests.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < REQUEST_HEADER_SIZE {
            return Ok(None);
        }

        let length = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if length < COMMAND_CODE_SIZE {
            return Err(ProtocolError::MalformedData {
                field: "request.length",
                offset: 0,
                needed: COMMAND_CODE_SIZE as usize,
                remaining: length as usize,
            });
        }
        let payload_len = length - COMMAND_CODE_SIZE;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let total_len = REQUEST_HEADER_SIZE + payload_len as usize;
        if buf.len() < total_len {
            return Ok(None);
        }

        let code = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let command = Command::from_code(code)?;

        buf.advance(REQUEST_HEADER_SIZE);
        let payload = buf.split_to(payload_len as usize).freeze();

        Ok(Some(Self { command, payload }))
    }
}

/// An inbound response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub status: u32,
    pub payload: Bytes,
}

impl ResponseFrame {
    /// A successful response carrying `payload`.
    pub fn ok(payload: Bytes) -> Self {
        Self {
            status: SUCCESS_STATUS,
            payload,
        }
    }

    /// A successful response with no payload.
    pub fn empty() -> Self {
        Self::ok(Bytes::new())
    }

    /// A failed response carrying only the error code.
    pub fn error(code: ErrorCode) -> Self {
        Self {
            status: code.code(),
            payload: Bytes::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }

    /// The server error code, or `None` on success.
    pub fn error_code(&self) -> Option<ErrorCode> {
        if self.is_success() {
            None
        } else {
            Some(ErrorCode::from_code(self.status))
        }
    }

    /// Encodes the frame (for test servers and benchmarks).
    pub fn encode(&self) -> Result<BytesMut, ValidationError> {
        if self.payload.len() > MAX_PAYLOAD_SIZE as usize {
            return Err(ValidationError::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_SIZE + self.payload.len());
        buf.put_u32_le(self.status);
        buf.put_u32_le(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        Ok(buf)
    }

    /// Decodes one response frame from the front of `buf`.
    ///
    /// Returns `Ok(Some(frame))` once the header and the full declared payload
    /// are buffered, `Ok(None)` if more data is needed, or `Err` if the
    /// declared length exceeds the protocol maximum. Only the bytes of the
    /// returned frame are consumed.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < RESPONSE_HEADER_SIZE {
            return Ok(None);
        }

        let status = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let length = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);

        if length > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: length,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let total_len = RESPONSE_HEADER_SIZE + length as usize;
        if buf.len() < total_len {
            return Ok(None);
        }

        buf.advance(RESPONSE_HEADER_SIZE);
        let payload = buf.split_to(length as usize).freeze();

        Ok(Some(Self { status, payload }))
    }

    /// Parses a buffer that must hold exactly one response frame.
    ///
    /// A declared length that differs from the bytes actually present is a
    /// protocol violation; the frame is rejected, never partially parsed.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < RESPONSE_HEADER_SIZE {
            return Err(ProtocolError::MalformedData {
                field: "response.header",
                offset: 0,
                needed: RESPONSE_HEADER_SIZE,
                remaining: bytes.len(),
            });
        }

        let status = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let length = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let actual = bytes.len() - RESPONSE_HEADER_SIZE;

        if length as usize != actual {
            return Err(ProtocolError::LengthMismatch {
                declared: length,
                actual,
            });
        }
        if length > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: length,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        Ok(Self {
            status,
            payload: Bytes::copy_from_slice(&bytes[RESPONSE_HEADER_SIZE..]),
        })
    }
}
