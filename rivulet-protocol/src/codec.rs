//! Primitive codec: the bounds-checked reader, length-prefixed strings and the
//! encode/decode traits every wire type implements.

use crate::error::{ProtocolError, ValidationError};
use bytes::{BufMut, Bytes, BytesMut};

/// Types that can be written to the wire.
pub trait WireEncode {
    /// Appends the wire form of `self` to `buf`.
    ///
    /// Fails without touching the transport if a field violates a protocol
    /// limit (for example a name longer than 255 bytes).
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError>;

    /// Encodes `self` into a fresh buffer.
    fn to_bytes(&self) -> Result<Bytes, ValidationError> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Types that can be read back from the wire.
pub trait WireDecode: Sized {
    /// Reads one value from the reader's current position.
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError>;

    /// Decodes a value that must span the whole of `bytes`.
    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = WireReader::new(bytes);
        let value = Self::decode(&mut reader)?;
        reader.finish(std::any::type_name::<Self>())?;
        Ok(value)
    }
}

/// Bounds-checked little-endian cursor over a borrowed byte slice.
///
/// Every read either returns exactly the requested bytes or fails with
/// [`ProtocolError::MalformedData`] naming the field; it never reads past the
/// end of the slice.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Takes the next `len` bytes.
    pub fn bytes(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < len {
            return Err(ProtocolError::MalformedData {
                field,
                offset: self.pos,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N, field)?);
        Ok(out)
    }

    pub fn u8(&mut self, field: &'static str) -> Result<u8, ProtocolError> {
        Ok(self.array::<1>(field)?[0])
    }

    pub fn u32(&mut self, field: &'static str) -> Result<u32, ProtocolError> {
        Ok(u32::from_le_bytes(self.array(field)?))
    }

    pub fn u64(&mut self, field: &'static str) -> Result<u64, ProtocolError> {
        Ok(u64::from_le_bytes(self.array(field)?))
    }

    pub fn u128(&mut self, field: &'static str) -> Result<u128, ProtocolError> {
        Ok(u128::from_le_bytes(self.array(field)?))
    }

    /// Reads a string with a one-byte length prefix.
    pub fn str8(&mut self, field: &'static str) -> Result<String, ProtocolError> {
        let len = self.u8(field)? as usize;
        self.utf8(len, field)
    }

    /// Reads a string with a four-byte length prefix.
    pub fn str32(&mut self, field: &'static str) -> Result<String, ProtocolError> {
        let len = self.u32(field)? as usize;
        self.utf8(len, field)
    }

    /// Reads `len` bytes as UTF-8.
    pub fn utf8(&mut self, len: usize, field: &'static str) -> Result<String, ProtocolError> {
        let raw = self.bytes(len, field)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidUtf8(field))
    }

    /// Fails if any bytes are left unread.
    pub fn finish(&self, field: &'static str) -> Result<(), ProtocolError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::TrailingBytes {
                field,
                count: self.remaining(),
            })
        }
    }
}

/// Checks that `value` fits a length field that can represent at most `max`
/// bytes.
pub fn check_len(field: &'static str, value: &[u8], max: usize) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::ValueTooLong {
            field,
            length: value.len(),
            max,
        });
    }
    Ok(())
}

/// Checks a non-empty name that must fit a one-byte length prefix.
pub fn check_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyValue { field });
    }
    check_len(field, value.as_bytes(), crate::MAX_NAME_LENGTH)
}

/// Writes a non-empty string with a one-byte length prefix.
pub fn put_str8(
    buf: &mut BytesMut,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    check_name(field, value)?;
    buf.put_u8(value.len() as u8);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// Writes a (possibly empty) string with a four-byte length prefix.
pub fn put_str32(buf: &mut BytesMut, value: &str) {
    buf.put_u32_le(value.len() as u32);
    buf.put_slice(value.as_bytes());
}
