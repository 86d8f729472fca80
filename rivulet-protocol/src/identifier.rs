//! Tagged identifiers addressing streams, topics and consumers.
//!
//! Wire layout:
//!
//! ```text
//! +--------+--------+----------------------------+
//! |  kind  | length |           value            |
//! | 1 byte | 1 byte |        length bytes        |
//! +--------+--------+----------------------------+
//! kind 1 = numeric: length 4, value is a u32 (LE)
//! kind 2 = name:    length 1..=255, value is UTF-8
//! ```

use crate::codec::{check_name, WireDecode, WireEncode, WireReader};
use crate::error::{ProtocolError, ValidationError};
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const NUMERIC_KIND: u8 = 1;
const NAME_KIND: u8 = 2;
const NUMERIC_LENGTH: u8 = 4;

/// Addresses a resource either by numeric id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identifier {
    Numeric(u32),
    Name(String),
}

impl Identifier {
    pub fn numeric(id: u32) -> Self {
        Identifier::Numeric(id)
    }

    /// Creates a name identifier, rejecting empty names and names longer
    /// than 255 bytes.
    pub fn named(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        check_name("identifier", &name)?;
        Ok(Identifier::Name(name))
    }

    pub fn kind(&self) -> u8 {
        match self {
            Identifier::Numeric(_) => NUMERIC_KIND,
            Identifier::Name(_) => NAME_KIND,
        }
    }

    pub fn as_numeric(&self) -> Option<u32> {
        match self {
            Identifier::Numeric(id) => Some(*id),
            Identifier::Name(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Identifier::Numeric(_))
    }

    /// Size of the encoded identifier in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Identifier::Numeric(_) => 2 + NUMERIC_LENGTH as usize,
            Identifier::Name(name) => 2 + name.len(),
        }
    }
}

impl WireEncode for Identifier {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), ValidationError> {
        match self {
            Identifier::Numeric(id) => {
                buf.put_u8(NUMERIC_KIND);
                buf.put_u8(NUMERIC_LENGTH);
                buf.put_u32_le(*id);
            }
            Identifier::Name(name) => {
                check_name("identifier", name)?;
                buf.put_u8(NAME_KIND);
                buf.put_u8(name.len() as u8);
                buf.put_slice(name.as_bytes());
            }
        }
        Ok(())
    }
}

impl WireDecode for Identifier {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let kind = reader.u8("identifier.kind")?;
        let length = reader.u8("identifier.length")?;
        match kind {
            NUMERIC_KIND => {
                if length != NUMERIC_LENGTH {
                    return Err(ProtocolError::InvalidIdentifierLength { kind, length });
                }
                Ok(Identifier::Numeric(reader.u32("identifier.value")?))
            }
            NAME_KIND => {
                if length == 0 {
                    return Err(ProtocolError::InvalidIdentifierLength { kind, length });
                }
                Ok(Identifier::Name(
                    reader.utf8(length as usize, "identifier.value")?,
                ))
            }
            other => Err(ProtocolError::UnknownIdentifierKind(other)),
        }
    }
}

impl From<u32> for Identifier {
    fn from(id: u32) -> Self {
        Identifier::Numeric(id)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = ValidationError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Identifier::named(name)
    }
}

/// Parses digits as a numeric id and anything else as a name.
impl FromStr for Identifier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<u32>() {
            Ok(id) => Ok(Identifier::Numeric(id)),
            Err(_) => Identifier::named(s),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(id) => write!(f, "{}", id),
            Identifier::Name(name) => write!(f, "{}", name),
        }
    }
}
