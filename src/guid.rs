//! 16-byte GUIDs carried by object ACEs.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::utils::ByteReader;
use crate::well_known;

pub const GUID_LEN: usize = 16;

/// A GUID as stored on the wire: the first three fields little-endian, the
/// last eight bytes in order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Guid(Uuid);

impl Guid {
    pub const NIL: Guid = Guid(Uuid::nil());

    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Guid {
        Guid(Uuid::from_fields(data1, data2, data3, &data4))
    }

    /// Decodes a GUID from the start of `data`; fewer than 16 bytes is an error.
    pub fn decode(data: &[u8]) -> Result<Guid> {
        Guid::decode_from(&mut ByteReader::new(data))
    }

    pub fn decode_from(reader: &mut ByteReader) -> Result<Guid> {
        if reader.remaining() < GUID_LEN {
            return Err(Error::record(format!(
                "GUID needs {} bytes, only {} available",
                GUID_LEN,
                reader.remaining()
            )));
        }

        Ok(Guid(Uuid::from_bytes_le(reader.read_array::<GUID_LEN>()?)))
    }

    pub fn encode(&self) -> [u8; GUID_LEN] {
        self.0.to_bytes_le()
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.encode());
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// The documented name of a control access right, property set or schema
    /// class, falling back to the canonical string.
    pub fn resolve(&self) -> String {
        let canonical = self.to_string();
        match well_known::guid_name(&canonical) {
            Some(name) => name.to_string(),
            None => canonical,
        }
    }
}

impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Guid {
        Guid(uuid)
    }
}

/// The nil GUID renders as an empty string; it stands for "absent".
impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_nil() {
            return Ok(());
        }
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Accepts the hyphenated form, with or without braces.
impl FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Guid> {
        Uuid::parse_str(s)
            .map(Guid)
            .map_err(|e| Error::identifier(format!("invalid GUID format: {:?}: {}", s, e)))
    }
}
