//! Security identifiers: binary codec, canonical text form and name lookup.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::{put_u32, ByteReader};
use crate::well_known;

pub const SID_REVISION: u8 = 1;
pub const SID_MAX_SUB_AUTHORITIES: usize = 15;

/// Largest value representable in the 6-byte identifier authority.
const MAX_AUTHORITY: u64 = (1 << 48) - 1;

pub const SECURITY_WORLD_AUTHORITY: u64 = 1;
pub const SECURITY_NT_AUTHORITY: u64 = 5;
pub const SECURITY_APP_PACKAGE_AUTHORITY: u64 = 15;
pub const SECURITY_MANDATORY_LABEL_AUTHORITY: u64 = 16;

/// A security identifier.
///
/// Values are immutable once built, either by [`Sid::decode`] or by parsing
/// the canonical `S-R-A-S1-S2-...` string. Equality is structural, which is
/// the same as comparing canonical strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sid {
    revision: u8,
    authority: [u8; 6],
    sub_authorities: Vec<u32>,
}

impl Sid {
    /// Builds a revision 1 SID from a 48-bit authority and its sub-authorities.
    pub fn new(authority: u64, sub_authorities: &[u32]) -> Result<Sid> {
        if authority > MAX_AUTHORITY {
            return Err(Error::identifier(format!(
                "identifier authority {} does not fit in 48 bits",
                authority
            )));
        }
        if sub_authorities.len() > SID_MAX_SUB_AUTHORITIES {
            return Err(Error::identifier(format!(
                "{} sub-authorities exceeds the maximum of {}",
                sub_authorities.len(),
                SID_MAX_SUB_AUTHORITIES
            )));
        }

        Ok(Sid {
            revision: SID_REVISION,
            authority: authority_bytes(authority),
            sub_authorities: sub_authorities.to_vec(),
        })
    }

    /// `S-1-1-0`, the Everyone group.
    pub fn everyone() -> Sid {
        Sid {
            revision: SID_REVISION,
            authority: authority_bytes(SECURITY_WORLD_AUTHORITY),
            sub_authorities: vec![0],
        }
    }

    pub(crate) fn with_authority(authority: u64, sub_authorities: Vec<u32>) -> Sid {
        Sid {
            revision: SID_REVISION,
            authority: authority_bytes(authority & MAX_AUTHORITY),
            sub_authorities,
        }
    }

    /// Decodes a SID from the start of `data`.
    ///
    /// Trailing bytes beyond the declared sub-authorities are ignored.
    pub fn decode(data: &[u8]) -> Result<Sid> {
        if data.len() < 8 {
            return Err(Error::record(format!("SID data too short: {} bytes", data.len())));
        }

        let revision = data[0];
        if revision != SID_REVISION {
            return Err(Error::record(format!("invalid SID revision: {}", revision)));
        }

        let count = data[1] as usize;
        if count > SID_MAX_SUB_AUTHORITIES {
            return Err(Error::record(format!("invalid number of sub-authorities: {}", count)));
        }

        let expected = 8 + 4 * count;
        if data.len() < expected {
            return Err(Error::record(format!(
                "SID data too short for {} sub-authorities: {} < {}",
                count,
                data.len(),
                expected
            )));
        }

        let mut authority = [0u8; 6];
        authority.copy_from_slice(&data[2..8]);

        let sub_authorities = data[8..expected]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Sid {
            revision,
            authority,
            sub_authorities,
        })
    }

    /// Consumes a `window`-byte SID record from a shared cursor.
    pub fn decode_from(reader: &mut ByteReader, window: usize) -> Result<Sid> {
        Sid::decode(reader.take(window)?)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        out
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.revision);
        out.push(self.sub_authorities.len() as u8);
        out.extend_from_slice(&self.authority);
        for sub in &self.sub_authorities {
            put_u32(out, *sub);
        }
    }

    /// Size of the binary record in bytes.
    pub fn encoded_len(&self) -> usize {
        8 + 4 * self.sub_authorities.len()
    }

    pub fn revision(&self) -> u8 {
        self.revision
    }

    /// The raw 6-byte, big-endian identifier authority.
    pub fn authority(&self) -> &[u8; 6] {
        &self.authority
    }

    pub fn authority_value(&self) -> u64 {
        self.authority
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }

    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }

    pub fn sub_authority_count(&self) -> u8 {
        self.sub_authorities.len() as u8
    }

    /// The relative identifier, i.e. the last sub-authority.
    pub fn rid(&self) -> Option<u32> {
        self.sub_authorities.last().copied()
    }

    pub fn is_everyone(&self) -> bool {
        *self == Sid::everyone()
    }

    /// Human-readable name for well-known SIDs, otherwise the canonical string.
    pub fn resolve(&self) -> String {
        let canonical = self.to_string();
        match well_known::sid_name(&canonical) {
            Some(name) => name.to_string(),
            None => canonical,
        }
    }
}

fn authority_bytes(value: u64) -> [u8; 6] {
    let be = value.to_be_bytes();
    let mut authority = [0u8; 6];
    authority.copy_from_slice(&be[2..8]);
    authority
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let authority = self.authority_value();
        if authority <= u64::from(u32::MAX) {
            write!(f, "S-{}-{}", self.revision, authority)?;
        } else {
            write!(f, "S-{}-0x{:012X}", self.revision, authority)?;
        }

        for sub in &self.sub_authorities {
            write!(f, "-{}", sub)?;
        }
        Ok(())
    }
}

impl FromStr for Sid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Sid> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() < 3 {
            return Err(Error::identifier(format!("invalid SID format: {:?}", s)));
        }
        if parts[0] != "S" {
            return Err(Error::identifier(format!("SID must start with S-: {:?}", s)));
        }

        let revision: u8 = parts[1]
            .parse()
            .map_err(|_| Error::identifier(format!("invalid SID revision: {:?}", parts[1])))?;

        let authority = parse_authority(parts[2])?;

        let sub_authorities = parts[3..]
            .iter()
            .enumerate()
            .map(|(i, p)| {
                p.parse::<u32>().map_err(|_| {
                    Error::identifier(format!("invalid sub-authority at index {}: {:?}", i, p))
                })
            })
            .collect::<Result<Vec<u32>>>()?;

        let mut sid = Sid::new(authority, &sub_authorities)?;
        sid.revision = revision;
        Ok(sid)
    }
}

fn parse_authority(text: &str) -> Result<u64> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };

    match parsed {
        Ok(value) if value <= MAX_AUTHORITY => Ok(value),
        _ => Err(Error::identifier(format!("invalid identifier authority: {:?}", text))),
    }
}

impl TryFrom<&[u8]> for Sid {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Sid> {
        Sid::decode(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn decodes_local_system() {
        let sid = Sid::decode(&[1, 1, 0, 0, 0, 0, 0, 5, 18, 0, 0, 0]).unwrap();
        assert_eq!(sid.to_string(), "S-1-5-18");
        assert_eq!(sid.rid(), Some(18));
        assert_eq!(sid.encoded_len(), 12);
    }

    #[test]
    fn rejects_too_many_sub_authorities() {
        let mut data = vec![1u8, 20, 0, 0, 0, 0, 0, 5];
        data.extend(std::iter::repeat(0).take(80));
        let err = Sid::decode(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);
    }

    #[test]
    fn rejects_bad_revision_and_short_windows() {
        assert!(Sid::decode(&[2, 0, 0, 0, 0, 0, 0, 5]).is_err());
        assert!(Sid::decode(&[1, 0, 0, 0]).is_err());
        assert!(Sid::decode(&[1, 2, 0, 0, 0, 0, 0, 5, 18, 0, 0, 0]).is_err());
    }

    #[test]
    fn parses_canonical_text() {
        let sid: Sid = "S-1-5-21-1004336348-1177238915-682003330-512".parse().unwrap();
        assert_eq!(sid.sub_authority_count(), 5);
        assert_eq!(sid.authority_value(), 5);
        assert_eq!(sid.to_string(), "S-1-5-21-1004336348-1177238915-682003330-512");

        let bare: Sid = "S-1-5".parse().unwrap();
        assert!(bare.sub_authorities().is_empty());
    }

    #[test]
    fn parse_failures_are_identifier_errors() {
        for text in ["", "S-1", "X-1-5-18", "S-one-5", "S-1-5-eighteen", "S-1-5-18-"] {
            let err = text.parse::<Sid>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidIdentifier, "{:?}", text);
        }
    }

    #[test]
    fn large_authorities_survive_round_trip() {
        let sid: Sid = "S-1-0x123456789ABC-7".parse().unwrap();
        assert_eq!(sid.authority_value(), 0x1234_5678_9ABC);
        assert_eq!(sid.to_string(), "S-1-0x123456789ABC-7");
        assert_eq!(sid.to_string().parse::<Sid>().unwrap(), sid);

        let wide: Sid = "S-1-4096-1".parse().unwrap();
        assert_eq!(wide.authority(), &[0, 0, 0, 0, 0x10, 0x00]);
    }

    #[test]
    fn encode_matches_decode() {
        let sid: Sid = "S-1-5-32-544".parse().unwrap();
        let bytes = sid.encode();
        assert_eq!(bytes, vec![1, 2, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0, 0x20, 2, 0, 0]);
        assert_eq!(Sid::decode(&bytes).unwrap(), sid);
    }

    #[test]
    fn resolves_names() {
        assert_eq!(Sid::everyone().resolve(), "Everyone");
        let admin: Sid = "S-1-5-21-1-2-3-500".parse().unwrap();
        assert_eq!(admin.resolve(), "Administrator");
        let unknown: Sid = "S-1-5-21-1-2-3-1105".parse().unwrap();
        assert_eq!(unknown.resolve(), "S-1-5-21-1-2-3-1105");
    }
}
