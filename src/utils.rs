//! Byte cursor and small formatting helpers shared by the codecs.

use crate::error::{Error, Result};

/// A forward-only little-endian cursor over a borrowed byte slice.
///
/// Every decode call owns its own reader; the position only ever advances.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> ByteReader<'a> {
        ByteReader { data, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consumes exactly `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::record(format!(
                "need {} bytes at offset {}, only {} available",
                len,
                self.pos,
                self.remaining()
            )));
        }

        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

pub(crate) fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Joins the names of every set bit in `value`, or returns `None` when no
/// listed bit is set.
pub(crate) fn join_flag_names<T>(value: T, defined: &[(T, &str)], sep: &str) -> Option<String>
where
    T: Copy + std::ops::BitAnd<Output = T> + PartialEq + Default,
{
    let mut names = String::new();
    for &(flag, desc) in defined {
        if (value & flag) != T::default() {
            if !names.is_empty() {
                names += sep;
            }
            names += desc;
        }
    }

    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}
