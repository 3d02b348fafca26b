//! Self-relative security descriptors.

use std::fmt;

use bitflags::bitflags;
use tracing::{trace, warn};

use crate::ace::{AceType, Principal};
use crate::acl::Acl;
use crate::error::{Error, Result, ResultExt};
use crate::integrity::{IntegrityLevel, IntegrityPolicy};
use crate::sid::Sid;
use crate::utils::{put_u16, put_u32, ByteReader};

pub const SECURITY_DESCRIPTOR_REVISION: u8 = 1;
pub const SECURITY_DESCRIPTOR_HEADER_LEN: usize = 20;

bitflags! {
    /// `SECURITY_DESCRIPTOR_CONTROL` bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ControlFlags: u16 {
        const OWNER_DEFAULTED = 0x0001;
        const GROUP_DEFAULTED = 0x0002;
        const DACL_PRESENT = 0x0004;
        const DACL_DEFAULTED = 0x0008;
        const SACL_PRESENT = 0x0010;
        const SACL_DEFAULTED = 0x0020;
        const DACL_AUTO_INHERIT_REQ = 0x0100;
        const SACL_AUTO_INHERIT_REQ = 0x0200;
        const DACL_AUTO_INHERITED = 0x0400;
        const SACL_AUTO_INHERITED = 0x0800;
        const DACL_PROTECTED = 0x1000;
        const SACL_PROTECTED = 0x2000;
        const RM_CONTROL_VALID = 0x4000;
        const SELF_RELATIVE = 0x8000;
    }
}

impl ControlFlags {
    /// Bits that describe the layout rather than the object's inheritance state.
    pub fn layout() -> ControlFlags {
        ControlFlags::SELF_RELATIVE | ControlFlags::DACL_PRESENT | ControlFlags::SACL_PRESENT
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecurityDescriptorHeader {
    pub revision: u8,
    pub sbz1: u8,
    pub control: ControlFlags,
    pub offset_owner: u32,
    pub offset_group: u32,
    pub offset_sacl: u32,
    pub offset_dacl: u32,
}

impl SecurityDescriptorHeader {
    pub fn decode_from(reader: &mut ByteReader) -> Result<SecurityDescriptorHeader> {
        Ok(SecurityDescriptorHeader {
            revision: reader.read_u8()?,
            sbz1: reader.read_u8()?,
            control: ControlFlags::from_bits_retain(reader.read_u16()?),
            offset_owner: reader.read_u32()?,
            offset_group: reader.read_u32()?,
            offset_sacl: reader.read_u32()?,
            offset_dacl: reader.read_u32()?,
        })
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.revision);
        out.push(self.sbz1);
        put_u16(out, self.control.bits());
        put_u32(out, self.offset_owner);
        put_u32(out, self.offset_group);
        put_u32(out, self.offset_sacl);
        put_u32(out, self.offset_dacl);
    }
}

/// Owner, group, DACL and optional SACL of one object.
///
/// Decoded descriptors are never mutated by this crate; the access checker
/// only borrows them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityDescriptor {
    pub header: SecurityDescriptorHeader,
    pub dacl: Acl,
    pub sacl: Option<Acl>,
    pub owner: Option<Sid>,
    pub group: Option<Sid>,
}

impl SecurityDescriptor {
    pub fn new(owner: Option<Sid>, group: Option<Sid>, dacl: Acl) -> SecurityDescriptor {
        let mut sd = SecurityDescriptor {
            header: SecurityDescriptorHeader {
                revision: SECURITY_DESCRIPTOR_REVISION,
                ..SecurityDescriptorHeader::default()
            },
            dacl,
            sacl: None,
            owner,
            group,
        };
        sd.header = sd.layout();
        sd
    }

    pub fn with_sacl(mut self, sacl: Acl) -> SecurityDescriptor {
        self.sacl = Some(sacl);
        self.header = self.layout();
        self
    }

    /// Adds inheritance or protection bits; layout bits are managed on encode.
    pub fn with_control(mut self, control: ControlFlags) -> SecurityDescriptor {
        self.header.control |= control.difference(ControlFlags::layout());
        self.header = self.layout();
        self
    }

    pub fn control(&self) -> ControlFlags {
        self.header.control
    }

    /// Decodes a self-relative descriptor.
    ///
    /// The DACL is read directly after the header. The SACL and both SIDs are
    /// read from their own offsets. When the owner and group offsets coincide
    /// the descriptor has no separate SID records and both are taken from the
    /// first DACL entry.
    pub fn decode(data: &[u8]) -> Result<SecurityDescriptor> {
        let mut reader = ByteReader::new(data);

        let header =
            SecurityDescriptorHeader::decode_from(&mut reader).context("parsing security descriptor header")?;
        trace!(
            control = header.control.bits(),
            owner = header.offset_owner,
            group = header.offset_group,
            sacl = header.offset_sacl,
            dacl = header.offset_dacl,
            "decoded security descriptor header"
        );

        let dacl = Acl::decode_from(&mut reader).context("parsing DACL")?;

        let sacl = match header.offset_sacl {
            0 => None,
            offset => Some(
                window(data, offset)
                    .and_then(Acl::decode)
                    .context("parsing SACL")?,
            ),
        };

        let (owner, group) = if header.offset_group.wrapping_sub(header.offset_owner) == 0 {
            let principal = dacl.aces.first().map(|ace| ace.principal().clone());
            warn!(
                offset = header.offset_owner,
                found = principal.is_some(),
                "owner and group offsets coincide, using the first DACL entry's principal"
            );
            (principal.clone(), principal)
        } else {
            (
                decode_sid_at(data, header.offset_owner).context("parsing owner SID")?,
                decode_sid_at(data, header.offset_group).context("parsing group SID")?,
            )
        };

        Ok(SecurityDescriptor {
            header,
            dacl,
            sacl,
            owner,
            group,
        })
    }

    /// Encodes as header | DACL | SACL | owner | group.
    pub fn encode(&self) -> Vec<u8> {
        let header = self.layout();

        let mut out = Vec::with_capacity(self.encoded_len());
        header.write_to(&mut out);
        self.dacl.write_to(&mut out);
        if let Some(sacl) = &self.sacl {
            sacl.write_to(&mut out);
        }
        if let Some(owner) = &self.owner {
            owner.write_to(&mut out);
        }
        if let Some(group) = &self.group {
            group.write_to(&mut out);
        }
        out
    }

    pub fn encoded_len(&self) -> usize {
        SECURITY_DESCRIPTOR_HEADER_LEN
            + self.dacl.encoded_len()
            + self.sacl.as_ref().map_or(0, Acl::encoded_len)
            + self.owner.as_ref().map_or(0, Sid::encoded_len)
            + self.group.as_ref().map_or(0, Sid::encoded_len)
    }

    /// The header `encode` would write for the current contents.
    fn layout(&self) -> SecurityDescriptorHeader {
        let mut control = self.header.control.difference(ControlFlags::layout());
        control |= ControlFlags::SELF_RELATIVE | ControlFlags::DACL_PRESENT;

        let offset_dacl = SECURITY_DESCRIPTOR_HEADER_LEN;
        let mut next = offset_dacl + self.dacl.encoded_len();

        let mut offset_sacl = 0;
        if let Some(sacl) = &self.sacl {
            control |= ControlFlags::SACL_PRESENT;
            offset_sacl = next;
            next += sacl.encoded_len();
        }

        let mut offset_owner = 0;
        if let Some(owner) = &self.owner {
            offset_owner = next;
            next += owner.encoded_len();
        }

        let offset_group = if self.group.is_some() { next } else { 0 };

        SecurityDescriptorHeader {
            revision: SECURITY_DESCRIPTOR_REVISION,
            sbz1: 0,
            control,
            offset_owner: offset_owner as u32,
            offset_group: offset_group as u32,
            offset_sacl: offset_sacl as u32,
            offset_dacl: offset_dacl as u32,
        }
    }

    /// Level and policy from the first mandatory label in the SACL.
    pub fn mandatory_label(&self) -> Option<(IntegrityLevel, IntegrityPolicy)> {
        let label = self
            .sacl
            .as_ref()?
            .aces
            .iter()
            .find(|ace| ace.ace_type() == AceType::SystemMandatoryLabel)?;

        let level = IntegrityLevel::from_sid(label.principal()).ok()?;
        Some((level, IntegrityPolicy::from_bits_truncate(label.mask.raw())))
    }
}

fn window(data: &[u8], offset: u32) -> Result<&[u8]> {
    data.get(offset as usize..).ok_or_else(|| {
        Error::record(format!(
            "offset {} is beyond the end of the {}-byte descriptor",
            offset,
            data.len()
        ))
    })
}

fn decode_sid_at(data: &[u8], offset: u32) -> Result<Option<Sid>> {
    if offset == 0 {
        return Ok(None);
    }
    window(data, offset).and_then(Sid::decode).map(Some)
}

impl fmt::Display for SecurityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Parsed Security Descriptor:")?;
        writeln!(f, " Offsets:")?;
        writeln!(
            f,
            " Owner={} Group={} Sacl={} Dacl={}",
            self.header.offset_owner, self.header.offset_group, self.header.offset_sacl, self.header.offset_dacl
        )?;

        let name = |sid: &Option<Sid>| sid.as_ref().map_or_else(|| "None".to_string(), Sid::resolve);
        writeln!(f, " Owner: {}", name(&self.owner))?;
        writeln!(f, " Group: {}", name(&self.group))?;
        write!(f, " DACL: {}", self.dacl)?;
        if let Some(sacl) = &self.sacl {
            write!(f, " SACL: {}", sacl)?;
        }
        Ok(())
    }
}
