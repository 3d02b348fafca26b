//! Access control lists: the header plus an ordered run of entries.

use std::fmt;

use tracing::trace;

use crate::ace::{Ace, AceFlags, AceType, Principal};
use crate::error::{Error, Result, ResultExt};
use crate::integrity::IntegrityPolicy;
use crate::sid::Sid;
use crate::utils::{put_u16, ByteReader};

pub const ACL_REVISION: u8 = 2;
pub const ACL_REVISION_DS: u8 = 4;
pub const ACL_HEADER_LEN: usize = 8;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AclHeader {
    pub revision: u8,
    pub sbz1: u8,
    /// Size of the whole list, header included.
    pub size: u16,
    pub ace_count: u16,
    pub sbz2: u16,
}

impl AclHeader {
    pub fn decode_from(reader: &mut ByteReader) -> Result<AclHeader> {
        Ok(AclHeader {
            revision: reader.read_u8()?,
            sbz1: reader.read_u8()?,
            size: reader.read_u16()?,
            ace_count: reader.read_u16()?,
            sbz2: reader.read_u16()?,
        })
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.revision);
        out.push(self.sbz1);
        put_u16(out, self.size);
        put_u16(out, self.ace_count);
        put_u16(out, self.sbz2);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Acl {
    pub header: AclHeader,
    pub aces: Vec<Ace>,
}

impl Acl {
    /// Builds a list whose header size and count match `aces`.
    ///
    /// The revision is `ACL_REVISION_DS` when any entry uses the object layout.
    pub fn new(aces: Vec<Ace>) -> Acl {
        let mut acl = Acl {
            header: AclHeader::default(),
            aces,
        };
        acl.update_header();
        acl
    }

    pub fn decode(data: &[u8]) -> Result<Acl> {
        Acl::decode_from(&mut ByteReader::new(data))
    }

    /// Decodes the header then exactly `ace_count` entries.
    ///
    /// Exactly `header.size` bytes are consumed. Entries must fit inside that
    /// window; any free space after the last one is skipped. The first
    /// malformed entry aborts the whole list.
    pub fn decode_from(reader: &mut ByteReader) -> Result<Acl> {
        let header = AclHeader::decode_from(reader).context("reading ACL header")?;
        if (header.size as usize) < ACL_HEADER_LEN {
            return Err(Error::record(format!("invalid ACL size: {}", header.size)));
        }

        let body = reader
            .take(header.size as usize - ACL_HEADER_LEN)
            .context("reading ACL body")?;
        let mut entries = ByteReader::new(body);

        let mut aces = Vec::with_capacity(header.ace_count as usize);
        for i in 0..header.ace_count {
            let ace = Ace::decode_from(&mut entries).with_context(|| format!("reading ACE {}", i))?;
            trace!(index = i, ace_type = %ace.ace_type(), sid = %ace.principal(), "decoded ACE");
            aces.push(ace);
        }
        if !entries.is_empty() {
            trace!(slack = entries.remaining(), "skipped free space at end of ACL");
        }

        Ok(Acl { header, aces })
    }

    /// Encodes the header as stored, followed by every entry.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        out
    }

    /// Free space declared by the header is written back as zeros.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let start = out.len();
        self.header.write_to(out);
        for ace in &self.aces {
            ace.write_to(out);
        }
        out.resize(start + self.encoded_len(), 0);
    }

    /// Size in bytes of the encoded list, including any declared free space.
    pub fn encoded_len(&self) -> usize {
        (self.header.size as usize).max(self.content_len())
    }

    fn content_len(&self) -> usize {
        ACL_HEADER_LEN + self.aces.iter().map(|a| a.size() as usize).sum::<usize>()
    }

    pub fn len(&self) -> usize {
        self.aces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aces.is_empty()
    }

    pub fn all(&self) -> &[Ace] {
        &self.aces
    }

    /// Entries for `sid`, optionally restricted to one type.
    pub fn get(&self, sid: &Sid, entry_type: Option<AceType>) -> Vec<&Ace> {
        self.aces
            .iter()
            .filter(|ace| ace.principal() == sid)
            .filter(|ace| entry_type.map_or(true, |t| ace.ace_type() == t))
            .collect()
    }

    pub fn add_entry(&mut self, ace: Ace) {
        trace!(ace_type = %ace.ace_type(), sid = %ace.principal(), "adding ACE");
        self.aces.push(ace);
        self.update_header();
    }

    /// Removes matching entries and returns how many were dropped.
    ///
    /// With `flags` set only entries carrying exactly those header flags match.
    pub fn remove_entry(&mut self, sid: &Sid, entry_type: Option<AceType>, flags: Option<AceFlags>) -> usize {
        let before = self.aces.len();
        self.aces.retain(|ace| {
            let matches = ace.principal() == sid
                && entry_type.map_or(true, |t| ace.ace_type() == t)
                && flags.map_or(true, |f| ace.flags() == f);
            !matches
        });

        let removed = before - self.aces.len();
        if removed > 0 {
            trace!(sid = %sid, removed, "removed ACEs");
            self.update_header();
        }
        removed
    }

    pub fn allow(&mut self, sid: Sid, inheritable: bool, mask: u32) {
        self.add_entry(Ace::allowed(sid, inherit_flags(inheritable), mask))
    }

    pub fn deny(&mut self, sid: Sid, inheritable: bool, mask: u32) {
        self.add_entry(Ace::denied(sid, inherit_flags(inheritable), mask))
    }

    pub fn audit(&mut self, sid: Sid, inheritable: bool, mask: u32, audit_success: bool, audit_fails: bool) {
        let mut flags = inherit_flags(inheritable);
        flags.set(AceFlags::SUCCESSFUL_ACCESS, audit_success);
        flags.set(AceFlags::FAILED_ACCESS, audit_fails);
        self.add_entry(Ace::audit(sid, flags, mask))
    }

    pub fn integrity_level(&mut self, label_sid: Sid, inheritable: bool, policy: IntegrityPolicy) {
        self.add_entry(Ace::mandatory_label(label_sid, inherit_flags(inheritable), policy))
    }

    /// `inheritable` of `None` removes regardless of inheritance flags.
    pub fn remove(&mut self, sid: &Sid, entry_type: AceType, inheritable: Option<bool>) -> usize {
        let flags = inheritable.map(inherit_flags);
        self.remove_entry(sid, Some(entry_type), flags)
    }

    fn update_header(&mut self) {
        if self.header.revision == 0 {
            self.header.revision = ACL_REVISION;
        }
        if self.aces.iter().any(|ace| ace.ace_type().is_object()) {
            self.header.revision = ACL_REVISION_DS;
        }
        self.header.size = self.content_len() as u16;
        self.header.ace_count = self.aces.len() as u16;
    }
}

fn inherit_flags(inheritable: bool) -> AceFlags {
    if inheritable {
        AceFlags::inheritable()
    } else {
        AceFlags::empty()
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Revision={} Size={} AceCount={}",
            self.header.revision, self.header.size, self.header.ace_count
        )?;
        for ace in &self.aces {
            write!(f, "{}", ace)?;
        }
        Ok(())
    }
}
