//! Access control entries: header, access mask and one of two body layouts.

use std::fmt;

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::guid::{Guid, GUID_LEN};
use crate::integrity::IntegrityPolicy;
use crate::rights::AccessMask;
use crate::sid::Sid;
use crate::utils::{join_flag_names, put_u16, put_u32, ByteReader};

/// Bytes taken by the header and the access mask.
pub const ACE_FIXED_LEN: usize = 8;
const ACE_OBJECT_FIXED_LEN: usize = ACE_FIXED_LEN + 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AceType {
    AccessAllowed = 0,
    AccessDenied = 1,
    SystemAudit = 2,
    SystemAlarm = 3,
    AccessAllowedObject = 5,
    AccessDeniedObject = 6,
    SystemAuditObject = 7,
    SystemAlarmObject = 8,
    AccessAllowedCallback = 9,
    AccessDeniedCallback = 10,
    AccessAllowedCallbackObject = 11,
    AccessDeniedCallbackObject = 12,
    SystemAuditCallback = 13,
    SystemAlarmCallback = 14,
    SystemAuditCallbackObject = 15,
    SystemAlarmCallbackObject = 16,
    SystemMandatoryLabel = 17,
}

impl AceType {
    /// Whether the body uses the object layout (flags and optional GUIDs).
    pub fn is_object(self) -> bool {
        matches!(
            self,
            AceType::AccessAllowedObject
                | AceType::AccessDeniedObject
                | AceType::SystemAuditObject
                | AceType::SystemAlarmObject
                | AceType::AccessAllowedCallbackObject
                | AceType::AccessDeniedCallbackObject
                | AceType::SystemAuditCallbackObject
                | AceType::SystemAlarmCallbackObject
        )
    }

    pub fn is_callback(self) -> bool {
        matches!(
            self,
            AceType::AccessAllowedCallback
                | AceType::AccessDeniedCallback
                | AceType::AccessAllowedCallbackObject
                | AceType::AccessDeniedCallbackObject
                | AceType::SystemAuditCallback
                | AceType::SystemAlarmCallback
                | AceType::SystemAuditCallbackObject
                | AceType::SystemAlarmCallbackObject
        )
    }

    pub fn is_allow(self) -> bool {
        matches!(
            self,
            AceType::AccessAllowed
                | AceType::AccessAllowedObject
                | AceType::AccessAllowedCallback
                | AceType::AccessAllowedCallbackObject
        )
    }

    pub fn is_deny(self) -> bool {
        matches!(
            self,
            AceType::AccessDenied
                | AceType::AccessDeniedObject
                | AceType::AccessDeniedCallback
                | AceType::AccessDeniedCallbackObject
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            AceType::AccessAllowed => "ACCESS_ALLOWED",
            AceType::AccessDenied => "ACCESS_DENIED",
            AceType::SystemAudit => "SYSTEM_AUDIT",
            AceType::SystemAlarm => "SYSTEM_ALARM",
            AceType::AccessAllowedObject => "ACCESS_ALLOWED_OBJECT",
            AceType::AccessDeniedObject => "ACCESS_DENIED_OBJECT",
            AceType::SystemAuditObject => "SYSTEM_AUDIT_OBJECT",
            AceType::SystemAlarmObject => "SYSTEM_ALARM_OBJECT",
            AceType::AccessAllowedCallback => "ACCESS_ALLOWED_CALLBACK",
            AceType::AccessDeniedCallback => "ACCESS_DENIED_CALLBACK",
            AceType::AccessAllowedCallbackObject => "ACCESS_ALLOWED_CALLBACK_OBJECT",
            AceType::AccessDeniedCallbackObject => "ACCESS_DENIED_CALLBACK_OBJECT",
            AceType::SystemAuditCallback => "SYSTEM_AUDIT_CALLBACK",
            AceType::SystemAlarmCallback => "SYSTEM_ALARM_CALLBACK",
            AceType::SystemAuditCallbackObject => "SYSTEM_AUDIT_CALLBACK_OBJECT",
            AceType::SystemAlarmCallbackObject => "SYSTEM_ALARM_CALLBACK_OBJECT",
            AceType::SystemMandatoryLabel => "SYSTEM_MANDATORY_LABEL",
        }
    }
}

impl TryFrom<u8> for AceType {
    type Error = Error;

    fn try_from(value: u8) -> Result<AceType> {
        let ace_type = match value {
            0 => AceType::AccessAllowed,
            1 => AceType::AccessDenied,
            2 => AceType::SystemAudit,
            3 => AceType::SystemAlarm,
            5 => AceType::AccessAllowedObject,
            6 => AceType::AccessDeniedObject,
            7 => AceType::SystemAuditObject,
            8 => AceType::SystemAlarmObject,
            9 => AceType::AccessAllowedCallback,
            10 => AceType::AccessDeniedCallback,
            11 => AceType::AccessAllowedCallbackObject,
            12 => AceType::AccessDeniedCallbackObject,
            13 => AceType::SystemAuditCallback,
            14 => AceType::SystemAlarmCallback,
            15 => AceType::SystemAuditCallbackObject,
            16 => AceType::SystemAlarmCallbackObject,
            17 => AceType::SystemMandatoryLabel,
            other => return Err(Error::record(format!("unknown ACE type: {}", other))),
        };
        Ok(ace_type)
    }
}

impl fmt::Display for AceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

bitflags! {
    /// Inheritance, propagation and audit bits of an ACE header.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AceFlags: u8 {
        const OBJECT_INHERIT = 0x01;
        const CONTAINER_INHERIT = 0x02;
        const NO_PROPAGATE_INHERIT = 0x04;
        const INHERIT_ONLY = 0x08;
        const INHERITED = 0x10;
        const SUCCESSFUL_ACCESS = 0x40;
        const FAILED_ACCESS = 0x80;
    }
}

const DEFINED_ACE_FLAGS: [(u8, &str); 7] = [
    (AceFlags::OBJECT_INHERIT.bits(), "OBJECT_INHERIT_ACE"),
    (AceFlags::CONTAINER_INHERIT.bits(), "CONTAINER_INHERIT_ACE"),
    (AceFlags::NO_PROPAGATE_INHERIT.bits(), "NO_PROPAGATE_INHERIT_ACE"),
    (AceFlags::INHERIT_ONLY.bits(), "INHERIT_ONLY_ACE"),
    (AceFlags::INHERITED.bits(), "INHERITED_ACE"),
    (AceFlags::SUCCESSFUL_ACCESS.bits(), "SUCCESSFUL_ACCESS_ACE_FLAG"),
    (AceFlags::FAILED_ACCESS.bits(), "FAILED_ACCESS_ACE_FLAG"),
];

impl AceFlags {
    /// Flags applied when an entry is meant to propagate to children.
    pub fn inheritable() -> AceFlags {
        AceFlags::OBJECT_INHERIT | AceFlags::CONTAINER_INHERIT
    }
}

impl fmt::Display for AceFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = join_flag_names(self.bits(), &DEFINED_ACE_FLAGS, "|").unwrap_or_default();
        write!(f, "{}", names)
    }
}

bitflags! {
    /// Presence bits of an object ACE body.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ObjectAceFlags: u32 {
        const OBJECT_TYPE_PRESENT = 0x1;
        const INHERITED_OBJECT_TYPE_PRESENT = 0x2;
    }
}

const DEFINED_OBJECT_ACE_FLAGS: [(u32, &str); 2] = [
    (ObjectAceFlags::OBJECT_TYPE_PRESENT.bits(), "ACE_OBJECT_TYPE_PRESENT"),
    (ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT.bits(), "ACE_INHERITED_OBJECT_TYPE_PRESENT"),
];

impl fmt::Display for ObjectAceFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = join_flag_names(self.bits(), &DEFINED_OBJECT_ACE_FLAGS, "|").unwrap_or_default();
        write!(f, "{}", names)
    }
}

/// Anything that names the principal an entry concerns.
pub trait Principal {
    fn principal(&self) -> &Sid;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AceHeader {
    pub ace_type: AceType,
    pub flags: AceFlags,
    /// Declared size of the whole record, header included.
    pub size: u16,
}

impl AceHeader {
    pub fn decode_from(reader: &mut ByteReader) -> Result<AceHeader> {
        let raw_type = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let size = reader.read_u16()?;

        Ok(AceHeader {
            ace_type: AceType::try_from(raw_type)?,
            flags: AceFlags::from_bits_retain(flags),
            size,
        })
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.ace_type as u8);
        out.push(self.flags.bits());
        put_u16(out, self.size);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicAce {
    pub sid: Sid,
}

impl BasicAce {
    fn decode_from(reader: &mut ByteReader, total_size: u16) -> Result<BasicAce> {
        let sid_size = i32::from(total_size) - ACE_FIXED_LEN as i32;
        if sid_size <= 0 {
            return Err(Error::record(format!("invalid ACE size for SID: {}", sid_size)));
        }

        Ok(BasicAce {
            sid: Sid::decode_from(reader, sid_size as usize)?,
        })
    }

    fn encoded_len(&self) -> usize {
        self.sid.encoded_len()
    }
}

impl Principal for BasicAce {
    fn principal(&self) -> &Sid {
        &self.sid
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvancedAce {
    pub flags: ObjectAceFlags,
    pub object_type: Option<Guid>,
    pub inherited_object_type: Option<Guid>,
    pub sid: Sid,
}

impl AdvancedAce {
    /// Builds a body whose presence flags follow the supplied GUIDs.
    pub fn new(object_type: Option<Guid>, inherited_object_type: Option<Guid>, sid: Sid) -> AdvancedAce {
        let mut flags = ObjectAceFlags::empty();
        flags.set(ObjectAceFlags::OBJECT_TYPE_PRESENT, object_type.is_some());
        flags.set(
            ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT,
            inherited_object_type.is_some(),
        );

        AdvancedAce {
            flags,
            object_type,
            inherited_object_type,
            sid,
        }
    }

    fn decode_from(reader: &mut ByteReader, total_size: u16) -> Result<AdvancedAce> {
        let flags = ObjectAceFlags::from_bits_retain(reader.read_u32()?);
        let mut consumed = ACE_OBJECT_FIXED_LEN as i32;

        let mut object_type = None;
        if flags.contains(ObjectAceFlags::OBJECT_TYPE_PRESENT) {
            object_type = Some(Guid::decode_from(reader)?);
            consumed += GUID_LEN as i32;
        }

        let mut inherited_object_type = None;
        if flags.contains(ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT) {
            inherited_object_type = Some(Guid::decode_from(reader)?);
            consumed += GUID_LEN as i32;
        }

        let sid_size = i32::from(total_size) - consumed;
        if sid_size <= 0 {
            return Err(Error::record(format!(
                "invalid advanced ACE size for SID: {}",
                sid_size
            )));
        }

        Ok(AdvancedAce {
            flags,
            object_type,
            inherited_object_type,
            sid: Sid::decode_from(reader, sid_size as usize)?,
        })
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        put_u32(out, self.flags.bits());
        if self.flags.contains(ObjectAceFlags::OBJECT_TYPE_PRESENT) {
            self.object_type.unwrap_or(Guid::NIL).write_to(out);
        }
        if self.flags.contains(ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT) {
            self.inherited_object_type.unwrap_or(Guid::NIL).write_to(out);
        }
        self.sid.write_to(out);
    }

    fn encoded_len(&self) -> usize {
        let guids = [
            ObjectAceFlags::OBJECT_TYPE_PRESENT,
            ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT,
        ]
        .iter()
        .filter(|flag| self.flags.contains(**flag))
        .count();

        4 + guids * GUID_LEN + self.sid.encoded_len()
    }
}

impl Principal for AdvancedAce {
    fn principal(&self) -> &Sid {
        &self.sid
    }
}

/// The body variant is fixed by the header type when the entry is decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AceBody {
    Basic(BasicAce),
    Advanced(AdvancedAce),
}

impl Principal for AceBody {
    fn principal(&self) -> &Sid {
        match self {
            AceBody::Basic(body) => body.principal(),
            AceBody::Advanced(body) => body.principal(),
        }
    }
}

impl AceBody {
    fn encoded_len(&self) -> usize {
        match self {
            AceBody::Basic(body) => body.encoded_len(),
            AceBody::Advanced(body) => body.encoded_len(),
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            AceBody::Basic(body) => body.sid.write_to(out),
            AceBody::Advanced(body) => body.write_to(out),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ace {
    pub header: AceHeader,
    pub mask: AccessMask,
    pub body: AceBody,
}

impl Ace {
    /// Builds an entry with a correctly sized header.
    ///
    /// Object types get an object body with neither GUID present.
    pub fn new(ace_type: AceType, flags: AceFlags, mask: u32, sid: Sid) -> Ace {
        let body = if ace_type.is_object() {
            AceBody::Advanced(AdvancedAce::new(None, None, sid))
        } else {
            AceBody::Basic(BasicAce { sid })
        };
        Ace::with_body(ace_type, flags, mask, body)
    }

    /// Builds an object entry restricted to `object_type` and/or applying to
    /// children of class `inherited_object_type`.
    pub fn object(
        ace_type: AceType,
        flags: AceFlags,
        mask: u32,
        object_type: Option<Guid>,
        inherited_object_type: Option<Guid>,
        sid: Sid,
    ) -> Ace {
        let body = AceBody::Advanced(AdvancedAce::new(object_type, inherited_object_type, sid));
        Ace::with_body(ace_type, flags, mask, body)
    }

    fn with_body(ace_type: AceType, flags: AceFlags, mask: u32, body: AceBody) -> Ace {
        let size = (ACE_FIXED_LEN + body.encoded_len()) as u16;
        Ace {
            header: AceHeader {
                ace_type,
                flags,
                size,
            },
            mask: AccessMask(mask),
            body,
        }
    }

    pub fn allowed(sid: Sid, flags: AceFlags, mask: u32) -> Ace {
        Ace::new(AceType::AccessAllowed, flags, mask, sid)
    }

    pub fn denied(sid: Sid, flags: AceFlags, mask: u32) -> Ace {
        Ace::new(AceType::AccessDenied, flags, mask, sid)
    }

    pub fn allowed_object(sid: Sid, flags: AceFlags, mask: u32, object_type: Guid) -> Ace {
        Ace::object(AceType::AccessAllowedObject, flags, mask, Some(object_type), None, sid)
    }

    pub fn denied_object(sid: Sid, flags: AceFlags, mask: u32, object_type: Guid) -> Ace {
        Ace::object(AceType::AccessDeniedObject, flags, mask, Some(object_type), None, sid)
    }

    /// A `SYSTEM_AUDIT` entry; the success/failure choice is carried in `flags`.
    pub fn audit(sid: Sid, flags: AceFlags, mask: u32) -> Ace {
        Ace::new(AceType::SystemAudit, flags, mask, sid)
    }

    /// A mandatory label whose mask holds the integrity policy bits.
    pub fn mandatory_label(label: Sid, flags: AceFlags, policy: IntegrityPolicy) -> Ace {
        Ace::new(AceType::SystemMandatoryLabel, flags, policy.bits(), label)
    }

    pub fn decode(data: &[u8]) -> Result<Ace> {
        Ace::decode_from(&mut ByteReader::new(data))
    }

    /// Decodes one entry, consuming exactly its declared size from `reader`.
    ///
    /// The principal SID is read from whatever the declared size leaves after
    /// the fixed fields, so trailing padding is absorbed by its window.
    pub fn decode_from(reader: &mut ByteReader) -> Result<Ace> {
        let header = AceHeader::decode_from(reader)?;
        let mask = AccessMask(reader.read_u32()?);

        let body = if header.ace_type.is_object() {
            AceBody::Advanced(AdvancedAce::decode_from(reader, header.size)?)
        } else {
            AceBody::Basic(BasicAce::decode_from(reader, header.size)?)
        };

        Ok(Ace { header, mask, body })
    }

    /// Encodes the entry, zero-padded to the declared header size.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.size as usize);
        self.write_to(&mut out);
        out
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        let start = out.len();
        self.header.write_to(out);
        put_u32(out, self.mask.raw());
        self.body.write_to(out);

        let end = start + self.header.size as usize;
        if out.len() < end {
            out.resize(end, 0);
        }
    }

    pub fn ace_type(&self) -> AceType {
        self.header.ace_type
    }

    pub fn flags(&self) -> AceFlags {
        self.header.flags
    }

    pub fn size(&self) -> u16 {
        self.header.size
    }

    pub fn is_allow(&self) -> bool {
        self.header.ace_type.is_allow()
    }

    pub fn is_deny(&self) -> bool {
        self.header.ace_type.is_deny()
    }

    /// Entries that only propagate to children and never apply to their own object.
    pub fn is_inherit_only(&self) -> bool {
        self.header.flags.contains(AceFlags::INHERIT_ONLY)
    }

    pub fn object_type(&self) -> Option<&Guid> {
        match &self.body {
            AceBody::Advanced(body) => body.object_type.as_ref(),
            AceBody::Basic(_) => None,
        }
    }

    pub fn inherited_object_type(&self) -> Option<&Guid> {
        match &self.body {
            AceBody::Advanced(body) => body.inherited_object_type.as_ref(),
            AceBody::Basic(_) => None,
        }
    }
}

impl Principal for Ace {
    fn principal(&self) -> &Sid {
        self.body.principal()
    }
}

impl fmt::Display for Ace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let masks = if self.header.ace_type == AceType::SystemMandatoryLabel {
            IntegrityPolicy::from_bits_retain(self.mask.raw()).to_string()
        } else {
            self.mask.to_string()
        };

        write!(
            f,
            "Type={}\n  Flags={}\n  RawMask={:X}\n  Mask={}\n",
            self.header.ace_type, self.header.flags, self.mask.raw(), masks
        )?;
        if let AceBody::Advanced(body) = &self.body {
            writeln!(f, "  ObjectFlags={}", body.flags)?;
        }
        if let Some(guid) = self.object_type() {
            writeln!(f, "  ObjectType={}", guid.resolve())?;
        }
        if let Some(guid) = self.inherited_object_type() {
            writeln!(f, "  InheritedObjectType={}", guid.resolve())?;
        }
        writeln!(f, "  Sid={}", self.principal())
    }
}
