//! SDDL text rendering for descriptors, plus a small string builder.
//!
//! Only output is supported; SDDL text is never parsed back.

use std::fmt;

use tracing::warn;

use crate::ace::{Ace, AceFlags, AceType, Principal};
use crate::acl::Acl;
use crate::guid::Guid;
use crate::rights::{
    DELETE, GENERIC_ALL, GENERIC_EXECUTE, GENERIC_READ, GENERIC_WRITE, MAXIMUM_ALLOWED, READ_CONTROL, SYNCHRONIZE,
    WRITE_DAC, WRITE_OWNER,
};
use crate::security_descriptor::{ControlFlags, SecurityDescriptor};

const RIGHT_CODES: [(u32, &str); 10] = [
    (GENERIC_ALL, "GA"),
    (GENERIC_EXECUTE, "GX"),
    (GENERIC_WRITE, "GW"),
    (GENERIC_READ, "GR"),
    (MAXIMUM_ALLOWED, "MA"),
    (READ_CONTROL, "RC"),
    (WRITE_DAC, "WD"),
    (WRITE_OWNER, "WO"),
    (DELETE, "SD"),
    (SYNCHRONIZE, "SY"),
];

const ACE_FLAG_CODES: [(AceFlags, &str); 7] = [
    (AceFlags::OBJECT_INHERIT, "OI"),
    (AceFlags::CONTAINER_INHERIT, "CI"),
    (AceFlags::NO_PROPAGATE_INHERIT, "NP"),
    (AceFlags::INHERIT_ONLY, "IO"),
    (AceFlags::INHERITED, "ID"),
    (AceFlags::SUCCESSFUL_ACCESS, "SA"),
    (AceFlags::FAILED_ACCESS, "FA"),
];

const DACL_CONTROL_CODES: [(ControlFlags, &str); 3] = [
    (ControlFlags::DACL_PROTECTED, "P"),
    (ControlFlags::DACL_AUTO_INHERIT_REQ, "AR"),
    (ControlFlags::DACL_AUTO_INHERITED, "AI"),
];

const SACL_CONTROL_CODES: [(ControlFlags, &str); 3] = [
    (ControlFlags::SACL_PROTECTED, "P"),
    (ControlFlags::SACL_AUTO_INHERIT_REQ, "AR"),
    (ControlFlags::SACL_AUTO_INHERITED, "AI"),
];

/// Codes accepted by [`SddlBuilder::flag`].
const BUILDER_FLAG_CODES: [(&str, ControlFlags); 6] = [
    ("P", ControlFlags::DACL_PROTECTED),
    ("AR", ControlFlags::DACL_AUTO_INHERIT_REQ),
    ("AI", ControlFlags::DACL_AUTO_INHERITED),
    ("SP", ControlFlags::SACL_PROTECTED),
    ("SR", ControlFlags::SACL_AUTO_INHERIT_REQ),
    ("SA", ControlFlags::SACL_AUTO_INHERITED),
];

fn type_code(ace_type: AceType) -> String {
    let code = match ace_type {
        AceType::AccessAllowed => "A",
        AceType::AccessDenied => "D",
        AceType::SystemAudit => "AU",
        AceType::SystemAlarm => "AL",
        AceType::AccessAllowedObject => "OA",
        AceType::AccessDeniedObject => "OD",
        AceType::SystemAuditObject => "OU",
        AceType::SystemAlarmObject => "OL",
        AceType::AccessAllowedCallback => "XA",
        AceType::AccessDeniedCallback => "XD",
        AceType::AccessAllowedCallbackObject => "ZA",
        AceType::SystemAuditCallback => "XU",
        AceType::SystemMandatoryLabel => "ML",
        other => return format!("0x{:02X}", other as u8),
    };
    code.to_string()
}

/// Concatenated flag codes in `OI CI NP IO ID SA FA` order.
pub fn ace_flag_codes(flags: AceFlags) -> String {
    ACE_FLAG_CODES
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, code)| *code)
        .collect()
}

/// Right codes when they account for every bit of `mask`, otherwise `0xXXXXXXXX`.
pub fn rights_codes(mask: u32) -> String {
    let mut covered = 0u32;
    let mut codes = String::new();
    for &(right, code) in &RIGHT_CODES {
        if mask & right != 0 {
            covered |= right;
            codes += code;
        }
    }

    if mask != 0 && covered == mask {
        codes
    } else {
        format!("0x{:08X}", mask)
    }
}

fn control_codes(control: ControlFlags, table: &[(ControlFlags, &str)]) -> String {
    table
        .iter()
        .filter(|(flag, _)| control.contains(*flag))
        .map(|(_, code)| *code)
        .collect()
}

/// `(<type>;<flags>;<rights>;<object guid>;<inherited guid>;<sid>)`.
pub fn ace_string(ace: &Ace) -> String {
    let guid = |g: Option<&Guid>| g.map(|g| g.to_string()).unwrap_or_default();
    format!(
        "({};{};{};{};{};{})",
        type_code(ace.ace_type()),
        ace_flag_codes(ace.flags()),
        rights_codes(ace.mask.raw()),
        guid(ace.object_type()),
        guid(ace.inherited_object_type()),
        ace.principal()
    )
}

fn acl_string(acl: &Acl) -> String {
    acl.aces.iter().map(ace_string).collect()
}

impl SecurityDescriptor {
    /// Renders the descriptor as `O:..G:..D:..S:..`.
    pub fn to_sddl(&self) -> String {
        let mut out = String::new();
        if let Some(owner) = &self.owner {
            out += &format!("O:{}", owner);
        }
        if let Some(group) = &self.group {
            out += &format!("G:{}", group);
        }

        let control = self.control();
        out += "D:";
        out += &control_codes(control, &DACL_CONTROL_CODES);
        out += &acl_string(&self.dacl);

        if let Some(sacl) = &self.sacl {
            out += "S:";
            out += &control_codes(control, &SACL_CONTROL_CODES);
            out += &acl_string(sacl);
        }
        out
    }
}

/// Assembles an SDDL string piece by piece.
///
/// Principals are taken as anything printable, so both [`Sid`](crate::Sid)
/// values and SID strings work.
#[derive(Clone, Debug, Default)]
pub struct SddlBuilder {
    owner: Option<String>,
    group: Option<String>,
    flags: ControlFlags,
    dacl: Option<Vec<String>>,
    sacl: Option<Vec<String>>,
}

impl SddlBuilder {
    pub fn new() -> SddlBuilder {
        SddlBuilder::default()
    }

    pub fn owner<S: fmt::Display>(mut self, sid: S) -> SddlBuilder {
        self.owner = Some(sid.to_string());
        self
    }

    pub fn group<S: fmt::Display>(mut self, sid: S) -> SddlBuilder {
        self.group = Some(sid.to_string());
        self
    }

    /// Replaces the control flags.
    pub fn flags(mut self, flags: ControlFlags) -> SddlBuilder {
        self.flags = flags;
        self
    }

    /// Adds one control flag by SDDL code; unknown codes are ignored.
    pub fn flag(mut self, code: &str) -> SddlBuilder {
        match BUILDER_FLAG_CODES.iter().find(|(c, _)| *c == code) {
            Some((_, flag)) => self.flags |= *flag,
            None => warn!(code, "ignoring unknown SDDL control flag"),
        }
        self
    }

    /// Emits a `D:` section even when no entry is added.
    pub fn dacl(mut self) -> SddlBuilder {
        self.dacl.get_or_insert_with(Vec::new);
        self
    }

    /// Emits an `S:` section even when no entry is added.
    pub fn sacl(mut self) -> SddlBuilder {
        self.sacl.get_or_insert_with(Vec::new);
        self
    }

    pub fn allow<S: fmt::Display>(self, sid: S, mask: u32, flags: AceFlags) -> SddlBuilder {
        self.push_dacl("A", sid, mask, flags)
    }

    pub fn deny<S: fmt::Display>(self, sid: S, mask: u32, flags: AceFlags) -> SddlBuilder {
        self.push_dacl("D", sid, mask, flags)
    }

    /// Adds an `AU` entry auditing successes, failures, or both.
    pub fn audit<S: fmt::Display>(
        mut self,
        sid: S,
        mask: u32,
        flags: AceFlags,
        success: bool,
        failure: bool,
    ) -> SddlBuilder {
        let mut flags = flags;
        flags.set(AceFlags::SUCCESSFUL_ACCESS, success);
        flags.set(AceFlags::FAILED_ACCESS, failure);

        let entry = format!("(AU;{};{};;;{})", ace_flag_codes(flags), rights_codes(mask), sid);
        self.sacl.get_or_insert_with(Vec::new).push(entry);
        self
    }

    fn push_dacl<S: fmt::Display>(mut self, code: &str, sid: S, mask: u32, flags: AceFlags) -> SddlBuilder {
        let entry = format!("({};{};{};;;{})", code, ace_flag_codes(flags), rights_codes(mask), sid);
        self.dacl.get_or_insert_with(Vec::new).push(entry);
        self
    }

    pub fn build(&self) -> String {
        let mut out = String::new();
        if let Some(owner) = &self.owner {
            out += &format!("O:{}", owner);
        }
        if let Some(group) = &self.group {
            out += &format!("G:{}", group);
        }

        let dacl_flags = control_codes(self.flags, &DACL_CONTROL_CODES);
        if self.dacl.is_some() || !dacl_flags.is_empty() {
            out += "D:";
            out += &dacl_flags;
            out += &self.dacl.as_deref().unwrap_or_default().concat();
        }

        let sacl_flags = control_codes(self.flags, &SACL_CONTROL_CODES);
        if self.sacl.is_some() || !sacl_flags.is_empty() {
            out += "S:";
            out += &sacl_flags;
            out += &self.sacl.as_deref().unwrap_or_default().concat();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sid::Sid;

    #[test]
    fn builds_owner_and_group() {
        assert_eq!(SddlBuilder::new().owner("S-1-5-18").build(), "O:S-1-5-18");
        let system: Sid = "S-1-5-18".parse().unwrap();
        assert_eq!(
            SddlBuilder::new().owner(&system).group("S-1-5-32-544").build(),
            "O:S-1-5-18G:S-1-5-32-544"
        );
    }

    #[test]
    fn builds_dacl_entries() {
        let sddl = SddlBuilder::new()
            .owner("S-1-5-18")
            .group("S-1-5-32-544")
            .dacl()
            .allow("S-1-1-0", GENERIC_READ, AceFlags::OBJECT_INHERIT)
            .deny("S-1-5-7", GENERIC_WRITE, AceFlags::empty())
            .build();
        assert_eq!(sddl, "O:S-1-5-18G:S-1-5-32-544D:(A;OI;GR;;;S-1-1-0)(D;;GW;;;S-1-5-7)");
    }

    #[test]
    fn protected_flag_goes_after_dacl_marker() {
        let sddl = SddlBuilder::new()
            .owner("S-1-5-18")
            .flag("P")
            .allow("S-1-1-0", GENERIC_READ, AceFlags::empty())
            .build();
        assert_eq!(sddl, "O:S-1-5-18D:P(A;;GR;;;S-1-1-0)");
    }

    #[test]
    fn audit_and_empty_sections() {
        let audit = SddlBuilder::new()
            .owner("S-1-5-18")
            .audit("S-1-1-0", GENERIC_ALL, AceFlags::empty(), true, true)
            .build();
        assert_eq!(audit, "O:S-1-5-18S:(AU;SAFA;GA;;;S-1-1-0)");

        let empty = SddlBuilder::new().owner("S-1-5-18").dacl().sacl().build();
        assert_eq!(empty, "O:S-1-5-18D:S:");
    }

    #[test]
    fn rights_fall_back_to_hex() {
        assert_eq!(rights_codes(GENERIC_READ | READ_CONTROL), "GRRC");
        assert_eq!(rights_codes(READ_CONTROL | 0x1), "0x00020001");
        assert_eq!(rights_codes(0), "0x00000000");
    }
}
