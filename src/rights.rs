//! Access-mask bits, their names, and generic-rights mapping.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use serde::{Deserialize, Serialize};

use crate::utils::join_flag_names;

pub const GENERIC_READ: u32 = 0x8000_0000;
pub const GENERIC_WRITE: u32 = 0x4000_0000;
pub const GENERIC_EXECUTE: u32 = 0x2000_0000;
pub const GENERIC_ALL: u32 = 0x1000_0000;
pub const MAXIMUM_ALLOWED: u32 = 0x0200_0000;
pub const ACCESS_SYSTEM_SECURITY: u32 = 0x0100_0000;

pub const SYNCHRONIZE: u32 = 0x0010_0000;
pub const WRITE_OWNER: u32 = 0x0008_0000;
pub const WRITE_DAC: u32 = 0x0004_0000;
pub const READ_CONTROL: u32 = 0x0002_0000;
pub const DELETE: u32 = 0x0001_0000;
pub const STANDARD_RIGHTS_ALL: u32 = 0x001F_0000;

// Directory service object rights.
pub const ADS_RIGHT_DS_CONTROL_ACCESS: u32 = 0x0000_0100;
pub const ADS_RIGHT_DS_LIST_OBJECT: u32 = 0x0000_0080;
pub const ADS_RIGHT_DS_DELETE_TREE: u32 = 0x0000_0040;
pub const ADS_RIGHT_DS_WRITE_PROP: u32 = 0x0000_0020;
pub const ADS_RIGHT_DS_READ_PROP: u32 = 0x0000_0010;
pub const ADS_RIGHT_DS_SELF: u32 = 0x0000_0008;
pub const ADS_RIGHT_ACTRL_DS_LIST: u32 = 0x0000_0004;
pub const ADS_RIGHT_DS_DELETE_CHILD: u32 = 0x0000_0002;
pub const ADS_RIGHT_DS_CREATE_CHILD: u32 = 0x0000_0001;

// File object rights.
pub const FILE_READ_DATA: u32 = 0x0000_0001;
pub const FILE_WRITE_DATA: u32 = 0x0000_0002;
pub const FILE_APPEND_DATA: u32 = 0x0000_0004;
pub const FILE_READ_EA: u32 = 0x0000_0008;
pub const FILE_WRITE_EA: u32 = 0x0000_0010;
pub const FILE_EXECUTE: u32 = 0x0000_0020;
pub const FILE_DELETE_CHILD: u32 = 0x0000_0040;
pub const FILE_READ_ATTRIBUTES: u32 = 0x0000_0080;
pub const FILE_WRITE_ATTRIBUTES: u32 = 0x0000_0100;
pub const FILE_GENERIC_READ: u32 = 0x0012_0089;
pub const FILE_GENERIC_WRITE: u32 = 0x0012_0116;
pub const FILE_GENERIC_EXECUTE: u32 = 0x0012_00A0;
pub const FILE_ALL_ACCESS: u32 = 0x001F_01FF;

/// Rights an owner holds implicitly, whatever the DACL says.
pub const OWNER_IMPLICIT_RIGHTS: u32 = READ_CONTROL | WRITE_DAC;

const DEFINED_RIGHTS: [(u32, &str); 20] = [
    (GENERIC_READ, "GENERIC_READ"),
    (GENERIC_WRITE, "GENERIC_WRITE"),
    (GENERIC_EXECUTE, "GENERIC_EXECUTE"),
    (GENERIC_ALL, "GENERIC_ALL"),
    (MAXIMUM_ALLOWED, "MAXIMUM_ALLOWED"),
    (ACCESS_SYSTEM_SECURITY, "ACCESS_SYSTEM_SECURITY"),
    (SYNCHRONIZE, "SYNCHRONIZE"),
    (WRITE_OWNER, "WRITE_OWNER"),
    (WRITE_DAC, "WRITE_DAC"),
    (READ_CONTROL, "READ_CONTROL"),
    (DELETE, "DELETE"),
    (ADS_RIGHT_DS_CONTROL_ACCESS, "CONTROL_ACCESS"),
    (ADS_RIGHT_DS_LIST_OBJECT, "LIST_OBJECT"),
    (ADS_RIGHT_DS_DELETE_TREE, "DELETE_TREE"),
    (ADS_RIGHT_DS_WRITE_PROP, "WRITE_PROPERTY"),
    (ADS_RIGHT_DS_READ_PROP, "READ_PROPERTY"),
    (ADS_RIGHT_DS_SELF, "SELF"),
    (ADS_RIGHT_ACTRL_DS_LIST, "LIST_CHILDREN"),
    (ADS_RIGHT_DS_DELETE_CHILD, "DELETE_CHILD"),
    (ADS_RIGHT_DS_CREATE_CHILD, "CREATE_CHILD"),
];

const GENERIC_RIGHTS: [u32; 4] = [GENERIC_READ, GENERIC_WRITE, GENERIC_EXECUTE, GENERIC_ALL];

/// A 32-bit rights bitmask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessMask(pub u32);

impl AccessMask {
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn contains(self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    pub const fn intersects(self, bits: u32) -> bool {
        self.0 & bits != 0
    }

    /// Names of every known right present in the mask.
    ///
    /// Membership is tested bit by bit, so overlapping names may co-occur.
    pub fn names(self) -> Vec<&'static str> {
        DEFINED_RIGHTS
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

impl From<u32> for AccessMask {
    fn from(value: u32) -> AccessMask {
        AccessMask(value)
    }
}

impl From<AccessMask> for u32 {
    fn from(mask: AccessMask) -> u32 {
        mask.0
    }
}

impl BitOr for AccessMask {
    type Output = AccessMask;

    fn bitor(self, rhs: AccessMask) -> AccessMask {
        AccessMask(self.0 | rhs.0)
    }
}

impl BitAnd for AccessMask {
    type Output = AccessMask;

    fn bitand(self, rhs: AccessMask) -> AccessMask {
        AccessMask(self.0 & rhs.0)
    }
}

impl Not for AccessMask {
    type Output = AccessMask;

    fn not(self) -> AccessMask {
        AccessMask(!self.0)
    }
}

/// Space-separated right names, or `0xXXXXXXXX` when no known bit is set.
impl fmt::Display for AccessMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match join_flag_names(self.0, &DEFINED_RIGHTS, " ") {
            Some(names) => write!(f, "{}", names),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

/// Object-specific meaning of the four generic rights.
///
/// A missing entry leaves the generic bit in place when mapping, so that
/// comparisons against the literal generic value keep working.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericMapping {
    pub read: Option<u32>,
    pub write: Option<u32>,
    pub execute: Option<u32>,
    pub all: Option<u32>,
}

impl Default for GenericMapping {
    fn default() -> GenericMapping {
        GenericMapping::standard()
    }
}

impl GenericMapping {
    /// `GR→READ_CONTROL, GW→WRITE_DAC|WRITE_OWNER, GX→SYNCHRONIZE, GA→all bits`.
    pub fn standard() -> GenericMapping {
        GenericMapping {
            read: Some(READ_CONTROL),
            write: Some(WRITE_DAC | WRITE_OWNER),
            execute: Some(SYNCHRONIZE),
            all: Some(0xFFFF_FFFF),
        }
    }

    /// `FILE_GENERIC_*` rights for file objects.
    pub fn file() -> GenericMapping {
        GenericMapping {
            read: Some(FILE_GENERIC_READ),
            write: Some(FILE_GENERIC_WRITE),
            execute: Some(FILE_GENERIC_EXECUTE),
            all: Some(FILE_ALL_ACCESS),
        }
    }

    /// The mapped bits for one generic right, if the table has an entry.
    pub fn get(&self, generic: u32) -> Option<u32> {
        match generic {
            GENERIC_READ => self.read,
            GENERIC_WRITE => self.write,
            GENERIC_EXECUTE => self.execute,
            GENERIC_ALL => self.all,
            _ => None,
        }
    }
}

/// Translates the generic bits of `access` into object-specific rights.
///
/// `None` is the identity mapping.
pub fn map_generic_access(access: u32, mapping: Option<&GenericMapping>) -> u32 {
    let mapping = match mapping {
        Some(m) => m,
        None => return access,
    };

    let mut remaining = access;
    let mut result = 0u32;
    for &generic in &GENERIC_RIGHTS {
        if remaining & generic == 0 {
            continue;
        }
        if let Some(specific) = mapping.get(generic) {
            result |= specific;
            remaining &= !generic;
        }
    }

    result | remaining
}
