//! Mandatory integrity levels and the no-write-up / no-read-up / no-execute-up policy.

use std::fmt;

use bitflags::bitflags;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rights::{GENERIC_EXECUTE, GENERIC_READ, GENERIC_WRITE, READ_CONTROL, WRITE_DAC, WRITE_OWNER};
use crate::sid::{Sid, SECURITY_MANDATORY_LABEL_AUTHORITY};
use crate::utils::join_flag_names;

const WRITE_UP_RIGHTS: u32 = GENERIC_WRITE | WRITE_DAC | WRITE_OWNER;
const READ_UP_RIGHTS: u32 = GENERIC_READ | READ_CONTROL;
const EXECUTE_UP_RIGHTS: u32 = GENERIC_EXECUTE;

/// An ordered mandatory integrity label, stored as its raw RID.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntegrityLevel(pub u32);

impl IntegrityLevel {
    pub const UNTRUSTED: IntegrityLevel = IntegrityLevel(0x0000);
    pub const LOW: IntegrityLevel = IntegrityLevel(0x1000);
    pub const MEDIUM: IntegrityLevel = IntegrityLevel(0x2000);
    pub const MEDIUM_PLUS: IntegrityLevel = IntegrityLevel(0x2100);
    pub const HIGH: IntegrityLevel = IntegrityLevel(0x3000);
    pub const SYSTEM: IntegrityLevel = IntegrityLevel(0x4000);
    pub const PROTECTED: IntegrityLevel = IntegrityLevel(0x5000);
    pub const SECURE_PROCESS: IntegrityLevel = IntegrityLevel(0x6000);

    /// Reads the level out of an `S-1-16-<level>` label SID.
    pub fn from_sid(sid: &Sid) -> Result<IntegrityLevel> {
        if sid.revision() != 1 || sid.authority_value() != SECURITY_MANDATORY_LABEL_AUTHORITY {
            return Err(Error::identifier(format!("not an integrity level SID: {}", sid)));
        }

        Ok(IntegrityLevel(sid.sub_authorities().first().copied().unwrap_or(0)))
    }

    pub fn to_sid(self) -> Sid {
        Sid::with_authority(SECURITY_MANDATORY_LABEL_AUTHORITY, vec![self.0])
    }

    pub fn is_higher_than(self, other: IntegrityLevel) -> bool {
        self > other
    }

    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            IntegrityLevel::UNTRUSTED => "Untrusted",
            IntegrityLevel::LOW => "Low",
            IntegrityLevel::MEDIUM => "Medium",
            IntegrityLevel::MEDIUM_PLUS => "Medium Plus",
            IntegrityLevel::HIGH => "High",
            IntegrityLevel::SYSTEM => "System",
            IntegrityLevel::PROTECTED => "Protected Process",
            IntegrityLevel::SECURE_PROCESS => "Secure Process",
            _ => return None,
        };
        Some(name)
    }

    /// Whether a subject at this level may request `requested` rights on an
    /// object at `object` level under `policy`.
    ///
    /// A subject at or above the object's level is never restricted.
    pub fn check_access(self, object: IntegrityLevel, policy: IntegrityPolicy, requested: u32) -> bool {
        if self >= object {
            return true;
        }

        if policy.contains(IntegrityPolicy::NO_WRITE_UP) && requested & WRITE_UP_RIGHTS != 0 {
            return false;
        }
        if policy.contains(IntegrityPolicy::NO_READ_UP) && requested & READ_UP_RIGHTS != 0 {
            return false;
        }
        if policy.contains(IntegrityPolicy::NO_EXECUTE_UP) && requested & EXECUTE_UP_RIGHTS != 0 {
            return false;
        }

        true
    }
}

impl fmt::Display for IntegrityLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "Unknown ({})", self.0),
        }
    }
}

bitflags! {
    /// Directions in which a lower-integrity subject is blocked.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct IntegrityPolicy: u32 {
        const NO_WRITE_UP = 0x1;
        const NO_READ_UP = 0x2;
        const NO_EXECUTE_UP = 0x4;
    }
}

const DEFINED_POLICIES: [(u32, &str, &str); 3] = [
    (0x1, "NoWriteUp", "no_write_up"),
    (0x2, "NoReadUp", "no_read_up"),
    (0x4, "NoExecuteUp", "no_execute_up"),
];

impl Default for IntegrityPolicy {
    fn default() -> IntegrityPolicy {
        IntegrityPolicy::NO_WRITE_UP
    }
}

impl fmt::Display for IntegrityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let defined: Vec<(u32, &str)> = DEFINED_POLICIES.iter().map(|&(bit, name, _)| (bit, name)).collect();
        let names = join_flag_names(self.bits(), &defined, "|").unwrap_or_default();
        write!(f, "{}", names)
    }
}

/// Serialized as a list such as `["no_write_up", "no_read_up"]`.
impl Serialize for IntegrityPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let keys: Vec<&str> = DEFINED_POLICIES
            .iter()
            .filter(|(bit, _, _)| self.bits() & bit != 0)
            .map(|(_, _, key)| *key)
            .collect();

        let mut seq = serializer.serialize_seq(Some(keys.len()))?;
        for key in keys {
            seq.serialize_element(key)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for IntegrityPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<IntegrityPolicy, D::Error> {
        struct PolicyVisitor;

        impl<'de> Visitor<'de> for PolicyVisitor {
            type Value = IntegrityPolicy;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a list of integrity policy names")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<IntegrityPolicy, A::Error> {
                let mut policy = IntegrityPolicy::empty();
                while let Some(key) = seq.next_element::<String>()? {
                    let bit = DEFINED_POLICIES
                        .iter()
                        .find(|(_, _, k)| *k == key)
                        .map(|(bit, _, _)| *bit)
                        .ok_or_else(|| {
                            de::Error::unknown_variant(&key, &["no_write_up", "no_read_up", "no_execute_up"])
                        })?;
                    policy |= IntegrityPolicy::from_bits_retain(bit);
                }
                Ok(policy)
            }
        }

        deserializer.deserialize_seq(PolicyVisitor)
    }
}
