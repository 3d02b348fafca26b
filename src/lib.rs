//! `ntsecurity` decodes Windows security descriptors and simulates the
//! access check over them, without needing Windows itself.
//!
//! ```
//! use ntsecurity::{access_check, AccessCheckOptions, AccessToken, Ace, AceFlags, Acl, SecurityDescriptor, Sid};
//! use ntsecurity::rights::{GENERIC_READ, GENERIC_WRITE};
//!
//! let dacl = Acl::new(vec![Ace::allowed(Sid::everyone(), AceFlags::empty(), GENERIC_READ)]);
//! let sd = SecurityDescriptor::decode(&SecurityDescriptor::new(None, None, dacl).encode()).unwrap();
//!
//! let token = AccessToken::new("S-1-5-21-1-2-3-1001".parse().unwrap(), Vec::new());
//! let options = AccessCheckOptions::default();
//! assert!(access_check(&sd, &token, GENERIC_READ, &options).granted);
//! assert!(!access_check(&sd, &token, GENERIC_WRITE, &options).granted);
//! ```

pub mod access_check;
pub mod ace;
pub mod acl;
pub mod capability;
pub mod error;
pub mod guid;
pub mod integrity;
pub mod rights;
pub mod sddl;
pub mod security_descriptor;
pub mod sid;
pub mod utils;
pub mod well_known;

pub use crate::access_check::{access_check, AccessCheckOptions, AccessCheckResult, AccessToken, CheckDetail};
pub use crate::ace::{Ace, AceBody, AceFlags, AceHeader, AceType, AdvancedAce, BasicAce, ObjectAceFlags, Principal};
pub use crate::acl::{Acl, AclHeader};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::guid::Guid;
pub use crate::integrity::{IntegrityLevel, IntegrityPolicy};
pub use crate::rights::{map_generic_access, AccessMask, GenericMapping};
pub use crate::sddl::SddlBuilder;
pub use crate::security_descriptor::{ControlFlags, SecurityDescriptor, SecurityDescriptorHeader};
pub use crate::sid::Sid;

#[cfg(test)]
mod tests;
