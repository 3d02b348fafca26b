//! Simulation of the discretionary access check.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::ace::{Ace, AceType, Principal};
use crate::error::{Error, Result};
use crate::integrity::{IntegrityLevel, IntegrityPolicy};
use crate::rights::{map_generic_access, AccessMask, GenericMapping, OWNER_IMPLICIT_RIGHTS};
use crate::security_descriptor::SecurityDescriptor;
use crate::sid::Sid;

/// The identity on whose behalf access is requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
    pub user: Sid,
    pub groups: Vec<Sid>,
}

impl AccessToken {
    pub fn new(user: Sid, groups: Vec<Sid>) -> AccessToken {
        AccessToken { user, groups }
    }

    /// Whether `sid` names Everyone, the user, or one of the user's groups.
    fn matches(&self, sid: &Sid) -> Option<&'static str> {
        if sid.is_everyone() {
            Some("Everyone SID matches all tokens")
        } else if *sid == self.user {
            Some("Directly matches user SID")
        } else if self.groups.iter().any(|g| g == sid) {
            Some("Matches a group SID")
        } else {
            None
        }
    }
}

/// Knobs for [`access_check`].
///
/// Loadable from TOML; omitted keys take the [`Default`] value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessCheckOptions {
    /// Let object ACEs that name an object type take part in the check.
    pub ignore_object_type: bool,
    pub check_integrity: bool,
    pub integrity_policy: IntegrityPolicy,
    pub subject_integrity: IntegrityLevel,
    pub object_integrity: IntegrityLevel,
    /// `None` leaves generic bits untouched.
    pub generic_mapping: Option<GenericMapping>,
}

impl Default for AccessCheckOptions {
    fn default() -> AccessCheckOptions {
        AccessCheckOptions {
            ignore_object_type: true,
            check_integrity: false,
            integrity_policy: IntegrityPolicy::NO_WRITE_UP,
            subject_integrity: IntegrityLevel::UNTRUSTED,
            object_integrity: IntegrityLevel::UNTRUSTED,
            generic_mapping: Some(GenericMapping::standard()),
        }
    }
}

impl AccessCheckOptions {
    pub fn from_toml(text: &str) -> Result<AccessCheckOptions> {
        toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Enables the integrity check for a subject and object label.
    pub fn with_integrity(
        mut self,
        subject: IntegrityLevel,
        object: IntegrityLevel,
        policy: IntegrityPolicy,
    ) -> AccessCheckOptions {
        self.check_integrity = true;
        self.subject_integrity = subject;
        self.object_integrity = object;
        self.integrity_policy = policy;
        self
    }
}

/// One step of the check's reasoning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckDetail {
    pub step: String,
    pub description: String,
    pub outcome: bool,
}

impl fmt::Display for CheckDetail {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {}: {}", if self.outcome { "+" } else { "-" }, self.step, self.description)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessCheckResult {
    pub granted: bool,
    pub reason: String,
    /// The deny entry that rejected the whole request, if one did.
    pub ace: Option<Ace>,
    /// Rights granted, even when the request as a whole was refused.
    pub access: AccessMask,
    pub details: Vec<CheckDetail>,
}

impl AccessCheckResult {
    fn new() -> AccessCheckResult {
        AccessCheckResult {
            granted: false,
            reason: String::new(),
            ace: None,
            access: AccessMask(0),
            details: Vec::new(),
        }
    }

    fn detail<S: Into<String>, D: Into<String>>(&mut self, step: S, description: D, outcome: bool) {
        self.details.push(CheckDetail {
            step: step.into(),
            description: description.into(),
            outcome,
        });
    }

    fn finish(self, desired: u32) -> AccessCheckResult {
        debug!(
            desired = format_args!("0x{:08X}", desired),
            granted = self.granted,
            access = format_args!("0x{:08X}", self.access.raw()),
            reason = %self.reason,
            "access check complete"
        );
        self
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pass {
    Deny,
    Allow,
}

impl Pass {
    fn label(self) -> &'static str {
        match self {
            Pass::Deny => "DenyACE",
            Pass::Allow => "AllowACE",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Pass::Deny => "deny",
            Pass::Allow => "allow",
        }
    }

    /// Whether `ace` belongs to this pass at all.
    fn selects(self, ace: &Ace, options: &AccessCheckOptions) -> bool {
        let (plain, object) = match self {
            Pass::Deny => (AceType::AccessDenied, AceType::AccessDeniedObject),
            Pass::Allow => (AceType::AccessAllowed, AceType::AccessAllowedObject),
        };

        let ace_type = ace.ace_type();
        ace_type == plain || (ace_type == object && (options.ignore_object_type || ace.object_type().is_none()))
    }
}

/// Decides whether `token` may open an object protected by `sd` for `desired`.
///
/// Deny entries are evaluated as a class before any allow entry. The check
/// never fails; an unmatched request is a denial.
pub fn access_check(
    sd: &SecurityDescriptor,
    token: &AccessToken,
    desired: u32,
    options: &AccessCheckOptions,
) -> AccessCheckResult {
    let mut result = AccessCheckResult::new();
    let mapping = options.generic_mapping.as_ref();
    let mapped = map_generic_access(desired, mapping);

    if options.check_integrity {
        let allowed = options
            .subject_integrity
            .check_access(options.object_integrity, options.integrity_policy, mapped);
        result.detail(
            "IntegrityLevel",
            format!(
                "Checking if integrity level {} can access {} with policy {}",
                options.subject_integrity,
                options.object_integrity,
                options.integrity_policy.bits()
            ),
            allowed,
        );

        if !allowed {
            result.reason = "Access denied by integrity level policy".to_string();
            return result.finish(desired);
        }
    }

    if sd.dacl.is_empty() {
        result.granted = true;
        result.reason = "No DACL present (full access)".to_string();
        result.access = AccessMask(mapped);
        result.detail("EmptyDACL", "No DACL present; full access granted", true);
        return result.finish(desired);
    }

    let is_owner = sd.owner.as_ref() == Some(&token.user);
    result.detail("OwnerCheck", format!("Checking if user is owner: {}", is_owner), is_owner);

    if is_owner && mapped & !OWNER_IMPLICIT_RIGHTS == 0 {
        result.granted = true;
        result.reason = "Access granted to owner".to_string();
        result.access = AccessMask(mapped & OWNER_IMPLICIT_RIGHTS);
        result.detail("OwnerRights", "Access granted based on ownership", true);
        return result.finish(desired);
    }

    let mut denied = 0u32;
    for (i, ace) in candidates(sd, Pass::Deny, options, &mut result) {
        let applies = applies_to(ace, token, Pass::Deny, i, &mut result);
        if !applies {
            continue;
        }

        let overlap = map_generic_access(ace.mask.raw(), mapping) & mapped;
        if overlap == 0 {
            continue;
        }

        denied |= overlap;
        result.reason = format!("Access explicitly denied by ACE {}", i);
        result.detail(
            format!("DenyACE[{}]Match", i),
            format!("Access denied by ACE - access mask 0x{:08X}", overlap),
            false,
        );

        if denied == mapped {
            result.ace = Some(ace.clone());
            return result.finish(desired);
        }
    }

    let mut granted = 0u32;
    for (i, ace) in candidates(sd, Pass::Allow, options, &mut result) {
        let applies = applies_to(ace, token, Pass::Allow, i, &mut result);
        if !applies {
            continue;
        }

        let allowed = map_generic_access(ace.mask.raw(), mapping) & mapped & !denied;
        if allowed == 0 {
            continue;
        }

        granted |= allowed;
        result.detail(
            format!("AllowACE[{}]Match", i),
            format!("Access allowed by ACE - access mask 0x{:08X}", allowed),
            true,
        );

        if granted | denied == mapped {
            break;
        }
    }

    let unmatched = mapped & !(granted | denied);
    result.access = AccessMask(granted);
    if unmatched == 0 && granted == mapped {
        result.granted = true;
        result.reason = "Access granted by ACL".to_string();
        result.detail("FinalDecision", "All requested access rights were granted", true);
    } else {
        result.reason = if denied != 0 {
            "Some requested access was explicitly denied".to_string()
        } else {
            "Some requested access was not granted by any ACE".to_string()
        };
        result.detail(
            "FinalDecision",
            format!(
                "Access partially granted: requested={:08X}, granted={:08X}, denied={:08X}, unmatched={:08X}",
                mapped, granted, denied, unmatched
            ),
            false,
        );
    }

    result.finish(desired)
}

/// Entries taking part in `pass`, with their DACL index.
///
/// Inherit-only entries are dropped here and noted in the trace.
fn candidates<'a>(
    sd: &'a SecurityDescriptor,
    pass: Pass,
    options: &AccessCheckOptions,
    result: &mut AccessCheckResult,
) -> Vec<(usize, &'a Ace)> {
    let mut selected = Vec::new();
    for (i, ace) in sd.dacl.aces.iter().enumerate() {
        if !pass.selects(ace, options) {
            continue;
        }
        if ace.is_inherit_only() {
            trace!(index = i, "skipping inherit-only ACE");
            result.detail(
                format!("{}[{}]", pass.label(), i),
                format!("Skipping inherit-only {} ACE", pass.noun()),
                false,
            );
            continue;
        }
        selected.push((i, ace));
    }
    selected
}

fn applies_to(ace: &Ace, token: &AccessToken, pass: Pass, index: usize, result: &mut AccessCheckResult) -> bool {
    let (applies, reason) = match token.matches(ace.principal()) {
        Some(reason) => (true, reason),
        None => (false, "No SID match found"),
    };

    result.detail(
        format!("{}[{}]", pass.label(), index),
        format!("Checking if {} ACE applies: {} - {}", pass.noun(), applies, reason),
        applies,
    );
    applies
}
