use crate::access_check::{access_check, AccessCheckOptions, AccessCheckResult, AccessToken};
use crate::ace::{Ace, AceFlags, AceType, Principal};
use crate::acl::Acl;
use crate::error::ErrorKind;
use crate::guid::Guid;
use crate::integrity::{IntegrityLevel, IntegrityPolicy};
use crate::rights::{
    AccessMask, GenericMapping, DELETE, FILE_GENERIC_READ, GENERIC_ALL, GENERIC_EXECUTE, GENERIC_READ, GENERIC_WRITE,
    READ_CONTROL, SYNCHRONIZE, WRITE_DAC, WRITE_OWNER,
};
use crate::security_descriptor::{ControlFlags, SecurityDescriptor};
use crate::sid::Sid;

const ALICE: &str = "S-1-5-21-1004336348-1177238915-682003330-1105";
const BOB: &str = "S-1-5-21-1004336348-1177238915-682003330-1106";
const ADMINS: &str = "S-1-5-32-544";
const SYSTEM: &str = "S-1-5-18";
const ANONYMOUS: &str = "S-1-5-7";

fn sid(text: &str) -> Sid {
    text.parse().unwrap()
}

fn token(user: &str, groups: &[&str]) -> AccessToken {
    AccessToken::new(sid(user), groups.iter().map(|g| sid(g)).collect())
}

/// Builds a descriptor and passes it through the binary codec.
fn descriptor(owner: &str, aces: Vec<Ace>) -> SecurityDescriptor {
    let sd = SecurityDescriptor::new(Some(sid(owner)), Some(sid(ADMINS)), Acl::new(aces));
    SecurityDescriptor::decode(&sd.encode()).unwrap()
}

fn check(sd: &SecurityDescriptor, token: &AccessToken, desired: u32) -> AccessCheckResult {
    access_check(sd, token, desired, &AccessCheckOptions::default())
}

fn steps(result: &AccessCheckResult) -> Vec<&str> {
    result.details.iter().map(|d| d.step.as_str()).collect()
}

#[test]
fn literal_sid_unit_test() {
    let sid = Sid::decode(&[1, 1, 0, 0, 0, 0, 0, 5, 18, 0, 0, 0]).unwrap();
    assert_eq!(sid.to_string(), "S-1-5-18");
    assert_eq!(sid.resolve(), "Local System");
}

#[test]
fn everyone_read_unit_test() {
    let sd = descriptor(SYSTEM, vec![Ace::allowed(Sid::everyone(), AceFlags::empty(), GENERIC_READ)]);

    for t in [token(ALICE, &[]), token(BOB, &[ADMINS]), token(ANONYMOUS, &[])] {
        let read = check(&sd, &t, GENERIC_READ);
        assert!(read.granted, "{}", read.reason);
        assert_eq!(read.access, AccessMask(READ_CONTROL));
        assert_eq!(read.reason, "Access granted by ACL");

        let write = check(&sd, &t, GENERIC_WRITE);
        assert!(!write.granted);
        assert_eq!(write.reason, "Some requested access was not granted by any ACE");
    }
}

#[test]
fn empty_dacl_unit_test() {
    let sd = descriptor(SYSTEM, Vec::new());

    for desired in [GENERIC_ALL, GENERIC_WRITE | DELETE, 0x0000_0001] {
        let result = check(&sd, &token(ALICE, &[]), desired);
        assert!(result.granted);
        assert_eq!(result.reason, "No DACL present (full access)");
        assert_eq!(steps(&result), vec!["EmptyDACL"]);
    }
}

#[test]
fn owner_rights_unit_test() {
    let sd = descriptor(ALICE, vec![Ace::allowed(sid(BOB), AceFlags::empty(), GENERIC_ALL)]);
    let alice = token(ALICE, &[]);

    let result = check(&sd, &alice, READ_CONTROL | WRITE_DAC);
    assert!(result.granted);
    assert_eq!(result.reason, "Access granted to owner");
    assert_eq!(result.access, AccessMask(READ_CONTROL | WRITE_DAC));
    assert_eq!(steps(&result), vec!["OwnerCheck", "OwnerRights"]);

    // Ownership does not cover anything beyond the implicit rights.
    let result = check(&sd, &alice, WRITE_DAC | DELETE);
    assert!(!result.granted);
}

#[test]
fn deny_precedence_unit_test() {
    // The deny entry comes last but is still evaluated first.
    let sd = descriptor(
        SYSTEM,
        vec![
            Ace::allowed(sid(ALICE), AceFlags::empty(), GENERIC_ALL),
            Ace::denied(Sid::everyone(), AceFlags::empty(), GENERIC_WRITE),
        ],
    );
    let alice = token(ALICE, &[]);

    let write = check(&sd, &alice, GENERIC_WRITE);
    assert!(!write.granted);
    assert_eq!(write.reason, "Access explicitly denied by ACE 1");
    assert_eq!(write.ace.as_ref().map(|a| a.ace_type()), Some(AceType::AccessDenied));
    assert_eq!(write.access, AccessMask(0));

    let read = check(&sd, &alice, GENERIC_READ);
    assert!(read.granted);
    assert_eq!(read.access, AccessMask(READ_CONTROL));
    assert_eq!(
        steps(&read),
        vec!["OwnerCheck", "DenyACE[1]", "AllowACE[0]", "AllowACE[0]Match", "FinalDecision"]
    );
}

#[test]
fn partial_deny_unit_test() {
    let sd = descriptor(
        SYSTEM,
        vec![
            Ace::denied(sid(ADMINS), AceFlags::empty(), WRITE_OWNER),
            Ace::allowed(sid(ALICE), AceFlags::empty(), GENERIC_ALL),
        ],
    );

    let result = check(&sd, &token(ALICE, &[ADMINS]), GENERIC_WRITE);
    assert!(!result.granted);
    assert!(result.ace.is_none());
    assert_eq!(result.reason, "Some requested access was explicitly denied");
    assert_eq!(result.access, AccessMask(WRITE_DAC));
}

#[test]
fn partial_grant_unit_test() {
    let sd = descriptor(SYSTEM, vec![Ace::allowed(sid(ALICE), AceFlags::empty(), GENERIC_READ)]);

    let result = check(&sd, &token(ALICE, &[]), GENERIC_READ | GENERIC_WRITE);
    assert!(!result.granted);
    assert_eq!(result.access, AccessMask(READ_CONTROL));
    assert!(!result.access.intersects(WRITE_DAC | WRITE_OWNER));

    let last = result.details.last().unwrap();
    assert_eq!(last.step, "FinalDecision");
    assert!(!last.outcome);
    assert!(last.description.starts_with("Access partially granted: requested=000E0000"));
}

#[test]
fn group_membership_unit_test() {
    let sd = descriptor(SYSTEM, vec![Ace::allowed(sid(ADMINS), AceFlags::empty(), GENERIC_EXECUTE)]);

    assert!(check(&sd, &token(BOB, &[ADMINS]), GENERIC_EXECUTE).granted);
    assert!(!check(&sd, &token(BOB, &[]), GENERIC_EXECUTE).granted);
    assert_eq!(
        check(&sd, &token(BOB, &[ADMINS]), GENERIC_EXECUTE).access,
        AccessMask(SYNCHRONIZE)
    );
}

#[test]
fn integrity_policy_unit_test() {
    let sd = descriptor(
        SYSTEM,
        vec![Ace::allowed(Sid::everyone(), AceFlags::empty(), GENERIC_READ | GENERIC_WRITE)],
    );
    let alice = token(ALICE, &[]);

    let low_to_high = AccessCheckOptions::default().with_integrity(
        IntegrityLevel::LOW,
        IntegrityLevel::HIGH,
        IntegrityPolicy::NO_WRITE_UP,
    );
    let write = access_check(&sd, &alice, GENERIC_WRITE, &low_to_high);
    assert!(!write.granted);
    assert_eq!(write.reason, "Access denied by integrity level policy");
    assert_eq!(steps(&write), vec!["IntegrityLevel"]);
    assert!(access_check(&sd, &alice, GENERIC_READ, &low_to_high).granted);

    let high_to_low = AccessCheckOptions::default().with_integrity(
        IntegrityLevel::HIGH,
        IntegrityLevel::LOW,
        IntegrityPolicy::all(),
    );
    assert!(access_check(&sd, &alice, GENERIC_WRITE, &high_to_low).granted);
    assert!(access_check(&sd, &alice, GENERIC_READ, &high_to_low).granted);
}

#[test]
fn integrity_from_label_unit_test() {
    let mut sacl = Acl::new(Vec::new());
    sacl.integrity_level(IntegrityLevel::SYSTEM.to_sid(), false, IntegrityPolicy::NO_WRITE_UP);
    let sd = SecurityDescriptor::new(
        Some(sid(SYSTEM)),
        None,
        Acl::new(vec![Ace::allowed(Sid::everyone(), AceFlags::empty(), GENERIC_ALL)]),
    )
    .with_sacl(sacl);
    let sd = SecurityDescriptor::decode(&sd.encode()).unwrap();

    let (level, policy) = sd.mandatory_label().unwrap();
    assert_eq!(level, IntegrityLevel::SYSTEM);

    let options = AccessCheckOptions::default().with_integrity(IntegrityLevel::MEDIUM, level, policy);
    assert!(!access_check(&sd, &token(ALICE, &[]), GENERIC_WRITE, &options).granted);
    assert!(access_check(&sd, &token(ALICE, &[]), GENERIC_READ, &options).granted);
}

#[test]
fn object_ace_unit_test() {
    let reset_password: Guid = "00299570-246d-11d0-a768-00aa006e0529".parse().unwrap();
    let sd = descriptor(
        SYSTEM,
        vec![
            Ace::allowed_object(sid(ALICE), AceFlags::empty(), GENERIC_READ, reset_password),
            Ace::object(AceType::AccessAllowedObject, AceFlags::empty(), DELETE, None, None, sid(ALICE)),
        ],
    );
    let alice = token(ALICE, &[]);

    assert!(check(&sd, &alice, GENERIC_READ).granted);

    let strict = AccessCheckOptions {
        ignore_object_type: false,
        ..AccessCheckOptions::default()
    };
    assert!(!access_check(&sd, &alice, GENERIC_READ, &strict).granted);
    assert!(access_check(&sd, &alice, DELETE, &strict).granted);
}

#[test]
fn callback_ace_unit_test() {
    let sd = descriptor(
        SYSTEM,
        vec![Ace::new(AceType::AccessAllowedCallback, AceFlags::empty(), GENERIC_ALL, sid(ALICE))],
    );
    let result = check(&sd, &token(ALICE, &[]), GENERIC_READ);
    assert!(!result.granted);
    assert_eq!(steps(&result), vec!["OwnerCheck", "FinalDecision"]);
}

#[test]
fn custom_mapping_unit_test() {
    let sd = descriptor(SYSTEM, vec![Ace::allowed(sid(ALICE), AceFlags::empty(), GENERIC_READ)]);
    let alice = token(ALICE, &[]);

    let files = AccessCheckOptions {
        generic_mapping: Some(GenericMapping::file()),
        ..AccessCheckOptions::default()
    };
    let result = access_check(&sd, &alice, GENERIC_READ, &files);
    assert!(result.granted);
    assert_eq!(result.access, AccessMask(FILE_GENERIC_READ));

    // Without a mapping only the literal generic bit matches.
    let identity = AccessCheckOptions {
        generic_mapping: None,
        ..AccessCheckOptions::default()
    };
    assert!(access_check(&sd, &alice, GENERIC_READ, &identity).granted);
    assert!(!access_check(&sd, &alice, READ_CONTROL, &identity).granted);
}

#[test]
fn short_descriptor_unit_test() {
    let err = SecurityDescriptor::decode(&[0u8; 10]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRecord);
}

#[test]
fn too_many_sub_authorities_unit_test() {
    let mut data = vec![1u8, 20, 0, 0, 0, 0, 0, 5];
    data.resize(8 + 4 * 20, 0);
    assert_eq!(Sid::decode(&data).unwrap_err().kind(), ErrorKind::InvalidRecord);
}

#[test]
fn undersized_ace_unit_test() {
    let mut bytes = descriptor(SYSTEM, vec![Ace::allowed(Sid::everyone(), AceFlags::empty(), GENERIC_READ)]).encode();
    // Shrink the only ACE's declared size below its header and mask.
    bytes[20 + 8 + 2] = 6;

    let err = SecurityDescriptor::decode(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRecord);
    assert_eq!(err.to_string(), "parsing DACL: reading ACE 0: invalid ACE size for SID: -2");
}

#[test]
fn error_chain_unit_test() {
    let good = Acl::new(vec![
        Ace::allowed(Sid::everyone(), AceFlags::empty(), GENERIC_READ),
        Ace::denied(sid(ANONYMOUS), AceFlags::empty(), GENERIC_WRITE),
    ]);
    let mut acl = good.encode();
    acl[4] = 3;
    // Object ACE claiming 25 bytes while its object type alone needs 28.
    acl.extend_from_slice(&[0x05, 0x00, 25, 0x00, 0, 0, 0, 0, 0x01, 0, 0, 0]);
    acl.extend_from_slice(&[0x11; 16]);
    let size = acl.len() as u16;
    acl[2..4].copy_from_slice(&size.to_le_bytes());

    let mut bytes = vec![1, 0, 0x04, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 20, 0, 0, 0];
    bytes.extend_from_slice(&acl);

    let err = SecurityDescriptor::decode(&bytes).unwrap_err();
    assert_eq!(
        err.to_string(),
        "parsing DACL: reading ACE 2: invalid advanced ACE size for SID: -3"
    );
    assert_eq!(err.root().to_string(), "invalid advanced ACE size for SID: -3");

    let mut causes = Vec::new();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    assert_eq!(
        causes,
        vec![
            "reading ACE 2: invalid advanced ACE size for SID: -3",
            "invalid advanced ACE size for SID: -3",
        ]
    );
}

#[test]
fn edit_and_render_unit_test() {
    let mut dacl = Acl::new(Vec::new());
    dacl.allow(Sid::everyone(), true, GENERIC_READ);
    dacl.deny(sid(ANONYMOUS), false, GENERIC_WRITE);
    let sd = SecurityDescriptor::new(Some(sid(SYSTEM)), Some(sid(ADMINS)), dacl)
        .with_control(ControlFlags::DACL_PROTECTED);

    let decoded = SecurityDescriptor::decode(&sd.encode()).unwrap();
    assert_eq!(decoded, sd);
    assert_eq!(
        decoded.to_sddl(),
        "O:S-1-5-18G:S-1-5-32-544D:P(A;OICI;GR;;;S-1-1-0)(D;;GW;;;S-1-5-7)"
    );

    let mut edited = decoded.clone();
    assert_eq!(edited.dacl.remove(&sid(ANONYMOUS), AceType::AccessDenied, None), 1);
    assert_eq!(edited.dacl.get(&Sid::everyone(), Some(AceType::AccessAllowed)).len(), 1);
    assert_eq!(
        SecurityDescriptor::decode(&edited.encode()).unwrap().dacl.all().len(),
        1
    );
}

#[test]
fn object_sddl_unit_test() {
    let user_class: Guid = "bf967aba-0de6-11d0-a285-00aa003049e2".parse().unwrap();
    let ace = Ace::object(
        AceType::AccessAllowedObject,
        AceFlags::CONTAINER_INHERIT | AceFlags::INHERIT_ONLY,
        0x100,
        None,
        Some(user_class),
        sid(ALICE),
    );
    let sd = descriptor(SYSTEM, vec![ace]);
    assert_eq!(
        sd.to_sddl(),
        format!(
            "O:S-1-5-18G:S-1-5-32-544D:(OA;CIIO;0x00000100;;bf967aba-0de6-11d0-a285-00aa003049e2;{})",
            ALICE
        )
    );
    assert_eq!(sd.dacl.all()[0].inherited_object_type().map(Guid::resolve).as_deref(), Some("User"));
    assert_eq!(sd.dacl.all()[0].principal(), &sid(ALICE));
}
