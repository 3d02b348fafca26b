//! Property tests for the binary codecs and the access checker.

use ntsecurity::rights::{GENERIC_ALL, GENERIC_READ, GENERIC_WRITE};
use ntsecurity::utils::ByteReader;
use ntsecurity::{
    access_check, AccessCheckOptions, AccessToken, Ace, AceFlags, AceType, Acl, Guid, SecurityDescriptor, Sid,
};
use proptest::prelude::*;

fn arb_sid() -> impl Strategy<Value = Sid> {
    (0u64..(1 << 48), proptest::collection::vec(any::<u32>(), 0..=15))
        .prop_map(|(authority, subs)| Sid::new(authority, &subs).unwrap())
}

fn arb_guid() -> impl Strategy<Value = Guid> {
    any::<[u8; 16]>().prop_map(|bytes| Guid::decode(&bytes).unwrap())
}

fn arb_flags() -> impl Strategy<Value = AceFlags> {
    any::<u8>().prop_map(AceFlags::from_bits_retain)
}

fn arb_basic_type() -> impl Strategy<Value = AceType> {
    prop_oneof![
        Just(AceType::AccessAllowed),
        Just(AceType::AccessDenied),
        Just(AceType::SystemAudit),
        Just(AceType::SystemAlarm),
        Just(AceType::AccessAllowedCallback),
        Just(AceType::AccessDeniedCallback),
        Just(AceType::SystemMandatoryLabel),
    ]
}

fn arb_object_type() -> impl Strategy<Value = AceType> {
    prop_oneof![
        Just(AceType::AccessAllowedObject),
        Just(AceType::AccessDeniedObject),
        Just(AceType::SystemAuditObject),
        Just(AceType::SystemAlarmObject),
    ]
}

fn arb_ace() -> impl Strategy<Value = Ace> {
    prop_oneof![
        (arb_basic_type(), arb_flags(), any::<u32>(), arb_sid())
            .prop_map(|(t, flags, mask, sid)| Ace::new(t, flags, mask, sid)),
        (
            arb_object_type(),
            arb_flags(),
            any::<u32>(),
            proptest::option::of(arb_guid()),
            proptest::option::of(arb_guid()),
            arb_sid()
        )
            .prop_map(|(t, flags, mask, object, inherited, sid)| Ace::object(t, flags, mask, object, inherited, sid)),
    ]
}

proptest! {
    #[test]
    fn prop_sid_text_round_trip(sid in arb_sid()) {
        let text = sid.to_string();
        prop_assert_eq!(text.parse::<Sid>().unwrap(), sid.clone());
        prop_assert_eq!(Sid::decode(&sid.encode()).unwrap(), sid);
    }

    #[test]
    fn prop_ace_round_trip(ace in arb_ace()) {
        let bytes = ace.encode();
        prop_assert_eq!(bytes.len(), ace.size() as usize);
        prop_assert_eq!(Ace::decode(&bytes).unwrap(), ace);
    }

    /// Decoding an ACL leaves the cursor exactly `header.size` bytes on.
    #[test]
    fn prop_acl_consumes_declared_size(
        aces in proptest::collection::vec(arb_ace(), 0..8),
        trailer in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let acl = Acl::new(aces);
        let mut bytes = acl.encode();
        bytes.extend_from_slice(&trailer);

        let mut reader = ByteReader::new(&bytes);
        let decoded = Acl::decode_from(&mut reader).unwrap();
        prop_assert_eq!(reader.position(), acl.header.size as usize);
        prop_assert_eq!(decoded, acl);
    }

    /// Free space declared after the last entry is consumed too.
    #[test]
    fn prop_acl_consumes_declared_free_space(
        aces in proptest::collection::vec(arb_ace(), 0..8),
        slack in 0u16..64,
        trailer in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let mut acl = Acl::new(aces);
        acl.header.size += slack;
        let mut bytes = acl.encode();
        prop_assert_eq!(bytes.len(), acl.header.size as usize);
        bytes.extend_from_slice(&trailer);

        let mut reader = ByteReader::new(&bytes);
        let decoded = Acl::decode_from(&mut reader).unwrap();
        prop_assert_eq!(reader.position(), acl.header.size as usize);
        prop_assert_eq!(decoded, acl);
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = SecurityDescriptor::decode(&data);
        let _ = Acl::decode(&data);
        let _ = Ace::decode(&data);
    }

    #[test]
    fn prop_empty_dacl_grants_anything(user in arb_sid(), desired in any::<u32>()) {
        let sd = SecurityDescriptor::new(None, None, Acl::new(Vec::new()));
        let token = AccessToken::new(user, Vec::new());
        let result = access_check(&sd, &token, desired, &AccessCheckOptions::default());
        prop_assert!(result.granted);
    }

    /// An Everyone deny covering the request wins over any allow entry.
    #[test]
    fn prop_covering_deny_wins(user in arb_sid(), position in 0usize..3) {
        let mut aces = vec![
            Ace::allowed(user.clone(), AceFlags::empty(), GENERIC_ALL),
            Ace::allowed(Sid::everyone(), AceFlags::empty(), GENERIC_READ | GENERIC_WRITE),
        ];
        aces.insert(position.min(aces.len()), Ace::denied(Sid::everyone(), AceFlags::empty(), GENERIC_WRITE));
        let sd = SecurityDescriptor::new(Some("S-1-5-18".parse().unwrap()), None, Acl::new(aces));

        let token = AccessToken::new(user, Vec::new());
        let result = access_check(&sd, &token, GENERIC_WRITE, &AccessCheckOptions::default());
        prop_assert!(!result.granted);
        prop_assert_eq!(result.ace.map(|a| a.ace_type()), Some(AceType::AccessDenied));
    }
}
