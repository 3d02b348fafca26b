//! App-container capability SIDs (`S-1-15-3-...`).

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::sid::{Sid, SECURITY_APP_PACKAGE_AUTHORITY};

pub const CAPABILITY_SID_PREFIX: &str = "S-1-15-3-";
const CUSTOM_CAPABILITY_PREFIX: &str = "CustomCapability-";

/// First sub-authority of every capability SID.
const SECURITY_CAPABILITY_BASE_RID: u32 = 3;

static WELL_KNOWN_CAPABILITIES: [(&str, u32); 37] = [
    ("internetClient", 1),
    ("internetClientServer", 2),
    ("privateNetworkClientServer", 3),
    ("picturesLibrary", 4),
    ("videosLibrary", 5),
    ("musicLibrary", 6),
    ("documentsLibrary", 7),
    ("enterpriseAuthentication", 8),
    ("sharedUserCertificates", 9),
    ("removableStorage", 10),
    ("appointments", 11),
    ("contacts", 12),
    ("location", 1024),
    ("microphone", 1025),
    ("webcam", 1026),
    ("systemManagement", 1027),
    ("appCertificates", 1028),
    ("offlineMapsManagement", 1029),
    ("enterpriseCloudSSO", 1030),
    ("remoteSystem", 1031),
    ("sharedUserCertificatesImport", 1032),
    ("remoteSystemDetailedSettings", 1033),
    ("phoneCallHistoryPublic", 1034),
    ("spatialPerception", 1035),
    ("deviceUnlock", 1037),
    ("lowLevelDevices", 1038),
    ("backgroundMediaRecording", 1039),
    ("cameraProcessingExtension", 1040),
    ("userDataTasks", 1041),
    ("userActivityInactiveThresholdTimer", 1042),
    ("cellularDeviceIdentity", 1043),
    ("cellularDeviceControl", 1044),
    ("protectedApp", 1045),
    ("userDataSystem", 1046),
    ("graphicsCapture", 1047),
    ("globalMediaControl", 1048),
    ("appLicensing", 1049),
];

static CAPABILITY_BY_SID: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    WELL_KNOWN_CAPABILITIES
        .iter()
        .map(|(name, rid)| (format!("{}{}", CAPABILITY_SID_PREFIX, rid), *name))
        .collect()
});

pub fn is_capability_sid(sid: &Sid) -> bool {
    sid.to_string().starts_with(CAPABILITY_SID_PREFIX)
}

/// The capability a SID grants, or `CustomCapability-<subs>` for unlisted ones.
pub fn capability_from_sid(sid: &Sid) -> Result<String> {
    let canonical = sid.to_string();
    let rest = canonical
        .strip_prefix(CAPABILITY_SID_PREFIX)
        .ok_or_else(|| Error::identifier(format!("not a capability SID: {}", canonical)))?;

    match CAPABILITY_BY_SID.get(&canonical) {
        Some(name) => Ok(name.to_string()),
        None => Ok(format!("{}{}", CUSTOM_CAPABILITY_PREFIX, rest)),
    }
}

/// Builds the SID for a well-known capability name or a
/// `CustomCapability-X-Y-...` string.
pub fn sid_from_capability(name: &str) -> Result<Sid> {
    if let Some((_, rid)) = WELL_KNOWN_CAPABILITIES.iter().find(|(n, _)| *n == name) {
        return Ok(Sid::with_authority(
            SECURITY_APP_PACKAGE_AUTHORITY,
            vec![SECURITY_CAPABILITY_BASE_RID, *rid],
        ));
    }

    let custom = name
        .strip_prefix(CUSTOM_CAPABILITY_PREFIX)
        .ok_or_else(|| Error::identifier(format!("unknown capability: {}", name)))?;

    let mut subs = vec![SECURITY_CAPABILITY_BASE_RID];
    for part in custom.split('-') {
        let value = part.parse::<u32>().map_err(|_| {
            Error::identifier(format!("invalid sub-authority in custom capability: {:?}", part))
        })?;
        subs.push(value);
    }

    Sid::new(SECURITY_APP_PACKAGE_AUTHORITY, &subs)
}

/// Decodes a binary SID and checks that it is a capability SID.
pub fn parse_capability_sid(data: &[u8]) -> Result<Sid> {
    let sid = Sid::decode(data)?;

    if sid.sub_authorities().len() < 2 {
        return Err(Error::record(format!(
            "invalid authority count for capability SID: {}",
            sid.sub_authorities().len()
        )));
    }
    if sid.authority_value() != SECURITY_APP_PACKAGE_AUTHORITY
        || sid.sub_authorities()[0] != SECURITY_CAPABILITY_BASE_RID
    {
        return Err(Error::record(format!("not a capability SID: {}", sid)));
    }

    Ok(sid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn names_well_known_and_custom_capabilities() {
        let sid: Sid = "S-1-15-3-1".parse().unwrap();
        assert!(is_capability_sid(&sid));
        assert_eq!(capability_from_sid(&sid).unwrap(), "internetClient");

        let custom: Sid = "S-1-15-3-999-888".parse().unwrap();
        assert_eq!(capability_from_sid(&custom).unwrap(), "CustomCapability-999-888");

        let system: Sid = "S-1-5-18".parse().unwrap();
        let err = capability_from_sid(&system).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidIdentifier);
        assert!(err.to_string().contains("not a capability SID"));
    }

    #[test]
    fn builds_sids_from_names() {
        let sid = sid_from_capability("internetClient").unwrap();
        assert_eq!(sid.to_string(), "S-1-15-3-1");
        assert_eq!(sid.authority()[5], 15);

        let custom = sid_from_capability("CustomCapability-999-888").unwrap();
        assert_eq!(custom.sub_authorities(), &[3, 999, 888]);

        let err = sid_from_capability("teleportation").unwrap_err();
        assert!(err.to_string().contains("unknown capability"));
        assert!(sid_from_capability("CustomCapability-x").is_err());
    }

    #[test]
    fn parses_binary_capability_sids() {
        let bytes = [1, 2, 0, 0, 0, 0, 0, 15, 3, 0, 0, 0, 1, 0, 0, 0];
        assert_eq!(parse_capability_sid(&bytes).unwrap().to_string(), "S-1-15-3-1");

        assert!(parse_capability_sid(&[1, 2, 0]).is_err());
        assert!(parse_capability_sid(&[2, 2, 0, 0, 0, 0, 0, 15, 3, 0, 0, 0, 1, 0, 0, 0]).is_err());

        let not_capability = [1, 2, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0, 0x20, 2, 0, 0];
        let err = parse_capability_sid(&not_capability).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);
    }
}
