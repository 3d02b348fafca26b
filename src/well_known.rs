//! Name tables for well-known SIDs and directory-service GUIDs.
//!
//! These are process-wide immutable statics, built on first use and never
//! mutated afterwards.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static WELL_KNOWN_SIDS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        ("S-1-0", "Null Authority"),
        ("S-1-0-0", "Nobody"),
        ("S-1-1", "World Authority"),
        ("S-1-1-0", "Everyone"),
        ("S-1-15-2-1", "All App Packages"),
        ("S-1-15-2-2", "Any Restricted App Packages"),
        ("S-1-16-0", "Untrusted Mandatory Level"),
        ("S-1-16-12288", "High Integrity level"),
        ("S-1-16-16384", "System Integrity level"),
        ("S-1-16-20480", "Protected Process Mandatory Level"),
        ("S-1-16-28672", "Secure Process Mandatory Level"),
        ("S-1-16-4096", "Low integrity level"),
        ("S-1-16-8192", "Medium integrity level"),
        ("S-1-16-8448", "Medium-plus integrity level"),
        ("S-1-2", "Local Authority"),
        ("S-1-2-0", "Local (Users with the ability to log in locally)"),
        ("S-1-2-1", "Console Logon (Users who are logged onto the physical console)"),
        ("S-1-3", "Creator Authority"),
        ("S-1-3-0", "Creator Owner"),
        ("S-1-3-1", "Creator Group"),
        ("S-1-3-2", "Creator Owner Server"),
        ("S-1-3-3", "Creator Group Server"),
        ("S-1-3-4", "Creator Owner Rights"),
        ("S-1-4", "Non-unique Authority"),
        ("S-1-5", "NT Authority"),
        ("S-1-5-1", "Dialup"),
        ("S-1-5-10", "Principal Self"),
        ("S-1-5-1000", "Other Organization"),
        ("S-1-5-11", "Authenticated Users"),
        ("S-1-5-12", "Restricted Code"),
        ("S-1-5-13", "Terminal Server Users"),
        ("S-1-5-14", "Remote Interactive Logon"),
        ("S-1-5-15", "This Organization"),
        ("S-1-5-17", "This Organization (Used by the default IIS user)"),
        ("S-1-5-18", "Local System"),
        ("S-1-5-19", "Local Service"),
        ("S-1-5-2", "Network Logon User"),
        ("S-1-5-20", "Network Service"),
        ("S-1-5-21-0-0-0-498", "Enterprise Read-Only Domain Controllers Group"),
        ("S-1-5-21-0-0-0-500", "Local Administrator"),
        ("S-1-5-21-0-0-0-501", "Local Guest"),
        ("S-1-5-21-0-0-0-512", "Domain Admins"),
        ("S-1-5-21-0-0-0-513", "Domain Users"),
        ("S-1-5-21-0-0-0-514", "Domain Guests"),
        ("S-1-5-21-0-0-0-515", "Domain Computers"),
        ("S-1-5-21-0-0-0-516", "Domain Controllers"),
        ("S-1-5-21-0-0-0-517", "Domain Certificate Publishers Admins"),
        ("S-1-5-21-0-0-0-518", "Schema Administrators"),
        ("S-1-5-21-0-0-0-519", "Enterprise Admins"),
        ("S-1-5-21-0-0-0-520", "Group Policy Creator Owners Admins"),
        ("S-1-5-21-0-0-0-522", "Clonable Domain Controllers"),
        ("S-1-5-21-0-0-0-553", "RAS Remote Access Services Servers"),
        ("S-1-5-3", "Batch"),
        ("S-1-5-32-544", "BUILTIN Administrators"),
        ("S-1-5-32-545", "BUILTIN Users"),
        ("S-1-5-32-546", "BUILTIN Guests"),
        ("S-1-5-32-547", "BUILTIN Power Users"),
        ("S-1-5-32-548", "BUILTIN Account Operators"),
        ("S-1-5-32-549", "BUILTIN System/Server Operators"),
        ("S-1-5-32-550", "BUILTIN Printer Operators"),
        ("S-1-5-32-551", "BUILTIN Backup Operators"),
        ("S-1-5-32-552", "BUILTIN Replicator"),
        ("S-1-5-32-554", "BUILTIN\\Pre-Windows 2000 Compatible Access"),
        ("S-1-5-32-555", "BUILTIN\\Remote Desktop Users"),
        ("S-1-5-32-556", "BUILTIN\\Network Configuration Operators"),
        ("S-1-5-32-557", "BUILTIN\\Incoming Forest Trust Builders"),
        ("S-1-5-32-558", "BUILTIN\\Performance Monitor Users"),
        ("S-1-5-32-559", "BUILTIN\\Performance Log Users"),
        ("S-1-5-32-560", "BUILTIN\\Windows Authorization Access Group"),
        ("S-1-5-32-561", "BUILTIN\\Terminal Server License Servers"),
        ("S-1-5-32-562", "BUILTIN\\Distributed COM Users"),
        ("S-1-5-32-568", "BUILTIN\\IIS IUSRS"),
        ("S-1-5-32-569", "BUILTIN\\Cryptographic Operators"),
        ("S-1-5-32-573", "BUILTIN\\Event Log Readers"),
        ("S-1-5-32-574", "BUILTIN\\Certificate Service DCOM Access"),
        ("S-1-5-32-575", "BUILTIN\\RDS Remote Access Servers"),
        ("S-1-5-32-576", "BUILTIN\\RDS Endpoint Servers"),
        ("S-1-5-32-577", "BUILTIN\\RDS Management Servers"),
        ("S-1-5-32-578", "BUILTIN\\Hyper V Admins"),
        ("S-1-5-32-579", "BUILTIN\\Access Control Assistance Operators"),
        ("S-1-5-32-580", "BUILTIN\\Remote Management Users"),
        ("S-1-5-33", "Write Restricted"),
        ("S-1-5-4", "Interactively logged-on User"),
        ("S-1-5-6", "Service Logon User"),
        ("S-1-5-64-10", "NTLM Authentication"),
        ("S-1-5-64-14", "SChannel Authentication"),
        ("S-1-5-64-21", "Digest Authentication"),
        ("S-1-5-7", "Anonymous"),
        ("S-1-5-8", "Proxy"),
        ("S-1-5-80", "NT Service"),
        ("S-1-5-80-956008885-3418522649-1831038044-1853292631-2271478464", "TrustedInstaller"),
        ("S-1-5-84-0-0-0-0-0", "User Mode Driver"),
        ("S-1-5-86-1544737700-199408000-2549878335-3519669259-381336952", "WMI (Local Service)"),
        ("S-1-5-86-615999462-62705297-2911207457-59056572-3668589837", "WMI (Network Service)"),
        ("S-1-5-9", "Enterprise Domain Controllers"),
    ]
    .into_iter()
    .collect()
});

/// Domain-relative SIDs, matched against the whole canonical string in order.
/// The domain-specific patterns come first so they win over the generic RIDs.
const SID_PATTERNS: [(&str, &str); 15] = [
    (r"^S-1-5-21-[0-9-]+-518$", "Schema Admins"),
    (r"^S-1-5-21-[0-9-]+-519$", "Enterprise Admins"),
    (r"^S-1-5-21-[0-9-]+-553$", "RAS Servers"),
    (r"^S-1-5-[0-9-]+-500$", "Administrator"),
    (r"^S-1-5-[0-9-]+-501$", "Guest"),
    (r"^S-1-5-[0-9-]+-502$", "KRBTGT"),
    (r"^S-1-5-[0-9-]+-512$", "Domain Admins"),
    (r"^S-1-5-[0-9-]+-513$", "Domain Users"),
    (r"^S-1-5-[0-9-]+-514$", "Domain Guests"),
    (r"^S-1-5-[0-9-]+-515$", "Domain Computers"),
    (r"^S-1-5-[0-9-]+-516$", "Domain Controllers"),
    (r"^S-1-5-[0-9-]+-517$", "Cert Publishers"),
    (r"^S-1-5-[0-9-]+-520$", "Group Policy Creator Owners"),
    (r"^S-1-5-[0-9-]+-533$", "RAS and IAS Servers"),
    (r"^S-1-5-5-[0-9]+-[0-9]+$", "Logon Session"),
];

static WELL_KNOWN_SID_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    SID_PATTERNS
        .iter()
        .filter_map(|(pattern, name)| Regex::new(pattern).ok().map(|re| (re, *name)))
        .collect()
});

/// Control access rights, property sets, validated writes and common schema
/// classes, keyed by lowercase canonical GUID.
static WELL_KNOWN_GUIDS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        // Extended rights
        ("ee914b82-0a98-11d1-adbb-00c04fd8d5cd", "Abandon Replication"),
        ("440820ad-65b4-11d1-a3da-0000f875ae0d", "Add GUID"),
        ("1abd7cf8-0a99-11d1-adbb-00c04fd8d5cd", "Allocate Rids"),
        ("68b1d179-0d15-4d4f-ab71-46152e79a7bc", "Allowed to Authenticate"),
        ("edacfd8f-ffb3-11d1-b41d-00a0c968f939", "Apply Group Policy"),
        ("0e10c968-78fb-11d2-90d4-00c04f79dc55", "Certificate-Enrollment"),
        ("014bf69c-7b3b-11d1-85f6-08002be74fab", "Change Domain Master"),
        ("cc17b1fb-33d9-11d2-97d4-00c04fd8d5cd", "Change Infrastructure Master"),
        ("bae50096-4752-11d1-9052-00c04fc2d4cf", "Change PDC"),
        ("d58d5f36-0a98-11d1-adbb-00c04fd8d5cd", "Change Rid Master"),
        ("e12b56b6-0a95-11d1-adbb-00c04fd8d5cd", "Change-Schema-Master"),
        ("e2a36dc9-ae17-47c3-b58b-be34c55ba633", "Create Inbound Forest Trust"),
        ("fec364e0-0a98-11d1-adbb-00c04fd8d5cd", "Do Garbage Collection"),
        ("ab721a52-1e2f-11d0-9819-00aa0040529b", "Domain-Administer-Server"),
        ("69ae6200-7f46-11d2-b9ad-00c04f79f805", "Check Stale Phantoms"),
        ("3e0f7e18-2c7a-4c10-ba82-4d926db99a3e", "Allow a DC to create a clone of itself"),
        ("2f16c4a5-b98e-432c-952a-cb388ba33f2e", "Execute Forest Update Script"),
        ("9923a32a-3607-11d2-b9be-0000f87a36b2", "Add/Remove Replica In Domain"),
        ("4ecc03fe-ffc0-4947-b630-eb672a8a9dbc", "Query Self Quota"),
        ("1131f6aa-9c07-11d1-f79f-00c04fc2dcd2", "Replicating Directory Changes"),
        ("1131f6ad-9c07-11d1-f79f-00c04fc2dcd2", "Replicating Directory Changes All"),
        ("89e95b76-444d-4c62-991a-0facbeda640c", "Replicating Directory Changes In Filtered Set"),
        ("1131f6ac-9c07-11d1-f79f-00c04fc2dcd2", "Manage Replication Topology"),
        ("f98340fb-7c5b-4cdb-a00b-2ebdfa115a96", "Monitor Active Directory Replication"),
        ("1131f6ab-9c07-11d1-f79f-00c04fc2dcd2", "Replication Synchronization"),
        ("05c74c5e-4deb-43b4-bd9f-86664c2a7fd5", "Enable Per User Reversibly Encrypted Password"),
        ("b7b1b3de-ab09-4242-9e30-9980e5d322f7", "Generate Resultant Set of Policy (Logging)"),
        ("b7b1b3dd-ab09-4242-9e30-9980e5d322f7", "Generate Resultant Set of Policy (Planning)"),
        ("7c0e2a7c-a419-48e4-a995-10180aad54dd", "Manage Optional Features for Active Directory"),
        ("ba33815a-4f93-4c76-87f3-57574bff8109", "Migrate SID History"),
        ("b4e60130-df3f-11d1-9c86-006008764d0e", "Open Connector Queue"),
        ("06bd3201-df3e-11d1-9c86-006008764d0e", "Allows peeking at messages in the queue."),
        ("4b6e08c3-df3c-11d1-9c86-006008764d0e", "msmq-Peek-computer-Journal"),
        ("4b6e08c1-df3c-11d1-9c86-006008764d0e", "Peek Dead Letter"),
        ("06bd3200-df3e-11d1-9c86-006008764d0e", "Receive Message"),
        ("4b6e08c2-df3c-11d1-9c86-006008764d0e", "Receive Computer Journal"),
        ("4b6e08c0-df3c-11d1-9c86-006008764d0e", "Receive Dead Letter"),
        ("06bd3203-df3e-11d1-9c86-006008764d0e", "Receive Journal"),
        ("06bd3202-df3e-11d1-9c86-006008764d0e", "Send Message"),
        ("a1990816-4298-11d1-ade2-00c04fd8d5cd", "Open Address List"),
        ("1131f6ae-9c07-11d1-f79f-00c04fc2dcd2", "Read Only Replication Secret Synchronization"),
        ("45ec5156-db7e-47bb-b53f-dbeb2d03c40f", "Reanimate Tombstones"),
        ("0bc1554e-0a99-11d1-adbb-00c04fd8d5cd", "Recalculate Hierarchy"),
        ("62dd28a8-7f46-11d2-b9ad-00c04f79f805", "Recalculate Security Inheritance"),
        ("ab721a56-1e2f-11d0-9819-00aa0040529b", "Receive As"),
        ("9432c620-033c-4db7-8b58-14ef6d0bf477", "Refresh Group Cache for Logons"),
        ("1a60ea8d-58a6-4b20-bcdc-fb71eb8a9ff8", "Reload SSL/TLS Certificate"),
        ("7726b9d5-a4b4-4288-a6b2-dce952e80a7f", "Run Protect Admin Groups Task"),
        ("91d67418-0135-4acc-8d79-c08e857cfbec", "Enumerate Entire SAM Domain"),
        ("ab721a54-1e2f-11d0-9819-00aa0040529b", "Send As"),
        ("ab721a55-1e2f-11d0-9819-00aa0040529b", "Send To"),
        ("ccc2dc7d-a6ad-4a7a-8846-c04e3cc53501", "Unexpire Password"),
        ("280f369c-67c7-438e-ae98-1d46f3c6f541", "Update Password Not Required Bit"),
        ("be2bb760-7f46-11d2-b9ad-00c04f79f805", "Update Schema Cache"),
        ("ab721a53-1e2f-11d0-9819-00aa0040529b", "Change Password"),
        ("00299570-246d-11d0-a768-00aa006e0529", "Reset Password"),

        // Property sets
        ("72e39547-7b18-11d1-adef-00c04fd8d5cd", "DNS Host Name Attributes"),
        ("b8119fd0-04f6-4762-ab7a-4986c76b3f9a", "Other Domain Parameters (for use by SAM)"),
        ("c7407360-20bf-11d0-a768-00aa006e0529", "Domain Password & Lockout Policies"),
        ("e45795b2-9455-11d1-aebd-0000f80367c1", "Phone and Mail Options"),
        ("59ba2f42-79a2-11d0-9020-00c04fc2d3cf", "General Information"),
        ("bc0ac240-79a9-11d0-9020-00c04fc2d4cf", "Group Membership"),
        ("ffa6f046-ca4b-4feb-b40d-04dfee722543", "MS-TS-GatewayAccess"),
        ("77b5b886-944a-11d1-aebd-0000f80367c1", "Personal Information"),
        ("91e647de-d96f-4b70-9557-d63ff4f3ccd8", "Private Information"),
        ("e48d0154-bcf8-11d1-8702-00c04fb96050", "Public Information"),
        ("037088f8-0ae1-11d2-b422-00a0c968f939", "Remote Access Information"),
        ("5805bc62-bdc9-4428-a5e2-856a0f4c185e", "Terminal Server License Server"),
        ("4c164200-20c0-11d0-a768-00aa006e0529", "Account Restrictions"),
        ("5f202010-79a5-11d0-9020-00c04fc2d4cf", "Logon Information"),
        ("e45795b3-9455-11d1-aebd-0000f80367c1", "Web Information"),

        // Validated writes
        ("bf9679c0-0de6-11d0-a285-00aa003049e2", "Add/Remove self as member"),
        ("80863791-dbe9-4eb8-837e-7f0ab55d9ac7", "Validated write to MS DS Additional DNS Host Name"),
        ("d31a8757-2447-4545-8081-3bb610cacbf2", "Validated write to MS DS behavior version"),
        ("f3a64788-5306-11d1-a9c5-0000f80367c1", "Validated write to service principal name"),

        // Schema classes
        ("bf967aa5-0de6-11d0-a285-00aa003049e2", "OrganizationalUnits"),
        ("bf967a86-0de6-11d0-a285-00aa003049e2", "Computer"),
        ("bf967aba-0de6-11d0-a285-00aa003049e2", "User"),
        ("bf967a9c-0de6-11d0-a285-00aa003049e2", "Groups"),
        ("5cb41ed0-0e4c-11d0-a286-00aa003049e2", "Contacts"),
        ("bf967a7f-0de6-11d0-a285-00aa003049e2", "UserCertificate"),
        ("6db69a1c-9422-11d1-aebd-0000f80367c1", "Terminal Server"),
        ("46a9b11d-60ae-405a-b7e8-ff8a58d456d2", "tokenGroupsGlobalAndUniversal"),
        ("4828cc14-1437-45bc-9b07-ad6f015e5f28", "inetOrgPerson"),
    ]
    .into_iter()
    .collect()
});

/// Looks up a canonical SID string, first exactly, then against the
/// domain-relative patterns.
pub fn sid_name(canonical: &str) -> Option<&'static str> {
    if let Some(name) = WELL_KNOWN_SIDS.get(canonical) {
        return Some(name);
    }

    WELL_KNOWN_SID_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(canonical))
        .map(|(_, name)| *name)
}

pub fn guid_name(canonical: &str) -> Option<&'static str> {
    WELL_KNOWN_GUIDS.get(canonical).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_compiles() {
        for (pattern, _) in &SID_PATTERNS {
            assert!(Regex::new(pattern).is_ok(), "{}", pattern);
        }
        assert_eq!(WELL_KNOWN_SID_PATTERNS.len(), SID_PATTERNS.len());
    }

    #[test]
    fn exact_entries_win_over_patterns() {
        assert_eq!(sid_name("S-1-5-21-0-0-0-500"), Some("Local Administrator"));
        assert_eq!(sid_name("S-1-5-21-9-9-9-500"), Some("Administrator"));
    }

    #[test]
    fn patterns_are_anchored() {
        assert_eq!(sid_name("S-1-5-21-9-9-9-5001"), None);
        assert_eq!(sid_name("S-1-5-21-9-9-9-519"), Some("Enterprise Admins"));
        assert_eq!(sid_name("S-1-5-5-0-123456"), Some("Logon Session"));
    }

    #[test]
    fn guid_lookup() {
        assert_eq!(guid_name("00299570-246d-11d0-a768-00aa006e0529"), Some("Reset Password"));
        assert_eq!(guid_name("bf967aba-0de6-11d0-a285-00aa003049e2"), Some("User"));
        assert_eq!(guid_name(""), None);
    }
}
