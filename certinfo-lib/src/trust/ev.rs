//! Extended Validation policy identifiers recognised for the primary store.

use crate::oid;

/// EV policy OIDs: the CA/Browser Forum identifier plus the CA-specific
/// identifiers that predate it and are still asserted by issued leaves.
pub const DEFAULT_EV_POLICY_OIDS: &[&str] = &[
    oid::POLICY_CABF_EV,
    "1.2.616.1.113527.2.5.1.1",          // Certum
    "1.3.159.1.17.1",                    // Actalis
    "1.3.6.1.4.1.14370.1.6",             // GeoTrust
    "1.3.6.1.4.1.4146.1.1",              // GlobalSign
    "1.3.6.1.4.1.6449.1.2.1.5.1",        // Sectigo / Comodo
    "1.3.6.1.4.1.782.1.2.1.8.1",         // Network Solutions
    "1.3.6.1.4.1.7879.13.24.1",          // T-Systems
    "1.3.6.1.4.1.8024.0.2.100.1.2",      // QuoVadis
    "2.16.578.1.26.1.3.3",               // Buypass
    "2.16.756.1.89.1.2.1.1",             // SwissSign
    "2.16.840.1.113733.1.7.23.6",        // VeriSign
    "2.16.840.1.113733.1.7.48.1",        // Thawte
    "2.16.840.1.114028.10.1.2",          // Entrust
    "2.16.840.1.114412.2.1",             // DigiCert
    "2.16.840.1.114413.1.7.23.3",        // GoDaddy
    "2.16.840.1.114414.1.7.23.3",        // Starfield
];

/// The default list as owned strings, for store construction.
pub fn default_ev_policy_oids() -> Vec<String> {
    DEFAULT_EV_POLICY_OIDS.iter().map(|s| s.to_string()).collect()
}
