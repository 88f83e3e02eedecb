//! Certificate data types and field extraction.

use crate::oid;
use serde::Serialize;

/// Digest algorithm for fingerprint computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha1,
}

/// A parsed X.509 certificate as received from a server or loaded from a
/// trust store.
///
/// Two certificates are the same certificate when their DER encodings are
/// identical.
#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    /// Certificate version (1, 2, or 3).
    pub version: u32,
    /// Serial number as a colon-separated hex string.
    pub serial: String,
    /// Signature algorithm name.
    pub signature_algorithm: String,
    /// Signature algorithm OID in dotted-decimal form.
    pub signature_algorithm_oid: String,
    /// Issuer distinguished name.
    pub issuer: DistinguishedName,
    /// Subject distinguished name.
    pub subject: DistinguishedName,
    /// Validity start date.
    pub not_before: DateTime,
    /// Validity end date.
    pub not_after: DateTime,
    /// Public key information.
    pub public_key: PublicKeyInfo,
    /// X.509v3 extensions.
    pub extensions: Vec<Extension>,
    /// SHA-1 fingerprint of the DER encoding.
    pub sha1_fingerprint: String,
    /// HPKP pin: base64 SHA-256 digest of the SubjectPublicKeyInfo.
    pub hpkp_pin: String,
    /// PEM encoding of the certificate.
    pub pem: String,
    /// Raw signature bytes (hex-encoded).
    #[serde(skip)]
    pub signature_hex: String,

    /// Raw DER-encoded subject name, used for chain linkage.
    #[serde(skip)]
    pub subject_raw: Vec<u8>,
    /// Raw DER-encoded issuer name, used for chain linkage.
    #[serde(skip)]
    pub issuer_raw: Vec<u8>,
    /// Raw DER bytes of the entire certificate.
    #[serde(skip)]
    pub raw_der: Vec<u8>,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.raw_der == other.raw_der
    }
}

impl Eq for Certificate {}

impl std::hash::Hash for Certificate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw_der.hash(state);
    }
}

/// Distinguished name with ordered components.
#[derive(Debug, Clone, Serialize)]
pub struct DistinguishedName {
    /// Ordered list of (attribute_type, value) pairs.
    /// Attribute types use short names where known (e.g., "CN", "O", "C").
    pub components: Vec<(String, String)>,
}

impl DistinguishedName {
    /// Format as a comma-separated one-line string matching OpenSSL's default format.
    /// Example: "C = US, O = Org, CN = example.com"
    ///
    /// Values containing commas, equals signs, or backslashes are escaped
    /// to prevent ambiguous output.
    pub fn to_oneline(&self) -> String {
        let mut result = String::new();
        for (i, (k, v)) in self.components.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            result.push_str(k);
            result.push_str(" = ");
            for ch in v.chars() {
                match ch {
                    '\\' => result.push_str("\\\\"),
                    ',' => result.push_str("\\,"),
                    '=' => result.push_str("\\="),
                    _ => result.push(ch),
                }
            }
        }
        result
    }

    /// Value of the first attribute with the given short name.
    pub fn get(&self, short_name: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|(k, _)| k == short_name)
            .map(|(_, v)| v.as_str())
    }

    /// The Common Name, if present.
    pub fn common_name(&self) -> Option<&str> {
        self.get("CN")
    }

    /// A short human-readable label: the CN, else O, else OU, else the
    /// whole name on one line.
    pub fn printable(&self) -> String {
        self.get("CN")
            .or_else(|| self.get("O"))
            .or_else(|| self.get("OU"))
            .map(str::to_string)
            .unwrap_or_else(|| self.to_oneline())
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_oneline())
    }
}

/// Public key information.
#[derive(Debug, Clone, Serialize)]
pub struct PublicKeyInfo {
    /// Algorithm name: "RSA", "EC", "Ed25519", etc.
    pub algorithm: String,
    /// Key size in bits (e.g., 2048 for RSA, 256 for P-256).
    pub key_size: Option<u32>,
    /// Named curve for EC keys (e.g., "P-256", "P-384").
    pub curve: Option<String>,
    /// RSA modulus as hex string (only for RSA keys).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modulus: Option<String>,
    /// RSA exponent (only for RSA keys, typically 65537).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exponent: Option<u64>,
    /// DER-encoded SubjectPublicKeyInfo.
    #[serde(skip)]
    pub spki_der: Vec<u8>,
}

/// A certificate extension.
#[derive(Debug, Clone, Serialize)]
pub struct Extension {
    /// OID as a dotted-decimal string.
    pub oid: String,
    /// Human-readable name (or OID string if unknown).
    pub name: String,
    /// Whether this extension is marked critical.
    pub critical: bool,
    /// Parsed extension value.
    pub value: ExtensionValue,
}

/// Strongly-typed extension values.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum ExtensionValue {
    BasicConstraints {
        ca: bool,
        path_len: Option<u32>,
    },
    KeyUsage(Vec<String>),
    ExtendedKeyUsage(Vec<String>),
    SubjectAltName(Vec<SanEntry>),
    SubjectKeyIdentifier(String),
    AuthorityKeyIdentifier {
        key_id: Option<String>,
    },
    AuthorityInfoAccess(Vec<AiaEntry>),
    CrlDistributionPoints(Vec<String>),
    CertificatePolicies(Vec<String>),
    /// Fallback for extensions we don't parse into a specific variant.
    Raw(String),
}

/// Subject Alternative Name entry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum SanEntry {
    Dns(String),
    Email(String),
    Ip(String),
    Uri(String),
    DirName(String),
    Other(String),
}

impl std::fmt::Display for SanEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SanEntry::Dns(v) => write!(f, "DNS:{}", v),
            SanEntry::Email(v) => write!(f, "email:{}", v),
            SanEntry::Ip(v) => write!(f, "IP Address:{}", v),
            SanEntry::Uri(v) => write!(f, "URI:{}", v),
            SanEntry::DirName(v) => write!(f, "DirName:{}", v),
            SanEntry::Other(v) => write!(f, "othername:{}", v),
        }
    }
}

/// Authority Information Access entry.
#[derive(Debug, Clone, Serialize)]
pub struct AiaEntry {
    /// Access method: "OCSP" or "CA Issuers".
    pub method: String,
    /// Access location (usually a URI).
    pub location: String,
}

/// Date-time representation.
#[derive(Debug, Clone, Serialize)]
pub struct DateTime {
    /// ISO 8601 formatted string.
    pub iso8601: String,
    /// Unix timestamp.
    pub timestamp: i64,
}

impl DateTime {
    /// Format in OpenSSL's default date style: `Feb  3 23:57:06 2026 GMT`.
    pub fn to_openssl(&self) -> String {
        match ::time::OffsetDateTime::from_unix_timestamp(self.timestamp) {
            Ok(dt) => {
                let month = match u8::from(dt.month()) {
                    1 => "Jan",
                    2 => "Feb",
                    3 => "Mar",
                    4 => "Apr",
                    5 => "May",
                    6 => "Jun",
                    7 => "Jul",
                    8 => "Aug",
                    9 => "Sep",
                    10 => "Oct",
                    11 => "Nov",
                    12 => "Dec",
                    _ => "???",
                };
                format!(
                    "{} {:2} {:02}:{:02}:{:02} {} GMT",
                    month,
                    dt.day(),
                    dt.hour(),
                    dt.minute(),
                    dt.second(),
                    dt.year()
                )
            }
            Err(_) => self.iso8601.clone(),
        }
    }
}

impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_openssl())
    }
}

impl Certificate {
    /// Return the subject as a one-line string.
    pub fn subject_string(&self) -> String {
        self.subject.to_oneline()
    }

    /// Return the issuer as a one-line string.
    pub fn issuer_string(&self) -> String {
        self.issuer.to_oneline()
    }

    /// Short label for the subject (CN where available).
    pub fn printable_subject_name(&self) -> String {
        self.subject.printable()
    }

    /// Short label for the issuer (CN where available).
    pub fn printable_issuer_name(&self) -> String {
        self.issuer.printable()
    }

    /// Return the serial number as a colon-separated hex string (e.g., "10:00").
    pub fn serial_hex(&self) -> &str {
        &self.serial
    }

    /// Return the notBefore date as a string (OpenSSL format).
    pub fn not_before_string(&self) -> String {
        self.not_before.to_openssl()
    }

    /// Return the notAfter date as a string (OpenSSL format).
    pub fn not_after_string(&self) -> String {
        self.not_after.to_openssl()
    }

    /// Compute the fingerprint of the certificate using the given digest algorithm.
    pub fn fingerprint(&self, algorithm: DigestAlgorithm) -> String {
        crate::fingerprint::compute_fingerprint(&self.raw_der, algorithm)
    }

    /// Whether subject and issuer are the same name.
    pub fn is_self_issued(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }

    /// Whether `issuer`'s subject is this certificate's issuer name.
    ///
    /// This is name linkage only; signatures are not checked.
    pub fn is_issued_by(&self, issuer: &Certificate) -> bool {
        self.issuer_raw == issuer.subject_raw
    }

    /// Whether the certificate is signed with a SHA-1 based algorithm.
    pub fn is_sha1_signed(&self) -> bool {
        oid::SHA1_SIGNATURE_ALGORITHMS.contains(&self.signature_algorithm_oid.as_str())
            || self.signature_algorithm.to_ascii_lowercase().contains("sha1")
    }

    /// Extract all SAN entries.
    pub fn san_entries(&self) -> Vec<&SanEntry> {
        self.extensions
            .iter()
            .find_map(|ext| match &ext.value {
                ExtensionValue::SubjectAltName(entries) => Some(entries.iter().collect()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// DNS names from the SAN extension.
    pub fn dns_names(&self) -> Vec<&str> {
        self.san_entries()
            .into_iter()
            .filter_map(|e| match e {
                SanEntry::Dns(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Policy OIDs from the Certificate Policies extension.
    pub fn policy_oids(&self) -> Vec<&str> {
        self.extensions
            .iter()
            .find_map(|ext| match &ext.value {
                ExtensionValue::CertificatePolicies(oids) => {
                    Some(oids.iter().map(String::as_str).collect())
                }
                _ => None,
            })
            .unwrap_or_default()
    }
}
