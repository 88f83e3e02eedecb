//! A named, versioned trust store.

use super::anchors::AnchorSet;
use crate::fields::Certificate;
use crate::CertinfoError;
use serde::ser::SerializeStruct;
use std::path::{Path, PathBuf};

/// Name given to a store built from `--ca-file`.
pub const CUSTOM_STORE_NAME: &str = "Custom --ca-file";
/// Version label of a store built from `--ca-file`.
pub const CUSTOM_STORE_VERSION: &str = "N/A";

/// A trust store: an identity plus the anchors it trusts.
///
/// Equality and hashing only consider the identity `(name, version)`.
#[derive(Debug, Clone)]
pub struct TrustStore {
    /// Display name, e.g. "Mozilla".
    pub name: String,
    /// Version label of the anchor set.
    pub version: String,
    /// File the anchors were loaded from, if any.
    pub path: Option<PathBuf>,
    /// The trusted anchors.
    pub anchors: AnchorSet,
    /// Certificate policy OIDs that mark a leaf as Extended Validation.
    /// Empty for stores that do not attribute EV.
    pub ev_policy_oids: Vec<String>,
}

impl TrustStore {
    pub fn new(name: impl Into<String>, version: impl Into<String>, anchors: AnchorSet) -> Self {
        TrustStore {
            name: name.into(),
            version: version.into(),
            path: None,
            anchors,
            ev_policy_oids: Vec::new(),
        }
    }

    /// Load a store from a PEM bundle on disk.
    pub fn from_pem_file(
        name: impl Into<String>,
        version: impl Into<String>,
        path: &Path,
    ) -> Result<Self, CertinfoError> {
        let anchors = AnchorSet::from_pem_file(path)?;
        if anchors.is_empty() {
            return Err(CertinfoError::TrustStore(format!(
                "{}: no certificates found",
                path.display()
            )));
        }
        let mut store = TrustStore::new(name, version, anchors);
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Store built from a user-supplied CA file.
    pub fn custom(path: &Path) -> Result<Self, CertinfoError> {
        Self::from_pem_file(CUSTOM_STORE_NAME, CUSTOM_STORE_VERSION, path)
    }

    pub fn with_ev_policy_oids(mut self, oids: Vec<String>) -> Self {
        self.ev_policy_oids = oids;
        self
    }

    /// Whether the leaf asserts one of this store's EV policies.
    pub fn is_extended_validation(&self, leaf: &Certificate) -> bool {
        leaf.policy_oids()
            .iter()
            .any(|oid| self.ev_policy_oids.iter().any(|ev| ev == oid))
    }
}

impl PartialEq for TrustStore {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl Eq for TrustStore {}

impl std::hash::Hash for TrustStore {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
    }
}

impl std::fmt::Display for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.version)
    }
}

impl serde::Serialize for TrustStore {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("TrustStore", 3)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("version", &self.version)?;
        s.serialize_field("path", &self.path)?;
        s.end()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn leaf_with_policy(policy: Option<&str>) -> Certificate {
        let mut params = rcgen::CertificateParams::new(vec!["ev.test".to_string()]).unwrap();
        if let Some(policy) = policy {
            let arcs: Vec<u64> = policy.split('.').map(|a| a.parse().unwrap()).collect();
            // certificatePolicies: SEQUENCE { SEQUENCE { OID } }
            let oid_der = encode_oid(&arcs);
            let info = der(0x30, &oid_der);
            params
                .custom_extensions
                .push(rcgen::CustomExtension::from_oid_content(
                    &[2, 5, 29, 32],
                    der(0x30, &info),
                ));
        }
        let key = rcgen::KeyPair::generate().unwrap();
        crate::parse_der(params.self_signed(&key).unwrap().der()).unwrap()
    }

    fn der(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = vec![tag, content.len() as u8];
        out.extend_from_slice(content);
        out
    }

    fn encode_oid(arcs: &[u64]) -> Vec<u8> {
        let mut body = vec![(arcs[0] * 40 + arcs[1]) as u8];
        for &arc in &arcs[2..] {
            let mut chunk = vec![(arc & 0x7f) as u8];
            let mut rest = arc >> 7;
            while rest > 0 {
                chunk.insert(0, (rest & 0x7f) as u8 | 0x80);
                rest >>= 7;
            }
            body.extend(chunk);
        }
        der(0x06, &body)
    }

    #[test]
    fn identity_is_name_and_version() {
        let a = TrustStore::new("Mozilla", "2024-01", AnchorSet::new());
        let mut b = TrustStore::new("Mozilla", "2024-01", AnchorSet::new());
        b.path = Some(PathBuf::from("/elsewhere.pem"));
        let c = TrustStore::new("Mozilla", "2023-06", AnchorSet::new());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "Mozilla (2024-01)");
    }

    #[test]
    fn ev_requires_a_listed_policy() {
        let store = TrustStore::new("Mozilla", "1", AnchorSet::new())
            .with_ev_policy_oids(vec!["2.23.140.1.1".into()]);
        let plain = TrustStore::new("Apple", "1", AnchorSet::new());

        let ev_leaf = leaf_with_policy(Some("2.23.140.1.1"));
        let dv_leaf = leaf_with_policy(Some("2.23.140.1.2.1"));
        let no_policy = leaf_with_policy(None);

        assert!(store.is_extended_validation(&ev_leaf));
        assert!(!store.is_extended_validation(&dv_leaf));
        assert!(!store.is_extended_validation(&no_policy));
        assert!(!plain.is_extended_validation(&ev_leaf));
    }

    #[test]
    fn custom_store_from_empty_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(TrustStore::custom(file.path()).is_err());
    }

    #[test]
    fn serializes_identity_only() {
        let store = TrustStore::new("Mozilla", "1", AnchorSet::new());
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["name"], "Mozilla");
        assert_eq!(json["version"], "1");
        assert!(json.get("anchors").is_none());
    }
}
