//! Sets of trusted root certificates.
//!
//! Provides [`AnchorSet`] for loading and querying anchor certificates,
//! matching OpenSSL's trust store discovery behavior for the system set.

use crate::fields::Certificate;
use crate::CertinfoError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Well-known CA bundle file paths, in order of preference.
pub(crate) const KNOWN_CA_BUNDLE_PATHS: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt", // Debian/Ubuntu
    "/etc/pki/tls/certs/ca-bundle.crt",   // RHEL/CentOS/Fedora
    "/etc/ssl/ca-bundle.pem",             // openSUSE
    "/etc/ssl/cert.pem",                  // macOS, Alpine
];

/// Well-known CA certificate directory paths.
pub(crate) const KNOWN_CA_DIR_PATHS: &[&str] = &["/etc/ssl/certs"];

/// Matches `.pem`, `.crt`, `.cer` and OpenSSL hash links (`XXXXXXXX.N`).
fn is_pem_cert_file(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e,
        None => return false,
    };
    matches!(ext, "pem" | "crt" | "cer")
        || (ext.len() == 1 && ext.bytes().next().is_some_and(|b| b.is_ascii_digit()))
}

/// A set of anchor certificates indexed by raw subject name.
#[derive(Clone, Default)]
pub struct AnchorSet {
    by_subject: HashMap<Vec<u8>, Vec<Certificate>>,
    count: usize,
}

impl std::fmt::Debug for AnchorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorSet")
            .field("count", &self.count)
            .finish()
    }
}

impl AnchorSet {
    /// Create an empty anchor set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the system anchors.
    ///
    /// Searches, in order: `SSL_CERT_FILE`, the bundle found by
    /// `openssl-probe`, [`KNOWN_CA_BUNDLE_PATHS`], then `SSL_CERT_DIR`, the
    /// probed directory and [`KNOWN_CA_DIR_PATHS`].
    pub fn system() -> Result<Self, CertinfoError> {
        let mut set = AnchorSet::new();

        if let Some(bundle_path) = find_system_ca_bundle() {
            if let Ok(data) = std::fs::read(&bundle_path) {
                if set.add_pem_bundle(&data)? > 0 {
                    tracing::debug!(path = %bundle_path.display(), anchors = set.len(), "loaded system CA bundle");
                    return Ok(set);
                }
            }
        }

        let probe = openssl_probe::probe();
        let dir_candidates = std::env::var("SSL_CERT_DIR")
            .ok()
            .into_iter()
            .chain(
                probe
                    .cert_dir
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned()),
            )
            .chain(KNOWN_CA_DIR_PATHS.iter().map(|s| (*s).to_string()));

        for dir in dir_candidates {
            if let Ok(added) = set.add_pem_directory(Path::new(&dir)) {
                if added > 0 {
                    tracing::debug!(dir = %dir, anchors = added, "loaded system CA directory");
                    return Ok(set);
                }
            }
        }

        Err(CertinfoError::TrustStore(
            "no system trust store found".into(),
        ))
    }

    /// Create an anchor set from a PEM bundle.
    pub fn from_pem(pem_data: &[u8]) -> Result<Self, CertinfoError> {
        let mut set = AnchorSet::new();
        set.add_pem_bundle(pem_data)?;
        Ok(set)
    }

    /// Create an anchor set from a PEM file.
    pub fn from_pem_file(path: &Path) -> Result<Self, CertinfoError> {
        let data = std::fs::read(path).map_err(|e| {
            CertinfoError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        Self::from_pem(&data)
    }

    /// Add a parsed certificate. Duplicates are ignored.
    pub fn add(&mut self, cert: Certificate) {
        let entry = self.by_subject.entry(cert.subject_raw.clone()).or_default();
        if !entry.contains(&cert) {
            entry.push(cert);
            self.count += 1;
        }
    }

    /// Add all certificates of a PEM bundle. Returns how many were added.
    pub fn add_pem_bundle(&mut self, pem_data: &[u8]) -> Result<usize, CertinfoError> {
        let before = self.count;
        for cert in crate::parse_pem_chain(pem_data)? {
            self.add(cert);
        }
        Ok(self.count - before)
    }

    /// Load certificates from a directory of PEM files (like OpenSSL's -CApath).
    pub fn add_pem_directory(&mut self, dir: &Path) -> Result<usize, CertinfoError> {
        let mut total = 0;
        let entries = std::fs::read_dir(dir).map_err(|e| {
            CertinfoError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", dir.display(), e),
            ))
        })?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_pem_cert_file(&path) {
                if let Ok(data) = std::fs::read(&path) {
                    if let Ok(added) = self.add_pem_bundle(&data) {
                        total += added;
                    }
                }
            }
        }
        Ok(total)
    }

    /// Anchors whose subject is the given raw DER name.
    pub fn find_by_subject_raw(&self, subject_raw: &[u8]) -> &[Certificate] {
        self.by_subject
            .get(subject_raw)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether the exact certificate is an anchor.
    pub fn contains(&self, cert: &Certificate) -> bool {
        self.find_by_subject_raw(&cert.subject_raw).contains(cert)
    }

    /// All anchors, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.by_subject.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Find the system CA bundle path (same location OpenSSL uses).
///
/// Checks, in order:
/// 1. `SSL_CERT_FILE` environment variable
/// 2. Path discovered by `openssl-probe`
/// 3. Well-known bundle file paths ([`KNOWN_CA_BUNDLE_PATHS`])
pub fn find_system_ca_bundle() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SSL_CERT_FILE") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Some(p);
        }
    }

    let probe = openssl_probe::probe();
    if let Some(file) = probe.cert_file {
        let path = PathBuf::from(&file);
        if path.exists() {
            return Some(path);
        }
    }

    KNOWN_CA_BUNDLE_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}
