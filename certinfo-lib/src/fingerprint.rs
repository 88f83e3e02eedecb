//! Certificate fingerprint and public-key pin computation.

use crate::fields::DigestAlgorithm;
use base64::Engine;
use digest::Digest;

/// Compute the fingerprint of DER-encoded certificate bytes.
///
/// Returns a colon-separated uppercase hex string (e.g., "AB:CD:EF:...").
pub fn compute_fingerprint(der_bytes: &[u8], algorithm: DigestAlgorithm) -> String {
    let hash_bytes: Vec<u8> = match algorithm {
        DigestAlgorithm::Sha256 => sha2::Sha256::digest(der_bytes).to_vec(),
        DigestAlgorithm::Sha1 => sha1::Sha1::digest(der_bytes).to_vec(),
    };
    crate::util::hex_colon_upper(&hash_bytes)
}

/// Compute the HPKP pin (RFC 7469) of a DER-encoded SubjectPublicKeyInfo:
/// the standard base64 encoding of its SHA-256 digest.
pub fn compute_hpkp_pin(spki_der: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(sha2::Sha256::digest(spki_der))
}
