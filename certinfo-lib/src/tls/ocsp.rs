//! Decoding and verifying stapled OCSP responses with OpenSSL.

use super::build_x509_store;
use crate::chain::find_leaf;
use crate::fields::Certificate;
use crate::ocsp::{
    responder_id_from_der, OcspCertStatus, OcspResponseStatus, OcspSingleResponse, OcspStaple,
};
use crate::scan::OcspVerifyError;
use crate::trust::TrustStore;
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::ocsp::{self as ssl_ocsp, OcspCertId, OcspFlag, OcspResponse};
use openssl::stack::Stack;
use openssl::x509::store::X509StoreRef;
use openssl::x509::{X509VerifyResult, X509};

/// OpenSSL failure reasons that mean the signer is not trusted, as opposed
/// to verification not being possible at all.
const UNTRUSTED_REASONS: &[&str] = &[
    "certificate verify error",
    "signer certificate not found",
    "signature failure",
    "root ca not trusted",
    "no signer key",
];

/// Decode a stapled response. `chain` is the server's chain and `anchors`
/// the store of the connection; together they locate the leaf's status.
pub(super) fn parse_staple(
    der: &[u8],
    chain: &[Certificate],
    anchors: &X509StoreRef,
) -> Result<OcspStaple, String> {
    let response = OcspResponse::from_der(der).map_err(|e| e.to_string())?;
    let code = response.status().as_raw();
    let status = OcspResponseStatus::from_code(code)
        .ok_or_else(|| format!("unknown OCSP response status {code}"))?;

    let single_response = if status == OcspResponseStatus::Successful {
        leaf_status(&response, chain, anchors)
    } else {
        None
    };

    Ok(OcspStaple {
        status,
        responder_id: responder_id_from_der(der),
        single_response,
        der: der.to_vec(),
    })
}

fn leaf_status(
    response: &OcspResponse,
    chain: &[Certificate],
    anchors: &X509StoreRef,
) -> Option<OcspSingleResponse> {
    let basic = response.basic().ok()?;
    let (leaf, leaf_x509, issuer_x509) = leaf_and_issuer(chain, anchors)?;
    let id = OcspCertId::from_cert(MessageDigest::sha1(), &leaf_x509, &issuer_x509).ok()?;
    let found = basic.find_status(&id)?;

    let cert_status = if found.status == ssl_ocsp::OcspCertStatus::GOOD {
        OcspCertStatus::Good
    } else if found.status == ssl_ocsp::OcspCertStatus::REVOKED {
        OcspCertStatus::Revoked
    } else {
        OcspCertStatus::Unknown
    };

    Some(OcspSingleResponse {
        cert_status,
        serial_number: leaf.serial.clone(),
        this_update: found.this_update.to_string(),
        next_update: found.next_update().map(|t| t.to_string()),
    })
}

/// The server's leaf and its issuer. The issuer is taken from the sent
/// chain, or from `anchors` when the server left it out.
fn leaf_and_issuer<'a>(
    chain: &'a [Certificate],
    anchors: &X509StoreRef,
) -> Option<(&'a Certificate, X509, X509)> {
    let leaf = chain.get(find_leaf(chain)?)?;
    let leaf_x509 = X509::from_der(&leaf.raw_der).ok()?;

    let issuer_x509 = match chain.iter().find(|c| *c != leaf && leaf.is_issued_by(c)) {
        Some(sent) => X509::from_der(&sent.raw_der).ok()?,
        None => anchors
            .objects()
            .iter()
            .filter_map(|object| object.x509())
            .find(|anchor| anchor.issued(&leaf_x509) == X509VerifyResult::OK)?
            .to_owned(),
    };
    Some((leaf, leaf_x509, issuer_x509))
}

/// Verify the staple's signer against `store`.
pub(super) fn verify_staple(
    staple: &OcspStaple,
    chain: &[Certificate],
    store: &TrustStore,
) -> Result<(), OcspVerifyError> {
    let other = |e: ErrorStack| OcspVerifyError::Other(e.to_string());

    let response = OcspResponse::from_der(&staple.der).map_err(other)?;
    if !staple.is_successful() {
        return Err(OcspVerifyError::Untrusted(format!(
            "response status is {}",
            staple.status
        )));
    }
    let basic = response
        .basic()
        .map_err(|e| OcspVerifyError::Untrusted(e.to_string()))?;

    let x509_store = build_x509_store(&store.anchors).map_err(other)?;
    let mut certs = Stack::new().map_err(other)?;
    for cert in chain {
        certs
            .push(X509::from_der(&cert.raw_der).map_err(other)?)
            .map_err(other)?;
    }

    basic
        .verify(&certs, &x509_store, OcspFlag::empty())
        .map_err(classify_verify_error)
}

fn classify_verify_error(e: ErrorStack) -> OcspVerifyError {
    let untrusted = e.errors().is_empty()
        || e.errors().iter().any(|err| {
            err.reason()
                .is_some_and(|reason| UNTRUSTED_REASONS.iter().any(|r| reason.contains(r)))
        });
    if untrusted {
        OcspVerifyError::Untrusted(e.to_string())
    } else {
        OcspVerifyError::Other(e.to_string())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use crate::trust::AnchorSet;

    /// OCSPResponse { responseStatus tryLater }, no responseBytes.
    const TRY_LATER: &[u8] = &[0x30, 0x03, 0x0a, 0x01, 0x03];
    /// OCSPResponse { responseStatus successful }, no responseBytes.
    const SUCCESSFUL_WITHOUT_BODY: &[u8] = &[0x30, 0x03, 0x0a, 0x01, 0x00];

    struct Issuer {
        cert: rcgen::Certificate,
        key: rcgen::KeyPair,
    }

    fn params(cn: &str, ca: bool) -> rcgen::CertificateParams {
        let mut params = rcgen::CertificateParams::default();
        params.distinguished_name = rcgen::DistinguishedName::new();
        params.distinguished_name.push(rcgen::DnType::CommonName, cn);
        if ca {
            params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        }
        params
    }

    fn root(cn: &str) -> Issuer {
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = params(cn, true).self_signed(&key).unwrap();
        Issuer { cert, key }
    }

    fn issue(cn: &str, ca: bool, by: &Issuer) -> Issuer {
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = params(cn, ca).signed_by(&key, &by.cert, &by.key).unwrap();
        Issuer { cert, key }
    }

    fn parsed(i: &Issuer) -> Certificate {
        crate::parse_der(i.cert.der()).unwrap()
    }

    fn empty_store() -> TrustStore {
        TrustStore::new("Empty", "1", AnchorSet::new())
    }

    fn x509_store(anchors: &[&Issuer]) -> openssl::x509::store::X509Store {
        let mut set = AnchorSet::new();
        for anchor in anchors {
            set.add(parsed(anchor));
        }
        build_x509_store(&set).unwrap()
    }

    fn der(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        let len = content.len();
        if len < 0x80 {
            out.push(len as u8);
        } else {
            let bytes: Vec<u8> = len
                .to_be_bytes()
                .into_iter()
                .skip_while(|b| *b == 0)
                .collect();
            out.push(0x80 | bytes.len() as u8);
            out.extend(bytes);
        }
        out.extend_from_slice(content);
        out
    }

    fn seq(parts: &[Vec<u8>]) -> Vec<u8> {
        der(0x30, &parts.concat())
    }

    fn generalized_time(text: &str) -> Vec<u8> {
        der(0x18, text.as_bytes())
    }

    /// An unsigned, successful response holding one `good` status for
    /// `leaf` as issued by `issuer`. Signature checks are not involved in
    /// locating the leaf's status.
    fn good_response(leaf: &Certificate, issuer: &Certificate, next_update: Option<&str>) -> Vec<u8> {
        use digest::Digest;

        let (_, leaf_x509) = x509_parser::parse_x509_certificate(&leaf.raw_der).unwrap();
        let (_, issuer_x509) = x509_parser::parse_x509_certificate(&issuer.raw_der).unwrap();
        let key_bits = issuer_x509.public_key().subject_public_key.data.as_ref();

        let sha1_oid = vec![0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a];
        let cert_id = seq(&[
            seq(&[sha1_oid, vec![0x05, 0x00]]),
            der(0x04, &sha1::Sha1::digest(&issuer.subject_raw)),
            der(0x04, &sha1::Sha1::digest(key_bits)),
            der(0x02, leaf_x509.tbs_certificate.raw_serial()),
        ]);

        let mut single = vec![cert_id, vec![0x80, 0x00], generalized_time("20240101000000Z")];
        if let Some(next) = next_update {
            single.push(der(0xa0, &generalized_time(next)));
        }

        let tbs = seq(&[
            der(0xa2, &der(0x04, &sha1::Sha1::digest(key_bits))),
            generalized_time("20240101000000Z"),
            seq(&[seq(&single)]),
        ]);
        let sha256_rsa = vec![0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b];
        let basic = seq(&[tbs, seq(&[sha256_rsa, vec![0x05, 0x00]]), vec![0x03, 0x02, 0x00, 0x00]]);

        let ocsp_basic_oid = vec![
            0x06, 0x09, 0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x30, 0x01, 0x01,
        ];
        let response_bytes = seq(&[ocsp_basic_oid, der(0x04, &basic)]);
        seq(&[vec![0x0a, 0x01, 0x00], der(0xa0, &response_bytes)])
    }

    #[test]
    fn missing_next_update_stays_absent() {
        let r = root("Root");
        let i = issue("Intermediate", true, &r);
        let l = issue("leaf.example", false, &i);
        let (leaf, intermediate) = (parsed(&l), parsed(&i));
        let response = good_response(&leaf, &intermediate, None);

        let staple =
            parse_staple(&response, &[leaf.clone(), intermediate], &x509_store(&[])).unwrap();
        let single = staple.single_response.unwrap();
        assert_eq!(single.cert_status, OcspCertStatus::Good);
        assert_eq!(single.serial_number, leaf.serial);
        assert!(single.this_update.contains("2024"));
        assert_eq!(single.next_update, None);
    }

    #[test]
    fn next_update_is_reported_when_present() {
        let r = root("Root");
        let i = issue("Intermediate", true, &r);
        let l = issue("leaf.example", false, &i);
        let (leaf, intermediate) = (parsed(&l), parsed(&i));
        let response = good_response(&leaf, &intermediate, Some("20240108000000Z"));

        let staple = parse_staple(&response, &[leaf, intermediate], &x509_store(&[])).unwrap();
        let next = staple.single_response.unwrap().next_update.unwrap();
        assert!(next.contains("2024"));
        assert!(!next.contains("9999"));
    }

    #[test]
    fn leaf_status_found_in_swapped_chain() {
        let r = root("Root");
        let i = issue("Intermediate", true, &r);
        let l = issue("leaf.example", false, &i);
        let (leaf, intermediate) = (parsed(&l), parsed(&i));
        let response = good_response(&leaf, &intermediate, None);

        let staple =
            parse_staple(&response, &[intermediate, leaf.clone()], &x509_store(&[])).unwrap();
        assert_eq!(staple.single_response.unwrap().serial_number, leaf.serial);
    }

    #[test]
    fn leaf_status_found_with_issuer_from_store() {
        let r = root("Root");
        let l = issue("leaf.example", false, &r);
        let (leaf, anchor) = (parsed(&l), parsed(&r));
        let response = good_response(&leaf, &anchor, None);

        let staple = parse_staple(&response, &[leaf.clone()], &x509_store(&[&r])).unwrap();
        assert_eq!(staple.single_response.unwrap().serial_number, leaf.serial);

        let staple = parse_staple(&response, &[leaf], &x509_store(&[])).unwrap();
        assert!(staple.single_response.is_none());
    }

    #[test]
    fn try_later_response_has_no_single_response() {
        let staple = parse_staple(TRY_LATER, &[], &x509_store(&[])).unwrap();
        assert_eq!(staple.status, OcspResponseStatus::TryLater);
        assert!(staple.single_response.is_none());
        assert!(staple.responder_id.is_none());
        assert_eq!(staple.der, TRY_LATER);
    }

    #[test]
    fn unsuccessful_response_is_untrusted() {
        let staple = parse_staple(TRY_LATER, &[], &x509_store(&[])).unwrap();
        match verify_staple(&staple, &[], &empty_store()) {
            Err(OcspVerifyError::Untrusted(reason)) => assert!(reason.contains("tryLater")),
            other => panic!("expected Untrusted, got {other:?}"),
        }
    }

    #[test]
    fn successful_response_without_body_is_untrusted() {
        let staple = parse_staple(SUCCESSFUL_WITHOUT_BODY, &[], &x509_store(&[])).unwrap();
        assert!(staple.is_successful());
        assert!(staple.single_response.is_none());
        assert!(matches!(
            verify_staple(&staple, &[], &empty_store()),
            Err(OcspVerifyError::Untrusted(_))
        ));
    }

    #[test]
    fn undecodable_response_is_an_other_error() {
        let staple = OcspStaple {
            status: OcspResponseStatus::Successful,
            responder_id: None,
            single_response: None,
            der: vec![0xde, 0xad, 0xbe, 0xef],
        };
        assert!(matches!(
            verify_staple(&staple, &[], &empty_store()),
            Err(OcspVerifyError::Other(_))
        ));
        assert!(parse_staple(&staple.der, &[], &x509_store(&[])).is_err());
    }

    #[test]
    fn empty_error_stack_counts_as_untrusted() {
        let stack = ErrorStack::get();
        assert!(matches!(
            classify_verify_error(stack),
            OcspVerifyError::Untrusted(_)
        ));
    }

    #[test]
    fn issuer_found_in_swapped_chain() {
        let r = root("Root");
        let i = issue("Intermediate", true, &r);
        let l = issue("leaf.example", false, &i);
        let chain = vec![parsed(&i), parsed(&l)];

        let (leaf, leaf_x509, issuer) = leaf_and_issuer(&chain, &x509_store(&[])).unwrap();
        assert_eq!(leaf.raw_der, l.cert.der().to_vec());
        assert_eq!(leaf_x509.to_der().unwrap(), l.cert.der().to_vec());
        assert_eq!(issuer.to_der().unwrap(), i.cert.der().to_vec());
    }

    #[test]
    fn issuer_falls_back_to_store_anchor() {
        let r = root("Root");
        let l = issue("leaf.example", false, &r);
        let chain = vec![parsed(&l)];

        let (_, _, issuer) = leaf_and_issuer(&chain, &x509_store(&[&r])).unwrap();
        assert_eq!(issuer.to_der().unwrap(), r.cert.der().to_vec());

        let unrelated = root("Unrelated");
        assert!(leaf_and_issuer(&chain, &x509_store(&[&unrelated])).is_none());
    }
}
