//! Stapled OCSP response model.
//!
//! The response is decoded and verified by the TLS backend; this module only
//! holds the fields the report needs.

use serde::Serialize;
use x509_parser::der_parser::asn1_rs::{Any, Class};
use x509_parser::prelude::*;

/// Top-level OCSP response status (RFC 6960 Section 4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OcspResponseStatus {
    Successful,
    MalformedRequest,
    InternalError,
    TryLater,
    SigRequired,
    Unauthorized,
}

impl OcspResponseStatus {
    /// Map the ENUMERATED wire value.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Successful),
            1 => Some(Self::MalformedRequest),
            2 => Some(Self::InternalError),
            3 => Some(Self::TryLater),
            5 => Some(Self::SigRequired),
            6 => Some(Self::Unauthorized),
            _ => None,
        }
    }
}

impl std::fmt::Display for OcspResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Successful => "successful",
            Self::MalformedRequest => "malformedRequest",
            Self::InternalError => "internalError",
            Self::TryLater => "tryLater",
            Self::SigRequired => "sigRequired",
            Self::Unauthorized => "unauthorized",
        };
        f.write_str(s)
    }
}

/// Revocation status of the leaf as asserted by the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OcspCertStatus {
    Good,
    Revoked,
    Unknown,
}

impl std::fmt::Display for OcspCertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Good => "good",
            Self::Revoked => "revoked",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// The SingleResponse covering the leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OcspSingleResponse {
    pub cert_status: OcspCertStatus,
    /// Serial of the certificate the response is about.
    pub serial_number: String,
    pub this_update: String,
    pub next_update: Option<String>,
}

/// An OCSP response stapled to the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OcspStaple {
    pub status: OcspResponseStatus,
    /// Responder name (one line) or key hash (hex), when present.
    pub responder_id: Option<String>,
    /// Only present for successful responses that cover the leaf.
    pub single_response: Option<OcspSingleResponse>,
    /// The response as received.
    #[serde(skip)]
    pub der: Vec<u8>,
}

impl OcspStaple {
    pub fn is_successful(&self) -> bool {
        self.status == OcspResponseStatus::Successful
    }
}

/// Extract the ResponderID of a DER-encoded OCSPResponse.
///
/// Returns `None` for non-successful responses and anything malformed.
pub fn responder_id_from_der(der: &[u8]) -> Option<String> {
    let (_, response) = Any::from_der(der).ok()?;
    let fields = children(response.data)?;
    let response_bytes = fields
        .iter()
        .find(|f| f.class() == Class::ContextSpecific && f.tag().0 == 0)?;

    // responseBytes: SEQUENCE { responseType OID, response OCTET STRING }
    let (_, response_bytes) = Any::from_der(response_bytes.data).ok()?;
    let octets = children(response_bytes.data)?.into_iter().nth(1)?;

    // BasicOCSPResponse: SEQUENCE { tbsResponseData, ... }
    let (_, basic) = Any::from_der(octets.data).ok()?;
    let tbs = children(basic.data)?.into_iter().next()?;
    let id = children(tbs.data)?
        .into_iter()
        .find(|f| f.class() == Class::ContextSpecific && matches!(f.tag().0, 1 | 2))?;

    if id.tag().0 == 1 {
        let (_, name) = X509Name::from_der(id.data).ok()?;
        Some(crate::parser::build_dn(&name).to_oneline())
    } else {
        let (_, key_hash) = Any::from_der(id.data).ok()?;
        Some(hex::encode_upper(key_hash.data))
    }
}

fn children(mut data: &[u8]) -> Option<Vec<Any<'_>>> {
    let mut out = Vec::new();
    while !data.is_empty() {
        let (rest, any) = Any::from_der(data).ok()?;
        out.push(any);
        data = rest;
    }
    Some(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
        assert!(content.len() < 0x80);
        let mut out = vec![tag, content.len() as u8];
        out.extend_from_slice(content);
        out
    }

    // OCSPResponse with only the fields needed to reach the ResponderID.
    fn response_with_responder(responder: Vec<u8>) -> Vec<u8> {
        let produced_at = tlv(0x18, b"20240101000000Z");
        let tbs = tlv(0x30, &[responder, produced_at, tlv(0x30, &[])].concat());
        let basic = tlv(0x30, &tbs);
        let oid_basic = tlv(
            0x06,
            &[0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x30, 0x01, 0x01],
        );
        let response_bytes = tlv(0x30, &[oid_basic, tlv(0x04, &basic)].concat());
        tlv(
            0x30,
            &[tlv(0x0a, &[0x00]), tlv(0xa0, &response_bytes)].concat(),
        )
    }

    #[test]
    fn responder_by_key_is_hex() {
        let by_key = tlv(0xa2, &tlv(0x04, &[0xde, 0xad, 0xbe, 0xef]));
        let der = response_with_responder(by_key);
        assert_eq!(responder_id_from_der(&der).as_deref(), Some("DEADBEEF"));
    }

    #[test]
    fn responder_by_name_is_one_line() {
        // Name: SEQUENCE { SET { SEQUENCE { OID CN, UTF8String "ocsp" } } }
        let cn = tlv(
            0x30,
            &[tlv(0x06, &[0x55, 0x04, 0x03]), tlv(0x0c, b"ocsp")].concat(),
        );
        let name = tlv(0x30, &tlv(0x31, &cn));
        let der = response_with_responder(tlv(0xa1, &name));
        assert_eq!(responder_id_from_der(&der).as_deref(), Some("CN = ocsp"));
    }

    #[test]
    fn unsuccessful_response_has_no_responder() {
        let der = tlv(0x30, &tlv(0x0a, &[0x03]));
        assert_eq!(responder_id_from_der(&der), None);
        assert_eq!(responder_id_from_der(b"junk"), None);
    }

    #[test]
    fn status_codes_map_and_display() {
        assert_eq!(
            OcspResponseStatus::from_code(0),
            Some(OcspResponseStatus::Successful)
        );
        assert_eq!(OcspResponseStatus::from_code(4), None);
        assert_eq!(OcspResponseStatus::TryLater.to_string(), "tryLater");
        assert_eq!(OcspCertStatus::Revoked.to_string(), "revoked");
    }
}
