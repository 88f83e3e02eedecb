//! Shared encoding utilities.

use base64::Engine;
use crate::oid;

/// Format bytes as colon-separated uppercase hex (e.g., "AB:CD:EF").
pub fn hex_colon_upper(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Encode bytes as base64 with PEM-style 64-character line wrapping.
pub fn base64_wrap(data: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    encoded
        .as_bytes()
        .chunks(64)
        .filter_map(|c| std::str::from_utf8(c).ok())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap DER bytes in a PEM envelope with the given label.
pub fn pem_encode(label: &str, der: &[u8]) -> String {
    format!(
        "-----BEGIN {label}-----\n{}\n-----END {label}-----\n",
        base64_wrap(der)
    )
}

/// Whether the input looks like PEM (starts with `-----BEGIN` after whitespace).
pub fn is_pem(input: &[u8]) -> bool {
    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(input.len());
    input
        .get(start..)
        .is_some_and(|rest| rest.starts_with(b"-----BEGIN"))
}

/// Map a distinguished-name attribute OID to its short name ("CN", "O", ...).
///
/// Unknown OIDs are returned in dotted-decimal form.
pub fn oid_short_name(oid_str: &str) -> String {
    match oid_str {
        oid::COMMON_NAME => "CN",
        oid::SURNAME => "SN",
        oid::SERIAL_NUMBER => "serialNumber",
        oid::COUNTRY => "C",
        oid::LOCALITY => "L",
        oid::STATE_OR_PROVINCE => "ST",
        oid::STREET_ADDRESS => "street",
        oid::ORGANIZATION => "O",
        oid::ORGANIZATIONAL_UNIT => "OU",
        oid::TITLE => "title",
        oid::POSTAL_CODE => "postalCode",
        oid::GIVEN_NAME => "GN",
        oid::EMAIL_ADDRESS => "emailAddress",
        oid::DOMAIN_COMPONENT => "DC",
        oid::BUSINESS_CATEGORY => "businessCategory",
        oid::JURISDICTION_COUNTRY => "jurisdictionC",
        oid::JURISDICTION_STATE => "jurisdictionST",
        oid::JURISDICTION_LOCALITY => "jurisdictionL",
        other => other,
    }
    .to_string()
}

/// Format an IPv6 address in fully expanded form (OpenSSL style).
pub fn format_ipv6_expanded(addr: &std::net::Ipv6Addr) -> String {
    addr.segments()
        .iter()
        .map(|s| format!("{:X}", s))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hex_colon_upper_formats_bytes() {
        assert_eq!(hex_colon_upper(&[0xab, 0x01, 0xff]), "AB:01:FF");
        assert_eq!(hex_colon_upper(&[]), "");
    }

    #[test]
    fn base64_wrap_breaks_at_64_columns() {
        let wrapped = base64_wrap(&[0u8; 96]);
        let lines: Vec<_> = wrapped.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.first().unwrap().len(), 64);
    }

    #[test]
    fn is_pem_skips_leading_whitespace() {
        assert!(is_pem(b"\n  -----BEGIN CERTIFICATE-----"));
        assert!(!is_pem(&[0x30, 0x82, 0x01]));
        assert!(!is_pem(b""));
    }

    #[test]
    fn oid_short_name_falls_back_to_oid() {
        assert_eq!(oid_short_name(oid::COMMON_NAME), "CN");
        assert_eq!(oid_short_name("1.2.3.4"), "1.2.3.4");
    }

    #[test]
    fn ipv6_is_expanded() {
        let addr: std::net::Ipv6Addr = "2001:db8::1".parse().unwrap();
        assert_eq!(format_ipv6_expanded(&addr), "2001:DB8:0:0:0:0:0:1");
    }
}
