//! Matching the server name sent in SNI against the leaf certificate.

use crate::fields::{Certificate, SanEntry};
use serde::Serialize;
use std::net::IpAddr;

/// Outcome of matching a server name against a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostnameValidation {
    /// A Subject Alternative Name entry matched.
    NameMatchesSan,
    /// The subject Common Name matched (certificate has no DNS SAN).
    NameMatchesCn,
    /// Nothing matched.
    NameMismatch,
}

impl HostnameValidation {
    pub fn is_match(self) -> bool {
        !matches!(self, HostnameValidation::NameMismatch)
    }
}

/// Match `server_name` against the certificate's names.
///
/// DNS SAN entries take precedence; the CN is only consulted when the
/// certificate carries no DNS SAN at all. IP literals are matched against
/// SAN IP entries only.
pub fn validate_hostname(cert: &Certificate, server_name: &str) -> HostnameValidation {
    let server_name = server_name.trim_end_matches('.');

    if let Ok(ip) = server_name
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
    {
        let matched = cert.san_entries().into_iter().any(|entry| match entry {
            SanEntry::Ip(value) => value.parse::<IpAddr>().is_ok_and(|san_ip| san_ip == ip),
            _ => false,
        });
        return if matched {
            HostnameValidation::NameMatchesSan
        } else {
            HostnameValidation::NameMismatch
        };
    }

    let dns_names = cert.dns_names();
    if !dns_names.is_empty() {
        return if dns_names
            .iter()
            .any(|pattern| hostname_matches(pattern, server_name))
        {
            HostnameValidation::NameMatchesSan
        } else {
            HostnameValidation::NameMismatch
        };
    }

    match cert.subject.common_name() {
        Some(cn) if hostname_matches(cn, server_name) => HostnameValidation::NameMatchesCn,
        _ => HostnameValidation::NameMismatch,
    }
}

/// Case-insensitive name comparison with RFC 6125 wildcard support.
///
/// Only a complete left-most label `*` is a wildcard. It matches exactly one
/// non-empty label, and it never matches when the remaining pattern has
/// fewer than two labels (`*.com`).
pub fn hostname_matches(pattern: &str, hostname: &str) -> bool {
    let pattern = pattern.trim_end_matches('.').to_ascii_lowercase();
    let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
    if pattern.is_empty() || hostname.is_empty() {
        return false;
    }

    match pattern.strip_prefix("*.") {
        Some(suffix) => {
            if !suffix.contains('.') || suffix.contains('*') {
                return false;
            }
            match hostname.split_once('.') {
                Some((first, rest)) => !first.is_empty() && rest == suffix,
                None => false,
            }
        }
        None => !pattern.contains('*') && pattern == hostname,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cert(cn: Option<&str>, sans: Vec<rcgen::SanType>) -> Certificate {
        let mut params = rcgen::CertificateParams::default();
        params.distinguished_name = rcgen::DistinguishedName::new();
        if let Some(cn) = cn {
            params.distinguished_name.push(rcgen::DnType::CommonName, cn);
        }
        params.subject_alt_names = sans;
        let key = rcgen::KeyPair::generate().unwrap();
        let generated = params.self_signed(&key).unwrap();
        crate::parse_der(generated.der()).unwrap()
    }

    fn dns(name: &str) -> rcgen::SanType {
        rcgen::SanType::DnsName(name.try_into().unwrap())
    }

    #[test]
    fn exact_and_case_insensitive_match() {
        assert!(hostname_matches("example.com", "example.com"));
        assert!(hostname_matches("Example.COM", "example.com"));
        assert!(hostname_matches("example.com.", "example.com"));
        assert!(!hostname_matches("example.com", "www.example.com"));
    }

    #[test]
    fn wildcard_covers_one_label() {
        assert!(hostname_matches("*.example.com", "www.example.com"));
        assert!(!hostname_matches("*.example.com", "example.com"));
        assert!(!hostname_matches("*.example.com", "a.b.example.com"));
        assert!(!hostname_matches("*.com", "example.com"));
        assert!(!hostname_matches("w*.example.com", "www.example.com"));
    }

    #[test]
    fn san_takes_precedence_over_cn() {
        let c = cert(Some("cn.example.com"), vec![dns("san.example.com")]);
        assert_eq!(
            validate_hostname(&c, "san.example.com"),
            HostnameValidation::NameMatchesSan
        );
        assert_eq!(
            validate_hostname(&c, "cn.example.com"),
            HostnameValidation::NameMismatch
        );
    }

    #[test]
    fn cn_used_without_dns_san() {
        let c = cert(Some("cn.example.com"), vec![]);
        assert_eq!(
            validate_hostname(&c, "CN.example.com"),
            HostnameValidation::NameMatchesCn
        );
        assert_eq!(
            validate_hostname(&c, "other.example.com"),
            HostnameValidation::NameMismatch
        );
    }

    #[test]
    fn ip_literal_matches_ip_san_only() {
        let c = cert(
            Some("127.0.0.1"),
            vec![rcgen::SanType::IpAddress("127.0.0.1".parse().unwrap())],
        );
        assert_eq!(
            validate_hostname(&c, "127.0.0.1"),
            HostnameValidation::NameMatchesSan
        );
        assert_eq!(
            validate_hostname(&c, "10.0.0.1"),
            HostnameValidation::NameMismatch
        );
    }

    #[test]
    fn no_names_is_a_mismatch() {
        let c = cert(None, vec![]);
        assert_eq!(
            validate_hostname(&c, "example.com"),
            HostnameValidation::NameMismatch
        );
        assert!(!HostnameValidation::NameMismatch.is_match());
        assert!(HostnameValidation::NameMatchesCn.is_match());
    }
}
