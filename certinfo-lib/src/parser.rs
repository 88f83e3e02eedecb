//! Certificate parsing from PEM and DER formats.

use crate::fields::{
    AiaEntry, Certificate, DateTime, DistinguishedName, Extension, ExtensionValue, PublicKeyInfo,
    SanEntry,
};
use crate::fingerprint;
use crate::oid;
use crate::util;
use crate::CertinfoError;
use x509_parser::prelude::*;

/// Parse a certificate from PEM or DER (auto-detected).
///
/// If the input begins with `-----BEGIN` (after stripping whitespace), it is
/// treated as PEM. Otherwise it is treated as DER.
pub fn parse_cert(input: &[u8]) -> Result<Certificate, CertinfoError> {
    if input.is_empty() {
        return Err(CertinfoError::ParseError("empty input".into()));
    }

    if util::is_pem(input) {
        parse_pem(input)
    } else {
        parse_der(input)
    }
}

/// Parse a certificate from PEM format.
pub fn parse_pem(input: &[u8]) -> Result<Certificate, CertinfoError> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(input)
        .map_err(|e| CertinfoError::PemError(format!("{}", e)))?;

    if !is_certificate_label(&pem.label) {
        return Err(CertinfoError::PemError(format!(
            "expected CERTIFICATE, got {}",
            pem.label
        )));
    }

    parse_der(&pem.contents)
}

/// Parse every certificate in a PEM bundle, in file order.
///
/// Blocks that are not certificates (keys, CRLs) are skipped. A bundle with
/// no certificate at all is an error.
pub fn parse_pem_chain(input: &[u8]) -> Result<Vec<Certificate>, CertinfoError> {
    let mut certs = Vec::new();
    for pem in x509_parser::pem::Pem::iter_from_buffer(input) {
        let pem = pem.map_err(|e| CertinfoError::PemError(format!("{}", e)))?;
        if !is_certificate_label(&pem.label) {
            continue;
        }
        certs.push(parse_der(&pem.contents)?);
    }
    if certs.is_empty() {
        return Err(CertinfoError::PemError(
            "no certificates found in PEM input".into(),
        ));
    }
    Ok(certs)
}

fn is_certificate_label(label: &str) -> bool {
    matches!(
        label,
        "CERTIFICATE" | "TRUSTED CERTIFICATE" | "X509 CERTIFICATE"
    )
}

/// Parse a certificate from DER format.
pub fn parse_der(input: &[u8]) -> Result<Certificate, CertinfoError> {
    let (remaining, x509) = X509Certificate::from_der(input)
        .map_err(|e| CertinfoError::DerError(format!("{}", e)))?;

    // Fingerprints cover the certificate bytes only, never trailing data.
    let cert_len = input.len() - remaining.len();
    let cert_der = input.get(..cert_len).unwrap_or(input);
    build_certificate(&x509, cert_der)
}

fn build_certificate(x509: &X509Certificate, raw_der: &[u8]) -> Result<Certificate, CertinfoError> {
    let tbs = &x509.tbs_certificate;

    let raw_version = tbs.version.0;
    if raw_version > 2 {
        return Err(CertinfoError::ParseError(format!(
            "unsupported X.509 version {} (expected v1, v2, or v3)",
            raw_version + 1
        )));
    }

    let public_key = build_public_key_info(&tbs.subject_pki)?;
    let hpkp_pin = fingerprint::compute_hpkp_pin(&public_key.spki_der);

    Ok(Certificate {
        version: raw_version + 1,
        serial: format_serial(tbs.raw_serial()),
        signature_algorithm: format_sig_algorithm(&x509.signature_algorithm),
        signature_algorithm_oid: x509.signature_algorithm.algorithm.to_id_string(),
        issuer: build_dn(&tbs.issuer),
        subject: build_dn(&tbs.subject),
        not_before: build_datetime(&tbs.validity.not_before),
        not_after: build_datetime(&tbs.validity.not_after),
        public_key,
        extensions: tbs.extensions().iter().map(build_extension).collect(),
        sha1_fingerprint: fingerprint::compute_fingerprint(
            raw_der,
            crate::DigestAlgorithm::Sha1,
        ),
        hpkp_pin,
        pem: util::pem_encode("CERTIFICATE", raw_der),
        signature_hex: hex::encode(&*x509.signature_value.data),
        subject_raw: tbs.subject.as_raw().to_vec(),
        issuer_raw: tbs.issuer.as_raw().to_vec(),
        raw_der: raw_der.to_vec(),
    })
}

/// Format a serial number as a colon-separated uppercase hex string,
/// stripping leading zero bytes but keeping at least one byte.
fn format_serial(raw: &[u8]) -> String {
    let stripped = match raw.iter().position(|&b| b != 0) {
        Some(pos) => raw.get(pos..).unwrap_or(raw),
        None => raw.get(raw.len().saturating_sub(1)..).unwrap_or(raw),
    };
    util::hex_colon_upper(stripped)
}

fn format_sig_algorithm(algo: &AlgorithmIdentifier) -> String {
    match algo.algorithm.to_id_string().as_str() {
        oid::MD5_WITH_RSA => "md5WithRSAEncryption".into(),
        oid::SHA1_WITH_RSA => "sha1WithRSAEncryption".into(),
        oid::SHA1_WITH_RSA_OIW => "sha1WithRSA".into(),
        oid::SHA256_WITH_RSA => "sha256WithRSAEncryption".into(),
        oid::SHA384_WITH_RSA => "sha384WithRSAEncryption".into(),
        oid::SHA512_WITH_RSA => "sha512WithRSAEncryption".into(),
        oid::RSASSA_PSS => "rsassaPss".into(),
        oid::DSA_WITH_SHA1 => "dsaWithSHA1".into(),
        oid::ECDSA_WITH_SHA1 => "ecdsa-with-SHA1".into(),
        oid::ECDSA_WITH_SHA256 => "ecdsa-with-SHA256".into(),
        oid::ECDSA_WITH_SHA384 => "ecdsa-with-SHA384".into(),
        oid::ECDSA_WITH_SHA512 => "ecdsa-with-SHA512".into(),
        oid::ED25519 => "Ed25519".into(),
        oid::ED448 => "Ed448".into(),
        other => other.to_string(),
    }
}

pub(crate) fn build_dn(name: &X509Name) -> DistinguishedName {
    let mut components = Vec::new();
    for rdn in name.iter() {
        for attr in rdn.iter() {
            let key = util::oid_short_name(&attr.attr_type().to_id_string());
            let value = attr.as_str().unwrap_or("<binary>").to_string();
            components.push((key, value));
        }
    }
    DistinguishedName { components }
}

pub(crate) fn build_datetime(asn1_time: &ASN1Time) -> DateTime {
    datetime_from_timestamp(asn1_time.timestamp())
}

pub(crate) fn datetime_from_timestamp(ts: i64) -> DateTime {
    let iso = match ::time::OffsetDateTime::from_unix_timestamp(ts) {
        Ok(dt) => format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            dt.year(),
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        ),
        Err(_) => format!("{}", ts),
    };
    DateTime {
        iso8601: iso,
        timestamp: ts,
    }
}

fn build_public_key_info(spki: &SubjectPublicKeyInfo) -> Result<PublicKeyInfo, CertinfoError> {
    let oid_str = spki.algorithm.algorithm.to_id_string();

    let (algorithm, key_size, curve, modulus, exponent) = match oid_str.as_str() {
        oid::RSA_ENCRYPTION => {
            if let Some((mod_hex, bits, exp)) = extract_rsa_params(&spki.subject_public_key.data) {
                ("RSA".into(), Some(bits), None, Some(mod_hex), Some(exp))
            } else {
                ("RSA".into(), None, None, None, None)
            }
        }
        oid::DSA => ("DSA".into(), None, None, None, None),
        oid::EC_PUBLIC_KEY => {
            let curve_name = extract_ec_curve(&spki.algorithm);
            let key_size = match curve_name.as_str() {
                "P-256" => Some(256),
                "P-384" => Some(384),
                "P-521" => Some(521),
                _ => None,
            };
            ("EC".into(), key_size, Some(curve_name), None, None)
        }
        oid::ED25519 => ("Ed25519".into(), Some(256), None, None, None),
        oid::ED448 => ("Ed448".into(), Some(448), None, None, None),
        _ => (oid_str, None, None, None, None),
    };

    Ok(PublicKeyInfo {
        algorithm,
        key_size,
        curve,
        modulus,
        exponent,
        spki_der: encode_spki(spki)?,
    })
}

/// Extract RSA modulus and exponent from raw public key DER.
///
/// Returns `None` if the DER structure cannot be parsed, rather than
/// silently returning incorrect fallback values.
fn extract_rsa_params(data: &[u8]) -> Option<(String, u32, u64)> {
    let (_, parsed) = x509_parser::der_parser::parse_der(data).ok()?;
    let seq = parsed.as_sequence().ok()?;
    let bigint = seq.first().and_then(|m| m.as_bigint().ok())?;
    let bytes = bigint.to_bytes_be().1;
    // Skip leading zero byte used for DER positive integer encoding
    let significant = match bytes.split_first() {
        Some((&0, rest)) if !rest.is_empty() => rest,
        _ => &bytes,
    };
    let bits = (significant.len() as u32) * 8;
    let exponent = seq.get(1).and_then(|e| e.as_u64().ok())?;
    Some((hex::encode_upper(significant), bits, exponent))
}

fn extract_ec_curve(algo: &AlgorithmIdentifier) -> String {
    if let Some(params) = &algo.parameters {
        if let Ok(oid) = params.as_oid() {
            return match oid.to_id_string().as_str() {
                oid::CURVE_P256 => "P-256".into(),
                oid::CURVE_P384 => "P-384".into(),
                oid::CURVE_P521 => "P-521".into(),
                other => other.to_string(),
            };
        }
    }
    "unknown".into()
}

/// Re-encode the SubjectPublicKeyInfo as DER.
///
/// The HPKP pin is computed over these bytes.
fn encode_spki(spki: &SubjectPublicKeyInfo) -> Result<Vec<u8>, CertinfoError> {
    use x509_parser::der_parser::asn1_rs::ToDer;

    let oid_der = spki.algorithm.algorithm.to_der_vec().map_err(|e| {
        CertinfoError::ParseError(format!("failed to encode algorithm OID: {}", e))
    })?;
    let params_der = match &spki.algorithm.parameters {
        Some(any) => any.to_der_vec().map_err(|e| {
            CertinfoError::ParseError(format!("failed to encode algorithm parameters: {}", e))
        })?,
        None => Vec::new(), // absent for EdDSA (RFC 8410)
    };

    let key_data = &spki.subject_public_key.data;

    let mut algo_content = Vec::new();
    algo_content.extend_from_slice(&oid_der);
    algo_content.extend_from_slice(&params_der);

    // unused-bits byte, then the key
    let mut bitstring_content = Vec::with_capacity(1 + key_data.len());
    bitstring_content.push(0x00);
    bitstring_content.extend_from_slice(key_data);

    let algo_seq = der_wrap(0x30, &algo_content)?;
    let bitstring = der_wrap(0x03, &bitstring_content)?;

    let mut outer_content = Vec::new();
    outer_content.extend_from_slice(&algo_seq);
    outer_content.extend_from_slice(&bitstring);
    der_wrap(0x30, &outer_content)
}

/// Maximum content length for DER TLV encoding with a 3-byte length field.
const MAX_DER_CONTENT_LEN: usize = 0xFF_FFFF;

/// Wrap content bytes in a DER tag-length-value envelope.
fn der_wrap(tag: u8, content: &[u8]) -> Result<Vec<u8>, CertinfoError> {
    let len = content.len();
    if len > MAX_DER_CONTENT_LEN {
        return Err(CertinfoError::ParseError(format!(
            "DER content length {} exceeds maximum supported ({})",
            len, MAX_DER_CONTENT_LEN
        )));
    }
    let mut buf = Vec::with_capacity(1 + 4 + len);
    buf.push(tag);
    if len < 0x80 {
        buf.push(len as u8);
    } else if len < 0x100 {
        buf.push(0x81);
        buf.push(len as u8);
    } else if len < 0x1_0000 {
        buf.push(0x82);
        buf.push((len >> 8) as u8);
        buf.push(len as u8);
    } else {
        buf.push(0x83);
        buf.push((len >> 16) as u8);
        buf.push((len >> 8) as u8);
        buf.push(len as u8);
    }
    buf.extend_from_slice(content);
    Ok(buf)
}

fn build_extension(ext: &X509Extension) -> Extension {
    let oid = ext.oid.to_id_string();
    let name = extension_oid_to_name(&oid);

    let value = match ext.parsed_extension() {
        ParsedExtension::BasicConstraints(bc) => ExtensionValue::BasicConstraints {
            ca: bc.ca,
            path_len: bc.path_len_constraint,
        },
        ParsedExtension::KeyUsage(ku) => {
            let flags = [
                (ku.digital_signature(), "Digital Signature"),
                (ku.non_repudiation(), "Non Repudiation"),
                (ku.key_encipherment(), "Key Encipherment"),
                (ku.data_encipherment(), "Data Encipherment"),
                (ku.key_agreement(), "Key Agreement"),
                (ku.key_cert_sign(), "Certificate Sign"),
                (ku.crl_sign(), "CRL Sign"),
                (ku.encipher_only(), "Encipher Only"),
                (ku.decipher_only(), "Decipher Only"),
            ];
            ExtensionValue::KeyUsage(
                flags
                    .iter()
                    .filter(|(set, _)| *set)
                    .map(|(_, label)| label.to_string())
                    .collect(),
            )
        }
        ParsedExtension::ExtendedKeyUsage(eku) => {
            let mut usages = Vec::new();
            if eku.any {
                usages.push("Any Extended Key Usage".into());
            }
            if eku.server_auth {
                usages.push("TLS Web Server Authentication".into());
            }
            if eku.client_auth {
                usages.push("TLS Web Client Authentication".into());
            }
            if eku.code_signing {
                usages.push("Code Signing".into());
            }
            if eku.email_protection {
                usages.push("E-mail Protection".into());
            }
            if eku.time_stamping {
                usages.push("Time Stamping".into());
            }
            if eku.ocsp_signing {
                usages.push("OCSP Signing".into());
            }
            for oid in &eku.other {
                usages.push(oid.to_id_string());
            }
            ExtensionValue::ExtendedKeyUsage(usages)
        }
        ParsedExtension::SubjectAlternativeName(san) => ExtensionValue::SubjectAltName(
            san.general_names
                .iter()
                .map(general_name_to_san_entry)
                .collect(),
        ),
        ParsedExtension::SubjectKeyIdentifier(ski) => {
            ExtensionValue::SubjectKeyIdentifier(util::hex_colon_upper(ski.0))
        }
        ParsedExtension::AuthorityKeyIdentifier(aki) => ExtensionValue::AuthorityKeyIdentifier {
            key_id: aki
                .key_identifier
                .as_ref()
                .map(|ki| util::hex_colon_upper(ki.0)),
        },
        ParsedExtension::AuthorityInfoAccess(aia) => {
            let entries = aia
                .accessdescs
                .iter()
                .map(|desc| {
                    let method = match desc.access_method.to_id_string().as_str() {
                        oid::ACCESS_OCSP => "OCSP".into(),
                        oid::ACCESS_CA_ISSUERS => "CA Issuers".into(),
                        other => other.to_string(),
                    };
                    let location = format_general_name(&desc.access_location);
                    AiaEntry { method, location }
                })
                .collect();
            ExtensionValue::AuthorityInfoAccess(entries)
        }
        ParsedExtension::CRLDistributionPoints(cdp) => {
            let mut uris = Vec::new();
            for point in &cdp.points {
                if let Some(x509_parser::extensions::DistributionPointName::FullName(names)) =
                    &point.distribution_point
                {
                    for gn in names {
                        if let GeneralName::URI(uri) = gn {
                            uris.push(uri.to_string());
                        }
                    }
                }
            }
            ExtensionValue::CrlDistributionPoints(uris)
        }
        ParsedExtension::CertificatePolicies(policies) => ExtensionValue::CertificatePolicies(
            policies
                .iter()
                .map(|p| p.policy_id.to_id_string())
                .collect(),
        ),
        _ => ExtensionValue::Raw(hex::encode(ext.value)),
    };

    Extension {
        oid,
        name,
        critical: ext.critical,
        value,
    }
}

fn extension_oid_to_name(oid_str: &str) -> String {
    match oid_str {
        oid::EXT_SUBJECT_KEY_ID => "Subject Key Identifier".into(),
        oid::EXT_KEY_USAGE => "Key Usage".into(),
        oid::EXT_SUBJECT_ALT_NAME => "Subject Alternative Name".into(),
        oid::EXT_ISSUER_ALT_NAME => "Issuer Alternative Name".into(),
        oid::EXT_BASIC_CONSTRAINTS => "Basic Constraints".into(),
        oid::EXT_NAME_CONSTRAINTS => "Name Constraints".into(),
        oid::EXT_CRL_DISTRIBUTION_POINTS => "CRL Distribution Points".into(),
        oid::EXT_CERTIFICATE_POLICIES => "Certificate Policies".into(),
        oid::EXT_AUTHORITY_KEY_ID => "Authority Key Identifier".into(),
        oid::EXT_EXTENDED_KEY_USAGE => "Extended Key Usage".into(),
        oid::EXT_AUTHORITY_INFO_ACCESS => "Authority Information Access".into(),
        oid::EXT_TLS_FEATURE => "TLS Feature".into(),
        oid::EXT_SCT_LIST => "CT Precertificate SCTs".into(),
        other => other.to_string(),
    }
}

fn general_name_to_san_entry(gn: &GeneralName) -> SanEntry {
    match gn {
        GeneralName::DNSName(name) => SanEntry::Dns(name.to_string()),
        GeneralName::RFC822Name(email) => SanEntry::Email(email.to_string()),
        GeneralName::IPAddress(ip_bytes) => SanEntry::Ip(format_ip_bytes(ip_bytes)),
        GeneralName::URI(uri) => SanEntry::Uri(uri.to_string()),
        GeneralName::DirectoryName(dn) => SanEntry::DirName(build_dn(dn).to_oneline()),
        other => SanEntry::Other(format!("{:?}", other)),
    }
}

fn format_general_name(gn: &GeneralName) -> String {
    match general_name_to_san_entry(gn) {
        SanEntry::Dns(v)
        | SanEntry::Email(v)
        | SanEntry::Ip(v)
        | SanEntry::Uri(v)
        | SanEntry::DirName(v)
        | SanEntry::Other(v) => v,
    }
}

pub(crate) fn format_ip_bytes(bytes: &[u8]) -> String {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        std::net::Ipv4Addr::from(octets).to_string()
    } else if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        util::format_ipv6_expanded(&std::net::Ipv6Addr::from(octets))
    } else {
        hex::encode(bytes)
    }
}
