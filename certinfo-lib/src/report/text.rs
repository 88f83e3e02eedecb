//! Human-readable report.

use super::Renderer;
use crate::fields::{AiaEntry, Certificate, DigestAlgorithm, Extension, ExtensionValue};
use crate::hostname::HostnameValidation;
use crate::scan::{ScanResult, ValidationOutcome};
use crate::CertinfoError;
use std::fmt::Write;

const NO_VERIFIED_CHAIN: &str = "ERROR - Could not build verified chain (certificate untrusted?)";

/// The classic certificate report: leaf summary, trust, OCSP stapling.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&self, result: &ScanResult) -> Result<String, CertinfoError> {
        let mut out = String::new();
        writeln!(out, "\n{}\n", result.server.address()).ok();

        title(&mut out, "Certificate Basic Information");
        if let Some(leaf) = result.leaf() {
            if result.print_full_certificate {
                out.push_str(&certificate_text(leaf));
            } else {
                basic_certificate(&mut out, leaf);
            }
        }

        out.push('\n');
        title(&mut out, "Certificate - Trust");
        trust_section(&mut out, result);

        out.push('\n');
        title(&mut out, "Certificate - OCSP Stapling");
        ocsp_section(&mut out, result);

        Ok(out)
    }
}

fn title(out: &mut String, text: &str) {
    writeln!(out, " * {text}:").ok();
}

fn field(out: &mut String, name: &str, value: impl std::fmt::Display) {
    writeln!(out, "      {name:<35}{value}").ok();
}

fn basic_certificate(out: &mut String, leaf: &Certificate) {
    field(out, "SHA1 Fingerprint:", &leaf.sha1_fingerprint);
    field(out, "Common Name:", leaf.printable_subject_name());
    field(out, "Issuer:", leaf.printable_issuer_name());
    field(out, "Serial Number:", leaf.serial_hex());
    field(out, "Not Before:", leaf.not_before_string());
    field(out, "Not After:", leaf.not_after_string());
    field(out, "Signature Algorithm:", &leaf.signature_algorithm);
    field(out, "Public Key Algorithm:", &leaf.public_key.algorithm);
    if let Some(bits) = leaf.public_key.key_size {
        field(out, "Key Size:", bits);
    }
    if let Some(exponent) = leaf.public_key.exponent {
        field(out, "Exponent:", format!("{exponent} (0x{exponent:x})"));
    }
    let sans = leaf.san_entries();
    if !sans.is_empty() {
        let joined = sans
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        field(out, "X509v3 Subject Alternative Name:", joined);
    }
}

fn trust_section(out: &mut String, result: &ScanResult) {
    let sni = &result.server.server_name_indication;
    if result.server.has_virtual_domain() {
        field(out, "SNI enabled with virtual domain:", sni);
    }

    let hostname_txt = match result.hostname_validation {
        HostnameValidation::NameMatchesSan => format!("OK - Subject Alternative Name matches {sni}"),
        HostnameValidation::NameMatchesCn => format!("OK - Common Name matches {sni}"),
        HostnameValidation::NameMismatch => format!("FAILED - Certificate does NOT match {sni}"),
    };
    field(out, "Hostname Validation:", hostname_txt);

    for outcome in &result.path_validation_outcomes {
        let store = outcome.store();
        let label = format!("{} CA Store ({}):", store.name, store.version);
        let text = match outcome {
            ValidationOutcome::PathResult { trusted: true, .. } => {
                if result.is_ev_for(outcome) {
                    "OK - Certificate is trusted, Extended Validation".to_string()
                } else {
                    "OK - Certificate is trusted".to_string()
                }
            }
            ValidationOutcome::PathResult { verify_string, .. } => {
                format!("FAILED - Certificate is NOT Trusted: {verify_string}")
            }
            ValidationOutcome::PathError { error, .. } => format!("ERROR: {error}"),
        };
        field(out, &label, text);
    }

    field(out, "Received Chain:", chain_names(&result.certificate_chain));

    let verified = !result.verified_certificate_chain.is_empty();
    let primary = &result.primary_trust_store;
    let verified_txt = if verified {
        chain_names(&result.verified_certificate_chain)
    } else {
        NO_VERIFIED_CHAIN.to_string()
    };
    field(out, &format!("Verified Chain w/ {} Store:", primary.name), verified_txt);

    let anchor_txt = match result.has_anchor_in_certificate_chain {
        None => NO_VERIFIED_CHAIN,
        Some(false) => "OK - Anchor certificate not sent",
        Some(true) => "WARNING - Received certificate chain contains the anchor certificate",
    };
    field(out, "Received Chain Contains Anchor:", anchor_txt);

    let order_txt = if result.is_certificate_chain_order_valid {
        "OK - Order is valid"
    } else {
        "FAILED - Certificate chain out of order!"
    };
    field(out, "Received Chain Order:", order_txt);

    let sha1_txt = match result.has_sha1_in_certificate_chain {
        None => NO_VERIFIED_CHAIN,
        Some(false) => "OK - No SHA1-signed certificate in the verified certificate chain",
        Some(true) => "INSECURE - SHA1-signed certificate in the verified certificate chain",
    };
    field(out, "Verified Chain contains SHA1:", sha1_txt);
}

fn chain_names(chain: &[Certificate]) -> String {
    chain
        .iter()
        .map(Certificate::printable_subject_name)
        .collect::<Vec<_>>()
        .join(" --> ")
}

fn ocsp_section(out: &mut String, result: &ScanResult) {
    let Some(staple) = &result.ocsp_staple else {
        field(out, "", "NOT SUPPORTED - Server did not send back an OCSP response.");
        return;
    };

    let trust_txt = if result.is_ocsp_response_trusted == Some(true) {
        "OK - Response is trusted"
    } else {
        "FAILED - Response is NOT trusted"
    };
    field(out, "OCSP Response Status:", staple.status);
    field(
        out,
        &format!("Validation w/ {} Store:", result.primary_trust_store.name),
        trust_txt,
    );
    field(out, "Responder Id:", staple.responder_id.as_deref().unwrap_or(""));

    if let Some(single) = &staple.single_response {
        field(out, "Cert Status:", single.cert_status);
        field(out, "Cert Serial Number:", &single.serial_number);
        field(out, "This Update:", &single.this_update);
        field(out, "Next Update:", single.next_update.as_deref().unwrap_or(""));
    }
}

/// Every field of `cert`, for `--print-full-certificate`.
pub fn certificate_text(cert: &Certificate) -> String {
    let mut out = String::new();

    out.push_str("Certificate:\n");
    out.push_str(&format!("  Version: {} (v{})\n", cert.version, cert.version));
    out.push_str(&format!("  Serial: {}\n", cert.serial));
    out.push_str(&format!("  Signature Algorithm: {}\n", cert.signature_algorithm));
    out.push_str(&format!("  Issuer: {}\n", cert.issuer_string()));
    out.push_str("  Validity:\n");
    out.push_str(&format!("    Not Before: {}\n", cert.not_before));
    out.push_str(&format!("    Not After:  {}\n", cert.not_after));
    out.push_str(&format!("  Subject: {}\n", cert.subject_string()));

    out.push_str("  Public Key:\n");
    out.push_str(&format!("    Algorithm: {}", cert.public_key.algorithm));
    if let Some(bits) = cert.public_key.key_size {
        out.push_str(&format!(" ({} bit)", bits));
    }
    if let Some(curve) = &cert.public_key.curve {
        out.push_str(&format!(" [{}]", curve));
    }
    out.push('\n');
    if let Some(modulus) = &cert.public_key.modulus {
        out.push_str(&format!("    Modulus: {}\n", modulus));
    }
    if let Some(exponent) = cert.public_key.exponent {
        out.push_str(&format!("    Exponent: {exponent} (0x{exponent:x})\n"));
    }

    if !cert.extensions.is_empty() {
        out.push_str("  Extensions:\n");
        for ext in &cert.extensions {
            format_extension(&mut out, ext);
        }
    }

    out.push_str(&format!(
        "  Fingerprint (SHA-1): {}\n",
        cert.fingerprint(DigestAlgorithm::Sha1)
    ));
    out.push_str(&format!(
        "  Fingerprint (SHA-256): {}\n",
        cert.fingerprint(DigestAlgorithm::Sha256)
    ));
    out.push_str(&format!("  HPKP Pin (SHA-256): {}\n", cert.hpkp_pin));
    if !cert.signature_hex.is_empty() {
        out.push_str(&format!("  Signature: {}\n", cert.signature_hex));
    }
    out.push_str(&cert.pem);
    if !cert.pem.ends_with('\n') {
        out.push('\n');
    }

    out
}

fn format_extension(out: &mut String, ext: &Extension) {
    let critical_str = if ext.critical { " [critical]" } else { "" };

    match &ext.value {
        ExtensionValue::BasicConstraints { ca, path_len } => {
            let pl = match path_len {
                Some(n) => format!(", pathlen:{}", n),
                None => String::new(),
            };
            out.push_str(&format!(
                "    Basic Constraints:{} CA={}{}\n",
                critical_str, ca, pl
            ));
        }
        ExtensionValue::KeyUsage(usages) => {
            out.push_str(&format!("    Key Usage:{} {}\n", critical_str, usages.join(", ")));
        }
        ExtensionValue::ExtendedKeyUsage(usages) => {
            out.push_str(&format!(
                "    Extended Key Usage:{} {}\n",
                critical_str,
                usages.join(", ")
            ));
        }
        ExtensionValue::SubjectAltName(entries) => {
            out.push_str(&format!("    Subject Alternative Name:{}\n", critical_str));
            for entry in entries {
                out.push_str(&format!("      {}\n", entry));
            }
        }
        ExtensionValue::SubjectKeyIdentifier(hex) => {
            out.push_str(&format!("    Subject Key Identifier:{} {}\n", critical_str, hex));
        }
        ExtensionValue::AuthorityKeyIdentifier { key_id } => match key_id {
            Some(kid) => out.push_str(&format!(
                "    Authority Key Identifier:{} keyid:{}\n",
                critical_str, kid
            )),
            None => out.push_str(&format!("    Authority Key Identifier:{}\n", critical_str)),
        },
        ExtensionValue::AuthorityInfoAccess(entries) => {
            out.push_str(&format!("    Authority Information Access:{}\n", critical_str));
            for AiaEntry { method, location } in entries {
                out.push_str(&format!("      {}: {}\n", method, location));
            }
        }
        ExtensionValue::CrlDistributionPoints(uris) => {
            out.push_str(&format!("    CRL Distribution Points:{}\n", critical_str));
            for uri in uris {
                out.push_str(&format!("      {}\n", uri));
            }
        }
        ExtensionValue::CertificatePolicies(oids) => {
            out.push_str(&format!(
                "    Certificate Policies:{} {}\n",
                critical_str,
                oids.join(", ")
            ));
        }
        ExtensionValue::Raw(hex) => {
            out.push_str(&format!("    {} ({}):{} {}\n", ext.name, ext.oid, critical_str, hex));
        }
    }
}
