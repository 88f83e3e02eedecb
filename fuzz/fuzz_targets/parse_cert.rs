#![no_main]

use certinfo_lib::{parse_cert, parse_pem_chain, validate_hostname, DigestAlgorithm};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The parser must never panic, regardless of input.
    if let Ok(cert) = parse_cert(data) {
        let _ = cert.subject_string();
        let _ = cert.issuer_string();
        let _ = cert.printable_subject_name();
        let _ = cert.printable_issuer_name();
        let _ = cert.not_before_string();
        let _ = cert.not_after_string();
        let _ = cert.fingerprint(DigestAlgorithm::Sha1);
        let _ = cert.is_sha1_signed();
        let _ = cert.policy_oids();
        let _ = validate_hostname(&cert, "www.example.com");
        let _ = validate_hostname(&cert, "192.0.2.1");
        let _ = certinfo_lib::report::certificate_text(&cert);
    }

    // Bundles go through the multi-certificate path.
    if let Ok(chain) = parse_pem_chain(data) {
        let _ = certinfo_lib::is_chain_order_valid(&chain);
    }
});
