//! certinfo-lib: TLS certificate chain trust assessment.
//!
//! Connects to a server once per trust store, collects the chain and the
//! TLS library's verdict from each attempt, rebuilds the verified chain
//! against the primary store and derives the trust properties of the
//! server's certificate: chain order, anchor inclusion, SHA-1 usage,
//! OCSP staple trust, hostname match and Extended Validation.

mod chain;
pub mod config;
mod fields;
mod fingerprint;
mod hostname;
pub mod ocsp;
mod oid;
mod parser;
pub mod report;
pub mod scan;
pub mod tls;
pub mod trust;
mod util;

pub use chain::{build_verified_chain, is_chain_order_valid, ChainBuild};
pub use config::Config;
pub use fields::{
    AiaEntry, Certificate, DateTime, DigestAlgorithm, DistinguishedName, Extension,
    ExtensionValue, PublicKeyInfo, SanEntry,
};
pub use fingerprint::{compute_fingerprint, compute_hpkp_pin};
pub use hostname::{hostname_matches, validate_hostname, HostnameValidation};
pub use parser::{parse_cert, parse_der, parse_pem, parse_pem_chain};
pub use scan::{scan_server, ScanCommand, ScanResult, ServerTarget, ValidationOutcome};
pub use trust::{TrustStore, TrustStoreRepository};

/// Errors returned by certinfo-lib.
#[derive(Debug, thiserror::Error)]
pub enum CertinfoError {
    #[error("Failed to parse certificate: {0}")]
    ParseError(String),

    #[error("Invalid PEM format: {0}")]
    PemError(String),

    #[error("Invalid DER format: {0}")]
    DerError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Trust store error: {0}")]
    TrustStore(String),

    #[error("Invalid target: {0}")]
    Target(String),

    /// Every handshake attempt failed.
    #[error("Could not connect to the server; last error: {last_error}")]
    Connectivity { last_error: String },

    #[error("OCSP verification error: {0}")]
    Ocsp(String),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
