//! Deriving the trust assessment from the collected chains and verdicts.

use super::connector::{OcspVerifyError, TlsConnector};
use super::orchestrator::{collect_certificate_chains, ChainCollection, ValidationOutcome};
use super::ServerTarget;
use crate::chain::build_verified_chain;
use crate::fields::Certificate;
use crate::hostname::{validate_hostname, HostnameValidation};
use crate::ocsp::OcspStaple;
use crate::trust::{TrustStore, TrustStoreRepository};
use crate::CertinfoError;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Options for one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanCommand {
    /// Extra PEM bundle to validate against, next to the catalog.
    pub ca_file: Option<PathBuf>,
    /// Report the whole leaf instead of a summary. Not used by the scan.
    pub print_full_certificate: bool,
}

/// The trust assessment of one server.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub server: ServerTarget,
    /// Chain sent by the server, leaf first.
    pub certificate_chain: Vec<Certificate>,
    /// Leaf-to-anchor chain against the primary store. Empty unless the
    /// primary store trusted the server's chain.
    pub verified_certificate_chain: Vec<Certificate>,
    pub is_certificate_chain_order_valid: bool,
    /// Whether the server also sent the anchor. `None` without a verified chain.
    pub has_anchor_in_certificate_chain: Option<bool>,
    /// Whether a non-anchor certificate of the verified chain is SHA-1
    /// signed. `None` without a verified chain.
    pub has_sha1_in_certificate_chain: Option<bool>,
    pub hostname_validation: HostnameValidation,
    /// Whether the leaf asserts an EV policy of the primary store.
    pub is_leaf_certificate_ev: bool,
    pub ocsp_staple: Option<OcspStaple>,
    /// `None` when no staple was sent.
    pub is_ocsp_response_trusted: Option<bool>,
    /// One entry per store, in scan order.
    pub path_validation_outcomes: Vec<ValidationOutcome>,
    pub primary_trust_store: Arc<TrustStore>,
    #[serde(skip)]
    pub print_full_certificate: bool,
}

impl ScanResult {
    /// Combine the collected chains and verdicts into the final assessment.
    ///
    /// The built chain is only kept when the primary store's own verdict
    /// is trusted. An OCSP signer that does not chain to the primary store
    /// marks the staple untrusted; any other verification failure is an
    /// error.
    pub fn evaluate<C: TlsConnector>(
        collection: ChainCollection,
        server: ServerTarget,
        primary: &Arc<TrustStore>,
        connector: &C,
        print_full_certificate: bool,
    ) -> Result<Self, CertinfoError> {
        let ChainCollection {
            received_chain,
            ocsp_staple,
            mut outcomes,
        } = collection;

        let leaf = received_chain.first().ok_or_else(|| CertinfoError::Connectivity {
            last_error: "server sent an empty certificate chain".into(),
        })?;

        let build = build_verified_chain(&received_chain, &primary.anchors);
        let is_certificate_chain_order_valid = build.is_order_valid();

        let trusted_by_primary = outcomes
            .iter()
            .any(|outcome| outcome.store() == primary && outcome.is_trusted());
        let verified_certificate_chain = if trusted_by_primary {
            build.into_chain().unwrap_or_default()
        } else {
            Vec::new()
        };

        let has_anchor_in_certificate_chain = verified_certificate_chain
            .last()
            .map(|anchor| received_chain.contains(anchor));
        let has_sha1_in_certificate_chain = verified_certificate_chain
            .split_last()
            .map(|(_, below_anchor)| below_anchor.iter().any(Certificate::is_sha1_signed));

        let hostname_validation = validate_hostname(leaf, &server.server_name_indication);
        let is_leaf_certificate_ev = primary.is_extended_validation(leaf);
        if is_leaf_certificate_ev {
            outcomes
                .iter_mut()
                .filter(|outcome| outcome.store() == primary)
                .for_each(ValidationOutcome::mark_extended_validation);
        }

        let is_ocsp_response_trusted = match &ocsp_staple {
            None => None,
            Some(staple) => match connector.verify_ocsp_staple(staple, &received_chain, primary) {
                Ok(()) => Some(true),
                Err(OcspVerifyError::Untrusted(reason)) => {
                    tracing::debug!(server = %server, reason = %reason, "OCSP response not trusted");
                    Some(false)
                }
                Err(OcspVerifyError::Other(reason)) => return Err(CertinfoError::Ocsp(reason)),
            },
        };

        Ok(ScanResult {
            server,
            certificate_chain: received_chain,
            verified_certificate_chain,
            is_certificate_chain_order_valid,
            has_anchor_in_certificate_chain,
            has_sha1_in_certificate_chain,
            hostname_validation,
            is_leaf_certificate_ev,
            ocsp_staple,
            is_ocsp_response_trusted,
            path_validation_outcomes: outcomes,
            primary_trust_store: Arc::clone(primary),
            print_full_certificate,
        })
    }

    /// The leaf as sent by the server.
    pub fn leaf(&self) -> Option<&Certificate> {
        self.certificate_chain.first()
    }

    /// Whether EV is attributed in `outcome`'s report entry: only for the
    /// primary store's own outcome.
    pub fn is_ev_for(&self, outcome: &ValidationOutcome) -> bool {
        self.is_leaf_certificate_ev && outcome.store() == &self.primary_trust_store
    }
}

/// Scan `server` against every catalog store plus the command's CA file.
pub fn scan_server<C: TlsConnector>(
    connector: &C,
    repository: &TrustStoreRepository,
    server: ServerTarget,
    command: &ScanCommand,
) -> Result<ScanResult, CertinfoError> {
    let custom = command
        .ca_file
        .as_deref()
        .map(TrustStore::custom)
        .transpose()?
        .map(Arc::new);
    let stores = repository.with_custom_store(custom.as_ref());

    tracing::info!(server = %server, stores = stores.len(), "scanning");
    let collection = collect_certificate_chains(connector, &server, &stores)?;
    ScanResult::evaluate(
        collection,
        server,
        repository.primary(),
        connector,
        command.print_full_certificate,
    )
}
