//! Concurrent validation of one server against every trust store.

use super::connector::{ConnectionError, ConnectionGuard, TlsConnection, TlsConnector};
use super::ServerTarget;
use crate::fields::Certificate;
use crate::ocsp::OcspStaple;
use crate::trust::TrustStore;
use crate::CertinfoError;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;

/// Result of validating against one trust store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// The handshake completed and the library produced a verdict.
    PathResult {
        store: Arc<TrustStore>,
        verify_string: String,
        trusted: bool,
        /// Set on the primary store's entry when the leaf is EV.
        is_leaf_certificate_ev: bool,
    },
    /// The attempt failed before a verdict was available.
    PathError {
        store: Arc<TrustStore>,
        error: String,
    },
}

impl ValidationOutcome {
    /// A verdict; trusted exactly when it is `"ok"`.
    pub fn path_result(store: Arc<TrustStore>, verify_string: impl Into<String>) -> Self {
        let verify_string = verify_string.into();
        ValidationOutcome::PathResult {
            trusted: verify_string == "ok",
            store,
            verify_string,
            is_leaf_certificate_ev: false,
        }
    }

    pub fn path_error(store: Arc<TrustStore>, error: impl Into<String>) -> Self {
        ValidationOutcome::PathError {
            store,
            error: error.into(),
        }
    }

    pub fn store(&self) -> &Arc<TrustStore> {
        match self {
            ValidationOutcome::PathResult { store, .. } | ValidationOutcome::PathError { store, .. } => {
                store
            }
        }
    }

    pub fn is_trusted(&self) -> bool {
        matches!(self, ValidationOutcome::PathResult { trusted: true, .. })
    }

    /// Attribute Extended Validation to this verdict. No effect on errors.
    pub(crate) fn mark_extended_validation(&mut self) {
        if let ValidationOutcome::PathResult {
            is_leaf_certificate_ev,
            ..
        } = self
        {
            *is_leaf_certificate_ev = true;
        }
    }
}

/// Everything gathered from the per-store handshakes.
#[derive(Debug, Clone)]
pub struct ChainCollection {
    /// Chain sent by the server, leaf first. Never empty.
    pub received_chain: Vec<Certificate>,
    /// OCSP response stapled by the server.
    pub ocsp_staple: Option<OcspStaple>,
    /// One outcome per store, in the order the stores were given.
    pub outcomes: Vec<ValidationOutcome>,
}

struct Attempt {
    chain: Vec<Certificate>,
    verify_string: String,
    ocsp_staple: Option<OcspStaple>,
}

/// Connect to `target` once per store, all at the same time.
///
/// Each store gets its own worker thread. Per-store failures are recorded
/// as [`ValidationOutcome::PathError`]; only when every attempt fails does
/// this return [`CertinfoError::Connectivity`], carrying the error of the
/// last store. The received chain and staple come from the first store,
/// in the given order, whose attempt succeeded.
pub fn collect_certificate_chains<C: TlsConnector>(
    connector: &C,
    target: &ServerTarget,
    stores: &[Arc<TrustStore>],
) -> Result<ChainCollection, CertinfoError> {
    if stores.is_empty() {
        return Err(CertinfoError::TrustStore(
            "no trust store to validate against".into(),
        ));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(stores.len())
        .thread_name(|idx| format!("certinfo-store-{idx}"))
        .build()?;

    // One slot per store; the pool's join is the only synchronization.
    let attempts: Vec<Result<Attempt, ConnectionError>> = pool.install(|| {
        stores
            .par_iter()
            .with_max_len(1)
            .map(|store| attempt(connector, target, store))
            .collect()
    });

    let mut outcomes = Vec::with_capacity(stores.len());
    let mut first_success: Option<(Vec<Certificate>, Option<OcspStaple>)> = None;
    let mut last_error: Option<String> = None;

    for (store, result) in stores.iter().zip(attempts) {
        match result {
            Ok(attempt) => {
                tracing::debug!(
                    target = %target,
                    store = %store,
                    verdict = %attempt.verify_string,
                    chain_len = attempt.chain.len(),
                    "handshake completed"
                );
                outcomes.push(ValidationOutcome::path_result(
                    Arc::clone(store),
                    attempt.verify_string,
                ));
                if first_success.is_none() {
                    first_success = Some((attempt.chain, attempt.ocsp_staple));
                }
            }
            Err(e) => {
                tracing::warn!(target = %target, store = %store, error = %e, "handshake failed");
                let error = e.to_string();
                outcomes.push(ValidationOutcome::path_error(Arc::clone(store), error.clone()));
                last_error = Some(error);
            }
        }
    }

    match first_success {
        Some((received_chain, ocsp_staple)) => Ok(ChainCollection {
            received_chain,
            ocsp_staple,
            outcomes,
        }),
        None => Err(CertinfoError::Connectivity {
            last_error: last_error.unwrap_or_default(),
        }),
    }
}

/// One handshake against one store. The connection is closed on every
/// path out of this function.
fn attempt<C: TlsConnector>(
    connector: &C,
    target: &ServerTarget,
    store: &TrustStore,
) -> Result<Attempt, ConnectionError> {
    let mut conn = ConnectionGuard::new(connector.connect(target, store)?);

    match conn.handshake() {
        Ok(()) => {}
        Err(ConnectionError::ClientCertificateRequested) => {
            tracing::debug!(target = %target, store = %store, "server requested a client certificate");
        }
        Err(e) => return Err(e),
    }

    let chain = conn.peer_certificate_chain()?;
    if chain.is_empty() {
        return Err(ConnectionError::NoPeerCertificate);
    }

    Ok(Attempt {
        chain,
        verify_string: conn.verify_result(),
        ocsp_staple: conn.ocsp_staple(),
    })
}
