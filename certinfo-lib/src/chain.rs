//! Reconstruction of the leaf-to-anchor chain from what a server sent.
//!
//! This is name linkage only: a certificate's issuer is the certificate
//! whose raw subject equals its raw issuer name. Signatures and validity
//! periods are left to the TLS library's own verdict, which the caller
//! reconciles against the result.

use crate::fields::Certificate;
use crate::trust::AnchorSet;

/// Maximum chain length before traversal gives up.
pub(crate) const MAX_CHAIN_DEPTH: usize = 32;

/// Outcome of [`build_verified_chain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainBuild {
    /// Leaf-to-anchor chain built from a correctly ordered received chain.
    Complete(Vec<Certificate>),
    /// A leaf-to-anchor chain exists, but the server sent it out of order.
    OutOfOrder(Vec<Certificate>),
    /// No issuer could be found for some certificate, neither among the
    /// received ones nor among the anchors.
    AnchorNotFound {
        /// Whether the received chain was correctly ordered.
        order_valid: bool,
    },
}

impl ChainBuild {
    /// The built chain, if any.
    pub fn chain(&self) -> Option<&[Certificate]> {
        match self {
            ChainBuild::Complete(chain) | ChainBuild::OutOfOrder(chain) => Some(chain),
            ChainBuild::AnchorNotFound { .. } => None,
        }
    }

    pub fn into_chain(self) -> Option<Vec<Certificate>> {
        match self {
            ChainBuild::Complete(chain) | ChainBuild::OutOfOrder(chain) => Some(chain),
            ChainBuild::AnchorNotFound { .. } => None,
        }
    }

    /// False only when the received chain was out of order.
    pub fn is_order_valid(&self) -> bool {
        match self {
            ChainBuild::Complete(_) => true,
            ChainBuild::OutOfOrder(_) => false,
            ChainBuild::AnchorNotFound { order_valid } => *order_valid,
        }
    }
}

/// Whether every received certificate after the first is the issuer of
/// the one before it.
pub fn is_chain_order_valid(received: &[Certificate]) -> bool {
    received
        .windows(2)
        .all(|pair| matches!(pair, [child, parent] if child.is_issued_by(parent)))
}

/// Build the leaf-to-anchor chain for `received` against `anchors`.
///
/// The last element of a built chain is always an anchor from `anchors`.
/// An empty `received` chain has no anchor.
pub fn build_verified_chain(received: &[Certificate], anchors: &AnchorSet) -> ChainBuild {
    let order_valid = is_chain_order_valid(received);

    let Some(leaf_idx) = find_leaf(received) else {
        return ChainBuild::AnchorNotFound { order_valid };
    };

    let mut used = vec![false; received.len()];
    let mut chain: Vec<Certificate> = Vec::new();
    let mut current_idx = leaf_idx;

    loop {
        let Some(current) = received.get(current_idx) else {
            return ChainBuild::AnchorNotFound { order_valid };
        };
        if let Some(slot) = used.get_mut(current_idx) {
            *slot = true;
        }
        chain.push(current.clone());

        if current.is_self_issued() && anchors.contains(current) {
            break;
        }

        if let Some(anchor) = anchors.find_by_subject_raw(&current.issuer_raw).first() {
            chain.push(anchor.clone());
            break;
        }

        if chain.len() >= MAX_CHAIN_DEPTH {
            tracing::debug!(depth = chain.len(), "chain depth limit reached");
            return ChainBuild::AnchorNotFound { order_valid };
        }

        let next = received.iter().enumerate().position(|(idx, candidate)| {
            !used.get(idx).copied().unwrap_or(true) && current.is_issued_by(candidate)
        });
        match next {
            Some(idx) => current_idx = idx,
            None => return ChainBuild::AnchorNotFound { order_valid },
        }
    }

    if order_valid {
        ChainBuild::Complete(chain)
    } else {
        ChainBuild::OutOfOrder(chain)
    }
}

/// Index of the end-entity certificate in `received`.
///
/// That is the first certificate unless it issued another received
/// certificate, as happens when a server sends `[intermediate, leaf]`. In
/// that case the first certificate that issued none of the others is used.
pub(crate) fn find_leaf(received: &[Certificate]) -> Option<usize> {
    let issued_another = |idx: usize, cert: &Certificate| {
        received
            .iter()
            .enumerate()
            .any(|(other_idx, other)| other_idx != idx && other.is_issued_by(cert))
    };

    let first = received.first()?;
    if !issued_another(0, first) {
        return Some(0);
    }
    received
        .iter()
        .enumerate()
        .position(|(idx, cert)| !issued_another(idx, cert))
        .or(Some(0))
}
