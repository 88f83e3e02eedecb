//! The catalog of trust stores a scan validates against.

use super::anchors::{find_system_ca_bundle, AnchorSet};
use super::ev::default_ev_policy_oids;
use super::store::{TrustStore, CUSTOM_STORE_NAME};
use crate::config::Config;
use crate::CertinfoError;
use std::collections::HashSet;
use std::sync::Arc;

/// Immutable, ordered set of trust stores with one designated primary.
///
/// Built once at startup and passed by reference to every scan.
#[derive(Debug, Clone)]
pub struct TrustStoreRepository {
    stores: Vec<Arc<TrustStore>>,
    primary: usize,
}

impl TrustStoreRepository {
    /// Build a catalog from stores in display order.
    ///
    /// Fails when the catalog is empty, `primary` is out of range, or two
    /// stores share a name and version.
    pub fn new(stores: Vec<TrustStore>, primary: usize) -> Result<Self, CertinfoError> {
        if primary >= stores.len() {
            return Err(CertinfoError::TrustStore(format!(
                "primary store index {} out of range for {} store(s)",
                primary,
                stores.len()
            )));
        }
        let mut seen = HashSet::new();
        for store in &stores {
            if !seen.insert((store.name.as_str(), store.version.as_str())) {
                return Err(CertinfoError::TrustStore(format!(
                    "duplicate trust store {}",
                    store
                )));
            }
        }
        Ok(TrustStoreRepository {
            stores: stores.into_iter().map(Arc::new).collect(),
            primary,
        })
    }

    /// Build the catalog described by the configuration, or the system
    /// default when it lists no store. The `--ca-file` store name may not
    /// appear in the catalog.
    pub fn from_config(config: &Config) -> Result<Self, CertinfoError> {
        let Some(primary) = config.primary_index() else {
            return Self::system_default();
        };

        let mut stores = Vec::with_capacity(config.trust_stores.len());
        for (idx, entry) in config.trust_stores.iter().enumerate() {
            if entry.name == CUSTOM_STORE_NAME {
                return Err(CertinfoError::TrustStore(format!(
                    "store name \"{CUSTOM_STORE_NAME}\" is reserved for --ca-file"
                )));
            }
            let mut store = TrustStore::from_pem_file(&entry.name, &entry.version, &entry.path)?;
            if idx == primary {
                store.ev_policy_oids = entry
                    .ev_oids
                    .clone()
                    .unwrap_or_else(default_ev_policy_oids);
            }
            tracing::debug!(store = %store, anchors = store.anchors.len(), "loaded trust store");
            stores.push(store);
        }
        Self::new(stores, primary)
    }

    /// A single primary store holding the platform's anchors.
    pub fn system_default() -> Result<Self, CertinfoError> {
        let anchors = AnchorSet::system()?;
        let mut store =
            TrustStore::new("System", "local", anchors).with_ev_policy_oids(default_ev_policy_oids());
        store.path = find_system_ca_bundle();
        Self::new(vec![store], 0)
    }

    /// Every catalog store, in display order.
    pub fn all(&self) -> &[Arc<TrustStore>] {
        &self.stores
    }

    /// The reference store whose verdict decides the verified chain.
    #[allow(clippy::indexing_slicing)] // index validated in `new`
    pub fn primary(&self) -> &Arc<TrustStore> {
        &self.stores[self.primary]
    }

    /// The stores one scan validates against: the catalog, plus the
    /// user-supplied store at the end when given.
    pub fn with_custom_store(&self, custom: Option<&Arc<TrustStore>>) -> Vec<Arc<TrustStore>> {
        let mut stores = self.stores.clone();
        if let Some(custom) = custom {
            if !stores.iter().any(|s| s == custom) {
                stores.push(Arc::clone(custom));
            }
        }
        stores
    }
}
