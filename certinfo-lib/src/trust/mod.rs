//! Trust stores: anchor sets, their identities and the catalog.

mod anchors;
mod ev;
mod repository;
mod store;

pub use anchors::{find_system_ca_bundle, AnchorSet};
pub use ev::{default_ev_policy_oids, DEFAULT_EV_POLICY_OIDS};
pub use repository::TrustStoreRepository;
pub use store::{TrustStore, CUSTOM_STORE_NAME, CUSTOM_STORE_VERSION};
