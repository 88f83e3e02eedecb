//! End-to-end scans against a scripted TLS connector.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]

use certinfo_lib::ocsp::{OcspResponseStatus, OcspStaple};
use certinfo_lib::scan::{
    ConnectionError, OcspVerifyError, TlsConnection, TlsConnector, ValidationOutcome,
};
use certinfo_lib::trust::{AnchorSet, CUSTOM_STORE_NAME};
use certinfo_lib::{
    parse_der, scan_server, CertinfoError, Certificate, Extension, ExtensionValue,
    HostnameValidation, ScanCommand, ScanResult, ServerTarget, TrustStore, TrustStoreRepository,
};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SHA1_RSA: &str = "1.2.840.113549.1.1.5";
const EV_OID: &str = "2.23.140.1.1";

// ---- PKI fixture ----

struct Issuer {
    cert: rcgen::Certificate,
    key: rcgen::KeyPair,
}

fn params(cn: &str, ca: bool, sans: &[&str]) -> rcgen::CertificateParams {
    let sans = sans.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let mut params = rcgen::CertificateParams::new(sans).unwrap();
    params.distinguished_name = rcgen::DistinguishedName::new();
    params.distinguished_name.push(rcgen::DnType::CommonName, cn);
    if ca {
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    }
    params
}

struct Pki {
    root: Certificate,
    root_pem: String,
    intermediate: Certificate,
    leaf: Certificate,
}

fn pki() -> Pki {
    let root_key = rcgen::KeyPair::generate().unwrap();
    let root_cert = params("Test Root", true, &[]).self_signed(&root_key).unwrap();
    let root = Issuer {
        cert: root_cert,
        key: root_key,
    };

    let int_key = rcgen::KeyPair::generate().unwrap();
    let int_cert = params("Test Intermediate", true, &[])
        .signed_by(&int_key, &root.cert, &root.key)
        .unwrap();

    let leaf_key = rcgen::KeyPair::generate().unwrap();
    let leaf_cert = params("www.example.com", false, &["www.example.com"])
        .signed_by(&leaf_key, &int_cert, &int_key)
        .unwrap();

    Pki {
        root: parse_der(root.cert.der()).unwrap(),
        root_pem: root.cert.pem(),
        intermediate: parse_der(int_cert.der()).unwrap(),
        leaf: parse_der(leaf_cert.der()).unwrap(),
    }
}

fn anchors(certs: &[&Certificate]) -> AnchorSet {
    let mut set = AnchorSet::new();
    for cert in certs {
        set.add((*cert).clone());
    }
    set
}

fn sha1_signed(cert: &Certificate) -> Certificate {
    let mut cert = cert.clone();
    cert.signature_algorithm_oid = SHA1_RSA.to_string();
    cert.signature_algorithm = "sha1WithRSAEncryption".to_string();
    cert
}

fn with_policy(cert: &Certificate, oid: &str) -> Certificate {
    let mut cert = cert.clone();
    cert.extensions.push(Extension {
        oid: "2.5.29.32".to_string(),
        name: "X509v3 Certificate Policies".to_string(),
        critical: false,
        value: ExtensionValue::CertificatePolicies(vec![oid.to_string()]),
    });
    cert
}

fn staple() -> OcspStaple {
    OcspStaple {
        status: OcspResponseStatus::Successful,
        responder_id: None,
        single_response: None,
        der: vec![0x30, 0x00],
    }
}

// ---- Scripted connector ----

#[derive(Debug, Clone)]
enum Script {
    Verdict(&'static str),
    ClientCertificate(&'static str),
    ConnectFails,
    HandshakeFails,
}

struct ScriptedConnector {
    scripts: HashMap<String, Script>,
    chain: Vec<Certificate>,
    staple: Option<OcspStaple>,
    ocsp: Result<(), OcspVerifyError>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    fn new(chain: Vec<Certificate>) -> Self {
        ScriptedConnector {
            scripts: HashMap::new(),
            chain,
            staple: None,
            ocsp: Ok(()),
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn script(mut self, store: &str, script: Script) -> Self {
        self.scripts.insert(store.to_string(), script);
        self
    }

    fn stapled(mut self, ocsp: Result<(), OcspVerifyError>) -> Self {
        self.staple = Some(staple());
        self.ocsp = ocsp;
        self
    }

    fn all_closed(&self) -> bool {
        self.opened.load(Ordering::SeqCst) == self.closed.load(Ordering::SeqCst)
    }
}

struct ScriptedConnection {
    script: Script,
    chain: Vec<Certificate>,
    staple: Option<OcspStaple>,
    closed: Arc<AtomicUsize>,
}

impl TlsConnection for ScriptedConnection {
    fn handshake(&mut self) -> Result<(), ConnectionError> {
        match self.script {
            Script::HandshakeFails => Err(ConnectionError::Handshake("alert".into())),
            Script::ClientCertificate(_) => Err(ConnectionError::ClientCertificateRequested),
            _ => Ok(()),
        }
    }

    fn peer_certificate_chain(&self) -> Result<Vec<Certificate>, ConnectionError> {
        Ok(self.chain.clone())
    }

    fn verify_result(&self) -> String {
        match self.script {
            Script::Verdict(v) | Script::ClientCertificate(v) => v.to_string(),
            _ => "no verdict".to_string(),
        }
    }

    fn ocsp_staple(&self) -> Option<OcspStaple> {
        self.staple.clone()
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl TlsConnector for ScriptedConnector {
    type Connection = ScriptedConnection;

    fn connect(
        &self,
        target: &ServerTarget,
        store: &TrustStore,
    ) -> Result<ScriptedConnection, ConnectionError> {
        let script = self
            .scripts
            .get(&store.name)
            .cloned()
            .unwrap_or(Script::Verdict("ok"));
        if let Script::ConnectFails = script {
            return Err(ConnectionError::Connect {
                address: target.address(),
                reason: "connection refused".into(),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedConnection {
            script,
            chain: self.chain.clone(),
            staple: self.staple.clone(),
            closed: Arc::clone(&self.closed),
        })
    }

    fn verify_ocsp_staple(
        &self,
        _staple: &OcspStaple,
        _chain: &[Certificate],
        _store: &TrustStore,
    ) -> Result<(), OcspVerifyError> {
        self.ocsp.clone()
    }
}

// ---- Helpers ----

fn target() -> ServerTarget {
    ServerTarget::new("www.example.com", 443)
}

fn repository(stores: Vec<TrustStore>) -> TrustStoreRepository {
    TrustStoreRepository::new(stores, 0).unwrap()
}

fn scan(
    connector: &ScriptedConnector,
    repo: &TrustStoreRepository,
) -> Result<ScanResult, CertinfoError> {
    scan_server(connector, repo, target(), &ScanCommand::default())
}

fn names(chain: &[Certificate]) -> Vec<String> {
    chain.iter().map(Certificate::printable_subject_name).collect()
}

// ---- Orchestration ----

#[test]
fn one_outcome_per_store_when_any_handshake_succeeds() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![p.leaf.clone(), p.intermediate.clone()])
        .script("B", Script::ConnectFails)
        .script("C", Script::HandshakeFails);
    let repo = repository(vec![
        TrustStore::new("A", "1", anchors(&[&p.root])),
        TrustStore::new("B", "1", anchors(&[&p.root])),
        TrustStore::new("C", "1", anchors(&[&p.root])),
    ]);

    let result = scan(&connector, &repo).unwrap();
    let outcomes = &result.path_validation_outcomes;
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].store().name, "A");
    assert!(outcomes[0].is_trusted());
    assert!(matches!(
        &outcomes[1],
        ValidationOutcome::PathError { error, .. } if error.contains("connection refused")
    ));
    assert!(matches!(
        &outcomes[2],
        ValidationOutcome::PathError { error, .. } if error.contains("alert")
    ));
    assert!(connector.all_closed());
}

#[test]
fn every_handshake_failing_is_a_connectivity_error() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![p.leaf.clone()])
        .script("A", Script::ConnectFails)
        .script("B", Script::HandshakeFails);
    let repo = repository(vec![
        TrustStore::new("A", "1", anchors(&[&p.root])),
        TrustStore::new("B", "1", anchors(&[&p.root])),
    ]);

    match scan(&connector, &repo) {
        Err(CertinfoError::Connectivity { last_error }) => {
            assert!(last_error.contains("alert"), "{last_error}");
        }
        other => panic!("expected connectivity error, got {other:?}"),
    }
    assert!(connector.all_closed());
}

#[test]
fn client_certificate_request_does_not_fail_the_attempt() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![p.leaf.clone(), p.intermediate.clone()])
        .script("A", Script::ClientCertificate("ok"));
    let repo = repository(vec![TrustStore::new("A", "1", anchors(&[&p.root]))]);

    let result = scan(&connector, &repo).unwrap();
    assert!(result.path_validation_outcomes[0].is_trusted());
    assert_eq!(result.verified_certificate_chain.len(), 3);
    assert!(connector.all_closed());
}

#[test]
fn empty_peer_chain_fails_the_attempt() {
    let connector = ScriptedConnector::new(Vec::new());
    let repo = repository(vec![TrustStore::new("A", "1", AnchorSet::new())]);

    assert!(matches!(
        scan(&connector, &repo),
        Err(CertinfoError::Connectivity { .. })
    ));
    assert!(connector.all_closed());
}

// ---- Chain reconciliation ----

#[test]
fn ordered_chain_without_anchor() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![p.leaf.clone(), p.intermediate.clone()]);
    let repo = repository(vec![TrustStore::new("A", "1", anchors(&[&p.root]))]);

    let result = scan(&connector, &repo).unwrap();
    assert_eq!(
        names(&result.verified_certificate_chain),
        ["www.example.com", "Test Intermediate", "Test Root"]
    );
    assert!(result.is_certificate_chain_order_valid);
    assert_eq!(result.has_anchor_in_certificate_chain, Some(false));
    assert_eq!(result.has_sha1_in_certificate_chain, Some(false));
    assert_eq!(result.hostname_validation, HostnameValidation::NameMatchesSan);
    assert_eq!(result.is_ocsp_response_trusted, None);
}

#[test]
fn sent_anchor_is_reported() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![
        p.leaf.clone(),
        p.intermediate.clone(),
        p.root.clone(),
    ]);
    let repo = repository(vec![TrustStore::new("A", "1", anchors(&[&p.root]))]);

    let result = scan(&connector, &repo).unwrap();
    assert_eq!(result.verified_certificate_chain.len(), 3);
    assert_eq!(result.has_anchor_in_certificate_chain, Some(true));
}

#[test]
fn swapped_chain_is_out_of_order_but_verified() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![p.intermediate.clone(), p.leaf.clone()]);
    let repo = repository(vec![TrustStore::new("A", "1", anchors(&[&p.root]))]);

    let result = scan(&connector, &repo).unwrap();
    assert!(!result.is_certificate_chain_order_valid);
    assert_eq!(
        names(&result.verified_certificate_chain),
        ["www.example.com", "Test Intermediate", "Test Root"]
    );
    assert_eq!(result.has_anchor_in_certificate_chain, Some(false));
    assert_eq!(result.has_sha1_in_certificate_chain, Some(false));
}

#[test]
fn untrusted_primary_verdict_discards_the_chain() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![p.leaf.clone(), p.intermediate.clone()])
        .script("A", Script::Verdict("certificate has expired"));
    let repo = repository(vec![
        TrustStore::new("A", "1", anchors(&[&p.root])),
        TrustStore::new("B", "1", anchors(&[&p.root])),
    ]);

    let result = scan(&connector, &repo).unwrap();
    assert!(result.verified_certificate_chain.is_empty());
    assert_eq!(result.has_anchor_in_certificate_chain, None);
    assert_eq!(result.has_sha1_in_certificate_chain, None);
    assert!(result.is_certificate_chain_order_valid);
    // A supplementary store trusting the chain does not bring it back.
    assert!(result.path_validation_outcomes[1].is_trusted());
}

#[test]
fn primary_path_error_discards_the_chain() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![p.leaf.clone(), p.intermediate.clone()])
        .script("A", Script::HandshakeFails);
    let repo = repository(vec![
        TrustStore::new("A", "1", anchors(&[&p.root])),
        TrustStore::new("B", "1", anchors(&[&p.root])),
    ]);

    let result = scan(&connector, &repo).unwrap();
    assert!(result.verified_certificate_chain.is_empty());
    assert_eq!(result.has_anchor_in_certificate_chain, None);
}

#[test]
fn sha1_root_is_ignored() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![p.leaf.clone(), p.intermediate.clone()]);
    let repo = repository(vec![TrustStore::new(
        "A",
        "1",
        anchors(&[&sha1_signed(&p.root)]),
    )]);

    let result = scan(&connector, &repo).unwrap();
    assert_eq!(result.verified_certificate_chain.len(), 3);
    assert!(result.verified_certificate_chain[2].is_sha1_signed());
    assert_eq!(result.has_sha1_in_certificate_chain, Some(false));
}

#[test]
fn sha1_intermediate_is_detected() {
    let p = pki();
    let connector =
        ScriptedConnector::new(vec![p.leaf.clone(), sha1_signed(&p.intermediate)]);
    let repo = repository(vec![TrustStore::new("A", "1", anchors(&[&p.root]))]);

    let result = scan(&connector, &repo).unwrap();
    assert_eq!(result.has_sha1_in_certificate_chain, Some(true));
}

// ---- EV ----

#[test]
fn ev_is_attributed_to_the_primary_store_only() {
    let p = pki();
    let leaf = with_policy(&p.leaf, EV_OID);
    let connector = ScriptedConnector::new(vec![leaf, p.intermediate.clone()]);
    let repo = repository(vec![
        TrustStore::new("A", "1", anchors(&[&p.root]))
            .with_ev_policy_oids(vec![EV_OID.to_string()]),
        TrustStore::new("B", "1", anchors(&[&p.root]))
            .with_ev_policy_oids(vec![EV_OID.to_string()]),
    ]);

    let result = scan(&connector, &repo).unwrap();
    assert!(result.is_leaf_certificate_ev);
    let outcomes = &result.path_validation_outcomes;
    assert!(outcomes[0].is_trusted() && outcomes[1].is_trusted());
    assert!(result.is_ev_for(&outcomes[0]));
    assert!(!result.is_ev_for(&outcomes[1]));
}

#[test]
fn json_outcomes_mark_ev_on_the_primary_entry() {
    use certinfo_lib::report::{JsonRenderer, Renderer};

    let p = pki();
    let leaf = with_policy(&p.leaf, EV_OID);
    let connector = ScriptedConnector::new(vec![leaf, p.intermediate.clone()]);
    let repo = repository(vec![
        TrustStore::new("A", "1", anchors(&[&p.root]))
            .with_ev_policy_oids(vec![EV_OID.to_string()]),
        TrustStore::new("B", "1", anchors(&[&p.root])),
    ]);

    let result = scan(&connector, &repo).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&JsonRenderer.render(&result).unwrap()).unwrap();
    let outcomes = &json["path_validation_outcomes"];
    assert_eq!(outcomes[0]["store"]["name"], "A");
    assert_eq!(outcomes[0]["is_leaf_certificate_ev"], true);
    assert_eq!(outcomes[1]["is_leaf_certificate_ev"], false);
}

#[test]
fn ev_oids_of_supplementary_stores_are_not_used() {
    let p = pki();
    let leaf = with_policy(&p.leaf, EV_OID);
    let connector = ScriptedConnector::new(vec![leaf, p.intermediate.clone()]);
    let repo = repository(vec![
        TrustStore::new("A", "1", anchors(&[&p.root])),
        TrustStore::new("B", "1", anchors(&[&p.root]))
            .with_ev_policy_oids(vec![EV_OID.to_string()]),
    ]);

    let result = scan(&connector, &repo).unwrap();
    assert!(!result.is_leaf_certificate_ev);
}

// ---- OCSP ----

#[test]
fn trusted_staple() {
    let p = pki();
    let connector =
        ScriptedConnector::new(vec![p.leaf.clone(), p.intermediate.clone()]).stapled(Ok(()));
    let repo = repository(vec![TrustStore::new("A", "1", anchors(&[&p.root]))]);

    let result = scan(&connector, &repo).unwrap();
    assert!(result.ocsp_staple.is_some());
    assert_eq!(result.is_ocsp_response_trusted, Some(true));
}

#[test]
fn untrusted_staple_is_not_an_error() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![p.leaf.clone(), p.intermediate.clone()])
        .stapled(Err(OcspVerifyError::Untrusted("certificate verify error".into())));
    let repo = repository(vec![TrustStore::new("A", "1", anchors(&[&p.root]))]);

    let result = scan(&connector, &repo).unwrap();
    assert_eq!(result.is_ocsp_response_trusted, Some(false));
}

#[test]
fn unrelated_ocsp_failure_is_an_error() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![p.leaf.clone(), p.intermediate.clone()])
        .stapled(Err(OcspVerifyError::Other("malloc failure".into())));
    let repo = repository(vec![TrustStore::new("A", "1", anchors(&[&p.root]))]);

    assert!(matches!(
        scan(&connector, &repo),
        Err(CertinfoError::Ocsp(reason)) if reason == "malloc failure"
    ));
}

// ---- Hostname, custom store ----

#[test]
fn hostname_is_matched_against_the_sni() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![p.leaf.clone(), p.intermediate.clone()]);
    let repo = repository(vec![TrustStore::new("A", "1", anchors(&[&p.root]))]);

    let server = ServerTarget::new("www.example.com", 443).with_sni("mail.example.com");
    let result = scan_server(&connector, &repo, server, &ScanCommand::default()).unwrap();
    assert_eq!(result.hostname_validation, HostnameValidation::NameMismatch);
}

#[test]
fn ca_file_adds_a_custom_store() {
    let p = pki();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(p.root_pem.as_bytes()).unwrap();

    let connector = ScriptedConnector::new(vec![p.leaf.clone(), p.intermediate.clone()])
        .script(CUSTOM_STORE_NAME, Script::Verdict("unable to get local issuer certificate"));
    let repo = repository(vec![TrustStore::new("A", "1", anchors(&[&p.root]))]);
    let command = ScanCommand {
        ca_file: Some(file.path().to_path_buf()),
        print_full_certificate: true,
    };

    let result = scan_server(&connector, &repo, target(), &command).unwrap();
    assert!(result.print_full_certificate);
    let outcomes = &result.path_validation_outcomes;
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[1].store().name, CUSTOM_STORE_NAME);
    assert!(!outcomes[1].is_trusted());
    assert_eq!(result.primary_trust_store.name, "A");
    assert_eq!(result.verified_certificate_chain.len(), 3);
}

#[test]
fn missing_ca_file_is_an_error() {
    let p = pki();
    let connector = ScriptedConnector::new(vec![p.leaf.clone()]);
    let repo = repository(vec![TrustStore::new("A", "1", anchors(&[&p.root]))]);
    let command = ScanCommand {
        ca_file: Some("/nonexistent/ca.pem".into()),
        print_full_certificate: false,
    };

    assert!(scan_server(&connector, &repo, target(), &command).is_err());
    assert_eq!(connector.opened.load(Ordering::SeqCst), 0);
}

#[test]
fn json_report_carries_every_property() {
    use certinfo_lib::report::{JsonRenderer, Renderer};

    let p = pki();
    let connector =
        ScriptedConnector::new(vec![p.leaf.clone(), p.intermediate.clone()]).stapled(Ok(()));
    let repo = repository(vec![TrustStore::new("A", "1", anchors(&[&p.root]))]);

    let result = scan(&connector, &repo).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&JsonRenderer.render(&result).unwrap()).unwrap();
    assert_eq!(json["is_certificate_chain_order_valid"], true);
    assert_eq!(json["has_anchor_in_certificate_chain"], false);
    assert_eq!(json["hostname_validation"], "NAME_MATCHES_SAN");
    assert_eq!(json["is_ocsp_response_trusted"], true);
    assert_eq!(json["ocsp_staple"]["status"], "successful");
    assert_eq!(json["path_validation_outcomes"][0]["kind"], "path_result");
    assert_eq!(json["path_validation_outcomes"][0]["store"]["name"], "A");
    assert_eq!(json["path_validation_outcomes"][0]["is_leaf_certificate_ev"], false);
    assert_eq!(json["verified_certificate_chain"].as_array().unwrap().len(), 3);
    assert!(json["certificate_chain"][0]["hpkp_pin"].is_string());
}
