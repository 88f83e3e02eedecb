//! The seam between the scanner and the TLS library.

use super::ServerTarget;
use crate::fields::Certificate;
use crate::ocsp::OcspStaple;
use crate::trust::TrustStore;

/// Errors from a single connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("could not connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// The server asked for a client certificate. The handshake stops
    /// there, but the peer chain and verdict are still available.
    #[error("server requested a client certificate")]
    ClientCertificateRequested,

    #[error("server did not send a certificate")]
    NoPeerCertificate,

    #[error("TLS setup failed: {0}")]
    Setup(String),
}

/// Errors from verifying a stapled OCSP response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OcspVerifyError {
    /// The response signer does not chain to the trust store.
    #[error("OCSP response is not trusted: {0}")]
    Untrusted(String),

    /// Verification could not be carried out at all.
    #[error("OCSP verification failed: {0}")]
    Other(String),
}

/// One TLS connection configured against one trust store.
pub trait TlsConnection {
    /// Run the handshake. A server asking for a client certificate is
    /// reported as [`ConnectionError::ClientCertificateRequested`].
    fn handshake(&mut self) -> Result<(), ConnectionError>;

    /// The chain as sent by the server, leaf first.
    fn peer_certificate_chain(&self) -> Result<Vec<Certificate>, ConnectionError>;

    /// The library's verdict on the chain against the connection's store;
    /// `"ok"` on success.
    fn verify_result(&self) -> String;

    /// The stapled OCSP response, if the server sent one.
    fn ocsp_staple(&self) -> Option<OcspStaple>;

    /// Close the connection. Must be safe to call more than once.
    fn close(&mut self);
}

/// Opens connections and verifies OCSP staples.
///
/// Shared by the per-store workers, hence `Sync`.
pub trait TlsConnector: Sync {
    type Connection: TlsConnection;

    /// Open a connection to `target` that verifies against `store` and
    /// requests OCSP stapling.
    fn connect(
        &self,
        target: &ServerTarget,
        store: &TrustStore,
    ) -> Result<Self::Connection, ConnectionError>;

    /// Check the staple's signature against `store`. `chain` is the chain
    /// the server sent, used to locate the responder's issuer.
    fn verify_ocsp_staple(
        &self,
        staple: &OcspStaple,
        chain: &[Certificate],
        store: &TrustStore,
    ) -> Result<(), OcspVerifyError>;
}

/// Closes the wrapped connection when dropped.
pub struct ConnectionGuard<C: TlsConnection> {
    inner: C,
}

impl<C: TlsConnection> ConnectionGuard<C> {
    pub fn new(inner: C) -> Self {
        ConnectionGuard { inner }
    }
}

impl<C: TlsConnection> std::ops::Deref for ConnectionGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.inner
    }
}

impl<C: TlsConnection> std::ops::DerefMut for ConnectionGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}

impl<C: TlsConnection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        self.inner.close();
    }
}
