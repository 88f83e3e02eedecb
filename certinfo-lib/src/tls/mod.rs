//! OpenSSL implementation of the TLS seam.
//!
//! Certificate verification runs in `SSL_VERIFY_NONE` mode so the handshake
//! always completes; the verdict against the store is read afterwards with
//! `SSL_get_verify_result`.

mod ocsp;

use crate::fields::Certificate;
use crate::ocsp::OcspStaple;
use crate::scan::{ConnectionError, OcspVerifyError, ServerTarget, TlsConnection, TlsConnector};
use crate::trust::{AnchorSet, TrustStore};
use openssl::error::ErrorStack;
use openssl::ssl::{
    HandshakeError, MidHandshakeSslStream, Ssl, SslContext, SslMethod, SslRef, SslStream,
    SslVerifyMode,
};
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::X509;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Opens one OpenSSL client connection per trust store.
#[derive(Debug, Clone)]
pub struct OpensslConnector {
    timeout: Duration,
}

impl OpensslConnector {
    /// `timeout` bounds the TCP connect and every socket read and write.
    pub fn new(timeout: Duration) -> Self {
        OpensslConnector { timeout }
    }

    fn context(&self, store: &TrustStore) -> Result<SslContext, ErrorStack> {
        let mut builder = SslContext::builder(SslMethod::tls_client())?;
        builder.set_verify(SslVerifyMode::NONE);
        builder.set_cert_store(build_x509_store(&store.anchors)?);
        Ok(builder.build())
    }

    fn open_socket(&self, target: &ServerTarget) -> Result<TcpStream, ConnectionError> {
        let address = target.address();
        let connect_error = |reason: String| ConnectionError::Connect {
            address: address.clone(),
            reason,
        };

        let addrs = (target.hostname.as_str(), target.port)
            .to_socket_addrs()
            .map_err(|e| connect_error(e.to_string()))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    let timeout = Some(self.timeout);
                    stream
                        .set_read_timeout(timeout)
                        .and_then(|()| stream.set_write_timeout(timeout))
                        .map_err(|e| connect_error(e.to_string()))?;
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e.to_string()),
            }
        }
        Err(connect_error(
            last_error.unwrap_or_else(|| "no address found".into()),
        ))
    }
}

impl TlsConnector for OpensslConnector {
    type Connection = OpensslConnection;

    fn connect(
        &self,
        target: &ServerTarget,
        store: &TrustStore,
    ) -> Result<OpensslConnection, ConnectionError> {
        let setup = |e: ErrorStack| ConnectionError::Setup(e.to_string());

        let context = self.context(store).map_err(setup)?;
        let mut ssl = Ssl::new(&context).map_err(setup)?;
        if target.sends_sni() {
            ssl.set_hostname(&target.server_name_indication)
                .map_err(setup)?;
        }
        ssl.set_status_type(openssl::ssl::StatusType::OCSP)
            .map_err(setup)?;

        let socket = self.open_socket(target)?;
        Ok(OpensslConnection {
            state: State::Ready(ssl, socket),
        })
    }

    fn verify_ocsp_staple(
        &self,
        staple: &OcspStaple,
        chain: &[Certificate],
        store: &TrustStore,
    ) -> Result<(), OcspVerifyError> {
        ocsp::verify_staple(staple, chain, store)
    }
}

enum State {
    Ready(Ssl, TcpStream),
    Established(SslStream<TcpStream>),
    /// Stopped after the server requested a client certificate.
    Interrupted(MidHandshakeSslStream<TcpStream>),
    Closed,
}

/// A client connection driven by [`OpensslConnector`].
pub struct OpensslConnection {
    state: State,
}

impl OpensslConnection {
    fn ssl(&self) -> Option<&SslRef> {
        match &self.state {
            State::Established(stream) => Some(stream.ssl()),
            State::Interrupted(mid) => Some(mid.ssl()),
            State::Ready(ssl, _) => Some(&**ssl),
            State::Closed => None,
        }
    }
}

impl TlsConnection for OpensslConnection {
    fn handshake(&mut self) -> Result<(), ConnectionError> {
        let (ssl, socket) = match std::mem::replace(&mut self.state, State::Closed) {
            State::Ready(ssl, socket) => (ssl, socket),
            other => {
                self.state = other;
                return Err(ConnectionError::Handshake(
                    "handshake already attempted".into(),
                ));
            }
        };

        match ssl.connect(socket) {
            Ok(stream) => {
                self.state = State::Established(stream);
                Ok(())
            }
            Err(HandshakeError::SetupFailure(e)) => Err(ConnectionError::Setup(e.to_string())),
            Err(HandshakeError::Failure(mid)) => {
                // The server has already sent its chain and then rejected
                // the handshake because we had no certificate to offer.
                let got_chain = mid
                    .ssl()
                    .peer_cert_chain()
                    .is_some_and(|chain| !chain.is_empty());
                if got_chain
                    && mid.ssl().peer_certificate().is_some()
                    && is_client_certificate_alert(mid.error())
                {
                    self.state = State::Interrupted(mid);
                    Err(ConnectionError::ClientCertificateRequested)
                } else {
                    Err(ConnectionError::Handshake(mid.error().to_string()))
                }
            }
            Err(HandshakeError::WouldBlock(mid)) => Err(ConnectionError::Handshake(format!(
                "timed out: {}",
                mid.error()
            ))),
        }
    }

    fn peer_certificate_chain(&self) -> Result<Vec<Certificate>, ConnectionError> {
        let ssl = self.ssl().ok_or(ConnectionError::NoPeerCertificate)?;
        let Some(stack) = ssl.peer_cert_chain() else {
            return Err(ConnectionError::NoPeerCertificate);
        };
        stack
            .iter()
            .map(|x509| {
                let der = x509
                    .to_der()
                    .map_err(|e| ConnectionError::Handshake(e.to_string()))?;
                crate::parse_der(&der).map_err(|e| {
                    ConnectionError::Handshake(format!("unparseable peer certificate: {e}"))
                })
            })
            .collect()
    }

    fn verify_result(&self) -> String {
        match self.ssl() {
            Some(ssl) => ssl.verify_result().error_string().to_string(),
            None => "no connection".into(),
        }
    }

    fn ocsp_staple(&self) -> Option<OcspStaple> {
        let ssl = self.ssl()?;
        let der = ssl.ocsp_status()?;
        let chain = self.peer_certificate_chain().unwrap_or_default();
        match ocsp::parse_staple(der, &chain, ssl.ssl_context().cert_store()) {
            Ok(staple) => Some(staple),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unparseable OCSP staple");
                None
            }
        }
    }

    fn close(&mut self) {
        if let State::Established(mut stream) = std::mem::replace(&mut self.state, State::Closed) {
            // close_notify is best effort; the socket is dropped either way.
            let _ = stream.shutdown();
        }
    }
}

/// Alerts a server sends when it required a client certificate and got none.
const CLIENT_CERTIFICATE_ALERTS: &[&str] = &[
    "alert handshake failure",
    "alert certificate required",
    "alert bad certificate",
];

fn is_client_certificate_alert(error: &openssl::ssl::Error) -> bool {
    error.ssl_error().is_some_and(|stack| {
        stack
            .errors()
            .iter()
            .filter_map(|e| e.reason())
            .any(is_client_certificate_reason)
    })
}

fn is_client_certificate_reason(reason: &str) -> bool {
    CLIENT_CERTIFICATE_ALERTS
        .iter()
        .any(|alert| reason.contains(alert))
}

/// An OpenSSL verification store holding `anchors`.
pub(crate) fn build_x509_store(anchors: &AnchorSet) -> Result<X509Store, ErrorStack> {
    let mut builder = X509StoreBuilder::new()?;
    for cert in anchors.iter() {
        builder.add_cert(X509::from_der(&cert.raw_der)?)?;
    }
    Ok(builder.build())
}
