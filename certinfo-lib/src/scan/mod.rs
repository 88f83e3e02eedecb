//! Scanning a server: connection seam, per-store fan-out and evaluation.

mod connector;
mod evaluate;
mod orchestrator;

pub use connector::{
    ConnectionError, ConnectionGuard, OcspVerifyError, TlsConnection, TlsConnector,
};
pub use evaluate::{scan_server, ScanCommand, ScanResult};
pub use orchestrator::{collect_certificate_chains, ChainCollection, ValidationOutcome};

use crate::CertinfoError;
use serde::Serialize;
use std::net::IpAddr;

/// Port used when a target does not name one.
pub const DEFAULT_PORT: u16 = 443;

/// A server to scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerTarget {
    /// Host name or IP literal to connect to.
    pub hostname: String,
    pub port: u16,
    /// Name sent in the SNI extension and matched against the leaf.
    pub server_name_indication: String,
}

impl ServerTarget {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        let hostname = hostname.into();
        ServerTarget {
            server_name_indication: hostname.clone(),
            hostname,
            port,
        }
    }

    /// Parse `host`, `host:port`, `[v6]` or `[v6]:port`.
    pub fn parse(input: &str) -> Result<Self, CertinfoError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CertinfoError::Target("empty target".into()));
        }

        if let Some(rest) = input.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| CertinfoError::Target(format!("{input}: missing ']'")))?;
            let port = match after {
                "" => DEFAULT_PORT,
                _ => {
                    let port = after.strip_prefix(':').ok_or_else(|| {
                        CertinfoError::Target(format!("{input}: unexpected text after ']'"))
                    })?;
                    parse_port(input, port)?
                }
            };
            return Ok(Self::new(host, port));
        }

        // A bare IPv6 literal has several colons and no port.
        if input.parse::<IpAddr>().is_ok() {
            return Ok(Self::new(input, DEFAULT_PORT));
        }

        match input.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => Ok(Self::new(host, parse_port(input, port)?)),
            Some(_) => Err(CertinfoError::Target(format!("{input}: missing host"))),
            None => Ok(Self::new(input, DEFAULT_PORT)),
        }
    }

    /// Use a different SNI name than the host connected to.
    pub fn with_sni(mut self, server_name: impl Into<String>) -> Self {
        self.server_name_indication = server_name.into();
        self
    }

    /// Whether the SNI name differs from the host connected to.
    pub fn has_virtual_domain(&self) -> bool {
        !self
            .server_name_indication
            .eq_ignore_ascii_case(&self.hostname)
    }

    /// The connect address, e.g. `example.com:443` or `[::1]:8443`.
    pub fn address(&self) -> String {
        if self.hostname.contains(':') {
            format!("[{}]:{}", self.hostname, self.port)
        } else {
            format!("{}:{}", self.hostname, self.port)
        }
    }

    /// Whether SNI should be sent at all (never for IP literals).
    pub fn sends_sni(&self) -> bool {
        self.server_name_indication.parse::<IpAddr>().is_err()
    }
}

impl std::fmt::Display for ServerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address())
    }
}

fn parse_port(input: &str, port: &str) -> Result<u16, CertinfoError> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(CertinfoError::Target(format!(
            "{input}: invalid port '{port}'"
        ))),
        Ok(p) => Ok(p),
    }
}
