//! # TLS Material
//!
//! Certificate, key and optional client CA, loaded once at startup and
//! turned into whatever each listener needs.
//!
//! ```text
//! ServiceEndpointConfig ──► TlsMaterial::from_config
//!                               │ (PEM read + parsed once; errors are fatal)
//!               ┌───────────────┴────────────────┐
//!               ▼                                ▼
//!        acceptor()                        grpc_config()
//!        rustls ServerConfig               tonic ServerTlsConfig
//!        ALPN: h2, http/1.1                (dedicated gRPC listener)
//!        (shared port + REST)
//! ```
//!
//! The ring provider is selected explicitly so the host never depends on
//! which process-wide rustls provider happens to be installed.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use janus_core::config::ServiceEndpointConfig;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;
use tonic::transport::{Certificate, Identity, ServerTlsConfig};

use crate::error::{HostError, HostResult};

/// ALPN protocols offered on REST and shared listeners, in preference order.
pub const ALPN_PROTOCOLS: [&[u8]; 2] = [b"h2", b"http/1.1"];

/// Parsed server identity plus optional client CA.
pub struct TlsMaterial {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
    ca_pem: Option<Vec<u8>>,
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    client_roots: Option<Arc<RootCertStore>>,
}

impl TlsMaterial {
    /// Loads the files named in `config`; `Ok(None)` when TLS is off.
    pub fn from_config(config: &ServiceEndpointConfig) -> HostResult<Option<Self>> {
        let Some((cert_path, key_path)) = config.tls_paths() else {
            return Ok(None);
        };
        let cert_pem = read_pem(cert_path, "certificate")?;
        let key_pem = read_pem(key_path, "private key")?;
        let ca_pem = config
            .client_ca_path()
            .map(|path| read_pem(path, "client CA"))
            .transpose()?;
        Self::from_pem(cert_pem, key_pem, ca_pem).map(Some)
    }

    /// Parses PEM-encoded material.
    pub fn from_pem(cert_pem: Vec<u8>, key_pem: Vec<u8>, ca_pem: Option<Vec<u8>>) -> HostResult<Self> {
        let certs = parse_certs(&cert_pem, "certificate")?;
        let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
            .map_err(|e| HostError::tls(format!("failed to parse private key: {e}")))?
            .ok_or_else(|| HostError::tls("no private key found in PEM"))?;

        let client_roots = match &ca_pem {
            Some(pem) => {
                let mut roots = RootCertStore::empty();
                for cert in parse_certs(pem, "client CA")? {
                    roots
                        .add(cert)
                        .map_err(|e| HostError::tls(format!("failed to add client CA: {e}")))?;
                }
                Some(Arc::new(roots))
            }
            None => None,
        };

        Ok(Self {
            cert_pem,
            key_pem,
            ca_pem,
            certs,
            key,
            client_roots,
        })
    }

    /// True when clients must present a certificate.
    pub fn requires_client_auth(&self) -> bool {
        self.client_roots.is_some()
    }

    /// rustls server config with ALPN for HTTP/2 and HTTP/1.1.
    pub fn server_config(&self) -> HostResult<Arc<ServerConfig>> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ServerConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| HostError::tls(format!("unsupported protocol versions: {e}")))?;

        let builder = match &self.client_roots {
            Some(roots) => builder.with_client_cert_verifier(client_verifier(roots, provider)?),
            None => builder.with_no_client_auth(),
        };

        let mut config = builder
            .with_single_cert(self.certs.clone(), self.key.clone_key())
            .map_err(|e| HostError::tls(format!("certificate and key do not match: {e}")))?;
        config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();
        Ok(Arc::new(config))
    }

    pub fn acceptor(&self) -> HostResult<TlsAcceptor> {
        Ok(TlsAcceptor::from(self.server_config()?))
    }

    /// Same identity for tonic's own TLS stack.
    pub fn grpc_config(&self) -> ServerTlsConfig {
        let config = ServerTlsConfig::new().identity(Identity::from_pem(&self.cert_pem, &self.key_pem));
        match &self.ca_pem {
            Some(ca) => config.client_ca_root(Certificate::from_pem(ca)),
            None => config,
        }
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("certificates", &self.certs.len())
            .field("client_auth", &self.requires_client_auth())
            .finish_non_exhaustive()
    }
}

fn client_verifier(
    roots: &Arc<RootCertStore>,
    provider: Arc<CryptoProvider>,
) -> HostResult<Arc<dyn rustls::server::danger::ClientCertVerifier>> {
    WebPkiClientVerifier::builder_with_provider(Arc::clone(roots), provider)
        .build()
        .map_err(|e| HostError::tls(format!("failed to build client verifier: {e}")))
}

fn read_pem(path: &Path, what: &str) -> HostResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| HostError::tls(format!("failed to read {what} {}: {e}", path.display())))
}

fn parse_certs(pem: &[u8], what: &str) -> HostResult<Vec<CertificateDer<'static>>> {
    let certs = rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| HostError::tls(format!("failed to parse {what}: {e}")))?;
    if certs.is_empty() {
        return Err(HostError::tls(format!("no {what} found in PEM")));
    }
    Ok(certs)
}
