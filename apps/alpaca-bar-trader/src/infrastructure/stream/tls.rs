//! TLS Connector Factory
//!
//! Builds the TLS connector used for the WebSocket handshake. rustls
//! negotiates TLS 1.2/1.3 only.
//!
//! Peer verification can be disabled for test endpoints via the explicit
//! `insecure_skip_verify` setting; it is never the default.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio_tungstenite::Connector;

/// TLS behaviour for the stream connection.
#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    /// Skip peer certificate verification (test endpoints only).
    pub insecure_skip_verify: bool,
}

impl TlsSettings {
    /// Build the connector override for the WebSocket handshake.
    ///
    /// Returns `None` for the default verified-TLS connector (webpki
    /// roots); `Some` only when verification is explicitly disabled.
    #[must_use]
    pub fn connector(&self) -> Option<Connector> {
        if !self.insecure_skip_verify {
            return None;
        }

        tracing::warn!("TLS peer verification disabled for stream connection");

        let config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerification::new()))
            .with_no_client_auth();

        Some(Connector::Rustls(Arc::new(config)))
    }
}

/// Certificate verifier that accepts any peer certificate.
#[derive(Debug)]
struct NoVerification {
    schemes: Vec<SignatureScheme>,
}

impl NoVerification {
    fn new() -> Self {
        Self {
            schemes: rustls::crypto::ring::default_provider()
                .signature_verification_algorithms
                .supported_schemes(),
        }
    }
}

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.schemes.clone()
    }
}
