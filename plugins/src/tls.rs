//! Names read from the certificate a target serves on port 443.
//!
//! The handshake accepts any certificate: only the names in it matter, not
//! whether it chains to a trusted root. The connection goes out directly and
//! does not use the run's HTTP proxy.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::debug;
use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

use scopr_common::error::{ConfigError, FailureKind, ProviderError};
use scopr_common::ports::{DiscoveryProvider, TargetKind};

const HTTPS_PORT: u16 = 443;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ReadCertificate {
    connector: TlsConnector,
}

impl ReadCertificate {
    pub const NAME: &'static str = "read_certificate";

    pub fn new() -> Result<Self, ConfigError> {
        let provider: Arc<CryptoProvider> = Arc::new(rustls::crypto::ring::default_provider());
        let config: ClientConfig = ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| ConfigError::TlsClient(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AnyCertificate(provider)))
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
        })
    }

    async fn leaf_certificate(&self, target: &str) -> Result<CertificateDer<'static>, FailureKind> {
        let server_name: ServerName<'static> = ServerName::try_from(target.to_string())
            .map_err(|e| FailureKind::Malformed(e.to_string()))?;

        let tcp: TcpStream = timeout(HANDSHAKE_TIMEOUT, TcpStream::connect((target, HTTPS_PORT)))
            .await
            .map_err(|_| FailureKind::Timeout)?
            .map_err(|e| FailureKind::Network(e.to_string()))?;
        let tls = timeout(HANDSHAKE_TIMEOUT, self.connector.connect(server_name, tcp))
            .await
            .map_err(|_| FailureKind::Timeout)?
            .map_err(|e| FailureKind::Network(e.to_string()))?;

        let (_, session) = tls.get_ref();
        session
            .peer_certificates()
            .and_then(|chain| chain.first())
            .cloned()
            .ok_or_else(|| FailureKind::Malformed("no certificate presented".into()))
    }
}

#[async_trait]
impl DiscoveryProvider for ReadCertificate {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn accepts(&self, target: TargetKind) -> bool {
        matches!(target, TargetKind::Ip | TargetKind::Domain)
    }

    async fn discover(&self, target: &str) -> Result<BTreeSet<String>, ProviderError> {
        let leaf: CertificateDer<'static> = self
            .leaf_certificate(target)
            .await
            .map_err(|kind| ProviderError::new(Self::NAME, target, kind))?;
        let names: BTreeSet<String> =
            certificate_names(&leaf).map_err(|kind| ProviderError::new(Self::NAME, target, kind))?;
        debug!("{target} presents a certificate for {} names", names.len());
        Ok(names)
    }
}

/// DNS names from the SAN extension plus the subject common names.
fn certificate_names(der: &[u8]) -> Result<BTreeSet<String>, FailureKind> {
    let (_, cert) = X509Certificate::from_der(der).map_err(|e| FailureKind::Malformed(e.to_string()))?;

    let mut names: BTreeSet<String> = BTreeSet::new();
    if let Ok(Some(san)) = cert.subject_alternative_name() {
        for general_name in &san.value.general_names {
            if let GeneralName::DNSName(name) = general_name {
                names.insert(name.to_ascii_lowercase());
            }
        }
    }
    for common_name in cert.subject().iter_common_name() {
        if let Ok(name) = common_name.as_str() {
            names.insert(name.to_ascii_lowercase());
        }
    }
    Ok(names)
}

#[derive(Debug)]
struct AnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AnyCertificate {
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
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

    fn certificate(common_name: &str, sans: &[&str]) -> Vec<u8> {
        let mut params = CertificateParams::new(sans.iter().map(|s| s.to_string()).collect::<Vec<_>>()).unwrap();
        let mut subject = DistinguishedName::new();
        subject.push(DnType::CommonName, common_name);
        params.distinguished_name = subject;
        let key = KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().der().to_vec()
    }

    #[test]
    fn sans_and_common_name_are_collected() {
        let der = certificate("Example.com", &["www.example.com", "*.shop.example.net", "example.org"]);

        let names = certificate_names(&der).unwrap();

        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["*.shop.example.net", "example.com", "example.org", "www.example.com"]
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(certificate_names(b"not a certificate"), Err(FailureKind::Malformed(_))));
    }

    #[test]
    fn provider_builds_and_takes_names_and_addresses() {
        let provider = ReadCertificate::new().unwrap();
        assert!(provider.accepts(TargetKind::Domain));
        assert!(provider.accepts(TargetKind::Ip));
        assert!(!provider.accepts(TargetKind::Subdomain));
    }
}
