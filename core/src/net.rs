/*
 * net.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Wirehttp, an HTTP/1.1 client library.
 *
 * Wirehttp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wirehttp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wirehttp.  If not, see <http://www.gnu.org/licenses/>.
 */

//! TLS client configuration for HTTPS: root store (native certs, Mozilla roots as fallback) and an
//! opt-in permissive verifier that logs validation failures and accepts the certificate anyway.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, Error as TlsError, RootCertStore, SignatureScheme};
use tracing::{debug, warn};

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            for cert in certs {
                let _ = root_store.add(cert);
            }
        }
        Err(e) => debug!(error = %e, "native certificate store unavailable"),
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

/// Runs the normal WebPKI checks, logs any failure, and accepts the certificate regardless.
#[derive(Debug)]
struct LoggingPermissiveVerifier {
    inner: Arc<WebPkiServerVerifier>,
}

impl ServerCertVerifier for LoggingPermissiveVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        if let Err(e) = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            warn!(server = ?server_name, error = %e, "accepting certificate that failed validation");
        }
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// TLS client config for HTTP/1.1 (ALPN `http/1.1`).
///
/// With `insecure_skip_verify` certificate validation errors are logged and ignored.
pub fn http_client_config(insecure_skip_verify: bool) -> Result<Arc<ClientConfig>, TlsError> {
    let roots = Arc::new(build_root_store());
    let mut config = if insecure_skip_verify {
        let inner = WebPkiServerVerifier::builder(roots)
            .build()
            .map_err(|e| TlsError::General(e.to_string()))?;
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(LoggingPermissiveVerifier { inner }))
            .with_no_client_auth()
    } else {
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth()
    };
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configs_offer_http11_only() {
        for insecure in [false, true] {
            let config = http_client_config(insecure).unwrap();
            assert_eq!(config.alpn_protocols, vec![b"http/1.1".to_vec()]);
        }
    }

    #[test]
    fn permissive_verifier_accepts_what_webpki_rejects() {
        let strict = WebPkiServerVerifier::builder(Arc::new(build_root_store()))
            .build()
            .unwrap();
        let permissive = LoggingPermissiveVerifier {
            inner: strict.clone(),
        };
        let garbage = CertificateDer::from(vec![1u8, 2, 3]);
        let name = ServerName::try_from("example.com").unwrap();
        let now = UnixTime::now();
        assert!(strict.verify_server_cert(&garbage, &[], &name, &[], now).is_err());
        assert!(permissive.verify_server_cert(&garbage, &[], &name, &[], now).is_ok());
    }
}
