// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

use crate::USER_AGENT;
use crate::configuration::{ENV_DISABLE_CERT_VERIFICATION, RelaySettings};
use crate::util::bool_from_env;
use awc::http::header;
use log::warn;
use rustls::ClientConfig;
use rustls_platform_verifier::ConfigVerifierExt;
use std::sync::Arc;

/// Create the HTTP client for webhook requests.
///
/// The connector enforces the connection timeout, the client the default request timeout.
/// Server certificates are verified with the platform verifier, unless disabled in the relay
/// settings or with the `N8N_DISABLE_CERT_VERIFICATION` environment variable.
pub fn new_http_client(settings: &RelaySettings) -> Result<awc::Client, rustls::Error> {
    // more than one crypto provider might be enabled through feature unification
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let mut config = if settings.disable_cert_validation
        || bool_from_env(ENV_DISABLE_CERT_VERIFICATION)
    {
        warn!("Certificate verification of webhook servers is disabled!");
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(danger::NoCertificateVerification::new()))
            .with_no_client_auth()
    } else {
        ClientConfig::with_platform_verifier()?
    };

    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    let connector = awc::Connector::new()
        .timeout(settings.connection_timeout)
        .rustls_0_23(Arc::new(config));

    Ok(awc::ClientBuilder::new()
        .timeout(settings.request_timeout)
        .add_default_header((header::USER_AGENT, USER_AGENT))
        .connector(connector)
        .finish())
}

mod danger {
    use rustls::DigitallySignedStruct;
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};

    #[derive(Debug)]
    pub struct NoCertificateVerification(CryptoProvider);

    impl NoCertificateVerification {
        pub fn new() -> Self {
            Self(rustls::crypto::aws_lc_rs::default_provider())
        }
    }

    impl ServerCertVerifier for NoCertificateVerification {
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

        fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::mock::{MockReply, MockWebhook};
    use actix_web::http::StatusCode;
    use rustls::client::danger::ServerCertVerifier;
    use serde_json::json;

    #[test]
    fn client_without_certificate_verification() {
        let settings = RelaySettings {
            disable_cert_validation: true,
            ..Default::default()
        };

        assert!(new_http_client(&settings).is_ok());
    }

    #[test]
    fn insecure_verifier_supports_signature_schemes() {
        let verifier = danger::NoCertificateVerification::new();
        assert!(!verifier.supported_verify_schemes().is_empty());
    }

    #[actix_web::test]
    async fn insecure_client_posts_to_webhook() {
        let webhook = MockWebhook::start(MockReply::Json(
            StatusCode::OK,
            json!({ "response_text": "ok" }),
        ))
        .await;
        let settings = RelaySettings {
            disable_cert_validation: true,
            ..Default::default()
        };
        let client = new_http_client(&settings).unwrap();

        let response = client
            .post(webhook.url.as_str())
            .send_json(&json!({ "text": "hello" }))
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert_eq!(1, webhook.requests().len());
    }
}
