use reqwest::{Client, header::HeaderMap};
use rustls_platform_verifier::BuilderVerifierExt;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct TlsClientConfig {
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
}

/// HTTP client that verifies TLS against the OS certificate store.
pub fn create_tls_client(config: TlsClientConfig) -> Result<Client, String> {
    // needed to use OS-provided CA certificates with Rustls
    let arc_crypto_provider = std::sync::Arc::new(rustls::crypto::ring::default_provider());
    let tls_config = rustls::ClientConfig::builder_with_provider(arc_crypto_provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| format!("Failed to build client TLS config: {}", e))?
        .with_platform_verifier()
        .with_no_client_auth();

    let mut builder = Client::builder()
        .use_preconfigured_tls(tls_config)
        .default_headers(config.headers);
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| format!("Failed to create HTTP client: {}", e))
}
