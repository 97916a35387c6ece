//! RFC 7636 proof key for the authorization code flow.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// Verifier/challenge pair plus the anti-CSRF `state` sent with the authorize request.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceChallenge {
    pub const METHOD: &'static str = "S256";

    pub fn generate() -> Self {
        let verifier = random_urlsafe();
        let mut pkce = Self::from_verifier(verifier);
        pkce.state = random_urlsafe();
        pkce
    }

    /// Derive the S256 challenge for a known verifier.
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
            state: String::new(),
        }
    }
}

fn random_urlsafe() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}
