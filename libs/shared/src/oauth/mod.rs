//! User login through the STACKIT identity provider.
//!
//! - `config`: identity provider endpoints and client id
//! - `pkce`: RFC 7636 verifier/challenge generation
//! - `flow`: authorization URL, code exchange and refresh grants
//! - `callback`: loopback listener receiving the redirect

pub mod callback;
pub mod config;
pub mod error;
pub mod flow;
pub mod pkce;

pub use callback::CallbackListener;
pub use config::OAuthConfig;
pub use error::{OAuthError, OAuthResult};
pub use flow::{OAuthFlow, TokenResponse, post_token_form, refresh_access_token};
pub use pkce::PkceChallenge;
