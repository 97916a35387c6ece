//! Credentials for the active profile and the rules for turning them into a
//! bearer token.

pub mod credentials;
pub mod error;
pub mod jwt;
pub mod resolver;
pub mod service_account;
pub mod storage;

pub use credentials::{Credentials, KeyCredentials, TokenCredentials, UserCredentials};
pub use error::{AuthError, AuthResult};
pub use resolver::{AuthSettings, Authenticator, ENV_ACCESS_TOKEN, SessionState};
pub use service_account::ServiceAccountKey;
pub use storage::{CredentialStore, DEFAULT_PROFILE};
