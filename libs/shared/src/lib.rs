pub mod auth;
pub mod cache;
pub mod duration;
pub mod oauth;
pub mod redact;
pub mod tls_client;
