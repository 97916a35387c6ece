//! Identity provider settings for the user login flow.

pub const DEFAULT_IDP_ENDPOINT: &str = "https://auth.01.idp.eu01.stackit.cloud/oauth";
pub const DEFAULT_CLIENT_ID: &str = "stackit-cli-client-id";
pub const DEFAULT_SCOPES: &[&str] = &["openid"];

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
        redirect_url: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            auth_url: auth_url.into(),
            token_url: token_url.into(),
            redirect_url: redirect_url.into(),
            scopes,
        }
    }

    /// Configuration for a given IdP base URL (`/authorize` and `/token` below it).
    pub fn for_idp(idp_endpoint: &str, client_id: &str, redirect_url: impl Into<String>) -> Self {
        let base = idp_endpoint.trim_end_matches('/');
        Self::new(
            client_id,
            format!("{base}/authorize"),
            format!("{base}/token"),
            redirect_url,
            DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn scopes_string(&self) -> String {
        self.scopes.join(" ")
    }
}
