use secrecy::SecretString;

/// Default Microsoft identity platform authority.
pub const MICROSOFT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// OAuth 2.0 provider configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Confidential clients send this with every token request.
    pub client_secret: Option<SecretString>,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// Adds `prompt=consent` to the authorization URL.
    pub prompt_consent: bool,
}

impl OAuthConfig {
    /// Build a config for a tenant-scoped v2.0 endpoint pair under `authority`.
    pub fn for_tenant(
        authority: &str,
        tenant_id: &str,
        client_id: String,
        client_secret: Option<SecretString>,
        redirect_uri: String,
        scopes: Vec<String>,
    ) -> Self {
        let base = format!("{}/{tenant_id}/oauth2/v2.0", authority.trim_end_matches('/'));
        Self {
            client_id,
            client_secret,
            auth_url: format!("{base}/authorize"),
            token_url: format!("{base}/token"),
            redirect_uri,
            scopes,
            prompt_consent: false,
        }
    }

    /// Space-separated scope string as sent on the wire.
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Tokens returned by the token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthTokens {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    /// Unix timestamp when the access token expires.
    pub expires_at: Option<u64>,
    /// Scopes actually granted, when the provider reports them.
    pub scope: Option<String>,
}

/// PKCE challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

/// What the provider handed back on the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult {
    Code(String),
    Denied {
        error: String,
        description: Option<String>,
    },
}
