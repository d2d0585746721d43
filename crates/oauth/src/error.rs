use thiserror::Error;

#[derive(Debug, Error)]
pub enum OAuthError {
    /// The provider redirected back with an `error` parameter.
    #[error("authorization denied: {error} {}", .description.as_deref().unwrap_or(""))]
    Denied {
        error: String,
        description: Option<String>,
    },

    /// The token endpoint answered with a non-success status.
    #[error("token endpoint returned HTTP {status}: {detail}")]
    TokenEndpoint {
        status: u16,
        /// The provider's `error` code, when the body carried one.
        code: Option<String>,
        /// Most specific description available.
        detail: String,
    },

    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to bind callback listener on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("callback listener stopped before a callback arrived")]
    CallbackClosed,
}

impl OAuthError {
    /// Build a token-endpoint error from the raw response body.
    ///
    /// Prefers `error_description`, then `error`, then the body text itself.
    pub fn from_token_response(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let field = |name: &str| {
            parsed
                .as_ref()
                .and_then(|v| v.get(name))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let code = field("error");
        let detail = field("error_description")
            .or_else(|| code.clone())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    "no details".to_string()
                } else {
                    trimmed.to_string()
                }
            });
        Self::TokenEndpoint {
            status,
            code,
            detail,
        }
    }
}
