use std::time::{SystemTime, UNIX_EPOCH};

use {
    secrecy::{ExposeSecret, SecretString},
    serde::Deserialize,
    tracing::{debug, info},
    url::Url,
};

use crate::{
    error::OAuthError,
    types::{OAuthConfig, OAuthTokens, PkceChallenge},
};

/// Successful token endpoint body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
}

/// Authorization-code and refresh-token grants against one provider.
pub struct OAuthFlow {
    config: OAuthConfig,
    client: reqwest::Client,
}

impl OAuthFlow {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the URL the user's browser is sent to.
    pub fn authorization_url(&self, pkce: &PkceChallenge) -> Result<Url, OAuthError> {
        let mut url = Url::parse(&self.config.auth_url)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", &self.config.redirect_uri)
                .append_pair("response_mode", "query")
                .append_pair("scope", &self.config.scope())
                .append_pair("code_challenge", &pkce.challenge)
                .append_pair("code_challenge_method", "S256");
            if self.config.prompt_consent {
                query.append_pair("prompt", "consent");
            }
        }
        Ok(url)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange(&self, code: &str, verifier: &str) -> Result<OAuthTokens, OAuthError> {
        let mut form = self.client_params();
        form.push(("code", code.to_string()));
        form.push(("redirect_uri", self.config.redirect_uri.clone()));
        form.push(("grant_type", "authorization_code".to_string()));
        form.push(("code_verifier", verifier.to_string()));
        self.request_token(form).await
    }

    /// Trade a refresh token for a fresh access token.
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<OAuthTokens, OAuthError> {
        let mut form = self.client_params();
        form.push(("refresh_token", refresh_token.expose_secret().clone()));
        form.push(("grant_type", "refresh_token".to_string()));
        self.request_token(form).await
    }

    fn client_params(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![("client_id", self.config.client_id.clone())];
        if let Some(ref secret) = self.config.client_secret {
            form.push(("client_secret", secret.expose_secret().clone()));
        }
        if !self.config.scopes.is_empty() {
            form.push(("scope", self.config.scope()));
        }
        form
    }

    async fn request_token(
        &self,
        form: Vec<(&'static str, String)>,
    ) -> Result<OAuthTokens, OAuthError> {
        let grant_type = form
            .iter()
            .find(|(k, _)| *k == "grant_type")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        debug!(token_url = %self.config.token_url, %grant_type, "requesting token");

        let resp = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(OAuthError::from_token_response(status.as_u16(), &body));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| OAuthError::InvalidResponse(e.to_string()))?;

        let expires_at = parsed.expires_in.map(|secs| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
                + secs
        });

        info!(
            %grant_type,
            has_refresh_token = parsed.refresh_token.is_some(),
            expires_in = parsed.expires_in,
            "token issued"
        );

        Ok(OAuthTokens {
            access_token: SecretString::new(parsed.access_token),
            refresh_token: parsed.refresh_token.map(SecretString::new),
            expires_at,
            scope: parsed.scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher};

    fn test_config(token_url: String) -> OAuthConfig {
        OAuthConfig {
            client_id: "client-123".into(),
            client_secret: Some(SecretString::new("s3cret".into())),
            auth_url: "https://login.example.com/tenant/oauth2/v2.0/authorize".into(),
            token_url,
            redirect_uri: "http://localhost:3000".into(),
            scopes: vec![
                "offline_access".into(),
                "https://outlook.office.com/SMTP.Send".into(),
            ],
            prompt_consent: false,
        }
    }

    #[test]
    fn test_authorization_url_params() {
        let flow = OAuthFlow::new(test_config("https://login.example.com/token".into()));
        let pkce = PkceChallenge {
            verifier: "verifier".into(),
            challenge: "challenge".into(),
        };
        let url = flow.authorization_url(&pkce).unwrap();
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("client_id"), Some("client-123"));
        assert_eq!(get("response_type"), Some("code"));
        assert_eq!(get("redirect_uri"), Some("http://localhost:3000"));
        assert_eq!(get("response_mode"), Some("query"));
        assert_eq!(
            get("scope"),
            Some("offline_access https://outlook.office.com/SMTP.Send")
        );
        assert_eq!(get("code_challenge"), Some("challenge"));
        assert_eq!(get("code_challenge_method"), Some("S256"));
        assert_eq!(get("prompt"), None);
    }

    #[test]
    fn test_authorization_url_prompt_consent() {
        let mut config = test_config("https://login.example.com/token".into());
        config.prompt_consent = true;
        let flow = OAuthFlow::new(config);
        let pkce = crate::pkce::generate();
        let url = flow.authorization_url(&pkce).unwrap();
        assert!(url.query_pairs().any(|(k, v)| k == "prompt" && v == "consent"));
    }

    #[tokio::test]
    async fn test_refresh_posts_refresh_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "rt-old".into()),
                Matcher::UrlEncoded("client_id".into(), "client-123".into()),
                Matcher::UrlEncoded("client_secret".into(), "s3cret".into()),
                Matcher::UrlEncoded(
                    "scope".into(),
                    "offline_access https://outlook.office.com/SMTP.Send".into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"token_type":"Bearer","access_token":"at-new","refresh_token":"rt-new","expires_in":3600}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let flow = OAuthFlow::new(test_config(format!("{}/token", server.url())));
        let tokens = flow
            .refresh(&SecretString::new("rt-old".into()))
            .await
            .unwrap();

        assert_eq!(tokens.access_token.expose_secret(), "at-new");
        assert_eq!(
            tokens.refresh_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("rt-new")
        );
        assert!(tokens.expires_at.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_surfaces_provider_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"invalid_grant","error_description":"refresh token revoked"}"#)
            .create_async()
            .await;

        let flow = OAuthFlow::new(test_config(format!("{}/token", server.url())));
        let err = flow
            .refresh(&SecretString::new("rt".into()))
            .await
            .unwrap_err();

        match err {
            OAuthError::TokenEndpoint { status, detail, .. } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "refresh token revoked");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_without_access_token_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let flow = OAuthFlow::new(test_config(format!("{}/token", server.url())));
        let err = flow.exchange("code", "verifier").await.unwrap_err();
        assert!(matches!(err, OAuthError::InvalidResponse(_)));
    }
}
