use std::net::SocketAddr;

use {
    axum::http::StatusCode,
    tracing::{error, info, warn},
    url::Url,
};

use crate::{
    callback_server::CallbackServer,
    error::OAuthError,
    flow::OAuthFlow,
    pages, pkce,
    types::{AuthorizationResult, OAuthConfig, OAuthTokens, PkceChallenge},
};

/// One interactive authorization attempt.
///
/// Owns the PKCE verifier and the redirect listener. [`complete`] consumes the
/// session, so the verifier is dropped and the listener shut down after the
/// first callback carrying a code or an error.
///
/// [`complete`]: AuthorizationSession::complete
pub struct AuthorizationSession {
    flow: OAuthFlow,
    pkce: PkceChallenge,
    server: CallbackServer,
    authorization_url: Url,
}

impl AuthorizationSession {
    /// Generate a PKCE pair and bind the redirect listener on `port`.
    pub async fn start(config: OAuthConfig, port: u16) -> Result<Self, OAuthError> {
        let pkce = pkce::generate();
        let flow = OAuthFlow::new(config);
        let authorization_url = flow.authorization_url(&pkce)?;
        let server = CallbackServer::bind(port).await?;

        info!(
            listen = %server.local_addr(),
            redirect_uri = %flow.config().redirect_uri,
            "authorization session started"
        );

        Ok(Self {
            flow,
            pkce,
            server,
            authorization_url,
        })
    }

    pub fn authorization_url(&self) -> &Url {
        &self.authorization_url
    }

    pub fn redirect_uri(&self) -> &str {
        &self.flow.config().redirect_uri
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Wait for the provider's redirect, exchange the code, answer the browser,
    /// then stop listening.
    pub async fn complete(self) -> Result<OAuthTokens, OAuthError> {
        let Self {
            flow,
            pkce,
            mut server,
            ..
        } = self;

        let callback = match server.next_callback().await {
            Ok(callback) => callback,
            Err(e) => {
                server.shutdown().await;
                return Err(e);
            },
        };

        let outcome = match callback.result().clone() {
            AuthorizationResult::Denied { error, description } => {
                warn!(
                    %error,
                    description = description.as_deref().unwrap_or(""),
                    "authorization denied by provider"
                );
                callback.respond(
                    StatusCode::OK,
                    pages::denied(&error, description.as_deref()),
                );
                Err(OAuthError::Denied { error, description })
            },
            AuthorizationResult::Code(code) => {
                info!("authorization code received, exchanging for tokens");
                match flow.exchange(&code, &pkce.verifier).await {
                    Ok(tokens) => {
                        callback.respond(StatusCode::OK, pages::success());
                        Ok(tokens)
                    },
                    Err(e) => {
                        error!(error = %e, "token exchange failed");
                        callback.respond(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            pages::exchange_failed(),
                        );
                        Err(e)
                    },
                }
            },
        };

        drop(pkce);
        server.shutdown().await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        mockito::Matcher,
        secrecy::{ExposeSecret, SecretString},
    };

    fn config(token_url: String) -> OAuthConfig {
        OAuthConfig {
            client_id: "client-abc".into(),
            client_secret: Some(SecretString::new("secret".into())),
            auth_url: "https://login.example.com/common/oauth2/v2.0/authorize".into(),
            token_url,
            redirect_uri: "http://localhost:3000".into(),
            scopes: vec!["offline_access".into(), "Mail.Send".into()],
            prompt_consent: false,
        }
    }

    fn query_value(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[tokio::test]
    async fn test_url_challenge_matches_retained_verifier() {
        let session = AuthorizationSession::start(config("http://127.0.0.1:9/token".into()), 0)
            .await
            .unwrap();
        let challenge = query_value(session.authorization_url(), "code_challenge").unwrap();
        assert_eq!(challenge, pkce::challenge_for(&session.pkce.verifier));
        assert_eq!(
            query_value(session.authorization_url(), "code_challenge_method").as_deref(),
            Some("S256")
        );
        session.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_code_callback_exchanges_exactly_once_with_verifier() {
        let mut token_server = mockito::Server::new_async().await;
        let session = AuthorizationSession::start(config(format!("{}/token", token_server.url())), 0)
            .await
            .unwrap();
        let verifier = session.pkce.verifier.clone();

        let mock = token_server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "auth-code-1".into()),
                Matcher::UrlEncoded("code_verifier".into(), verifier),
                Matcher::UrlEncoded("redirect_uri".into(), "http://localhost:3000".into()),
                Matcher::UrlEncoded("client_id".into(), "client-abc".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at","refresh_token":"rt","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let base = format!("http://{}", session.local_addr());
        let client = reqwest::Client::new();

        // The warm-up navigation must not end the session.
        let waiting = client.get(format!("{base}/")).send().await.unwrap();
        assert!(waiting.text().await.unwrap().contains("Waiting"));

        let completion = tokio::spawn(session.complete());
        let page = client
            .get(format!("{base}/?code=auth-code-1"))
            .send()
            .await
            .unwrap();
        assert!(page.status().is_success());
        assert!(page.text().await.unwrap().contains("Authorization successful"));

        let tokens = completion.await.unwrap().unwrap();
        assert_eq!(tokens.access_token.expose_secret(), "at");
        assert_eq!(
            tokens.refresh_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("rt")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_callback_never_exchanges() {
        let mut token_server = mockito::Server::new_async().await;
        let mock = token_server
            .mock("POST", "/token")
            .expect(0)
            .create_async()
            .await;
        let session = AuthorizationSession::start(config(format!("{}/token", token_server.url())), 0)
            .await
            .unwrap();
        let url = format!(
            "http://{}/?error=access_denied&error_description=The%20user%20declined",
            session.local_addr()
        );

        let completion = tokio::spawn(session.complete());
        let page = reqwest::get(url).await.unwrap().text().await.unwrap();
        assert!(page.contains("Auth failed: access_denied."));

        let err = completion.await.unwrap().unwrap_err();
        match err {
            OAuthError::Denied { error, description } => {
                assert_eq!(error, "access_denied");
                assert_eq!(description.as_deref(), Some("The user declined"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_failure_answers_500_and_errors() {
        let mut token_server = mockito::Server::new_async().await;
        let mock = token_server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"code expired"}"#)
            .expect(1)
            .create_async()
            .await;
        let session = AuthorizationSession::start(config(format!("{}/token", token_server.url())), 0)
            .await
            .unwrap();
        let url = format!("http://{}/?code=stale", session.local_addr());

        let completion = tokio::spawn(session.complete());
        let resp = reqwest::get(url).await.unwrap();
        assert_eq!(resp.status().as_u16(), 500);

        let err = completion.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("code expired"));
        mock.assert_async().await;
    }
}
