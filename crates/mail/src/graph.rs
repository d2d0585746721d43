//! Microsoft Graph `sendMail` transport.
//!
//! Works for mailboxes where SMTP AUTH is disabled, since it never touches
//! SMTP. Requires a delegated `Mail.Send` access token.

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, SecretString},
    tracing::{debug, warn},
};

use crate::{error::SendError, mailer::Mailer, message::Message};

pub struct GraphMailer {
    client: reqwest::Client,
    base_url: String,
    access_token: SecretString,
    user_id: Option<String>,
}

impl GraphMailer {
    /// `user_id` selects `/users/{id}/sendMail`; without one the token's own
    /// mailbox (`/me/sendMail`) is used.
    pub fn new(base_url: impl Into<String>, access_token: SecretString, user_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            access_token,
            user_id,
        }
    }

    fn send_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.user_id {
            Some(ref id) => format!("{base}/users/{id}/sendMail"),
            None => format!("{base}/me/sendMail"),
        }
    }
}

#[async_trait]
impl Mailer for GraphMailer {
    fn name(&self) -> &str {
        "graph"
    }

    async fn send(&self, to: &str, message: &Message) -> Result<(), SendError> {
        let body = serde_json::json!({
            "message": {
                "subject": message.subject,
                "body": {
                    "contentType": "Text",
                    "content": message.body,
                },
                "toRecipients": [
                    { "emailAddress": { "address": to } }
                ],
            },
            "saveToSentItems": true,
        });

        let resp = self
            .client
            .post(self.send_url())
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            debug!(%to, status = status.as_u16(), "graph accepted message");
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_default();
        let err = SendError::from_api_response(status.as_u16(), &text);
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!(%to, body = %text, "graph rejected the access token");
        }
        Err(err)
    }
}
