//! SMTP submission over STARTTLS via `lettre`.
//!
//! Supports XOAUTH2 (bearer access token) and plain username/password.

use {
    async_trait::async_trait,
    lettre::{
        AsyncSmtpTransport, AsyncTransport, Message as MimeMessage, Tokio1Executor,
        message::{Mailbox, header::ContentType},
        transport::smtp::authentication::{Credentials, Mechanism},
    },
    secrecy::{ExposeSecret, SecretString},
    tracing::{debug, info},
};

use crate::{
    error::{ConnectError, SendError},
    mailer::Mailer,
    message::Message,
};

/// How to authenticate the SMTP session.
pub enum SmtpAuth {
    /// XOAUTH2: `user` is the mailbox, the secret is an access token.
    OAuth2 {
        user: String,
        access_token: SecretString,
    },
    Password {
        username: String,
        password: SecretString,
    },
}

impl SmtpAuth {
    fn kind(&self) -> &'static str {
        match self {
            Self::OAuth2 { .. } => "xoauth2",
            Self::Password { .. } => "password",
        }
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    host: String,
    port: u16,
}

impl SmtpMailer {
    /// Build the transport without touching the network.
    pub fn new(host: &str, port: u16, from: &str, auth: SmtpAuth) -> Result<Self, ConnectError> {
        let from: Mailbox = from.parse().map_err(|e: lettre::address::AddressError| {
            ConnectError::Sender {
                address: from.to_string(),
                reason: e.to_string(),
            }
        })?;

        let auth_kind = auth.kind();
        let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| ConnectError::Setup(e.to_string()))?
            .port(port);
        let builder = match auth {
            SmtpAuth::OAuth2 { user, access_token } => builder
                .credentials(Credentials::new(user, access_token.expose_secret().clone()))
                .authentication(vec![Mechanism::Xoauth2]),
            SmtpAuth::Password { username, password } => {
                builder.credentials(Credentials::new(username, password.expose_secret().clone()))
            },
        };

        debug!(host, port, auth = auth_kind, "smtp transport configured");

        Ok(Self {
            transport: builder.build(),
            from,
            host: host.to_string(),
            port,
        })
    }

    /// Connect, upgrade to TLS and authenticate once, without sending.
    pub async fn verify(&self) -> Result<(), ConnectError> {
        let verify_err = |detail: String| ConnectError::Verify {
            host: self.host.clone(),
            port: self.port,
            detail,
        };
        match self.transport.test_connection().await {
            Ok(true) => {
                info!(host = %self.host, port = self.port, "smtp connection verified");
                Ok(())
            },
            Ok(false) => Err(verify_err("server did not answer NOOP".to_string())),
            Err(e) => Err(verify_err(e.to_string())),
        }
    }

    /// [`new`](Self::new) followed by [`verify`](Self::verify).
    pub async fn connect(
        host: &str,
        port: u16,
        from: &str,
        auth: SmtpAuth,
    ) -> Result<Self, ConnectError> {
        let mailer = Self::new(host, port, from, auth)?;
        mailer.verify().await?;
        Ok(mailer)
    }

    fn build_message(&self, to: &str, message: &Message) -> Result<MimeMessage, SendError> {
        let to_mailbox: Mailbox = to.parse().map_err(|e: lettre::address::AddressError| {
            SendError::InvalidAddress {
                address: to.to_string(),
                reason: e.to_string(),
            }
        })?;

        MimeMessage::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| SendError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, to: &str, message: &Message) -> Result<(), SendError> {
        let email = self.build_message(to, message)?;
        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| SendError::Smtp(e.to_string()))?;
        debug!(%to, code = %response.code(), "smtp accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oauth_mailer() -> SmtpMailer {
        SmtpMailer::new(
            "smtp.office365.com",
            587,
            "sender@example.com",
            SmtpAuth::OAuth2 {
                user: "sender@example.com".into(),
                access_token: SecretString::new("token".into()),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_build_message() {
        let mailer = oauth_mailer();
        let email = mailer
            .build_message("a@x.com", &Message::new("Subject", "Body text"))
            .unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("Subject: Subject"));
        assert!(raw.contains("To: a@x.com"));
        assert!(raw.contains("From: sender@example.com"));
        assert!(raw.contains("Body text"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_a_send_error() {
        let mailer = oauth_mailer();
        let err = mailer
            .send("not an address", &Message::new("s", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn test_invalid_sender_is_a_connect_error() {
        let result = SmtpMailer::new(
            "smtp.office365.com",
            587,
            "nope",
            SmtpAuth::Password {
                username: "nope".into(),
                password: SecretString::new("pw".into()),
            },
        );
        assert!(matches!(result, Err(ConnectError::Sender { .. })));
    }

    #[tokio::test]
    async fn test_connect_to_a_server_that_hangs_up_is_a_verify_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let result = SmtpMailer::connect(
            "127.0.0.1",
            port,
            "sender@example.com",
            SmtpAuth::OAuth2 {
                user: "sender@example.com".into(),
                access_token: SecretString::new("token".into()),
            },
        )
        .await;

        match result {
            Err(ConnectError::Verify {
                host,
                port: failed_port,
                ..
            }) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(failed_port, port);
            },
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("connection check should fail"),
        }
        server.abort();
    }

    #[tokio::test]
    async fn test_connect_to_a_closed_port_is_a_verify_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = SmtpMailer::connect(
            "127.0.0.1",
            port,
            "sender@example.com",
            SmtpAuth::Password {
                username: "sender@example.com".into(),
                password: SecretString::new("pw".into()),
            },
        )
        .await;
        assert!(matches!(result, Err(ConnectError::Verify { .. })));
    }
}
