use std::path::PathBuf;

use {
    anyhow::{Context, Result},
    clap::{Args, ValueEnum},
    mailrun_config::{ConfigError, ScopePreset, Settings},
    mailrun_dispatch::{DispatchInput, TerminalProgress, dispatch},
    mailrun_mail::{ConsoleMailer, GraphMailer, Mailer, SmtpAuth, SmtpMailer},
    mailrun_oauth::{OAuthConfig, OAuthFlow, claims},
    secrecy::{ExposeSecret, SecretString},
    tracing::{info, warn},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// Microsoft Graph sendMail with a bearer token.
    Graph,
    /// SMTP AUTH XOAUTH2 with a bearer token.
    SmtpOauth,
    /// SMTP AUTH with username and password.
    SmtpPassword,
}

impl Transport {
    fn uses_oauth(self) -> bool {
        matches!(self, Self::Graph | Self::SmtpOauth)
    }
}

#[derive(Args)]
pub struct SendArgs {
    #[arg(long, value_enum, default_value_t = Transport::Graph)]
    transport: Transport,

    /// Message template: first line subject, the rest body.
    #[arg(long)]
    message: Option<PathBuf>,

    /// Recipient list, one address per line.
    #[arg(long)]
    recipients: Option<PathBuf>,

    /// Log each message instead of sending it. No token is requested.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn missing_keys<T>(result: Result<T, ConfigError>) -> Vec<&'static str> {
    match result {
        Err(ConfigError::Missing { keys }) => keys,
        _ => Vec::new(),
    }
}

/// Report every configuration value the transport needs that is absent.
///
/// The sender address is required for every transport, Graph included.
fn check_settings(settings: &Settings, transport: Transport) -> Result<(), ConfigError> {
    let mut keys = Vec::new();
    if transport.uses_oauth() {
        keys.extend(missing_keys(settings.oauth_credentials()));
        keys.extend(missing_keys(settings.refresh_token()));
    }
    keys.extend(missing_keys(settings.sender_address()));
    if transport == Transport::SmtpPassword {
        keys.extend(missing_keys(settings.smtp_password()));
    }

    if keys.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Missing { keys })
    }
}

/// Trade the stored refresh token for an access token, once per run.
async fn access_token(settings: &Settings, preset: ScopePreset) -> Result<SecretString> {
    let creds = settings.oauth_credentials()?;
    let stored = settings.refresh_token()?;
    let flow = OAuthFlow::new(OAuthConfig::for_tenant(
        &creds.authority,
        &creds.tenant_id,
        creds.client_id,
        Some(creds.client_secret),
        creds.redirect_uri,
        preset.refresh_scopes(),
    ));

    let tokens = flow
        .refresh(stored)
        .await
        .context("failed to obtain an access token")?;

    if let Some(ref rotated) = tokens.refresh_token
        && rotated.expose_secret() != stored.expose_secret()
    {
        warn!("refresh token was rotated; update OAUTH_REFRESH_TOKEN to keep using the newest one");
    }
    Ok(tokens.access_token)
}

async fn build_mailer(settings: &Settings, transport: Transport) -> Result<Box<dyn Mailer>> {
    let mailer: Box<dyn Mailer> = match transport {
        Transport::Graph => {
            let token = access_token(settings, ScopePreset::GraphIdentity).await?;
            let user_id = claims::user_id(token.expose_secret());
            info!(
                sender = settings.sender_address()?,
                user_id = user_id.as_deref().unwrap_or("me"),
                "sending through graph"
            );
            Box::new(GraphMailer::new(settings.graph_url.clone(), token, user_id))
        },
        Transport::SmtpOauth => {
            let token = access_token(settings, ScopePreset::Smtp).await?;
            let sender = settings.sender_address()?;
            let auth = SmtpAuth::OAuth2 {
                user: sender.to_string(),
                access_token: token,
            };
            Box::new(
                SmtpMailer::connect(&settings.smtp.host, settings.smtp.port, sender, auth)
                    .await
                    .context("SMTP OAuth2 login failed")?,
            )
        },
        Transport::SmtpPassword => {
            let sender = settings.sender_address()?;
            let auth = SmtpAuth::Password {
                username: settings
                    .smtp
                    .username
                    .clone()
                    .unwrap_or_else(|| sender.to_string()),
                password: settings.smtp_password()?.clone(),
            };
            Box::new(
                SmtpMailer::connect(&settings.smtp.host, settings.smtp.port, sender, auth)
                    .await
                    .context("SMTP password login failed")?,
            )
        },
    };
    Ok(mailer)
}

pub async fn run(args: SendArgs, settings: &Settings) -> Result<()> {
    if !args.dry_run {
        check_settings(settings, args.transport)?;
    }

    let message_path = args.message.unwrap_or_else(|| settings.message_file.clone());
    let recipients_path = args
        .recipients
        .unwrap_or_else(|| settings.recipients_file.clone());
    let input = DispatchInput::load(&message_path, &recipients_path).await?;

    let mailer: Box<dyn Mailer> = if args.dry_run {
        let from = settings.sender.clone().unwrap_or_else(|| "me".to_string());
        Box::new(ConsoleMailer::new(from).verbose())
    } else {
        build_mailer(settings, args.transport).await?
    };

    println!(
        "Sending to {} recipients via {}...",
        input.recipients.len(),
        mailer.name()
    );
    let report = dispatch(
        mailer.as_ref(),
        &input.recipients,
        &input.message,
        &mut TerminalProgress::new(),
    )
    .await;

    if report.failed > 0 {
        warn!(failed = report.failed, "some recipients could not be reached");
    }
    Ok(())
}
