use std::path::{Path, PathBuf};

use {secrecy::SecretString, tracing::debug};

use crate::{error::ConfigError, schema::FileConfig};

pub const DEFAULT_CONFIG_FILE: &str = "mailrun.toml";
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_OAUTH_PORT: u16 = 3000;
pub const DEFAULT_SMTP_HOST: &str = "smtp.office365.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_MESSAGE_FILE: &str = "bid_text.txt";
pub const DEFAULT_RECIPIENTS_FILE: &str = "receivers/email.txt";

/// Environment variables checked, in order, for the sender address.
const SENDER_VARS: [&str; 3] = ["HOTMAIL_EMAIL", "OUTLOOK_EMAIL", "SENDER_EMAIL"];

/// Load the config file.
///
/// An explicit path must exist. Without one, `./mailrun.toml` is used when
/// present and an empty config otherwise.
pub fn load_file(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                return Ok(FileConfig::default());
            }
            default
        },
    };

    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Fully resolved settings. Fields that only some commands need stay optional;
/// the accessor methods turn their absence into a [`ConfigError`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub tenant_id: Option<String>,
    pub authority: String,
    pub port: u16,
    pub redirect_uri: String,
    pub refresh_token: Option<SecretString>,
    pub sender: Option<String>,
    pub graph_url: String,
    pub smtp: SmtpSettings,
    pub message_file: PathBuf,
    pub recipients_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// Defaults to the sender address when unset.
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

/// Everything the authorization-code flow needs.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub tenant_id: String,
    pub authority: String,
    pub port: u16,
    pub redirect_uri: String,
}

impl Settings {
    /// Resolve against the real process environment.
    pub fn from_env(file: FileConfig) -> Result<Self, ConfigError> {
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Layer `env` over `file`. Empty environment values count as unset.
    pub fn resolve<F>(file: FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let secret = |key: &str| var(key).map(SecretString::new);

        let port = match var("OAUTH_PORT") {
            Some(raw) => parse_port("OAUTH_PORT", &raw)?,
            None => file.oauth.port.unwrap_or(DEFAULT_OAUTH_PORT),
        };
        let redirect_uri = var("OAUTH_REDIRECT_URI")
            .or(file.oauth.redirect_uri)
            .unwrap_or_else(|| default_redirect_uri(port));

        let smtp_port = match var("SMTP_PORT") {
            Some(raw) => parse_port("SMTP_PORT", &raw)?,
            None => file.smtp.port.unwrap_or(DEFAULT_SMTP_PORT),
        };

        Ok(Self {
            client_id: var("OAUTH_CLIENT_ID").or(file.oauth.client_id),
            client_secret: secret("OAUTH_CLIENT_SECRET").or(file.oauth.client_secret),
            tenant_id: var("OAUTH_TENANT_ID").or(file.oauth.tenant_id),
            authority: var("OAUTH_AUTHORITY")
                .or(file.oauth.authority)
                .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
            port,
            redirect_uri,
            refresh_token: secret("OAUTH_REFRESH_TOKEN").or(file.oauth.refresh_token),
            sender: SENDER_VARS
                .iter()
                .find_map(|&key| var(key))
                .or(file.sender.address),
            graph_url: file
                .sender
                .graph_url
                .unwrap_or_else(|| DEFAULT_GRAPH_URL.to_string()),
            smtp: SmtpSettings {
                host: var("SMTP_HOST")
                    .or(file.smtp.host)
                    .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                port: smtp_port,
                username: var("SMTP_USERNAME").or(file.smtp.username),
                password: secret("SMTP_PASSWORD").or(file.smtp.password),
            },
            message_file: file
                .files
                .message
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MESSAGE_FILE)),
            recipients_file: file
                .files
                .recipients
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RECIPIENTS_FILE)),
        })
    }

    /// Client id, secret and tenant, reporting every missing one at once.
    pub fn oauth_credentials(&self) -> Result<OAuthCredentials, ConfigError> {
        let mut missing = Vec::new();
        if self.client_id.is_none() {
            missing.push("OAUTH_CLIENT_ID");
        }
        if self.client_secret.is_none() {
            missing.push("OAUTH_CLIENT_SECRET");
        }
        if self.tenant_id.is_none() {
            missing.push("OAUTH_TENANT_ID");
        }

        match (&self.client_id, &self.client_secret, &self.tenant_id) {
            (Some(client_id), Some(client_secret), Some(tenant_id)) => Ok(OAuthCredentials {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                tenant_id: tenant_id.clone(),
                authority: self.authority.clone(),
                port: self.port,
                redirect_uri: self.redirect_uri.clone(),
            }),
            _ => Err(ConfigError::Missing { keys: missing }),
        }
    }

    pub fn sender_address(&self) -> Result<&str, ConfigError> {
        self.sender
            .as_deref()
            .ok_or_else(|| ConfigError::missing("HOTMAIL_EMAIL"))
    }

    pub fn refresh_token(&self) -> Result<&SecretString, ConfigError> {
        self.refresh_token
            .as_ref()
            .ok_or_else(|| ConfigError::missing("OAUTH_REFRESH_TOKEN"))
    }

    pub fn smtp_password(&self) -> Result<&SecretString, ConfigError> {
        self.smtp
            .password
            .as_ref()
            .ok_or_else(|| ConfigError::missing("SMTP_PASSWORD"))
    }
}

/// Port 80 redirects to the bare host, which is what provider registrations
/// for the web platform expect.
pub fn default_redirect_uri(port: u16) -> String {
    if port == 80 {
        "http://localhost".to_string()
    } else {
        format!("http://localhost:{port}")
    }
}

fn parse_port(key: &'static str, raw: &str) -> Result<u16, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
