use std::path::PathBuf;

use {secrecy::SecretString, serde::Deserialize};

/// On-disk `mailrun.toml`. Every field is optional; environment variables
/// take precedence over whatever is set here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub oauth: OAuthSection,
    pub sender: SenderSection,
    pub smtp: SmtpSection,
    pub files: FilesSection,
}

// ── [oauth] ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OAuthSection {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub tenant_id: Option<String>,
    /// Identity provider base URL, e.g. `https://login.microsoftonline.com`.
    pub authority: Option<String>,
    pub port: Option<u16>,
    pub redirect_uri: Option<String>,
    pub refresh_token: Option<SecretString>,
}

// ── [sender] ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SenderSection {
    pub address: Option<String>,
    /// Mail API base URL, e.g. `https://graph.microsoft.com/v1.0`.
    pub graph_url: Option<String>,
}

// ── [smtp] ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmtpSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

// ── [files] ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesSection {
    pub message: Option<PathBuf>,
    pub recipients: Option<PathBuf>,
}
