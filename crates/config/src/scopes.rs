use std::{fmt, str::FromStr};

pub const OFFLINE_ACCESS: &str = "offline_access";
pub const SMTP_SEND: &str = "https://outlook.office.com/SMTP.Send";
pub const GRAPH_MAIL_SEND: &str = "https://graph.microsoft.com/Mail.Send";
pub const GRAPH_USER_READ: &str = "https://graph.microsoft.com/User.Read";

/// Which transport the issued tokens should be valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopePreset {
    /// SMTP AUTH (XOAUTH2).
    Smtp,
    /// Mail API send only.
    Graph,
    /// Mail API send plus the caller's profile.
    GraphIdentity,
}

impl ScopePreset {
    /// Scopes requested in the interactive authorization.
    pub fn authorize_scopes(self) -> Vec<String> {
        let mut scopes = vec![OFFLINE_ACCESS.to_string()];
        scopes.extend(self.refresh_scopes());
        scopes
    }

    /// Scopes requested when trading a refresh token for an access token.
    pub fn refresh_scopes(self) -> Vec<String> {
        match self {
            Self::Smtp => vec![SMTP_SEND.to_string()],
            Self::Graph => vec![GRAPH_MAIL_SEND.to_string()],
            Self::GraphIdentity => vec![GRAPH_MAIL_SEND.to_string(), GRAPH_USER_READ.to_string()],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Smtp => "smtp",
            Self::Graph => "graph",
            Self::GraphIdentity => "graph-identity",
        }
    }
}

impl fmt::Display for ScopePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smtp" => Ok(Self::Smtp),
            "graph" => Ok(Self::Graph),
            "graph-identity" => Ok(Self::GraphIdentity),
            other => Err(format!(
                "unknown scope preset '{other}': expected smtp, graph or graph-identity"
            )),
        }
    }
}

/// Split a free-form scope string on whitespace.
pub fn parse_scope_list(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
