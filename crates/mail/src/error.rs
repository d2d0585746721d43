use thiserror::Error;

/// Failure to deliver to a single recipient. Never fatal to a run.
#[derive(Debug, Error)]
pub enum SendError {
    /// The mail API rejected the request.
    #[error("HTTP {status}: {detail}")]
    Api {
        status: u16,
        detail: String,
        /// Parsed error payload, when the body was JSON.
        payload: Option<serde_json::Value>,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

impl SendError {
    /// Build an API error, preferring `error.message`, then `error.code`,
    /// then the HTTP reason phrase.
    pub fn from_api_response(status: u16, body: &str) -> Self {
        let payload: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let field = |name: &str| {
            payload
                .as_ref()
                .and_then(|v| v.get("error"))
                .and_then(|e| e.get(name))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let detail = field("message")
            .or_else(|| field("code"))
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    reqwest::StatusCode::from_u16(status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or("request rejected")
                        .to_string()
                } else {
                    trimmed.to_string()
                }
            });
        Self::Api {
            status,
            detail,
            payload,
        }
    }
}

/// Failure while setting up a transport, before any message is sent.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid sender address {address:?}: {reason}")]
    Sender { address: String, reason: String },

    #[error("SMTP setup failed: {0}")]
    Setup(String),

    #[error("SMTP connection check against {host}:{port} failed: {detail}")]
    Verify {
        host: String,
        port: u16,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_detail_precedence() {
        let err = SendError::from_api_response(
            403,
            r#"{"error":{"code":"ErrorAccessDenied","message":"Access is denied."}}"#,
        );
        assert_eq!(err.to_string(), "HTTP 403: Access is denied.");

        let err = SendError::from_api_response(400, r#"{"error":{"code":"ErrorInvalidRecipients"}}"#);
        assert_eq!(err.to_string(), "HTTP 400: ErrorInvalidRecipients");

        let err = SendError::from_api_response(503, "");
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");

        let err = SendError::from_api_response(500, "upstream exploded");
        assert_eq!(err.to_string(), "HTTP 500: upstream exploded");
    }

    #[test]
    fn test_api_error_keeps_payload() {
        match SendError::from_api_response(401, r#"{"error":{"code":"InvalidAuthenticationToken"}}"#) {
            SendError::Api { payload, .. } => assert!(payload.is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
