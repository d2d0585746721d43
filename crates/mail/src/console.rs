//! Dry-run transport: logs each message instead of delivering it.

use {
    async_trait::async_trait,
    tracing::{debug, info},
};

use crate::{error::SendError, mailer::Mailer, message::Message};

#[derive(Debug, Clone)]
pub struct ConsoleMailer {
    from: String,
    verbose: bool,
}

impl ConsoleMailer {
    #[must_use]
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            verbose: false,
        }
    }

    /// Also log the message body at debug level.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, to: &str, message: &Message) -> Result<(), SendError> {
        if to.trim().is_empty() {
            return Err(SendError::InvalidAddress {
                address: to.to_string(),
                reason: "empty address".into(),
            });
        }

        info!(from = %self.from, %to, subject = %message.subject, "dry run: message not sent");
        if self.verbose {
            debug!(body = %message.body, "dry run body");
        }
        Ok(())
    }
}
