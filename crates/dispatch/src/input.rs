use std::path::Path;

use {mailrun_mail::Message, tracing::info};

use crate::{error::DispatchError, recipients::RecipientSet};

/// Message and recipients for one run, validated before any network activity.
#[derive(Debug, Clone)]
pub struct DispatchInput {
    pub message: Message,
    pub recipients: RecipientSet,
}

impl DispatchInput {
    /// Fails if the message file is missing, the recipient file is missing,
    /// or the recipient file yields no addresses.
    pub async fn load(message_path: &Path, recipients_path: &Path) -> Result<Self, DispatchError> {
        let template = tokio::fs::read_to_string(message_path)
            .await
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    DispatchError::MessageFileMissing {
                        path: message_path.to_path_buf(),
                    }
                } else {
                    DispatchError::Read {
                        path: message_path.to_path_buf(),
                        source,
                    }
                }
            })?;
        let message = Message::parse(&template);

        let recipients = RecipientSet::load(recipients_path).await?;
        if recipients.is_empty() {
            return Err(DispatchError::NoRecipients {
                path: recipients_path.to_path_buf(),
            });
        }

        info!(
            subject = %message.subject,
            recipients = recipients.len(),
            "dispatch input loaded"
        );
        Ok(Self {
            message,
            recipients,
        })
    }
}
