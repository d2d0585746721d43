use async_trait::async_trait;

use crate::{error::SendError, message::Message};

/// Deliver one message to one address.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Transport identifier (e.g. "graph", "smtp").
    fn name(&self) -> &str;

    async fn send(&self, to: &str, message: &Message) -> Result<(), SendError>;
}
