//! Message model and delivery transports.
//!
//! Every transport implements [`Mailer`]: deliver one [`Message`] to one
//! address. The dispatcher picks one implementation per run.

pub mod console;
pub mod error;
pub mod graph;
pub mod mailer;
pub mod message;
pub mod smtp;

pub use console::ConsoleMailer;
pub use error::{ConnectError, SendError};
pub use graph::GraphMailer;
pub use mailer::Mailer;
pub use message::Message;
pub use smtp::{SmtpAuth, SmtpMailer};
