//! Batch delivery: load the recipient set and message, then send one message
//! per recipient through a [`mailrun_mail::Mailer`], tolerating individual
//! failures.

pub mod error;
pub mod input;
pub mod progress;
pub mod recipients;
pub mod run;

pub use error::DispatchError;
pub use input::DispatchInput;
pub use progress::{Progress, TerminalProgress};
pub use recipients::RecipientSet;
pub use run::{DispatchReport, Failure, dispatch};
