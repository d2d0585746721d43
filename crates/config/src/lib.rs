//! Configuration for mailrun.
//!
//! Values come from an optional `mailrun.toml`, overridden by environment
//! variables (which the binary seeds from `.env`).

pub mod env_file;
pub mod error;
pub mod loader;
pub mod schema;
pub mod scopes;

pub use error::ConfigError;
pub use loader::{OAuthCredentials, Settings, SmtpSettings};
pub use schema::FileConfig;
pub use scopes::ScopePreset;
