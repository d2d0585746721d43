pub mod callback_server;
pub mod claims;
pub mod error;
pub mod flow;
mod pages;
pub mod pkce;
pub mod session;
pub mod types;

pub use callback_server::{CallbackServer, PendingCallback};
pub use error::OAuthError;
pub use flow::OAuthFlow;
pub use session::AuthorizationSession;
pub use types::{AuthorizationResult, OAuthConfig, OAuthTokens, PkceChallenge};
