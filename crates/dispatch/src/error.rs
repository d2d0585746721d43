use std::path::PathBuf;

use thiserror::Error;

/// Fatal input problems, raised before any network activity.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("message file not found: {}", .path.display())]
    MessageFileMissing { path: PathBuf },

    #[error("recipient file not found: {}", .path.display())]
    RecipientFileMissing { path: PathBuf },

    #[error("no recipients found in {}", .path.display())]
    NoRecipients { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
