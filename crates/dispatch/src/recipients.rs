use std::{collections::HashSet, path::Path};

use tracing::debug;

use crate::error::DispatchError;

/// Unique, trimmed, non-empty addresses in first-occurrence order.
///
/// Comparison is case-sensitive; no normalization beyond trimming whitespace
/// and byte-order marks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientSet {
    addresses: Vec<String>,
}

impl RecipientSet {
    pub fn parse(content: &str) -> Self {
        let mut seen = HashSet::new();
        let addresses = content
            .lines()
            .map(|line| line.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}'))
            .filter(|line| !line.is_empty())
            .filter(|line| seen.insert(*line))
            .map(str::to_string)
            .collect();
        Self { addresses }
    }

    /// Read and parse a recipient file. A missing file is reported as
    /// [`DispatchError::RecipientFileMissing`].
    pub async fn load(path: &Path) -> Result<Self, DispatchError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                DispatchError::RecipientFileMissing {
                    path: path.to_path_buf(),
                }
            } else {
                DispatchError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let set = Self::parse(&content);
        debug!(path = %path.display(), count = set.len(), "loaded recipients");
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.addresses.iter().map(String::as_str)
    }
}
