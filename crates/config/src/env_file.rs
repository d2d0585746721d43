//! Minimal dotenv writer used to persist a freshly issued refresh token.

use std::{io::Write, path::Path};

use {tempfile::NamedTempFile, tracing::debug};

use crate::error::ConfigError;

/// Set `key` in the dotenv file at `path`, keeping every other line intact.
///
/// The value is single-quoted so dotenv loaders read it literally. An existing
/// assignment (optionally prefixed with `export`) is replaced in place;
/// otherwise the line is appended. A missing file is created. The new content
/// goes to a temporary file in the same directory that then replaces the
/// original, so a failed write leaves the old file untouched.
pub fn upsert(path: &Path, key: &str, value: &str) -> Result<(), ConfigError> {
    let existing = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        },
    };

    let assignment = format!("{key}='{value}'");
    let mut replaced = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| {
            if !replaced && assigns(line, key) {
                replaced = true;
                assignment.clone()
            } else {
                line.to_string()
            }
        })
        .collect();
    if !replaced {
        lines.push(assignment);
    }

    let mut content = lines.join("\n");
    content.push('\n');
    write_atomic(path, content.as_bytes())?;
    debug!(path = %path.display(), %key, "updated env file");
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConfigError> {
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

fn assigns(line: &str, key: &str) -> bool {
    let line = line.trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
    line.strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_to_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".env");
        upsert(&path, "OAUTH_REFRESH_TOKEN", "M.C5$abc!").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "OAUTH_REFRESH_TOKEN='M.C5$abc!'\n"
        );
    }

    #[test]
    fn test_replaces_existing_assignment_only() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".env");
        std::fs::write(
            &path,
            "# credentials\nOAUTH_CLIENT_ID=abc\nexport OAUTH_REFRESH_TOKEN=old\nOAUTH_REFRESH_TOKEN_NOTE=keep\n",
        )
        .unwrap();

        upsert(&path, "OAUTH_REFRESH_TOKEN", "new").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# credentials\nOAUTH_CLIENT_ID=abc\nOAUTH_REFRESH_TOKEN='new'\nOAUTH_REFRESH_TOKEN_NOTE=keep\n"
        );
    }

    #[test]
    fn test_rewrite_leaves_no_temporary_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".env");
        std::fs::write(&path, "OAUTH_CLIENT_SECRET=s3cret\n").unwrap();

        upsert(&path, "OAUTH_REFRESH_TOKEN", "first").unwrap();
        upsert(&path, "OAUTH_REFRESH_TOKEN", "second").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "OAUTH_CLIENT_SECRET=s3cret\nOAUTH_REFRESH_TOKEN='second'\n"
        );
        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_missing_directory_is_a_write_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent").join(".env");
        let err = upsert(&path, "OAUTH_REFRESH_TOKEN", "x").unwrap_err();
        assert!(matches!(err, ConfigError::Write { .. }));
        assert!(!path.exists());
    }
}
