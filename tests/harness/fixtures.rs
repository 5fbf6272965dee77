// tests/harness/fixtures.rs
//
// Email fixture loader for .eml files under tests/fixtures/emails.

use std::path::PathBuf;
use thiserror::Error;

use crate::harness::virtual_mailbox::MailboxMessage;

/// Represents a loaded email fixture with metadata.
#[derive(Debug, Clone)]
pub struct EmailFixture {
    pub message: MailboxMessage,
    /// Original file path for debugging
    pub source_path: String,
}

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("fixture {0} has no header block")]
    NoHeaders(String),
}

/// Loader for email fixtures from .eml files.
pub struct FixtureLoader {
    base_path: PathBuf,
}

impl FixtureLoader {
    /// Create a new fixture loader pointing to the standard fixtures directory.
    pub fn new() -> Self {
        Self {
            base_path: PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("tests")
                .join("fixtures")
                .join("emails"),
        }
    }

    /// Load a single .eml file verbatim.
    pub fn load_email(&self, relative_path: &str) -> Result<EmailFixture, FixtureError> {
        let path = self.base_path.join(relative_path);
        let raw = std::fs::read(&path)?;
        if !raw.windows(4).any(|w| w == b"\r\n\r\n") && !raw.windows(2).any(|w| w == b"\n\n") {
            return Err(FixtureError::NoHeaders(relative_path.to_string()));
        }

        Ok(EmailFixture {
            message: MailboxMessage::from_eml(raw),
            source_path: path.to_string_lossy().to_string(),
        })
    }

    /// Load all .eml files from a directory, sorted by filename.
    pub fn load_directory(&self, relative_path: &str) -> Result<Vec<EmailFixture>, FixtureError> {
        let dir = self.base_path.join(relative_path);
        let mut paths = Vec::new();

        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "eml") {
                paths.push(path);
            }
        }
        paths.sort();

        paths
            .iter()
            .map(|p| {
                let name = p.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                self.load_email(&format!("{}/{}", relative_path, name))
            })
            .collect()
    }
}

impl Default for FixtureLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_single_fixture() {
        let fixture = FixtureLoader::new().load_email("invoice.eml").unwrap();
        assert!(fixture.source_path.ends_with("invoice.eml"));
        assert!(fixture.message.raw.is_some());
    }

    #[test]
    fn test_load_directory_is_sorted() {
        let fixtures = FixtureLoader::new().load_directory("plans").unwrap();
        assert_eq!(fixtures.len(), 3);
        assert!(fixtures[0].source_path.ends_with("01-root.eml"));
        assert!(fixtures[2].source_path.ends_with("03-reply-to-reply.eml"));
    }

    #[test]
    fn test_missing_fixture_is_io_error() {
        let err = FixtureLoader::new().load_email("nope.eml").unwrap_err();
        assert!(matches!(err, FixtureError::Io(_)));
    }
}
