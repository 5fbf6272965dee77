// src/error.rs
//
// Error taxonomy for reply/forward/thread operations.
// Adapter failures are carried through unchanged; the core never retries.

use thiserror::Error;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Target identifier absent from the scanned candidates (forward path).
    #[error("message not found: {0}")]
    NotFound(String),

    /// No parent resolved for a reply target. Callers usually degrade to an
    /// unthreaded message instead of surfacing this.
    #[error("no message in the mailbox references {0}")]
    AmbiguousNoParent(String),

    /// Only raised for identifiers that are empty after trimming; anything
    /// else is passed through as-is.
    #[error("malformed message identifier: {0:?}")]
    MalformedIdentifier(String),

    /// The forward scan hit its deadline or was cancelled by the caller.
    #[error("operation cancelled after scanning {scanned} messages")]
    Cancelled { scanned: usize },

    /// The located message came back without its raw source.
    #[error("failed to retrieve message source for {0}")]
    MissingSource(String),

    /// Nobody to address the outgoing message to.
    #[error("no recipient for reply to {0}")]
    MissingRecipient(String),

    /// Any failure reported by the mail store or transport.
    #[error("mail store failure: {0:#}")]
    Adapter(eyre::Report),
}

impl Error {
    /// True when the caller should offer "try again" rather than "no such message".
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Cancelled { .. } | Error::Adapter(_))
    }
}

impl From<eyre::Report> for Error {
    fn from(report: eyre::Report) -> Self {
        Error::Adapter(report)
    }
}
