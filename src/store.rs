// src/store.rs
//
// Contracts for the mail store and submission transport.
// Production code talks to IMAP/SMTP; tests plug in in-memory versions.

use chrono::{DateTime, Utc};
use eyre::Result;
use serde::Serialize;

use crate::compose::{HeaderSet, OutgoingMessage};
use crate::message::Message;

/// Which messages of a mailbox to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    All,
    /// The last `n` messages by sequence number.
    Last(usize),
}

/// Read side of a remote mailbox. Addresses are UIDs within `mailbox`.
///
/// Implementations are owned by the caller for the span of one operation and
/// are never retained by the threading code.
pub trait MailStore {
    /// List message addresses in `mailbox`, oldest first.
    fn search(&mut self, mailbox: &str, selector: Selector) -> Result<Vec<u32>>;

    /// Envelope-level records (ids, references, date, subject, sender).
    fn fetch_envelopes(&mut self, mailbox: &str, selector: Selector) -> Result<Vec<Message>>;

    /// Envelope for one address, or `None` if it vanished since `search`.
    fn fetch_envelope(&mut self, mailbox: &str, uid: u32) -> Result<Option<Message>>;

    /// Full message (body, attachments, raw source) for one address.
    fn fetch_full(&mut self, mailbox: &str, uid: u32) -> Result<Option<Message>>;
}

/// Result of handing a message to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub success: bool,
    pub remote_message_id: String,
}

/// Write side: message submission.
pub trait MailTransport {
    /// Submit `message`; `headers` is `None` for new messages and forwards.
    fn submit(&mut self, message: &OutgoingMessage, headers: Option<&HeaderSet>) -> Result<Submission>;
}

/// Trait for time providers.
/// Allows production code to use real time or virtual time for testing.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real clock implementation using system time.
#[derive(Clone, Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
