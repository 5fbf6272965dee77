// tests/harness/virtual_mailbox.rs
//
// In-memory IMAP account for testing.
// Messages live once and appear in every mailbox whose label they carry,
// the way Gmail exposes one message in INBOX and All Mail.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};

pub const INBOX: &str = "INBOX";
pub const ALL_MAIL: &str = "[Gmail]/All Mail";

/// One stored message: raw RFC 5322 source plus server-side attributes.
#[derive(Debug, Clone)]
pub struct MailboxMessage {
    pub uid: u32,
    pub labels: HashSet<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Verbatim source when loaded from a fixture file.
    pub raw: Option<Vec<u8>>,
    pub internal_date: Option<DateTime<Utc>>,
    pub thread_id: Option<String>,
    pub deleted: bool,
}

impl MailboxMessage {
    /// Create a plain-text message with the usual headers.
    pub fn new(subject: &str, from: &str, date: &str) -> Self {
        Self {
            uid: 0,
            labels: [INBOX, ALL_MAIL].iter().map(|l| l.to_string()).collect(),
            headers: vec![
                ("From".to_string(), from.to_string()),
                ("To".to_string(), "me@example.com".to_string()),
                ("Subject".to_string(), subject.to_string()),
                ("Date".to_string(), date.to_string()),
            ],
            body: String::new(),
            raw: None,
            internal_date: None,
            thread_id: None,
            deleted: false,
        }
    }

    /// Wrap a verbatim .eml source.
    pub fn from_eml(raw: Vec<u8>) -> Self {
        Self {
            uid: 0,
            labels: [INBOX, ALL_MAIL].iter().map(|l| l.to_string()).collect(),
            headers: Vec::new(),
            body: String::new(),
            raw: Some(raw),
            internal_date: None,
            thread_id: None,
            deleted: false,
        }
    }

    pub fn with_message_id(self, message_id: &str) -> Self {
        self.with_header("Message-ID", message_id)
    }

    pub fn with_in_reply_to(self, in_reply_to: &str) -> Self {
        self.with_header("In-Reply-To", in_reply_to)
    }

    pub fn with_references(self, refs: &[&str]) -> Self {
        self.with_header("References", &refs.join(" "))
    }

    /// Builder method to set thread ID (Gmail X-GM-THRID).
    pub fn with_thread_id(mut self, thread_id: &str) -> Self {
        self.thread_id = Some(thread_id.to_string());
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn with_internal_date(mut self, date: DateTime<Utc>) -> Self {
        self.internal_date = Some(date);
        self
    }

    /// Restrict the message to exactly these mailboxes.
    pub fn only_in(mut self, mailboxes: &[&str]) -> Self {
        self.labels = mailboxes.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// RFC 5322 bytes as a server would hand them out.
    pub fn source(&self) -> Vec<u8> {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let mut out = String::new();
        for (name, value) in &self.headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str("\r\n");
        out.push_str(&self.body);
        out.push_str("\r\n");
        out.into_bytes()
    }
}

/// In-memory IMAP account for testing.
#[derive(Debug, Default)]
pub struct VirtualMailbox {
    messages: BTreeMap<u32, MailboxMessage>,
    next_uid: u32,
}

impl VirtualMailbox {
    pub fn new() -> Self {
        Self {
            messages: BTreeMap::new(),
            next_uid: 1,
        }
    }

    /// Add a message to the account, returning the assigned UID.
    pub fn add_message(&mut self, mut message: MailboxMessage) -> u32 {
        let uid = self.next_uid;
        self.next_uid += 1;

        message.uid = uid;
        self.messages.insert(uid, message);
        uid
    }

    pub fn get_message(&self, uid: u32) -> Option<&MailboxMessage> {
        self.messages.get(&uid).filter(|m| !m.deleted)
    }

    /// Live UIDs visible in `mailbox`, ascending.
    pub fn uids_in(&self, mailbox: &str) -> Vec<u32> {
        self.messages
            .values()
            .filter(|m| !m.deleted && m.labels.contains(mailbox))
            .map(|m| m.uid)
            .collect()
    }

    /// Message in `mailbox` by UID, if it is still there.
    pub fn get_in(&self, mailbox: &str, uid: u32) -> Option<&MailboxMessage> {
        self.get_message(uid).filter(|m| m.labels.contains(mailbox))
    }

    /// Mark a message as deleted; it disappears from every mailbox.
    pub fn delete_message(&mut self, uid: u32) -> bool {
        match self.messages.get_mut(&uid) {
            Some(msg) => {
                msg.deleted = true;
                true
            }
            None => false,
        }
    }

    pub fn message_count(&self, mailbox: &str) -> usize {
        self.uids_in(mailbox).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uids_are_assigned_in_order() {
        let mut mb = VirtualMailbox::new();
        let a = mb.add_message(MailboxMessage::new("a", "x@example.com", "Sat, 01 Jun 2024 09:00:00 +0000"));
        let b = mb.add_message(MailboxMessage::new("b", "x@example.com", "Sat, 01 Jun 2024 09:00:00 +0000"));
        assert_eq!((a, b), (1, 2));
        assert_eq!(mb.uids_in(INBOX), vec![1, 2]);
    }

    #[test]
    fn test_mailbox_membership_follows_labels() {
        let mut mb = VirtualMailbox::new();
        let archived = mb.add_message(
            MailboxMessage::new("old", "x@example.com", "Sat, 01 Jun 2024 09:00:00 +0000").only_in(&[ALL_MAIL]),
        );
        assert_eq!(mb.message_count(INBOX), 0);
        assert_eq!(mb.uids_in(ALL_MAIL), vec![archived]);
        assert!(mb.get_in(INBOX, archived).is_none());
    }

    #[test]
    fn test_deleted_message_vanishes() {
        let mut mb = VirtualMailbox::new();
        let uid = mb.add_message(MailboxMessage::new("gone", "x@example.com", "Sat, 01 Jun 2024 09:00:00 +0000"));
        assert!(mb.delete_message(uid));
        assert!(mb.get_message(uid).is_none());
        assert_eq!(mb.message_count(ALL_MAIL), 0);
    }

    #[test]
    fn test_rendered_source_has_headers_and_body() {
        let msg = MailboxMessage::new("Hello", "Alice <alice@example.com>", "Sat, 01 Jun 2024 09:00:00 +0000")
            .with_message_id("<m1@example.com>")
            .with_body("hi there");
        let source = String::from_utf8(msg.source()).unwrap();
        assert!(source.contains("Message-ID: <m1@example.com>\r\n"));
        assert!(source.contains("\r\n\r\nhi there"));
    }
}
