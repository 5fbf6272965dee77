// src/compose.rs
//
// Outgoing reply/forward composition: threading headers and subjects.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};
use crate::ident::{render_id_list, MessageId};
use crate::message::Message;

/// Body text sent along with a forwarded message.
pub const FORWARD_BODY: &str = "Forwarded message is attached.";
/// File name of the attached original in a forward.
pub const FORWARD_FILENAME: &str = "forwarded.eml";

/// `In-Reply-To` and `References` for one outgoing reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderSet {
    pub in_reply_to: MessageId,
    /// Oldest first, no duplicates.
    pub references: Vec<MessageId>,
}

impl HeaderSet {
    /// Build from caller-supplied values; references are de-duplicated
    /// keeping the first occurrence.
    pub fn new(in_reply_to: MessageId, references: Vec<MessageId>) -> Self {
        HeaderSet {
            in_reply_to,
            references: dedup_ids(references),
        }
    }

    /// Headers for a reply to `parent` given the chain it belongs to. The
    /// parent is moved to the end of `References`, so the list is never
    /// empty and always ends with `In-Reply-To`.
    pub fn replying_to(parent: MessageId, mut chain: Vec<MessageId>) -> Self {
        chain.retain(|r| r != &parent);
        chain.push(parent.clone());
        HeaderSet::new(parent, chain)
    }

    /// Wire value of `In-Reply-To`.
    pub fn in_reply_to_value(&self) -> String {
        self.in_reply_to.denormalize()
    }

    /// Wire value of `References`.
    pub fn references_value(&self) -> String {
        render_id_list(&self.references)
    }
}

impl fmt::Display for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "In-Reply-To: {}\r\nReferences: {}",
            self.in_reply_to_value(),
            self.references_value()
        )
    }
}

/// Headers for a reply to `parent`: its own id as `In-Reply-To`, and its
/// reference chain with its own id appended.
pub fn compose(parent: &Message) -> HeaderSet {
    HeaderSet::replying_to(parent.id.clone(), parent.references.clone())
}

/// Reply subject: prefixed with `Re: ` unless it already starts with `Re:`.
pub fn reply_subject(subject: &str) -> String {
    if subject.starts_with("Re:") {
        subject.to_string()
    } else {
        format!("Re: {}", subject)
    }
}

/// One attachment of an outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// A message ready for submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub attachments: Vec<OutgoingAttachment>,
}

/// Subject and attachment for forwarding `original`. Forwards carry no
/// threading headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardDraft {
    pub subject: String,
    pub attachment: OutgoingAttachment,
}

impl ForwardDraft {
    pub fn into_message(self, to: Vec<String>) -> OutgoingMessage {
        OutgoingMessage {
            to,
            subject: self.subject,
            text: FORWARD_BODY.to_string(),
            attachments: vec![self.attachment],
            ..OutgoingMessage::default()
        }
    }
}

/// Forward `original`, carrying its raw source as a `message/rfc822` part.
pub fn compose_forward(original: &Message) -> Result<ForwardDraft> {
    let source = original
        .source
        .as_ref()
        .ok_or_else(|| Error::MissingSource(original.id.to_string()))?;

    Ok(ForwardDraft {
        subject: format!("Fwd: {}", original.subject),
        attachment: OutgoingAttachment {
            filename: FORWARD_FILENAME.to_string(),
            content_type: "message/rfc822".to_string(),
            content: source.clone(),
        },
    })
}

fn dedup_ids(ids: Vec<MessageId>) -> Vec<MessageId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
