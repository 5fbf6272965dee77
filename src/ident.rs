// src/ident.rs
//
// Canonical form for Message-ID values so that identifiers coming from
// envelopes, parsed headers, and URL path segments compare equal.

use log::debug;
use percent_encoding::percent_decode_str;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::Error;

/// A normalized message identifier: no surrounding whitespace, no outer
/// angle brackets, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(String);

impl MessageId {
    /// Normalize a raw identifier. Returns `None` for values that are empty
    /// once whitespace and one pair of outer brackets are removed.
    ///
    /// Exactly one outer `<...>` pair is stripped, so `<<a>>` becomes `<a>`.
    /// A value bracketed on one side only is kept verbatim (trimmed).
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let opens = trimmed.starts_with('<');
        let closes = trimmed.ends_with('>');

        let value = if opens && closes && trimmed.len() >= 2 {
            trimmed[1..trimmed.len() - 1].trim()
        } else {
            if opens != closes {
                debug!("Passing through unbalanced message id {:?}", trimmed);
            }
            trimmed
        };

        if value.is_empty() {
            None
        } else {
            Some(MessageId(value.to_string()))
        }
    }

    /// Normalize an identifier taken from a URL path segment, which may
    /// arrive percent-encoded (`%3Cabc%40host%3E`).
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        let decoded = percent_decode_str(segment).decode_utf8_lossy();
        Self::normalize(&decoded)
    }

    /// Identifier supplied by a caller (URL segment or flag). Empty input is
    /// an error rather than a silent `None`.
    pub fn parse(segment: &str) -> crate::error::Result<Self> {
        Self::from_path_segment(segment).ok_or_else(|| Error::MalformedIdentifier(segment.to_string()))
    }

    /// Local stand-in for a stored message that carries no Message-ID.
    pub fn orphan(uid: u32) -> Self {
        MessageId(format!("orphan-{}", uid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wire form for protocol headers: `<id>`.
    pub fn denormalize(&self) -> String {
        format!("<{}>", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Parse a `References`/`In-Reply-To` header value into normalized ids,
/// oldest first. Accepts whitespace or commas between ids, and ids that are
/// run together (`<a><b>`). Bare tokens without brackets are kept.
pub fn parse_id_list(value: &str) -> Vec<MessageId> {
    let bytes = value.as_bytes();
    let mut out = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        if b.is_ascii_whitespace() || b == b',' {
            pos += 1;
            continue;
        }

        let start = pos;
        if b == b'<' {
            match value[pos..].find('>') {
                Some(offset) => pos += offset + 1,
                None => pos = bytes.len(),
            }
        } else {
            while pos < bytes.len()
                && !bytes[pos].is_ascii_whitespace()
                && bytes[pos] != b','
                && bytes[pos] != b'<'
            {
                pos += 1;
            }
        }

        if let Some(id) = MessageId::normalize(&value[start..pos]) {
            out.push(id);
        }
    }

    out
}

/// Render ids for a `References` header: bracketed, space separated.
pub fn render_id_list(ids: &[MessageId]) -> String {
    ids.iter()
        .map(MessageId::denormalize)
        .collect::<Vec<_>>()
        .join(" ")
}
