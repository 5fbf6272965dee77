// src/message.rs

use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use log::debug;
use mailparse::{addrparse, parse_headers, parse_mail, DispositionType, MailAddr, MailHeaderMap, ParsedMail};
use serde::Serialize;

use crate::ident::{parse_id_list, MessageId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailAddress {
    pub name: String,
    pub email: String,
}

/// Descriptor for one attachment; the content itself stays in the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub size: usize,
}

/// Immutable snapshot of one stored message. All identifiers are normalized
/// on construction; nothing downstream sees raw header text.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Store address (IMAP UID) the message was fetched from.
    pub uid: u32,
    pub id: MessageId,
    pub parent_id: Option<MessageId>,
    /// Ancestor ids, oldest first.
    pub references: Vec<MessageId>,
    /// Opaque conversation token assigned by the store (Gmail X-GM-THRID).
    pub provider_thread_id: Option<String>,
    pub subject: String,
    pub from: Vec<EmailAddress>,
    pub date: DateTime<Utc>,
    pub body: String,
    pub attachments: Vec<Attachment>,
    /// Raw RFC 5322 source; only present after a full fetch.
    #[serde(skip)]
    pub source: Option<Vec<u8>>,
}

impl Message {
    /// Minimal message, mostly useful for building fixtures.
    pub fn new(uid: u32, id: MessageId, date: DateTime<Utc>) -> Self {
        Message {
            uid,
            id,
            parent_id: None,
            references: Vec::new(),
            provider_thread_id: None,
            subject: String::new(),
            from: Vec::new(),
            date,
            body: String::new(),
            attachments: Vec::new(),
            source: None,
        }
    }

    /// Build a message from the header block returned by an envelope fetch.
    ///
    /// The `Date` header wins over the store's internal date; when neither is
    /// usable the fetch time is used.
    pub fn from_envelope(
        uid: u32,
        raw_headers: &[u8],
        internal_date: Option<DateTime<Utc>>,
        provider_thread_id: Option<String>,
    ) -> Result<Self> {
        let (headers, _) =
            parse_headers(raw_headers).map_err(|e| eyre!("Failed to parse headers for UID {}: {}", uid, e))?;

        let id = match headers.get_first_value("Message-ID").as_deref().and_then(MessageId::normalize) {
            Some(id) => id,
            None => {
                debug!("UID {} has no Message-ID; using a local identifier", uid);
                MessageId::orphan(uid)
            }
        };

        // In-Reply-To may list several ids; the first one is the parent
        let parent_id = headers
            .get_first_value("In-Reply-To")
            .and_then(|v| parse_id_list(&v).into_iter().next());

        let references = headers
            .get_first_value("References")
            .map(|v| parse_id_list(&v))
            .unwrap_or_default();

        let date = headers
            .get_first_value("Date")
            .and_then(|d| mailparse::dateparse(&d).ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or(internal_date)
            .unwrap_or_else(Utc::now);

        Ok(Message {
            uid,
            id,
            parent_id,
            references,
            provider_thread_id: provider_thread_id.filter(|t| !t.trim().is_empty()),
            subject: headers.get_first_value("Subject").unwrap_or_default(),
            from: parse_addrs(headers.get_first_value("From")),
            date,
            body: String::new(),
            attachments: Vec::new(),
            source: None,
        })
    }

    /// Build a message from a full RFC 5322 source, decoding the body and
    /// attachment descriptors. The source is kept for forwarding.
    pub fn from_source(
        uid: u32,
        source: Vec<u8>,
        internal_date: Option<DateTime<Utc>>,
        provider_thread_id: Option<String>,
    ) -> Result<Self> {
        let parsed = parse_mail(&source).map_err(|e| eyre!("Failed to parse message UID {}: {}", uid, e))?;
        let header_end = header_block_len(&source);
        let mut msg = Message::from_envelope(uid, &source[..header_end], internal_date, provider_thread_id)?;

        let mut plain = None;
        let mut html = None;
        collect_parts(&parsed, &mut plain, &mut html, &mut msg.attachments);
        msg.body = plain.or(html).unwrap_or_default();
        msg.source = Some(source);
        Ok(msg)
    }

    // Builder helpers, used by fixtures and tests.

    pub fn with_parent(mut self, parent: MessageId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_references(mut self, references: Vec<MessageId>) -> Self {
        self.references = references;
        self
    }

    pub fn with_thread_id(mut self, thread_id: &str) -> Self {
        self.provider_thread_id = Some(thread_id.to_string());
        self
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    pub fn with_from(mut self, email: &str) -> Self {
        self.from = vec![EmailAddress {
            name: String::new(),
            email: email.to_string(),
        }];
        self
    }

    pub fn with_source(mut self, source: Vec<u8>) -> Self {
        self.source = Some(source);
        self
    }

    /// Address of the first sender, if any.
    pub fn sender(&self) -> Option<&str> {
        self.from.first().map(|a| a.email.as_str()).filter(|e| !e.is_empty())
    }
}

/// Length of the header block including the blank separator line.
fn header_block_len(raw: &[u8]) -> usize {
    raw.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| p + 4)
        .or_else(|| raw.windows(2).position(|w| w == b"\n\n").map(|p| p + 2))
        .unwrap_or(raw.len())
}

fn collect_parts(
    part: &ParsedMail,
    plain: &mut Option<String>,
    html: &mut Option<String>,
    attachments: &mut Vec<Attachment>,
) {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_parts(sub, plain, html, attachments);
        }
        return;
    }

    let disposition = part.get_content_disposition();
    let filename = disposition
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .cloned();
    let mimetype = part.ctype.mimetype.to_lowercase();

    if matches!(disposition.disposition, DispositionType::Attachment) || filename.is_some() {
        let size = part.get_body_raw().map(|b| b.len()).unwrap_or(0);
        attachments.push(Attachment {
            filename: filename.unwrap_or_else(|| "unknown".to_string()),
            content_type: mimetype,
            size,
        });
        return;
    }

    match mimetype.as_str() {
        "text/plain" if plain.is_none() => *plain = part.get_body().ok(),
        "text/html" if html.is_none() => *html = part.get_body().ok(),
        _ => {}
    }
}

/// Owned parsing of an address header into `EmailAddress`
fn parse_addrs(field: Option<String>) -> Vec<EmailAddress> {
    let Some(s) = field else {
        return Vec::new();
    };
    let Ok(addrs) = addrparse(&s) else {
        return Vec::new();
    };

    let mut result = Vec::new();
    for addr in addrs.iter() {
        match addr {
            MailAddr::Single(info) => {
                result.push(EmailAddress {
                    name: info.display_name.clone().unwrap_or_default(),
                    email: info.addr.clone(),
                });
            }
            MailAddr::Group(group) => {
                for info in &group.addrs {
                    result.push(EmailAddress {
                        name: info.display_name.clone().unwrap_or_default(),
                        email: info.addr.clone(),
                    });
                }
            }
        }
    }
    result
}
