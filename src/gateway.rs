// src/gateway.rs
//
// Webmail operations: each call borrows the caller's store/transport for its
// duration and keeps nothing afterwards.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::compose::{compose, compose_forward, reply_subject, HeaderSet, OutgoingMessage};
use crate::correlate::{resolve, Tier};
use crate::error::{Error, Result};
use crate::ident::MessageId;
use crate::message::{Attachment, Message};
use crate::scan::{Cancellation, ForwardScan};
use crate::store::{Clock, MailStore, MailTransport, Selector, Submission};
use crate::thread::{assemble, select_thread, sort_by_recent_activity, thread_key, Thread};

/// One row of the inbox listing.
#[derive(Debug, Clone, Serialize)]
pub struct InboxEntry {
    pub subject: String,
    pub from: String,
    pub date: DateTime<Utc>,
    pub body: String,
    pub attachments: Vec<Attachment>,
    pub message_id: MessageId,
    pub parent_message_id: Option<MessageId>,
    pub references: Vec<MessageId>,
    pub thread_id: String,
}

impl From<Message> for InboxEntry {
    fn from(msg: Message) -> Self {
        let thread_id = thread_key(&msg);
        let from = msg.sender().unwrap_or("Unknown").to_string();
        let subject = if msg.subject.is_empty() {
            "(No Subject)".to_string()
        } else {
            msg.subject
        };
        InboxEntry {
            subject,
            from,
            date: msg.date,
            body: msg.body,
            attachments: msg.attachments,
            message_id: msg.id,
            parent_message_id: msg.parent_id,
            references: msg.references,
            thread_id,
        }
    }
}

/// The latest `limit` messages of `mailbox`, newest first.
pub fn inbox<S: MailStore>(store: &mut S, mailbox: &str, limit: usize) -> Result<Vec<InboxEntry>> {
    let mut messages = store.fetch_envelopes(mailbox, Selector::Last(limit))?;
    messages.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.uid.cmp(&a.uid)));
    debug!("Inbox listing of '{}' has {} entries", mailbox, messages.len());
    Ok(messages.into_iter().map(InboxEntry::from).collect())
}

/// Every message of `mailbox` as threads, most recent activity first.
pub fn threads<S: MailStore>(store: &mut S, mailbox: &str) -> Result<Vec<Thread>> {
    let messages = store.fetch_envelopes(mailbox, Selector::All)?;
    let mut threads = assemble(&messages);
    sort_by_recent_activity(&mut threads);
    Ok(threads)
}

/// The tree for one surfaced thread identifier. An unknown identifier yields
/// a thread with no roots.
pub fn thread<S: MailStore>(store: &mut S, mailbox: &str, thread_id: &str) -> Result<Thread> {
    let messages = store.fetch_envelopes(mailbox, Selector::All)?;
    Ok(select_thread(&messages, thread_id))
}

/// Content of a reply plus where to send it if no parent can be found.
#[derive(Debug, Clone, Default)]
pub struct ReplyRequest {
    pub text: String,
    pub html: Option<String>,
    /// Recipients for the unthreaded fallback.
    pub fallback_to: Vec<String>,
    /// Subject for the unthreaded fallback.
    pub fallback_subject: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyOutcome {
    pub sent_to: Vec<String>,
    pub remote_message_id: String,
    /// `None` when the reply went out unthreaded.
    pub replied_to: Option<MessageId>,
    pub references: Vec<MessageId>,
    pub tier: Option<Tier>,
}

/// Reply to `target`, threading onto the best anchor found in `mailbox`.
///
/// When nothing in the mailbox correlates with `target`, the reply is sent
/// as a new message to `request.fallback_to`; with no fallback recipients
/// this is [`Error::AmbiguousNoParent`].
pub fn reply<S, T>(
    store: &mut S,
    transport: &mut T,
    mailbox: &str,
    target: &MessageId,
    request: &ReplyRequest,
) -> Result<ReplyOutcome>
where
    S: MailStore,
    T: MailTransport,
{
    let candidates = store.fetch_envelopes(mailbox, Selector::All)?;

    let Some(resolved) = resolve(target, &candidates) else {
        if request.fallback_to.is_empty() {
            return Err(Error::AmbiguousNoParent(target.to_string()));
        }
        warn!("No parent for {}; sending unthreaded", target);
        let outgoing = OutgoingMessage {
            to: request.fallback_to.clone(),
            subject: request.fallback_subject.clone(),
            text: request.text.clone(),
            html: request.html.clone(),
            ..OutgoingMessage::default()
        };
        let submission = transport.submit(&outgoing, None)?;
        return Ok(ReplyOutcome {
            sent_to: outgoing.to,
            remote_message_id: submission.remote_message_id,
            replied_to: None,
            references: Vec::new(),
            tier: None,
        });
    };

    let parent = resolved.message;
    let recipient = parent
        .sender()
        .ok_or_else(|| Error::MissingRecipient(parent.id.to_string()))?
        .to_string();
    let headers = compose(parent);
    let outgoing = OutgoingMessage {
        to: vec![recipient],
        subject: reply_subject(&parent.subject),
        text: request.text.clone(),
        html: request.html.clone(),
        ..OutgoingMessage::default()
    };

    let submission = transport.submit(&outgoing, Some(&headers))?;
    info!("Replied to {} ({:?}) as {}", parent.id, resolved.tier, submission.remote_message_id);

    Ok(ReplyOutcome {
        sent_to: outgoing.to,
        remote_message_id: submission.remote_message_id,
        replied_to: Some(headers.in_reply_to),
        references: headers.references,
        tier: Some(resolved.tier),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ForwardOutcome {
    pub forwarded: MessageId,
    pub sent_to: Vec<String>,
    pub remote_message_id: String,
}

/// Locate `target` in `mailbox` by envelope scan and forward it to `to`
/// with the original attached. Nothing is submitted unless the scan
/// completes.
pub fn forward<S, T, C>(
    store: &mut S,
    transport: &mut T,
    mailbox: &str,
    target: &MessageId,
    to: Vec<String>,
    cancel: &Cancellation<C>,
) -> Result<ForwardOutcome>
where
    S: MailStore,
    T: MailTransport,
    C: Clock,
{
    let original = ForwardScan::new(mailbox, target).run(store, cancel)?;
    let outgoing = compose_forward(&original)?.into_message(to);

    let submission = transport.submit(&outgoing, None)?;
    info!("Forwarded {} as {}", original.id, submission.remote_message_id);

    Ok(ForwardOutcome {
        forwarded: original.id,
        sent_to: outgoing.to,
        remote_message_id: submission.remote_message_id,
    })
}

/// Submit a composed message, optionally with caller-supplied threading
/// headers. A references list without `in_reply_to` replies to its last id;
/// either way `References` ends with the `In-Reply-To` id.
pub fn send<T: MailTransport>(
    transport: &mut T,
    message: &OutgoingMessage,
    in_reply_to: Option<MessageId>,
    references: Vec<MessageId>,
) -> Result<Submission> {
    let headers = in_reply_to
        .or_else(|| references.last().cloned())
        .map(|parent| HeaderSet::replying_to(parent, references));
    Ok(transport.submit(message, headers.as_ref())?)
}
