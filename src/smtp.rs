// src/smtp.rs
//
// MailTransport over SMTP (lettre, implicit TLS).

use eyre::{eyre, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use log::{debug, info};
use uuid::Uuid;

use crate::cfg::config::Config;
use crate::compose::{HeaderSet, OutgoingMessage};
use crate::store::{MailTransport, Submission};

pub struct SmtpSubmitter {
    mailer: SmtpTransport,
    from: Mailbox,
}

impl SmtpSubmitter {
    pub fn connect(config: &Config) -> Result<Self> {
        let domain = config.smtp_domain()?;
        let (username, password) = config.credentials()?;

        let mailer = SmtpTransport::relay(domain)
            .map_err(|e| eyre!("Failed to configure SMTP relay {}: {}", domain, e))?
            .port(config.smtp_port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();
        let from: Mailbox = username
            .parse()
            .map_err(|e| eyre!("Invalid sender address '{}': {}", username, e))?;

        debug!("SMTP relay {}:{} configured for {}", domain, config.smtp_port, username);
        Ok(SmtpSubmitter { mailer, from })
    }
}

impl MailTransport for SmtpSubmitter {
    fn submit(&mut self, message: &OutgoingMessage, headers: Option<&HeaderSet>) -> Result<Submission> {
        let message_id = new_message_id(&self.from);
        let email = build_email(&self.from, message, headers, &message_id)?;

        self.mailer
            .send(&email)
            .map_err(|e| eyre!("SMTP submission failed: {}", e))?;
        info!("Submitted {} to {} recipient(s)", message_id, message.to.len() + message.cc.len() + message.bcc.len());

        Ok(Submission {
            success: true,
            remote_message_id: message_id,
        })
    }
}

fn new_message_id(from: &Mailbox) -> String {
    format!("<{}@{}>", Uuid::new_v4(), from.email.domain())
}

/// Assemble the RFC 5322 message lettre will send.
fn build_email(
    from: &Mailbox,
    message: &OutgoingMessage,
    headers: Option<&HeaderSet>,
    message_id: &str,
) -> Result<lettre::Message> {
    let mut builder = lettre::Message::builder()
        .from(from.clone())
        .subject(message.subject.clone())
        .message_id(Some(message_id.to_string()));

    for to in &message.to {
        builder = builder.to(parse_mailbox(to)?);
    }
    for cc in &message.cc {
        builder = builder.cc(parse_mailbox(cc)?);
    }
    for bcc in &message.bcc {
        builder = builder.bcc(parse_mailbox(bcc)?);
    }
    if let Some(h) = headers {
        builder = builder
            .in_reply_to(h.in_reply_to_value())
            .references(h.references_value());
    }

    let body = match &message.html {
        Some(html) => MultiPart::alternative()
            .singlepart(SinglePart::plain(message.text.clone()))
            .singlepart(SinglePart::html(html.clone())),
        None => MultiPart::mixed().singlepart(SinglePart::plain(message.text.clone())),
    };

    let body = if message.attachments.is_empty() {
        body
    } else {
        let mut mixed = MultiPart::mixed().multipart(body);
        for att in &message.attachments {
            let content_type = ContentType::parse(&att.content_type)
                .map_err(|e| eyre!("Bad content type '{}': {}", att.content_type, e))?;
            mixed = mixed.singlepart(Attachment::new(att.filename.clone()).body(att.content.clone(), content_type));
        }
        mixed
    };

    builder
        .multipart(body)
        .map_err(|e| eyre!("Failed to build message: {}", e))
}

fn parse_mailbox(addr: &str) -> Result<Mailbox> {
    addr.parse()
        .map_err(|e| eyre!("Invalid recipient address '{}': {}", addr, e))
}
