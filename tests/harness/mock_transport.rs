// tests/harness/mock_transport.rs
//
// Recording MailTransport: keeps every submission instead of sending it.

use eyre::{eyre, Result};

use mailthread::compose::{HeaderSet, OutgoingMessage};
use mailthread::store::{MailTransport, Submission};

/// A message handed to the transport, with the threading headers it carried.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: OutgoingMessage,
    pub headers: Option<HeaderSet>,
    pub remote_message_id: String,
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Vec<SentMessage>,
    reject: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent submission fails like a refused relay.
    pub fn reject_all(&mut self) {
        self.reject = true;
    }

    pub fn sent(&self) -> &[SentMessage] {
        &self.sent
    }

    pub fn last(&self) -> Option<&SentMessage> {
        self.sent.last()
    }
}

impl MailTransport for RecordingTransport {
    fn submit(&mut self, message: &OutgoingMessage, headers: Option<&HeaderSet>) -> Result<Submission> {
        if self.reject {
            return Err(eyre!("550 relay refused"));
        }
        let remote_message_id = format!("<sent-{}@test.local>", self.sent.len() + 1);
        self.sent.push(SentMessage {
            message: message.clone(),
            headers: headers.cloned(),
            remote_message_id: remote_message_id.clone(),
        });
        Ok(Submission {
            success: true,
            remote_message_id,
        })
    }
}
