// src/scan.rs
//
// Linear envelope scan that locates one message by Message-ID inside a
// remote mailbox, for forwarding. O(mailbox size); cancellable.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ident::MessageId;
use crate::message::Message;
use crate::store::{Clock, MailStore, Selector};

/// Shared flag a caller can flip to abort a running scan.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Deadline and cancel token checked between store round-trips.
#[derive(Clone)]
pub struct Cancellation<C: Clock> {
    clock: C,
    deadline: Option<DateTime<Utc>>,
    token: CancelToken,
}

impl<C: Clock> Cancellation<C> {
    /// No deadline; only the token can stop the scan.
    pub fn new(clock: C) -> Self {
        Cancellation {
            clock,
            deadline: None,
            token: CancelToken::new(),
        }
    }

    /// Expire `timeout` from now according to the clock.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(self.clock.now() + timeout);
        self
    }

    pub fn with_token(mut self, token: CancelToken) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| self.clock.now() >= d)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Scanning { scanned: usize },
    Found { uid: u32 },
    FetchingFull { uid: u32 },
    Done { uid: u32 },
    Exhausted { scanned: usize },
    Failed,
    Cancelled { scanned: usize },
}

/// One forward-path lookup. Drive it with [`ForwardScan::run`].
pub struct ForwardScan<'a> {
    mailbox: &'a str,
    target: &'a MessageId,
    state: ScanState,
}

impl<'a> ForwardScan<'a> {
    pub fn new(mailbox: &'a str, target: &'a MessageId) -> Self {
        ForwardScan {
            mailbox,
            target,
            state: ScanState::Scanning { scanned: 0 },
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    fn transition(&mut self, next: ScanState) {
        debug!("Forward scan for {}: {:?} -> {:?}", self.target, self.state, next);
        self.state = next;
    }

    /// Enumerate the mailbox, compare each envelope's id to the target, and
    /// fetch the full message for the first exact match.
    pub fn run<S, C>(&mut self, store: &mut S, cancel: &Cancellation<C>) -> Result<Message>
    where
        S: MailStore,
        C: Clock,
    {
        let result = self.scan(store, cancel);
        if result.is_err() && !matches!(self.state, ScanState::Cancelled { .. }) {
            self.transition(ScanState::Failed);
        }
        result
    }

    fn scan<S, C>(&mut self, store: &mut S, cancel: &Cancellation<C>) -> Result<Message>
    where
        S: MailStore,
        C: Clock,
    {
        let uids = store.search(self.mailbox, Selector::All)?;
        info!("Scanning {} envelopes in '{}' for {}", uids.len(), self.mailbox, self.target);

        let mut scanned = 0;
        let mut found = None;
        for uid in uids {
            if cancel.is_expired() {
                self.transition(ScanState::Cancelled { scanned });
                return Err(Error::Cancelled { scanned });
            }
            let envelope = store.fetch_envelope(self.mailbox, uid)?;
            scanned += 1;
            self.state = ScanState::Scanning { scanned };

            if envelope.is_some_and(|m| &m.id == self.target) {
                found = Some(uid);
                break;
            }
        }

        let Some(uid) = found else {
            self.transition(ScanState::Exhausted { scanned });
            return Err(Error::NotFound(self.target.to_string()));
        };
        self.transition(ScanState::Found { uid });

        if cancel.is_expired() {
            self.transition(ScanState::Cancelled { scanned });
            return Err(Error::Cancelled { scanned });
        }
        self.transition(ScanState::FetchingFull { uid });
        let message = store
            .fetch_full(self.mailbox, uid)?
            .ok_or_else(|| Error::NotFound(self.target.to_string()))?;

        self.transition(ScanState::Done { uid });
        Ok(message)
    }
}
