// src/imap_store.rs
//
// MailStore over a blocking IMAP session (imap + native-tls).

use chrono::Utc;
use eyre::{eyre, Result};
use std::collections::HashMap;
use imap::types::Fetch;
use imap::Session;
use log::{debug, info, warn};
use native_tls::{TlsConnector, TlsStream};
use std::net::TcpStream;

use crate::cfg::config::Config;
use crate::message::Message;
use crate::store::{MailStore, Selector};
use crate::utils::parse_gmail_thread_ids;

const ENVELOPE_QUERY: &str = "(UID INTERNALDATE RFC822.HEADER)";
const FULL_QUERY: &str = "(UID INTERNALDATE RFC822)";

/// One logged-in IMAP session. Logs out when dropped.
pub struct ImapStore {
    session: Session<TlsStream<TcpStream>>,
    selected: Option<String>,
    gmail_extensions: bool,
    logged_out: bool,
}

impl ImapStore {
    pub fn connect(config: &Config) -> Result<Self> {
        let domain = config.imap_domain()?;
        let (username, password) = config.credentials()?;

        info!("Connecting to {}:{}", domain, config.imap_port);
        let tls = TlsConnector::builder().build()?;
        let client = imap::connect((domain, config.imap_port), domain, &tls)
            .map_err(|e| eyre!("Failed to connect to {}: {}", domain, e))?;
        let session = client
            .login(username, password)
            .map_err(|(e, _)| eyre!("Login failed for {}: {}", username, e))?;
        info!("Logged in as {}", username);

        Ok(ImapStore {
            session,
            selected: None,
            gmail_extensions: config.gmail_extensions,
            logged_out: false,
        })
    }

    pub fn logout(mut self) -> Result<()> {
        self.logged_out = true;
        self.session.logout()?;
        Ok(())
    }

    fn select(&mut self, mailbox: &str) -> Result<()> {
        if self.selected.as_deref() != Some(mailbox) {
            let mb = self
                .session
                .select(mailbox)
                .map_err(|e| eyre!("Failed to select '{}': {}", mailbox, e))?;
            debug!("Selected '{}' - {} messages", mailbox, mb.exists);
            self.selected = Some(mailbox.to_string());
        }
        Ok(())
    }

    /// One parse result per returned record; callers decide whether a bad
    /// record is skipped or fatal.
    fn fetch_uids(&mut self, uids: &[u32], full: bool) -> Result<Vec<Result<Message>>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let uid_set = uids.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
        let query = if full { FULL_QUERY } else { ENVELOPE_QUERY };
        debug!("UID FETCH {} {}", uid_set, query);

        let fetches = self.session.uid_fetch(&uid_set, query)?;
        debug!("FETCH returned {} records", fetches.len());

        let mut thread_ids = if self.gmail_extensions {
            self.fetch_thread_ids(&uid_set)?
        } else {
            HashMap::new()
        };

        Ok(fetches
            .iter()
            .map(|fetch| to_message(fetch, full, &mut thread_ids))
            .collect())
    }

    /// X-GM-THRID per UID. The typed FETCH parser rejects Gmail attributes,
    /// so this runs as a separate command over the raw response.
    fn fetch_thread_ids(&mut self, uid_set: &str) -> Result<HashMap<u32, String>> {
        let raw = self
            .session
            .run_command_and_read_response(format!("UID FETCH {} (X-GM-THRID)", uid_set))
            .map_err(|e| eyre!("X-GM-THRID fetch failed: {}", e))?;
        let ids = parse_gmail_thread_ids(&String::from_utf8_lossy(&raw));
        debug!("X-GM-THRID known for {} messages", ids.len());
        Ok(ids)
    }

    fn fetch_one(&mut self, mailbox: &str, uid: u32, full: bool) -> Result<Option<Message>> {
        self.select(mailbox)?;
        self.fetch_uids(&[uid], full)?.into_iter().next().transpose()
    }
}

fn to_message(fetch: &Fetch, full: bool, thread_ids: &mut HashMap<u32, String>) -> Result<Message> {
    let uid = fetch.uid.ok_or_else(|| eyre!("FETCH seq {} carried no UID", fetch.message))?;
    let internal_date = fetch.internal_date().map(|d| d.with_timezone(&Utc));
    let thread_id = thread_ids.remove(&uid);

    if full {
        let body = fetch.body().ok_or_else(|| eyre!("Empty fetched body for UID {}", uid))?;
        Message::from_source(uid, body.to_vec(), internal_date, thread_id)
    } else {
        let header = fetch.header().ok_or_else(|| eyre!("Empty fetched header for UID {}", uid))?;
        Message::from_envelope(uid, header, internal_date, thread_id)
    }
}

impl Drop for ImapStore {
    fn drop(&mut self) {
        if !self.logged_out {
            if let Err(e) = self.session.logout() {
                debug!("Logout on drop failed: {}", e);
            }
        }
    }
}

impl MailStore for ImapStore {
    fn search(&mut self, mailbox: &str, selector: Selector) -> Result<Vec<u32>> {
        self.select(mailbox)?;
        let mut uids: Vec<u32> = self.session.uid_search("ALL")?.into_iter().collect();
        uids.sort_unstable();
        debug!("SEARCH returned {} messages in '{}'", uids.len(), mailbox);

        if let Selector::Last(n) = selector {
            let skip = uids.len().saturating_sub(n);
            uids.drain(..skip);
        }
        Ok(uids)
    }

    /// Listing tolerates individual unparseable records.
    fn fetch_envelopes(&mut self, mailbox: &str, selector: Selector) -> Result<Vec<Message>> {
        let uids = self.search(mailbox, selector)?;
        let mut out = Vec::with_capacity(uids.len());
        for parsed in self.fetch_uids(&uids, false)? {
            match parsed {
                Ok(msg) => out.push(msg),
                Err(e) => warn!("Skipping unparseable FETCH record: {}", e),
            }
        }
        Ok(out)
    }

    fn fetch_envelope(&mut self, mailbox: &str, uid: u32) -> Result<Option<Message>> {
        self.fetch_one(mailbox, uid, false)
    }

    fn fetch_full(&mut self, mailbox: &str, uid: u32) -> Result<Option<Message>> {
        self.fetch_one(mailbox, uid, true)
    }
}
