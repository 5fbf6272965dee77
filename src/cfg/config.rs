// src/cfg/config.rs

use chrono::Duration;
use eyre::{eyre, Result};
use log::{debug, error};
use secure_string::SecureString;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::parse_timeout;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(alias = "imap-domain")]
    pub imap_domain: Option<String>,

    #[serde(alias = "imap-port", default = "default_imap_port")]
    pub imap_port: u16,

    #[serde(alias = "smtp-domain")]
    pub smtp_domain: Option<String>,

    #[serde(alias = "smtp-port", default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecureString>,

    /// Mailbox listed by `inbox`, `threads`, `thread` and searched by `reply`.
    #[serde(default = "default_inbox")]
    pub inbox: String,

    /// Mailbox scanned when forwarding; Gmail's All Mail sees every label.
    #[serde(alias = "scan-mailbox", default = "default_scan_mailbox")]
    pub scan_mailbox: String,

    #[serde(alias = "inbox-limit", default = "default_inbox_limit")]
    pub inbox_limit: usize,

    #[serde(alias = "scan-timeout", default = "default_scan_timeout", deserialize_with = "deserialize_timeout")]
    pub scan_timeout: Duration,

    /// Ask the server for X-GM-THRID on every fetch.
    #[serde(alias = "gmail-extensions", default = "default_true")]
    pub gmail_extensions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            imap_domain: None,
            imap_port: default_imap_port(),
            smtp_domain: None,
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            inbox: default_inbox(),
            scan_mailbox: default_scan_mailbox(),
            inbox_limit: default_inbox_limit(),
            scan_timeout: default_scan_timeout(),
            gmail_extensions: true,
        }
    }
}

impl Config {
    /// Username and password, both required to open a session.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let user = self
            .username
            .as_deref()
            .ok_or_else(|| eyre!("No username configured (set `username` or IMAP_USERNAME)"))?;
        let pass = self
            .password
            .as_ref()
            .map(|p| p.unsecure())
            .ok_or_else(|| eyre!("No password configured (set `password` or IMAP_PASSWORD)"))?;
        Ok((user, pass))
    }

    pub fn imap_domain(&self) -> Result<&str> {
        self.imap_domain
            .as_deref()
            .ok_or_else(|| eyre!("No IMAP domain configured (set `imap-domain` or IMAP_DOMAIN)"))
    }

    pub fn smtp_domain(&self) -> Result<&str> {
        self.smtp_domain
            .as_deref()
            .ok_or_else(|| eyre!("No SMTP domain configured (set `smtp-domain` or SMTP_DOMAIN)"))
    }
}

pub fn load_config(config_path: &Path) -> Result<Config> {
    debug!("Loading configuration from {:?}", config_path);

    let content = fs::read_to_string(config_path).map_err(|e| {
        error!("Failed to read config file {}: {}", config_path.display(), e);
        eyre!("Failed to read config file {}: {}", config_path.display(), e)
    })?;

    let cfg: Config = serde_yaml::from_str(&content).map_err(|e| {
        error!("Failed to parse YAML: {}", e);
        eyre!("Failed to parse YAML: {}", e)
    })?;

    debug!("Successfully loaded configuration");
    Ok(cfg)
}

/// The explicit path if it exists, else `~/.config/mailthread/mailthread.yml`
/// if that exists.
pub fn locate_config(explicit: &Path) -> Option<PathBuf> {
    if explicit.exists() {
        return Some(explicit.to_path_buf());
    }
    dirs::config_dir()
        .map(|dir| dir.join("mailthread").join("mailthread.yml"))
        .filter(|p| p.exists())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecureString>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.map(SecureString::from))
}

fn deserialize_timeout<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timeout(&raw).map_err(de::Error::custom)
}

fn default_imap_port() -> u16 {
    993
}

fn default_smtp_port() -> u16 {
    465
}

fn default_inbox() -> String {
    "INBOX".to_string()
}

fn default_scan_mailbox() -> String {
    "[Gmail]/All Mail".to_string()
}

fn default_inbox_limit() -> usize {
    5
}

fn default_scan_timeout() -> Duration {
    Duration::seconds(30)
}

fn default_true() -> bool {
    true
}
