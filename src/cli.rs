// src/cli.rs

use clap::{Parser, Subcommand};
use secure_string::SecureString;
use std::path::PathBuf;

/// Command-line interface options for mailthread.
#[derive(Parser, Debug)]
#[command(
    name = "mailthread",
    version,
    about = "Threaded webmail over IMAP and SMTP",
    long_about = None
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "mailthread.yml")]
    pub config: PathBuf,

    /// IMAP server domain
    #[arg(short = 'D', long, env = "IMAP_DOMAIN")]
    pub imap_domain: Option<String>,

    /// SMTP server domain
    #[arg(short = 'S', long, env = "SMTP_DOMAIN")]
    pub smtp_domain: Option<String>,

    /// IMAP/SMTP username
    #[arg(short = 'U', long, env = "IMAP_USERNAME")]
    pub imap_username: Option<String>,

    /// IMAP/SMTP password
    #[arg(short = 'P', long, env = "IMAP_PASSWORD")]
    pub imap_password: Option<SecureString>,

    #[arg(short, long, help = "turn on debug logging")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the latest messages, newest first
    Inbox {
        /// How many messages to list (defaults to `inbox-limit`)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show every inbox message grouped into threads
    Threads,

    /// Show the tree for one thread id
    Thread {
        thread_id: String,
    },

    /// Reply to a message, threading onto the conversation when possible
    Reply {
        /// Message-ID to reply to (brackets and %-encoding accepted)
        message_id: String,

        #[arg(long, default_value = "")]
        text: String,

        #[arg(long)]
        html: Option<String>,

        /// Recipients if no parent message can be found
        #[arg(long)]
        to: Vec<String>,

        /// Subject if no parent message can be found
        #[arg(long, default_value = "")]
        subject: String,
    },

    /// Forward a message as an attachment
    Forward {
        message_id: String,

        #[arg(long, required = true)]
        to: Vec<String>,
    },

    /// Send a new message
    Send {
        #[arg(long, required = true)]
        to: Vec<String>,

        #[arg(long)]
        cc: Vec<String>,

        #[arg(long)]
        bcc: Vec<String>,

        #[arg(long, default_value = "")]
        subject: String,

        #[arg(long, default_value = "")]
        text: String,

        #[arg(long)]
        html: Option<String>,

        #[arg(long)]
        in_reply_to: Option<String>,

        #[arg(long)]
        references: Vec<String>,
    },
}
