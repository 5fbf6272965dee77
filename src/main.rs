use clap::Parser;
use env_logger::Builder;
use eyre::Result;
use log::{debug, LevelFilter};
use serde::Serialize;

use mailthread::cfg::config::{load_config, locate_config, Config};
use mailthread::cli::{Cli, Command};
use mailthread::compose::OutgoingMessage;
use mailthread::gateway::{self, ReplyRequest};
use mailthread::ident::MessageId;
use mailthread::imap_store::ImapStore;
use mailthread::scan::Cancellation;
use mailthread::smtp::SmtpSubmitter;
use mailthread::store::RealClock;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = Builder::new();
    builder.parse_default_env();
    if cli.debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.try_init().ok();

    let config = resolve_config(&cli)?;
    run(cli.command, &config)
}

/// File settings first, then CLI flags / environment on top.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match locate_config(&cli.config) {
        Some(path) => load_config(&path)?,
        None => {
            debug!("No config file found; using defaults and command-line values");
            Config::default()
        }
    };

    if let Some(domain) = &cli.imap_domain {
        config.imap_domain = Some(domain.clone());
    }
    if let Some(domain) = &cli.smtp_domain {
        config.smtp_domain = Some(domain.clone());
    }
    if let Some(user) = &cli.imap_username {
        config.username = Some(user.clone());
    }
    if let Some(pass) = &cli.imap_password {
        config.password = Some(pass.clone());
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Inbox { limit } => {
            let mut store = ImapStore::connect(config)?;
            let entries = gateway::inbox(&mut store, &config.inbox, limit.unwrap_or(config.inbox_limit))?;
            store.logout()?;
            print_json(&entries)
        }
        Command::Threads => {
            let mut store = ImapStore::connect(config)?;
            let threads = gateway::threads(&mut store, &config.inbox)?;
            store.logout()?;
            print_json(&threads)
        }
        Command::Thread { thread_id } => {
            let mut store = ImapStore::connect(config)?;
            let thread = gateway::thread(&mut store, &config.inbox, &thread_id)?;
            store.logout()?;
            print_json(&thread)
        }
        Command::Reply {
            message_id,
            text,
            html,
            to,
            subject,
        } => {
            let target = MessageId::parse(&message_id)?;
            let request = ReplyRequest {
                text,
                html,
                fallback_to: to,
                fallback_subject: subject,
            };
            let mut store = ImapStore::connect(config)?;
            let mut transport = SmtpSubmitter::connect(config)?;
            let outcome = gateway::reply(&mut store, &mut transport, &config.inbox, &target, &request)?;
            store.logout()?;
            print_json(&outcome)
        }
        Command::Forward { message_id, to } => {
            let target = MessageId::parse(&message_id)?;
            let cancel = Cancellation::new(RealClock).with_timeout(config.scan_timeout);
            let mut store = ImapStore::connect(config)?;
            let mut transport = SmtpSubmitter::connect(config)?;
            let outcome = gateway::forward(&mut store, &mut transport, &config.scan_mailbox, &target, to, &cancel)?;
            store.logout()?;
            print_json(&outcome)
        }
        Command::Send {
            to,
            cc,
            bcc,
            subject,
            text,
            html,
            in_reply_to,
            references,
        } => {
            let message = OutgoingMessage {
                to,
                cc,
                bcc,
                subject,
                text,
                html,
                attachments: Vec::new(),
            };
            let in_reply_to = in_reply_to.as_deref().map(MessageId::parse).transpose()?;
            let references = references
                .iter()
                .map(|r| MessageId::parse(r))
                .collect::<mailthread::Result<Vec<_>>>()?;
            let mut transport = SmtpSubmitter::connect(config)?;
            let submission = gateway::send(&mut transport, &message, in_reply_to, references)?;
            print_json(&submission)
        }
    }
}
