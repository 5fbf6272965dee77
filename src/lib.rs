// src/lib.rs
//
// Library entry point for mailthread.
// Re-exports modules needed by the binary and integration tests.

pub mod cfg;
pub mod cli;
pub mod compose;
pub mod correlate;
pub mod error;
pub mod gateway;
pub mod ident;
pub mod imap_store;
pub mod message;
pub mod scan;
pub mod smtp;
pub mod store;
pub mod thread;
pub mod utils;

pub use error::{Error, Result};
pub use ident::MessageId;
pub use message::Message;
pub use store::{Clock, MailStore, MailTransport, RealClock};
