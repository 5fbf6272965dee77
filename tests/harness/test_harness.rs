// tests/harness/test_harness.rs
//
// High-level test harness combining all components.
// Provides a convenient API for writing integration tests.

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

use mailthread::scan::Cancellation;

use crate::harness::fixtures::FixtureLoader;
use crate::harness::mock_client::MockMailStore;
use crate::harness::mock_transport::RecordingTransport;
use crate::harness::virtual_clock::VirtualClock;
use crate::harness::virtual_mailbox::{MailboxMessage, VirtualMailbox};

pub struct TestHarness {
    pub mailbox: Arc<RwLock<VirtualMailbox>>,
    pub clock: VirtualClock,
    pub store: MockMailStore,
    pub transport: RecordingTransport,
    loader: FixtureLoader,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::at_time(Utc::now())
    }

    /// Create a test harness with a specific starting time.
    pub fn at_time(time: DateTime<Utc>) -> Self {
        let mailbox = Arc::new(RwLock::new(VirtualMailbox::new()));
        let clock = VirtualClock::at(time);
        let store = MockMailStore::new(Arc::clone(&mailbox), clock.clone());

        Self {
            mailbox,
            clock,
            store,
            transport: RecordingTransport::new(),
            loader: FixtureLoader::new(),
        }
    }

    /// Add a message directly to the account.
    pub fn add_message(&mut self, message: MailboxMessage) -> u32 {
        self.mailbox.write().unwrap().add_message(message)
    }

    /// Load a fixture email and add it to the account.
    pub fn add_fixture(&mut self, fixture_path: &str) -> u32 {
        let fixture = self
            .loader
            .load_email(fixture_path)
            .unwrap_or_else(|e| panic!("fixture {}: {}", fixture_path, e));
        self.add_message(fixture.message)
    }

    /// Load every fixture in a directory, in filename order.
    pub fn add_fixture_dir(&mut self, dir: &str) -> Vec<u32> {
        let fixtures = self
            .loader
            .load_directory(dir)
            .unwrap_or_else(|e| panic!("fixture dir {}: {}", dir, e));
        fixtures.into_iter().map(|f| self.add_message(f.message)).collect()
    }

    /// Cancellation reading this harness's virtual clock.
    pub fn cancellation(&self) -> Cancellation<VirtualClock> {
        Cancellation::new(self.clock.clone())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
