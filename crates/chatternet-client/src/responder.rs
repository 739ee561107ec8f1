//! Demo/offline auto-responder.
//!
//! When enabled and the peer is the designated demo contact, a send
//! schedules a canned reply from that contact after a fixed delay, purely to
//! exercise the UI without a live backend.  It never applies to real peers
//! and is off unless explicitly constructed enabled.

use std::time::Duration;

use chatternet_shared::constants::{DEMO_CONTACT_HANDLE, DEMO_REPLY_DELAY_MS};
use chatternet_shared::types::UserId;

#[derive(Debug, Clone)]
pub struct DemoResponder {
    enabled: bool,
    contact: UserId,
    delay: Duration,
}

impl DemoResponder {
    /// An enabled responder bound to the built-in demo contact.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            contact: UserId::from(DEMO_CONTACT_HANDLE),
            delay: Duration::from_millis(DEMO_REPLY_DELAY_MS),
        }
    }

    /// A responder that never fires.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            contact: UserId::from(DEMO_CONTACT_HANDLE),
            delay: Duration::from_millis(DEMO_REPLY_DELAY_MS),
        }
    }

    /// Override the reply delay (tests use a short one).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether a send to `peer` should schedule a canned reply.
    pub fn applies_to(&self, peer: &UserId) -> bool {
        self.enabled && peer == &self.contact
    }

    /// The canned reply: the demo contact echoes the sent text back.
    pub fn canned_reply(&self, text: &str) -> String {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fires_for_the_demo_contact_when_enabled() {
        let responder = DemoResponder::enabled();
        assert!(responder.applies_to(&UserId::from(DEMO_CONTACT_HANDLE)));
        assert!(!responder.applies_to(&UserId::from("alice")));

        let off = DemoResponder::disabled();
        assert!(!off.applies_to(&UserId::from(DEMO_CONTACT_HANDLE)));
    }

    #[test]
    fn reply_echoes_the_text() {
        assert_eq!(DemoResponder::enabled().canned_reply("hi"), "hi");
    }
}
