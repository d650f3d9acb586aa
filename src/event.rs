//! Checkout session events.
//!
//! A session broadcasts its progress so presenters (the till UI, a
//! customer-facing display, a logger) can follow along without polling
//! the session. Events are fire-and-forget; a subscriber that falls
//! more than the channel capacity behind starts losing the oldest ones.

use tokio::sync::broadcast;

/// How many events a subscriber can lag behind before losing some.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session is waiting for the payment to settle. Emitted when
    /// the session starts and again after every inconclusive check.
    AwaitingPayment {
        /// How many verification attempts have completed so far.
        checks: u32,
    },
    /// A settled transaction matched the request in full.
    Verified {
        /// Signature of the settling transaction.
        signature: String,
    },
    /// A settled transaction claimed the reference but did not match.
    Rejected {
        /// Signature of the offending transaction.
        signature: String,
    },
    /// The session gave up waiting.
    TimedOut,
    /// The merchant cancelled the checkout.
    Cancelled,
}

/// Sender half of a session's event channel.
pub type SessionEventsSender = broadcast::Sender<SessionEvent>;

/// Receiver half of a session's event channel.
pub type SessionEventsChannel = broadcast::Receiver<SessionEvent>;

/// Create the broadcast channel a session announces itself on.
#[must_use]
pub fn create_event_channel() -> (SessionEventsSender, SessionEventsChannel) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}
