//! The checkout session state machine.
//!
//! A [`PollSession`] owns one checkout from presentation to outcome. It
//! asks its [`Verifier`] whether the payment has settled, sleeps for the
//! tick interval, and asks again, until a check is conclusive, the
//! session's deadline passes, or the merchant cancels. Progress is
//! broadcast as [`SessionEvent`]s; the final state is also the return
//! value of [`PollSession::run`].
//!
//! Cancellation and the deadline always win over a verification attempt
//! that is still in flight: the attempt is dropped and its result, if
//! it ever existed, is never applied.

use crate::event::{create_event_channel, SessionEvent, SessionEventsChannel, SessionEventsSender};
use crate::request::PaymentRequest;
use crate::verify::{VerificationResult, Verifier};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, sleep_until};
use tracing::{debug, info, warn};

/// Timing for a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Delay between verification attempts.
    pub tick_interval: Duration,
    /// How long the session waits in total before giving up.
    pub timeout: Duration,
}

impl SessionConfig {
    /// Build a config from millisecond values.
    #[must_use]
    pub const fn from_millis(tick_interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            tick_interval: Duration::from_millis(tick_interval_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_millis(3000, 180_000)
    }
}

/// Where a checkout session stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the payment to settle.
    AwaitingPayment,
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

impl SessionState {
    /// Whether the session has reached an outcome.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::AwaitingPayment)
    }

    /// The state after applying one verification result.
    ///
    /// Terminal states absorb every result; once a session has an
    /// outcome, nothing changes it.
    #[must_use]
    pub fn apply(&self, result: &VerificationResult) -> Self {
        if self.is_terminal() {
            return self.clone();
        }
        match result {
            VerificationResult::Pending | VerificationResult::TransientError { .. } => {
                Self::AwaitingPayment
            }
            VerificationResult::Confirmed { signature } => Self::Verified {
                signature: signature.clone(),
            },
            VerificationResult::Invalid { signature } => Self::Rejected {
                signature: signature.clone(),
            },
        }
    }
}

/// Handle for cancelling a checkout from outside the session.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Ask the session to stop. Safe to call more than once; after the
    /// session has finished it has no effect.
    pub fn cancel(&self) {
        if let Err(e) = self.cancel_tx.send(true) {
            debug!("Cancel requested after the session ended: {e}");
        }
    }
}

/// A checkout session polling for its payment.
pub struct PollSession {
    request: PaymentRequest,
    config: SessionConfig,
    verifier: Arc<dyn Verifier>,
    state: SessionState,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
    events_tx: SessionEventsSender,
    events_rx: Option<SessionEventsChannel>,
}

impl PollSession {
    /// Create a session for `request`, checked through `verifier`.
    #[must_use]
    pub fn new(request: PaymentRequest, verifier: Arc<dyn Verifier>, config: SessionConfig) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (events_tx, events_rx) = create_event_channel();
        Self {
            request,
            config,
            verifier,
            state: SessionState::AwaitingPayment,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// The request this session is waiting on.
    #[must_use]
    pub fn request(&self) -> &PaymentRequest {
        &self.request
    }

    /// The session's current state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Get a receiver for session events.
    ///
    /// Note: Can only be called once. Subsequent calls return None.
    pub fn events(&mut self) -> Option<SessionEventsChannel> {
        self.events_rx.take()
    }

    /// Subscribe to session events.
    #[must_use]
    pub fn subscribe_events(&self) -> SessionEventsChannel {
        self.events_tx.subscribe()
    }

    /// Get a handle that can cancel this session.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancel_tx: Arc::clone(&self.cancel_tx),
        }
    }

    /// Run the session to its outcome.
    ///
    /// The deadline is anchored at the request's creation, so a
    /// request held for a while before running only gets the rest of
    /// its window. It covers time spent inside verification attempts;
    /// an attempt still in flight when the deadline passes is dropped,
    /// not awaited.
    pub async fn run(mut self) -> SessionState {
        info!(
            "Starting checkout session for reference {}",
            self.request.reference
        );

        let expected = self.request.expectation();
        let verifier = Arc::clone(&self.verifier);
        let mut cancel_rx = self.cancel_rx.clone();
        let deadline = self.request.created + self.config.timeout;
        let mut checks: u32 = 0;

        self.emit(SessionEvent::AwaitingPayment { checks });

        while !self.state.is_terminal() {
            tokio::select! {
                biased;

                _ = cancel_rx.changed() => {
                    if *cancel_rx.borrow() {
                        info!("Checkout cancelled by the merchant");
                        self.state = SessionState::Cancelled;
                    }
                }
                _ = sleep_until(deadline) => {
                    info!("Checkout timed out after {checks} checks");
                    self.state = SessionState::TimedOut;
                }
                result = verifier.verify(&expected) => {
                    checks = checks.saturating_add(1);
                    debug!("Verification check {checks} returned {result:?}");
                    self.state = self.state.apply(&result);

                    if !self.state.is_terminal() {
                        self.emit(SessionEvent::AwaitingPayment { checks });

                        // Same precedence while waiting out the tick
                        // interval: cancellation and the deadline cut
                        // the sleep short.
                        tokio::select! {
                            biased;

                            _ = cancel_rx.changed() => {
                                if *cancel_rx.borrow() {
                                    info!("Checkout cancelled by the merchant");
                                    self.state = SessionState::Cancelled;
                                }
                            }
                            _ = sleep_until(deadline) => {
                                info!("Checkout timed out after {checks} checks");
                                self.state = SessionState::TimedOut;
                            }
                            _ = sleep(self.config.tick_interval) => {}
                        }
                    }
                }
            }
        }

        match &self.state {
            SessionState::Verified { signature } => {
                info!("Payment verified: {signature}");
                self.emit(SessionEvent::Verified {
                    signature: signature.clone(),
                });
            }
            SessionState::Rejected { signature } => {
                info!("Payment rejected: {signature}");
                self.emit(SessionEvent::Rejected {
                    signature: signature.clone(),
                });
            }
            SessionState::TimedOut => self.emit(SessionEvent::TimedOut),
            SessionState::Cancelled => self.emit(SessionEvent::Cancelled),
            SessionState::AwaitingPayment => {}
        }

        self.state
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(e) = self.events_tx.send(event) {
            warn!("Failed to send session event: {e}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_documented_timings() {
        let config = SessionConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(3));
        assert_eq!(config.timeout, Duration::from_secs(180));
    }

    #[test]
    fn inconclusive_results_keep_the_session_waiting() {
        let state = SessionState::AwaitingPayment;
        let state = state.apply(&VerificationResult::Pending);
        assert_eq!(state, SessionState::AwaitingPayment);
        let state = state.apply(&VerificationResult::TransientError {
            detail: "timeout".into(),
        });
        assert_eq!(state, SessionState::AwaitingPayment);
    }

    #[test]
    fn a_confirmed_result_verifies_the_session() {
        let state = SessionState::AwaitingPayment.apply(&VerificationResult::Confirmed {
            signature: "sig123".into(),
        });
        assert_eq!(
            state,
            SessionState::Verified {
                signature: "sig123".into()
            }
        );
    }

    #[test]
    fn an_invalid_result_rejects_the_session() {
        let state = SessionState::AwaitingPayment.apply(&VerificationResult::Invalid {
            signature: "sig456".into(),
        });
        assert_eq!(
            state,
            SessionState::Rejected {
                signature: "sig456".into()
            }
        );
    }

    #[test]
    fn terminal_states_absorb_every_result() {
        for terminal in [
            SessionState::Verified {
                signature: "sig123".into(),
            },
            SessionState::Rejected {
                signature: "sig456".into(),
            },
            SessionState::TimedOut,
            SessionState::Cancelled,
        ] {
            let next = terminal.apply(&VerificationResult::Confirmed {
                signature: "other".into(),
            });
            assert_eq!(next, terminal);
            let next = terminal.apply(&VerificationResult::Pending);
            assert_eq!(next, terminal);
        }
    }
}
