//! Long-poll wait for `/meta/connect`.
//!
//! The connect response is held while the session's queue is drained. The
//! first wait lasts `interval`, every later wait lasts whatever remains of
//! `timeout` measured from the start of the loop:
//!
//! ```text
//! start                                            start + timeout
//!   |--- interval ---|--------- remaining ------------|
//!   poll             poll (woken by delivery)  poll   done
//! ```
//!
//! The wait ends early when the transport cancels the request or the session
//! is disconnected.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::api::{Protocol, Session};
use crate::protocol::advice::{INTERVAL, TIMEOUT};
use crate::protocol::{Message, SessionState};

/// Negotiated long-poll window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongPollTiming {
    /// Total time to hold the connect, in milliseconds
    pub timeout_ms: i64,
    /// Length of the first wait, in milliseconds
    pub interval_ms: i64,
}

impl LongPollTiming {
    /// Negotiate against the protocol defaults.
    ///
    /// A positive protocol timeout is a floor: clients may ask to be held
    /// longer, never shorter. With no protocol timeout the client's request
    /// stands, clamped at zero. The interval is the client's numeric
    /// `advice.interval` if present, else the protocol default.
    pub fn negotiate(protocol: &dyn Protocol, request: &Message) -> Self {
        let default_timeout = protocol.long_poll_timeout_ms();
        let requested = request.advice_millis(TIMEOUT).unwrap_or(default_timeout);

        let timeout_ms = if default_timeout > 0 {
            default_timeout.max(requested)
        } else {
            requested.max(0)
        };

        let interval_ms = request
            .advice_millis(INTERVAL)
            .unwrap_or_else(|| protocol.long_poll_interval_ms())
            .max(0);

        Self {
            timeout_ms,
            interval_ms,
        }
    }

    /// Timeout as a duration
    pub fn timeout(&self) -> Duration {
        millis(self.timeout_ms)
    }

    /// Interval as a duration
    pub fn interval(&self) -> Duration {
        millis(self.interval_ms)
    }
}

/// Long-poll coordinator for one connect
#[derive(Debug, Clone, Copy)]
pub struct LongPoll {
    timing: LongPollTiming,
}

impl LongPoll {
    /// Create a coordinator for the negotiated window
    pub fn new(timing: LongPollTiming) -> Self {
        Self { timing }
    }

    /// Negotiated window
    pub fn timing(&self) -> LongPollTiming {
        self.timing
    }

    /// Drain the session's queue until the window closes.
    ///
    /// Returns every message received, in arrival order. A packet already
    /// taken from the queue is never dropped by cancellation.
    pub async fn run(&self, session: &dyn Session, cancel: &CancellationToken) -> Vec<Message> {
        let start = Instant::now();
        let deadline = start + self.timing.timeout();
        let mut wait = self.timing.interval();
        let mut delivered = Vec::new();

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!(session = session.id(), "Long-poll cancelled");
                    break;
                }
                packet = session.poll(wait) => {
                    if let Some(packet) = packet {
                        trace!(
                            session = session.id(),
                            messages = packet.messages.len(),
                            "Long-poll received packet"
                        );
                        delivered.extend(packet.messages);
                    }
                }
            }

            if session.state() == SessionState::Disconnected {
                debug!(session = session.id(), "Session disconnected during long-poll");
                break;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            wait = remaining;
        }

        delivered
    }
}

fn millis(ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config::ProtocolConfig;
    use crate::memory::{MemorySession, TransportProtocol};
    use crate::protocol::{Packet, Route};

    fn protocol(timeout_ms: i64, interval_ms: i64) -> TransportProtocol {
        TransportProtocol::from(&ProtocolConfig::long_polling(
            "long-polling",
            &["long-polling"],
            timeout_ms,
            interval_ms,
        ))
    }

    fn with_advice(advice: serde_json::Value) -> Message {
        Message::new().with("advice", advice)
    }

    fn packet(n: i64) -> Packet {
        Packet::delivery(
            "sender",
            Route::parse("/foo").unwrap(),
            Message::new().with("data", n),
        )
    }

    fn assert_elapsed(start: Instant, expected_ms: u64) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(expected_ms)
                && elapsed < Duration::from_millis(expected_ms + 5),
            "elapsed {elapsed:?}, expected ~{expected_ms}ms"
        );
    }

    #[test]
    fn test_negotiate_defaults() {
        let timing = LongPollTiming::negotiate(&protocol(30_000, 0), &Message::new());
        assert_eq!(timing.timeout_ms, 30_000);
        assert_eq!(timing.interval_ms, 0);
    }

    #[test]
    fn test_negotiate_protocol_timeout_is_floor() {
        let p = protocol(30_000, 0);

        let shorter = with_advice(json!({"timeout": 1000}));
        assert_eq!(LongPollTiming::negotiate(&p, &shorter).timeout_ms, 30_000);

        let longer = with_advice(json!({"timeout": 45_000}));
        assert_eq!(LongPollTiming::negotiate(&p, &longer).timeout_ms, 45_000);
    }

    #[test]
    fn test_negotiate_without_protocol_timeout() {
        let p = protocol(0, 0);

        assert_eq!(LongPollTiming::negotiate(&p, &Message::new()).timeout_ms, 0);

        let requested = with_advice(json!({"timeout": 500}));
        assert_eq!(LongPollTiming::negotiate(&p, &requested).timeout_ms, 500);

        let negative = with_advice(json!({"timeout": -5}));
        assert_eq!(LongPollTiming::negotiate(&p, &negative).timeout_ms, 0);
    }

    #[test]
    fn test_negotiate_interval() {
        let p = protocol(1000, 250);
        assert_eq!(LongPollTiming::negotiate(&p, &Message::new()).interval_ms, 250);

        let requested = with_advice(json!({"interval": 10}));
        assert_eq!(LongPollTiming::negotiate(&p, &requested).interval_ms, 10);

        // non-numeric falls back to the default
        let bogus = with_advice(json!({"interval": "soon"}));
        assert_eq!(LongPollTiming::negotiate(&p, &bogus).interval_ms, 250);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_full_timeout() {
        let session = MemorySession::new(16);
        let poll = LongPoll::new(LongPollTiming {
            timeout_ms: 3000,
            interval_ms: 0,
        });

        let start = Instant::now();
        let messages = poll.run(&session, &CancellationToken::new()).await;

        assert!(messages.is_empty());
        assert_elapsed(start, 3000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_zero_timeout_returns_immediately() {
        let session = MemorySession::new(16);
        session.enqueue(packet(1));

        let poll = LongPoll::new(LongPollTiming {
            timeout_ms: 0,
            interval_ms: 0,
        });

        let start = Instant::now();
        let messages = poll.run(&session, &CancellationToken::new()).await;

        assert_eq!(messages.len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_collects_in_arrival_order() {
        let session = Arc::new(MemorySession::new(16));
        let poll = LongPoll::new(LongPollTiming {
            timeout_ms: 3000,
            interval_ms: 0,
        });

        let producer = {
            let session = session.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                session.enqueue(packet(1));
                tokio::time::sleep(Duration::from_millis(500)).await;
                session.enqueue(packet(2));
            })
        };

        let start = Instant::now();
        let messages = poll.run(&*session, &CancellationToken::new()).await;
        producer.await.unwrap();

        assert_elapsed(start, 3000);
        let data: Vec<_> = messages.iter().filter_map(Message::data).cloned().collect();
        assert_eq!(data, vec![json!(1), json!(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel() {
        let session = MemorySession::new(16);
        let cancel = CancellationToken::new();
        let poll = LongPoll::new(LongPollTiming {
            timeout_ms: 30_000,
            interval_ms: 0,
        });

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        poll.run(&session, &cancel).await;
        assert_elapsed(start, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_disconnect() {
        let session = Arc::new(MemorySession::new(16));
        session.complete_handshake();
        session.complete_connection();

        let poll = LongPoll::new(LongPollTiming {
            timeout_ms: 30_000,
            interval_ms: 0,
        });

        let disconnector = session.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            disconnector.complete_disconnect();
        });

        let start = Instant::now();
        poll.run(&*session, &CancellationToken::new()).await;
        assert_elapsed(start, 200);
    }
}
