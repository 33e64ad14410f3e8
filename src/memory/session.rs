//! In-process session with a bounded delivery queue.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::Session;
use crate::protocol::{Packet, SessionState, SessionStateMachine};

/// Session backed by a FIFO queue.
///
/// When the queue is full the oldest packet is dropped. Pollers are woken on
/// every enqueue and on disconnect.
#[derive(Debug)]
pub struct MemorySession {
    id: String,
    state: SessionStateMachine,
    queue: Mutex<VecDeque<Packet>>,
    max_queue_size: usize,
    notify: Notify,
    last_contact: Mutex<Instant>,
    in_flight: AtomicUsize,
}

/// Marks a request as being processed for as long as it is held.
///
/// A session with a held guard is never idle, however long its connect waits.
#[derive(Debug)]
pub struct InFlight<'a> {
    session: &'a MemorySession,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.session.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.session.touch();
    }
}

impl MemorySession {
    /// Create a session with a fresh id
    pub fn new(max_queue_size: usize) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), max_queue_size)
    }

    /// Create a session with a caller-chosen id
    pub fn with_id(id: impl Into<String>, max_queue_size: usize) -> Self {
        Self {
            id: id.into(),
            state: SessionStateMachine::new(),
            queue: Mutex::new(VecDeque::new()),
            max_queue_size: max_queue_size.max(1),
            notify: Notify::new(),
            last_contact: Mutex::new(Instant::now()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Queue a packet for the next poll
    pub fn enqueue(&self, packet: Packet) {
        {
            let mut queue = self.queue();
            if queue.len() >= self.max_queue_size {
                queue.pop_front();
                warn!(
                    session = %self.id,
                    capacity = self.max_queue_size,
                    "Session queue full, dropped oldest packet"
                );
            }
            queue.push_back(packet);
        }
        self.notify.notify_one();
    }

    /// Packets waiting to be polled
    pub fn queue_len(&self) -> usize {
        self.queue().len()
    }

    /// Record client activity
    pub fn touch(&self) {
        *lock(&self.last_contact) = Instant::now();
    }

    /// Time since the last recorded activity
    pub fn idle_for(&self) -> Duration {
        lock(&self.last_contact).elapsed()
    }

    /// Record activity and hold the session busy until the guard drops
    pub fn begin_request(&self) -> InFlight<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.touch();
        InFlight { session: self }
    }

    /// Whether a request is currently being processed
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    /// Idle for longer than `max_idle` with nothing in flight
    pub fn is_idle(&self, max_idle: Duration) -> bool {
        !self.is_busy() && self.idle_for() > max_idle
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Packet>> {
        lock(&self.queue)
    }

    fn pop(&self) -> Option<Packet> {
        self.queue().pop_front()
    }
}

impl Session for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> SessionState {
        self.state.state()
    }

    fn complete_handshake(&self) {
        if self.state.complete_handshake() {
            debug!(session = %self.id, "Handshake completed");
        }
    }

    fn complete_connection(&self) {
        if self.state.complete_connection() {
            debug!(session = %self.id, "Connection completed");
        }
    }

    fn complete_disconnect(&self) {
        if self.state.complete_disconnect() {
            debug!(session = %self.id, "Disconnected");
            self.notify.notify_waiters();
        }
    }

    fn poll(&self, timeout: Duration) -> Pin<Box<dyn Future<Output = Option<Packet>> + Send + '_>> {
        Box::pin(async move {
            let deadline = Instant::now() + timeout;

            loop {
                // Register before checking so an enqueue in between is not missed
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if let Some(packet) = self.pop() {
                    return Some(packet);
                }
                if self.state() == SessionState::Disconnected {
                    return None;
                }
                if tokio::time::timeout_at(deadline, notified).await.is_err() {
                    return self.pop();
                }
            }
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::protocol::{Message, Route};

    fn packet(n: i64) -> Packet {
        Packet::delivery("p", Route::parse("/foo").unwrap(), Message::new().with("data", n))
    }

    fn data(packet: &Packet) -> i64 {
        packet.first().and_then(|m| m.data()).and_then(|d| d.as_i64()).unwrap()
    }

    #[test]
    fn test_ids_are_unique() {
        let a = MemorySession::new(4);
        let b = MemorySession::new(4);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.state(), SessionState::Handshaking);
    }

    #[tokio::test]
    async fn test_poll_is_fifo() {
        let session = MemorySession::new(4);
        session.enqueue(packet(1));
        session.enqueue(packet(2));

        assert_eq!(data(&session.poll(Duration::ZERO).await.unwrap()), 1);
        assert_eq!(data(&session.poll(Duration::ZERO).await.unwrap()), 2);
        assert!(session.poll(Duration::ZERO).await.is_none());
    }

    #[tokio::test]
    async fn test_full_queue_drops_oldest() {
        let session = MemorySession::new(2);
        session.enqueue(packet(1));
        session.enqueue(packet(2));
        session.enqueue(packet(3));

        assert_eq!(session.queue_len(), 2);
        assert_eq!(data(&session.poll(Duration::ZERO).await.unwrap()), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out() {
        let session = MemorySession::new(4);
        let start = Instant::now();

        assert!(session.poll(Duration::from_millis(250)).await.is_none());
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_wakes_on_enqueue() {
        let session = Arc::new(MemorySession::new(4));
        let producer = session.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            producer.enqueue(packet(7));
        });

        let start = Instant::now();
        let packet = session.poll(Duration::from_secs(10)).await.unwrap();
        assert_eq!(data(&packet), 7);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_wakes_on_disconnect() {
        let session = Arc::new(MemorySession::new(4));
        let other = session.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            other.complete_disconnect();
        });

        let start = Instant::now();
        assert!(session.poll(Duration::from_secs(10)).await.is_none());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_tracking() {
        let session = MemorySession::new(4);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(session.idle_for() >= Duration::from_secs(5));

        session.touch();
        assert!(session.idle_for() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_request_is_never_idle() {
        let session = MemorySession::new(4);
        let max_idle = Duration::from_secs(1);

        let guard = session.begin_request();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(session.is_busy());
        assert!(!session.is_idle(max_idle));

        drop(guard);
        assert!(!session.is_busy());
        assert!(!session.is_idle(max_idle));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(session.is_idle(max_idle));
    }
}
