//! Session lifecycle state machine.
//!
//! State only advances forward:
//!
//! ```text
//! [Handshaking] ──complete_handshake()──> [Handshook]
//!       [Handshook] ──complete_connection()──> [Connected]
//!            [any] ──complete_disconnect()──> [Disconnected]
//! ```
//!
//! [`SessionStateMachine`] stores the state in an atomic and exposes only the
//! three transitions, never a raw setter. Each transition is a single
//! compare-and-swap, so concurrent callers cannot move the state backwards.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Session lifecycle stage, ordered by progression
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    /// Created by the registry, no handshake yet
    Handshaking = 0,
    /// Handshake completed
    Handshook = 1,
    /// At least one successful connect
    Connected = 2,
    /// Terminal
    Disconnected = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Handshaking,
            1 => Self::Handshook,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }

    /// Handshake completed and not yet disconnected
    pub fn is_handshook(&self) -> bool {
        matches!(self, Self::Handshook | Self::Connected)
    }

    /// Connected and not yet disconnected
    pub fn is_connected(&self) -> bool {
        *self == Self::Connected
    }

    /// Lower-case name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Handshaking => "handshaking",
            Self::Handshook => "handshook",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Forward-only atomic session state
#[derive(Debug)]
pub struct SessionStateMachine {
    state: AtomicU8,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    /// Start in [`SessionState::Handshaking`]
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Handshaking as u8),
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// HANDSHAKING → HANDSHOOK. Returns whether the state changed.
    pub fn complete_handshake(&self) -> bool {
        self.advance(SessionState::Handshaking, SessionState::Handshook)
    }

    /// HANDSHOOK → CONNECTED. Returns whether the state changed.
    pub fn complete_connection(&self) -> bool {
        self.advance(SessionState::Handshook, SessionState::Connected)
    }

    /// Any live state → DISCONNECTED. Returns whether the state changed.
    pub fn complete_disconnect(&self) -> bool {
        let previous = self
            .state
            .swap(SessionState::Disconnected as u8, Ordering::AcqRel);
        previous != SessionState::Disconnected as u8
    }

    fn advance(&self, from: SessionState, to: SessionState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_forward_transitions() {
        let machine = SessionStateMachine::new();
        assert_eq!(machine.state(), SessionState::Handshaking);

        assert!(machine.complete_handshake());
        assert_eq!(machine.state(), SessionState::Handshook);

        assert!(machine.complete_connection());
        assert_eq!(machine.state(), SessionState::Connected);

        assert!(machine.complete_disconnect());
        assert_eq!(machine.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_transitions_never_go_backwards() {
        let machine = SessionStateMachine::new();

        // connection requires a completed handshake
        assert!(!machine.complete_connection());
        assert_eq!(machine.state(), SessionState::Handshaking);

        machine.complete_handshake();
        machine.complete_connection();
        assert!(!machine.complete_handshake());
        assert_eq!(machine.state(), SessionState::Connected);

        machine.complete_disconnect();
        assert!(!machine.complete_disconnect());
        assert!(!machine.complete_handshake());
        assert!(!machine.complete_connection());
        assert_eq!(machine.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_state_ordering() {
        assert!(SessionState::Handshaking < SessionState::Handshook);
        assert!(SessionState::Handshook < SessionState::Connected);
        assert!(SessionState::Connected < SessionState::Disconnected);
        assert_eq!(SessionState::Connected.to_string(), "connected");
    }

    #[test]
    fn test_disconnected_is_not_live() {
        assert!(!SessionState::Handshaking.is_handshook());
        assert!(SessionState::Handshook.is_handshook());
        assert!(SessionState::Connected.is_handshook());
        assert!(!SessionState::Disconnected.is_handshook());

        assert!(!SessionState::Handshook.is_connected());
        assert!(SessionState::Connected.is_connected());
        assert!(!SessionState::Disconnected.is_connected());
    }

    #[test]
    fn test_concurrent_handshake_advances_once() {
        let machine = Arc::new(SessionStateMachine::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let machine = Arc::clone(&machine);
                std::thread::spawn(move || machine.complete_handshake())
            })
            .collect();

        let advanced = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|advanced| *advanced)
            .count();

        assert_eq!(advanced, 1);
        assert_eq!(machine.state(), SessionState::Handshook);
    }
}
