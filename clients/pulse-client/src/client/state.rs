//! Channel State Management
//!
//! Provides the channel state machine and state tracker for the realtime
//! connection lifecycle.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Represents the possible states of the realtime channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No connection attempt has been made (or none can be made)
    Idle,
    /// A connection attempt is in progress
    Connecting,
    /// The channel is open and usable
    Open,
    /// The channel closed; a reconnection may be pending
    Closed,
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelState::Idle => write!(f, "Idle"),
            ChannelState::Connecting => write!(f, "Connecting"),
            ChannelState::Open => write!(f, "Open"),
            ChannelState::Closed => write!(f, "Closed"),
        }
    }
}

/// State transition information
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: ChannelState,
    pub to: ChannelState,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Internal state data
struct ChannelStateInner {
    current: ChannelState,
    last_open: Option<DateTime<Utc>>,
    connection_attempts: u32,
    transitions: Vec<StateTransition>,
}

/// Thread-safe channel state tracker
#[derive(Clone)]
pub struct ChannelStateTracker {
    inner: Arc<RwLock<ChannelStateInner>>,
}

impl ChannelStateTracker {
    /// Create a new tracker starting in the Idle state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ChannelStateInner {
                current: ChannelState::Idle,
                last_open: None,
                connection_attempts: 0,
                transitions: Vec::new(),
            })),
        }
    }

    /// Get the current state
    pub fn current_state(&self) -> ChannelState {
        self.inner.read().current
    }

    /// Get the timestamp of the last successful open
    pub fn last_open(&self) -> Option<DateTime<Utc>> {
        self.inner.read().last_open
    }

    /// Get the number of connection attempts since the last open
    pub fn connection_attempts(&self) -> u32 {
        self.inner.read().connection_attempts
    }

    /// Transition to a new state
    pub fn transition_to(&self, new_state: ChannelState, reason: Option<String>) -> bool {
        let mut inner = self.inner.write();

        if !self.is_valid_transition(inner.current, new_state) {
            return false;
        }

        let transition = StateTransition {
            from: inner.current,
            to: new_state,
            timestamp: Utc::now(),
            reason,
        };

        let old_state = inner.current;
        inner.current = new_state;

        match new_state {
            ChannelState::Open => {
                inner.last_open = Some(Utc::now());
                inner.connection_attempts = 0;
            }
            ChannelState::Connecting => {
                inner.connection_attempts += 1;
            }
            _ => {}
        }

        inner.transitions.push(transition);

        // Keep only last 100 transitions
        if inner.transitions.len() > 100 {
            inner.transitions.remove(0);
        }

        tracing::info!(
            from = %old_state,
            to = %new_state,
            attempts = inner.connection_attempts,
            "Channel state transition"
        );

        true
    }

    /// Check if a state transition is valid
    fn is_valid_transition(&self, from: ChannelState, to: ChannelState) -> bool {
        // Self-transition is always allowed
        if from == to {
            return true;
        }

        matches!(
            (from, to),
            // From Idle
            (ChannelState::Idle, ChannelState::Connecting) |
            // From Connecting
            (ChannelState::Connecting, ChannelState::Open) |
            (ChannelState::Connecting, ChannelState::Closed) |
            // From Open
            (ChannelState::Open, ChannelState::Closed) |
            // From Closed
            (ChannelState::Closed, ChannelState::Connecting)
        )
    }

    /// Set state to connecting
    pub fn set_connecting(&self) {
        self.transition_to(
            ChannelState::Connecting,
            Some("Initiating connection".to_string()),
        );
    }

    /// Set state to open
    pub fn set_open(&self) {
        self.transition_to(ChannelState::Open, Some("Channel established".to_string()));
    }

    /// Set state to closed
    pub fn set_closed(&self, reason: Option<String>) {
        self.transition_to(ChannelState::Closed, reason);
    }

    /// Get recent state transitions
    pub fn recent_transitions(&self, count: usize) -> Vec<StateTransition> {
        let inner = self.inner.read();
        inner.transitions.iter().rev().take(count).cloned().collect()
    }

    /// Check if the channel is currently open
    pub fn is_open(&self) -> bool {
        self.current_state() == ChannelState::Open
    }
}

impl Default for ChannelStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let tracker = ChannelStateTracker::new();
        assert_eq!(tracker.current_state(), ChannelState::Idle);
    }

    #[test]
    fn test_valid_transitions() {
        let tracker = ChannelStateTracker::new();

        // Idle -> Connecting
        assert!(tracker.transition_to(ChannelState::Connecting, None));
        assert_eq!(tracker.current_state(), ChannelState::Connecting);

        // Connecting -> Open
        assert!(tracker.transition_to(ChannelState::Open, None));
        assert_eq!(tracker.current_state(), ChannelState::Open);

        // Open -> Closed
        assert!(tracker.transition_to(ChannelState::Closed, None));
        assert_eq!(tracker.current_state(), ChannelState::Closed);

        // Closed -> Connecting (reconnection)
        assert!(tracker.transition_to(ChannelState::Connecting, None));
        assert_eq!(tracker.current_state(), ChannelState::Connecting);
    }

    #[test]
    fn test_invalid_transitions() {
        let tracker = ChannelStateTracker::new();

        // Idle -> Open is not allowed, only via Connecting
        assert!(!tracker.transition_to(ChannelState::Open, None));
        assert_eq!(tracker.current_state(), ChannelState::Idle);

        // Idle -> Closed is not allowed either
        assert!(!tracker.transition_to(ChannelState::Closed, None));
        assert_eq!(tracker.current_state(), ChannelState::Idle);
    }

    #[test]
    fn test_open_failure_path() {
        let tracker = ChannelStateTracker::new();

        tracker.set_connecting();
        tracker.set_closed(Some("open failed".to_string()));
        assert_eq!(tracker.current_state(), ChannelState::Closed);
    }

    #[test]
    fn test_connection_attempts() {
        let tracker = ChannelStateTracker::new();

        tracker.set_connecting();
        assert_eq!(tracker.connection_attempts(), 1);

        tracker.set_closed(None);
        tracker.set_connecting();
        assert_eq!(tracker.connection_attempts(), 2);

        tracker.set_open();
        assert_eq!(tracker.connection_attempts(), 0);
        assert!(tracker.last_open().is_some());
    }
}
