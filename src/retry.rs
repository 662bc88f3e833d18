//! Retry/timeout bookkeeping for one exchange.
//!
//! The scheduler is a plain state machine with no I/O: the client worker
//! reports what happened (`sent`, `accepted`, `expired`, `cancel`) and the
//! scheduler answers with the next state. `sent` hands back the attempt
//! deadline, which only moves when a new attempt starts.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Sending,
    Waiting,
    /// At least one correlated response has been delivered.
    Streaming,
    Retrying,
    Succeeded,
    TimedOut,
    Cancelled,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AttemptState::Succeeded | AttemptState::TimedOut | AttemptState::Cancelled
        )
    }
}

#[derive(Debug)]
pub struct RetryScheduler {
    state: AttemptState,
    timeout: Duration,
    attempts_remaining: u32,
    transmissions: u32,
    delivered: usize,
}

impl RetryScheduler {
    /// `retries` counts transmissions after the first one.
    pub fn new(retries: u32, timeout: Duration) -> Self {
        Self {
            state: AttemptState::Sending,
            timeout,
            attempts_remaining: retries,
            transmissions: 0,
            delivered: 0,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn transmissions(&self) -> u32 {
        self.transmissions
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Sending -> Waiting. Starts the attempt window and returns its deadline.
    pub fn sent(&mut self, now: Instant) -> Instant {
        debug_assert_eq!(self.state, AttemptState::Sending);
        let deadline = now + self.timeout;
        self.transmissions += 1;
        self.state = AttemptState::Waiting;
        deadline
    }

    /// Records a delivered response. Listening continues either way.
    pub fn accepted(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.delivered += 1;
        self.state = AttemptState::Streaming;
    }

    /// Handles the end of the current attempt window.
    ///
    /// A window that produced responses ends the exchange successfully.
    /// Otherwise another attempt is scheduled while any remain.
    pub fn expired(&mut self) -> AttemptState {
        self.state = match self.state {
            AttemptState::Streaming => AttemptState::Succeeded,
            AttemptState::Waiting if self.attempts_remaining > 0 => {
                self.attempts_remaining -= 1;
                AttemptState::Retrying
            }
            AttemptState::Waiting => AttemptState::TimedOut,
            other => other,
        };
        self.state
    }

    /// Retrying -> Sending.
    pub fn retransmit(&mut self) {
        if self.state == AttemptState::Retrying {
            self.state = AttemptState::Sending;
        }
    }

    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.state = AttemptState::Cancelled;
        }
    }
}
