use std::time::Duration;

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            initial,
            max,
            max_attempts,
            attempts: 0,
        }
    }

    /// Registers a failed attempt.
    /// Returns the delay to wait before the next attempt,
    /// or None once the retry budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }

        let factor = 2_u32.checked_pow(self.attempts).unwrap_or(u32::MAX);
        self.attempts += 1;

        let delay = self.initial.checked_mul(factor).unwrap_or(self.max);
        Some(delay.min(self.max))
    }

    /// Number of failed attempts so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Call this on successful connection
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
