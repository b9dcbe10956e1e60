use std::time::{Duration, Instant};

/// Holds the consumer to a per-frame time budget.
///
/// Sleeps away whatever is left of the budget. A frame that overran gets no
/// sleep, and later frames do not try to catch up.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    budget: Duration,
}

impl Pacer {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time left in the budget after `elapsed`, if any.
    pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        self.budget
            .checked_sub(elapsed)
            .filter(|left| !left.is_zero())
    }

    /// Sleep out the rest of the budget for a frame that began at `started`.
    /// Returns how long it slept.
    pub fn pace(&self, started: Instant) -> Duration {
        match self.remaining(started.elapsed()) {
            Some(left) => {
                std::thread::sleep(left);
                left
            }
            None => Duration::ZERO,
        }
    }
}
