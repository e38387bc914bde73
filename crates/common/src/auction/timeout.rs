//! Absolute deadlines propagated from an auction to its outbound calls.

use std::time::Duration;

use tokio::time::Instant;

/// An absolute point in time by which some work must finish.
///
/// Child deadlines are always derived from a parent with [`Timeout::minus`]
/// or [`Timeout::min_with`], so they can never outlive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timeout {
    deadline: Instant,
}

impl Timeout {
    #[must_use]
    pub fn at(deadline: Instant) -> Self {
        Self { deadline }
    }

    /// A deadline `budget` from now.
    #[must_use]
    pub fn from_budget(budget: Duration) -> Self {
        Self::at(Instant::now() + budget)
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// The same deadline moved `margin` earlier.
    #[must_use]
    pub fn minus(&self, margin: Duration) -> Self {
        Self::at(self.deadline.checked_sub(margin).unwrap_or_else(Instant::now))
    }

    /// The earlier of this deadline and `budget` from now.
    #[must_use]
    pub fn min_with(&self, budget: Duration) -> Self {
        let candidate = Instant::now() + budget;
        Self::at(self.deadline.min(candidate))
    }
}
