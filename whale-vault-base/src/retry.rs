// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! Retry and polling policies, independent of any real timer.

use std::{fmt, future::Future, iter, time::Duration};

use tracing::{debug, warn};

use crate::clock::Clock;

/// The pauses between receipt lookups, in milliseconds.
pub const DEFAULT_RECEIPT_BACKOFF_MS: [u64; 6] = [250, 500, 900, 1500, 2200, 3200];

/// The number of status queries made before giving up on a transaction.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;

/// The pause between two status queries, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// A fixed backoff schedule: one attempt before each delay of the schedule, then one
/// final attempt with no delay after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    delays: Vec<Duration>,
}

/// Reported when every attempt of a [`BackoffPolicy`] came back empty-handed.
#[derive(Debug)]
pub struct Exhausted<E> {
    /// How many attempts were made.
    pub attempts: usize,
    /// The last error seen, if any attempt failed rather than returning nothing.
    pub last_error: Option<E>,
}

impl BackoffPolicy {
    /// Creates a policy pausing for each of `delays` in turn.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Creates a policy from a schedule given in milliseconds.
    pub fn from_millis(delays: &[u64]) -> Self {
        Self::new(delays.iter().copied().map(Duration::from_millis).collect())
    }

    /// The delays taken between attempts.
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// The total number of attempts, including the final one.
    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Yields, for each attempt in order, the pause to take if that attempt does not
    /// succeed. The final attempt has no pause.
    pub fn schedule(&self) -> impl Iterator<Item = Option<Duration>> + '_ {
        self.delays
            .iter()
            .copied()
            .map(Some)
            .chain(iter::once(None))
    }

    /// Runs `attempt` until it produces a value or the schedule is exhausted.
    ///
    /// An attempt may succeed with `Some(value)`, come back empty with `None`, or fail.
    /// Failures are logged and retried like empty results; only the last one is kept.
    pub async fn run<C, T, E, F, Fut>(&self, clock: &C, mut attempt: F) -> Result<T, Exhausted<E>>
    where
        C: Clock + ?Sized,
        E: fmt::Display,
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let mut last_error = None;
        for (index, delay) in self.schedule().enumerate() {
            match attempt(index + 1).await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => debug!(attempt = index + 1, "nothing available yet"),
                Err(error) => {
                    warn!(attempt = index + 1, %error, "attempt failed");
                    last_error = Some(error);
                }
            }
            if let Some(delay) = delay {
                clock.sleep(delay).await;
            }
        }
        Err(Exhausted {
            attempts: self.max_attempts(),
            last_error,
        })
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_millis(&DEFAULT_RECEIPT_BACKOFF_MS)
    }
}

/// A bounded polling loop with a constant pause between queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// The maximum number of queries.
    pub max_attempts: u32,
    /// The pause between two consecutive queries.
    pub interval: Duration,
}

/// How a polling loop ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// A terminal value was observed on the given attempt.
    Terminal {
        /// The terminal value.
        value: T,
        /// The 1-based attempt that produced it.
        attempts: u32,
    },
    /// Every attempt was used without observing a terminal value.
    Exhausted {
        /// The number of queries made.
        attempts: u32,
    },
}

impl PollPolicy {
    /// Creates a policy making at most `max_attempts` queries, `interval` apart.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Returns the same policy with a different query budget.
    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..self
        }
    }

    /// Queries until `is_terminal` accepts a value or the budget is spent.
    ///
    /// Each query is followed by a pause of `interval` before the next one, whatever the
    /// query latency was. No pause follows a terminal value or the last query. Failed
    /// queries are logged and count against the budget; they never end the loop.
    pub async fn run<C, T, E, F, Fut, P>(
        &self,
        clock: &C,
        mut query: F,
        is_terminal: P,
    ) -> PollOutcome<T>
    where
        C: Clock + ?Sized,
        E: fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&T) -> bool,
    {
        for attempt in 1..=self.max_attempts {
            match query(attempt).await {
                Ok(value) if is_terminal(&value) => {
                    return PollOutcome::Terminal {
                        value,
                        attempts: attempt,
                    }
                }
                Ok(_) => debug!(attempt, "not final yet"),
                Err(error) => warn!(attempt, %error, "poll attempt failed"),
            }
            if attempt < self.max_attempts {
                clock.sleep(self.interval).await;
            }
        }
        PollOutcome::Exhausted {
            attempts: self.max_attempts,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_POLL_ATTEMPTS,
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        )
    }
}
