// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

/*!
Abstractions over waiting, so that polling and retry loops can run against the real timer
or against a clock driven by tests.
 */

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

/// A source of delays for the retry and polling loops.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspends the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// A [`Clock`] implementation using the Tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

#[async_trait]
impl Clock for WallClock {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[async_trait]
impl<C: Clock + ?Sized> Clock for Arc<C> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}

/// A clock that never actually waits but records every requested delay. All clones share
/// the same record.
#[cfg(with_testing)]
#[derive(Clone, Debug, Default)]
pub struct TestClock(Arc<std::sync::Mutex<Vec<Duration>>>);

#[cfg(with_testing)]
#[async_trait]
impl Clock for TestClock {
    async fn sleep(&self, duration: Duration) {
        self.lock().push(duration);
    }
}

#[cfg(with_testing)]
impl TestClock {
    /// Creates a clock with an empty record of delays.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the delays requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().clone()
    }

    /// Returns the total amount of time the callers asked to wait.
    pub fn elapsed(&self) -> Duration {
        self.lock().iter().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Duration>> {
        self.0.lock().expect("poisoned TestClock mutex")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clock_records_delays_across_clones() {
        let clock = TestClock::new();
        let shared = Arc::new(clock.clone());
        clock.sleep(Duration::from_millis(250)).await;
        shared.sleep(Duration::from_millis(500)).await;
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(250), Duration::from_millis(500)]
        );
        assert_eq!(clock.elapsed(), Duration::from_millis(750));
    }
}
