use std::time::{Duration, Instant};

use async_trait::async_trait;

#[async_trait]
/// The scheduler used for every time based decision the client makes.
///
/// This covers the dead server cooldown, the discovery interval and the
/// wait performed after a refresh, allowing all of them to be driven by a
/// fake clock in tests rather than real sleeps.
pub trait Clock: Send + Sync + 'static {
    /// The current point in time.
    fn now(&self) -> Instant;

    /// Suspends the caller until `duration` has elapsed on this clock.
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Copy, Clone)]
/// The runtime clock backed by `tokio::time`.
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-utils"))]
mod manual {
    use std::sync::Arc;

    use tokio::sync::watch;

    use super::*;

    #[derive(Clone)]
    /// A clock which only moves forward when told to.
    ///
    /// Sleepers are woken once [ManualClock::advance] moves the clock past
    /// their deadline.
    pub struct ManualClock {
        start: Instant,
        elapsed: Arc<watch::Sender<Duration>>,
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ManualClock {
        pub fn new() -> Self {
            let (tx, _) = watch::channel(Duration::ZERO);
            Self {
                start: Instant::now(),
                elapsed: Arc::new(tx),
            }
        }

        /// Moves the clock forward, waking any sleepers whose deadline has passed.
        pub fn advance(&self, by: Duration) {
            self.elapsed.send_modify(|elapsed| *elapsed += by);
        }

        /// The total time the clock has been advanced by.
        pub fn elapsed(&self) -> Duration {
            *self.elapsed.borrow()
        }

        /// The number of tasks currently suspended in [Clock::sleep].
        pub fn num_sleepers(&self) -> usize {
            self.elapsed.receiver_count()
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + self.elapsed()
        }

        async fn sleep(&self, duration: Duration) {
            let mut rx = self.elapsed.subscribe();
            let deadline = *rx.borrow() + duration;

            while *rx.borrow_and_update() < deadline {
                if rx.changed().await.is_err() {
                    return;
                }
            }
        }
    }
}
