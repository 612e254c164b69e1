//! Fixed-delay, unbounded retry loop shared by every fetcher.
//!
//! A single request attempt is classified into a [`FetchOutcome`]. [`Backoff::resolve`]
//! keeps re-issuing the attempt while the outcome is `RateLimited` or `TransientError`,
//! sleeping the configured delay in between, and hands back a [`Resolved`] outcome that
//! is always terminal for the identifier.

use std::fmt::Display;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::SourceError;

/// Classification of one request attempt.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Success(T),
    NotFound,
    RateLimited,
    TransientError(SourceError),
    PermanentFailure(SourceError),
}

/// Terminal result of a fetch. Rate limiting and transient errors are absorbed by the
/// retry loop, so they have no representation here.
#[derive(Debug)]
pub enum Resolved<T> {
    Success(T),
    NotFound,
    PermanentFailure(SourceError),
}

impl<T> Resolved<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Resolved::Success(_))
    }
}

pub trait Sleeper {
    fn sleep(&self, delay: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

#[derive(Debug, Clone)]
pub struct Backoff<S = ThreadSleeper> {
    delay: Duration,
    sleeper: S,
}

impl Backoff<ThreadSleeper> {
    pub fn new(delay: Duration) -> Self {
        Self::with_sleeper(delay, ThreadSleeper)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }
}

impl<S: Sleeper> Backoff<S> {
    pub fn with_sleeper(delay: Duration, sleeper: S) -> Self {
        Self { delay, sleeper }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Run `attempt` until it yields a terminal outcome.
    ///
    /// There is no attempt cap: the counter only feeds the log lines.
    pub fn resolve<T, F>(&self, appid: impl Display, mut attempt: F) -> Resolved<T>
    where
        F: FnMut() -> FetchOutcome<T>,
    {
        let mut attempts: u64 = 0;
        loop {
            match attempt() {
                FetchOutcome::Success(payload) => {
                    if attempts > 0 {
                        info!(%appid, retries = attempts, "request succeeded after retry");
                    }
                    return Resolved::Success(payload);
                }
                FetchOutcome::NotFound => {
                    warn!(%appid, "no such record exists");
                    return Resolved::NotFound;
                }
                FetchOutcome::PermanentFailure(err) => {
                    warn!(%appid, error = %err, "can't get record, moving on");
                    return Resolved::PermanentFailure(err);
                }
                FetchOutcome::RateLimited => {
                    attempts += 1;
                    warn!(
                        %appid,
                        attempt = attempts,
                        delay_secs = self.delay.as_secs(),
                        "too many requests, waiting"
                    );
                }
                FetchOutcome::TransientError(err) => {
                    attempts += 1;
                    warn!(
                        %appid,
                        attempt = attempts,
                        delay_secs = self.delay.as_secs(),
                        error = %err,
                        "request failed, retrying"
                    );
                }
            }
            self.sleeper.sleep(self.delay);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Records requested delays instead of blocking.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        pub slept: RefCell<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, delay: Duration) {
            self.slept.borrow_mut().push(delay);
        }
    }

    impl Sleeper for &RecordingSleeper {
        fn sleep(&self, delay: Duration) {
            (**self).sleep(delay);
        }
    }

    /// Hands out a fixed sequence of attempt outcomes.
    pub struct Script<T> {
        outcomes: RefCell<VecDeque<FetchOutcome<T>>>,
    }

    impl<T> Script<T> {
        pub fn new(outcomes: Vec<FetchOutcome<T>>) -> Self {
            Self {
                outcomes: RefCell::new(outcomes.into()),
            }
        }

        pub fn next(&self) -> FetchOutcome<T> {
            self.outcomes
                .borrow_mut()
                .pop_front()
                .expect("script exhausted")
        }

        pub fn remaining(&self) -> usize {
            self.outcomes.borrow().len()
        }
    }
}
