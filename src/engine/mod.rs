//! Generic batch driver: enumerate identifiers, fetch each one, persist successes.
//!
//! The three capabilities are injected as trait implementations; every run mode wires
//! a different triple into the same [`IngestionEngine`].

pub mod report;
pub mod retry;
pub mod state;

use std::fmt::Display;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::error::{EngineError, PersistenceError};
pub use report::{BarProgress, CompletionReporter, NoProgress, ProgressSink, SummaryReporter};
pub use retry::{Backoff, FetchOutcome, Resolved, Sleeper, ThreadSleeper};
pub use state::RunState;

/// Produces the ordered, duplicate-free work list for a run. Must not mutate storage.
pub trait RecordSetProvider<Id> {
    fn enumerate(&self) -> Result<Vec<Id>, EngineError>;
}

/// Fetches one record. The returned outcome is terminal: rate limiting and transient
/// errors are retried inside the implementation.
pub trait RetryableFetcher<Id> {
    type Payload;

    fn fetch(&self, id: &Id) -> Resolved<Self::Payload>;
}

/// Writes one fetched record. Each call is its own unit of work.
pub trait Persister<Id> {
    type Payload;

    fn persist(&self, payload: Self::Payload, id: &Id) -> Result<(), PersistenceError>;

    /// Called when the source confirmed the record does not exist.
    fn record_absent(&self, _id: &Id) -> Result<(), PersistenceError> {
        Ok(())
    }
}

impl<Id, T: RecordSetProvider<Id> + ?Sized> RecordSetProvider<Id> for &T {
    fn enumerate(&self) -> Result<Vec<Id>, EngineError> {
        (**self).enumerate()
    }
}

impl<Id, T: RetryableFetcher<Id> + ?Sized> RetryableFetcher<Id> for &T {
    type Payload = T::Payload;

    fn fetch(&self, id: &Id) -> Resolved<Self::Payload> {
        (**self).fetch(id)
    }
}

impl<Id, T: Persister<Id> + ?Sized> Persister<Id> for &T {
    type Payload = T::Payload;

    fn persist(&self, payload: Self::Payload, id: &Id) -> Result<(), PersistenceError> {
        (**self).persist(payload, id)
    }

    fn record_absent(&self, id: &Id) -> Result<(), PersistenceError> {
        (**self).record_absent(id)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions<Id> {
    /// Identifiers below this bound are skipped.
    pub min_identifier: Option<Id>,
}

impl<Id> Default for RunOptions<Id> {
    fn default() -> Self {
        Self {
            min_identifier: None,
        }
    }
}

pub struct IngestionEngine<'a, Id, R, F, P> {
    provider: R,
    fetcher: F,
    persister: P,
    reporter: Box<dyn CompletionReporter + 'a>,
    progress: Box<dyn ProgressSink + 'a>,
    options: RunOptions<Id>,
}

impl<'a, Id, R, F, P> IngestionEngine<'a, Id, R, F, P>
where
    Id: Ord + Display,
    R: RecordSetProvider<Id>,
    F: RetryableFetcher<Id>,
    P: Persister<Id, Payload = F::Payload>,
{
    pub fn new(
        provider: R,
        fetcher: F,
        persister: P,
        reporter: impl CompletionReporter + 'a,
        options: RunOptions<Id>,
    ) -> Self {
        Self {
            provider,
            fetcher,
            persister,
            reporter: Box::new(reporter),
            progress: Box::new(NoProgress),
            options,
        }
    }

    pub fn with_progress(mut self, progress: impl ProgressSink + 'a) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Drive one batch run to completion and return the final counters.
    ///
    /// Only enumeration failures abort the run; per-identifier failures are counted.
    pub fn run(&self) -> Result<RunState, EngineError> {
        let work_list = self.provider.enumerate()?;
        if work_list.is_empty() {
            info!("no records to scrape, exiting");
            println!("No records to scrape. Exiting.");
            return Ok(RunState::default());
        }

        let started = Instant::now();
        let mut state = RunState::new(work_list.len() as u64);
        info!(total = state.total, "starting scraping");
        self.progress.start(state.total);

        for id in &work_list {
            // Skipped identifiers keep their share of `total` but never advance
            // `current`, so a filtered run finishes below 100%.
            if let Some(min) = &self.options.min_identifier {
                if id < min {
                    continue;
                }
            }

            self.progress.update(&state);
            info!(appid = %id, "Running ID {id}...");
            self.process(id, &mut state);
        }

        self.progress.finish(&state);
        self.reporter.on_finished(&state, started.elapsed());
        Ok(state)
    }

    fn process(&self, id: &Id, state: &mut RunState) {
        match self.fetcher.fetch(id) {
            Resolved::Success(payload) => match self.persister.persist(payload, id) {
                Ok(()) => state.record_success(),
                Err(err) => {
                    error!(appid = %id, error = %err, "failed to persist record");
                    state.record_failure();
                }
            },
            Resolved::NotFound => {
                if let Err(err) = self.persister.record_absent(id) {
                    warn!(appid = %id, error = %err, "failed to mark record as unreachable");
                }
                state.record_failure();
            }
            Resolved::PermanentFailure(_) => state.record_failure(),
        }
    }
}
