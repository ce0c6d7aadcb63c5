//! Sequential batch generation.
//!
//! A [`BatchRun`] holds the ordered items; a [`BatchOrchestrator`] drives them
//! one at a time through a [`Generator`], reporting [`BatchEvent`]s as it goes.

mod generator;
mod mock;
mod orchestrator;
mod retry;
mod run;

pub use generator::{FnGenerator, Generator, generator_fn};
pub use mock::MockGenerator;
pub use orchestrator::{BatchEvent, BatchOrchestrator};
pub use retry::{Backoff, BatchOptions, RetryPolicy};
pub use run::{
    BatchItem, BatchOutcome, BatchProgress, BatchRun, BatchSummary, CancelHandle, ItemReport,
    ItemStatus,
};
