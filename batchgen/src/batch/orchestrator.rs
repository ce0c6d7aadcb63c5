//! Sequential batch orchestrator.

use log::{debug, info, warn};
use std::time::Duration;

use super::generator::Generator;
use super::retry::BatchOptions;
use super::run::{BatchProgress, BatchRun, BatchSummary, ItemStatus};
use crate::error::Result;
use crate::text::Segment;

/// Something that happened during a run, delivered in processing order.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// Item moved to `Generating`
    ItemStarted { index: usize },
    /// An attempt failed; `retry_in` is `None` when no attempts remain
    AttemptFailed {
        index: usize,
        attempt: u32,
        error: String,
        retry_in: Option<Duration>,
    },
    /// Item reached a terminal state
    ItemFinished { index: usize, status: ItemStatus },
    /// Another item of the current pass is done
    Progress { current: usize, total: usize },
}

impl BatchEvent {
    fn progress(progress: BatchProgress) -> Self {
        Self::Progress {
            current: progress.completed,
            total: progress.total,
        }
    }
}

/// Drives batch items one at a time through a [`Generator`].
///
/// Items run strictly in order with no overlap: item `i` starts only after
/// item `i - 1` reached a terminal state. Per-item failures are recorded and
/// never abort the run. Cancellation is checked between items only.
pub struct BatchOrchestrator<G> {
    generator: G,
    options: BatchOptions,
}

impl<G: Generator> BatchOrchestrator<G> {
    /// Create an orchestrator; invalid options are rejected up front.
    pub fn new(generator: G, options: BatchOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { generator, options })
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Run every item of `run` in order.
    pub async fn run<F>(&self, run: &mut BatchRun<G::Artifact>, mut on_event: F) -> BatchSummary
    where
        F: FnMut(&BatchEvent),
    {
        let indices: Vec<usize> = (0..run.items().len()).collect();
        self.execute(run, &indices, &mut on_event).await
    }

    /// Re-run only the failed items, leaving successes and skips untouched.
    pub async fn retry_failed<F>(
        &self,
        run: &mut BatchRun<G::Artifact>,
        mut on_event: F,
    ) -> BatchSummary
    where
        F: FnMut(&BatchEvent),
    {
        let mut indices = Vec::new();
        for (i, item) in run.items_mut().iter_mut().enumerate() {
            if item.status() == ItemStatus::Failed {
                item.reset_failed();
                indices.push(i);
            }
        }

        if indices.is_empty() {
            debug!("No failed items to retry");
            return run.summary();
        }

        info!("Retrying {} failed items", indices.len());
        self.execute(run, &indices, &mut on_event).await
    }

    async fn execute<F>(
        &self,
        run: &mut BatchRun<G::Artifact>,
        indices: &[usize],
        on_event: &mut F,
    ) -> BatchSummary
    where
        F: FnMut(&BatchEvent),
    {
        run.begin(indices.len());
        info!(
            "Starting batch of {} items with {}",
            indices.len(),
            self.generator.name()
        );

        for (position, &index) in indices.iter().enumerate() {
            if run.is_cancel_requested() {
                self.skip_remaining(run, &indices[position..], on_event);
                break;
            }

            run.items_mut()[index].mark_generating();
            on_event(&BatchEvent::ItemStarted { index });

            let segment = run.items()[index].segment().clone();
            let status = match self.generate_with_retry(&segment, on_event).await {
                Ok((artifact, retries)) => {
                    run.items_mut()[index].mark_success(artifact, retries);
                    ItemStatus::Success
                }
                Err((error, retries)) => {
                    run.items_mut()[index].mark_failed(error, retries);
                    ItemStatus::Failed
                }
            };
            on_event(&BatchEvent::ItemFinished { index, status });

            let progress = run.advance();
            on_event(&BatchEvent::progress(progress));

            let is_last = position + 1 == indices.len();
            let delay = self.options.inter_item_delay;
            if !is_last && !run.is_cancel_requested() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let summary = run.summary();
        info!("{}", summary);
        summary
    }

    /// Call the generator until it succeeds or the attempt budget is spent.
    ///
    /// Returns the artifact or the last error, with the number of failed attempts.
    async fn generate_with_retry<F>(
        &self,
        segment: &Segment,
        on_event: &mut F,
    ) -> std::result::Result<(G::Artifact, u32), (String, u32)>
    where
        F: FnMut(&BatchEvent),
    {
        let policy = &self.options.retry;
        let mut failures = 0;

        loop {
            match self.generator.generate(segment).await {
                Ok(artifact) => return Ok((artifact, failures)),
                Err(e) => {
                    failures += 1;
                    let error = format!("{e:#}");

                    let retry_in = (failures < policy.max_attempts)
                        .then(|| policy.backoff.delay(failures));

                    match retry_in {
                        Some(delay) => warn!(
                            "Segment {} failed (attempt {}/{}), retrying in {:?}: {}",
                            segment.index, failures, policy.max_attempts, delay, error
                        ),
                        None => warn!(
                            "Segment {} failed after {} attempts: {}",
                            segment.index, failures, error
                        ),
                    }

                    on_event(&BatchEvent::AttemptFailed {
                        index: segment.index,
                        attempt: failures,
                        error: error.clone(),
                        retry_in,
                    });

                    match retry_in {
                        Some(delay) if !delay.is_zero() => tokio::time::sleep(delay).await,
                        Some(_) => {}
                        None => return Err((error, failures)),
                    }
                }
            }
        }
    }

    fn skip_remaining<F>(&self, run: &mut BatchRun<G::Artifact>, indices: &[usize], on_event: &mut F)
    where
        F: FnMut(&BatchEvent),
    {
        info!("Cancellation requested, skipping {} items", indices.len());

        for &index in indices {
            if run.items()[index].status() != ItemStatus::Pending {
                continue;
            }
            run.items_mut()[index].mark_skipped();
            on_event(&BatchEvent::ItemFinished {
                index,
                status: ItemStatus::Skipped,
            });
            let progress = run.advance();
            on_event(&BatchEvent::progress(progress));
        }
    }
}
