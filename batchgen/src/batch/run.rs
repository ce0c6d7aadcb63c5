//! Batch run state: items, progress, cancellation, and the terminal summary.

use crate::error::{EngineError, Result};
use crate::text::Segment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-item state. `Pending -> Generating -> Success | Failed`, or
/// `Pending -> Skipped` once cancellation is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Generating,
    Success,
    Failed,
    Skipped,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Skipped)
    }
}

/// A segment plus its generation outcome.
#[derive(Debug, Clone)]
pub struct BatchItem<A> {
    segment: Segment,
    status: ItemStatus,
    result: Option<A>,
    retries: u32,
    error: Option<String>,
}

impl<A> BatchItem<A> {
    fn new(segment: Segment) -> Self {
        Self {
            segment,
            status: ItemStatus::Pending,
            result: None,
            retries: 0,
            error: None,
        }
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// The artifact; present only when the item succeeded.
    pub fn result(&self) -> Option<&A> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Option<A> {
        self.result
    }

    /// Failed attempts consumed before the final status.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Last failure reason; present only when the item failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn mark_generating(&mut self) {
        self.status = ItemStatus::Generating;
    }

    pub(crate) fn mark_success(&mut self, artifact: A, retries: u32) {
        self.status = ItemStatus::Success;
        self.result = Some(artifact);
        self.retries = retries;
        self.error = None;
    }

    pub(crate) fn mark_failed(&mut self, error: String, retries: u32) {
        self.status = ItemStatus::Failed;
        self.result = None;
        self.retries = retries;
        self.error = Some(error);
    }

    pub(crate) fn mark_skipped(&mut self) {
        self.status = ItemStatus::Skipped;
    }

    /// Return a failed item to `Pending` for a retry-failed pass.
    pub(crate) fn reset_failed(&mut self) {
        debug_assert_eq!(self.status, ItemStatus::Failed);
        self.status = ItemStatus::Pending;
        self.retries = 0;
        self.error = None;
    }

    fn report(&self) -> ItemReport {
        ItemReport {
            index: self.segment.index,
            status: self.status,
            retries: self.retries,
            char_count: self.segment.char_count,
            error: self.error.clone(),
        }
    }
}

/// Cooperative cancellation flag shared between a run and its callers.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Ask the run to stop before starting its next item.
    pub fn request_cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Items finished out of the current (sub-)run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

/// One orchestration session over an ordered list of segments.
#[derive(Debug)]
pub struct BatchRun<A> {
    items: Vec<BatchItem<A>>,
    cancel: CancelHandle,
    progress: BatchProgress,
}

impl<A> BatchRun<A> {
    /// Wrap segments as pending items. An empty list is rejected.
    pub fn new(segments: Vec<Segment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(EngineError::invalid("a batch run needs at least one segment"));
        }

        let total = segments.len();
        Ok(Self {
            items: segments.into_iter().map(BatchItem::new).collect(),
            cancel: CancelHandle::default(),
            progress: BatchProgress {
                completed: 0,
                total,
            },
        })
    }

    pub fn items(&self) -> &[BatchItem<A>] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&BatchItem<A>> {
        self.items.get(index)
    }

    pub fn into_items(self) -> Vec<BatchItem<A>> {
        self.items
    }

    pub fn progress(&self) -> BatchProgress {
        self.progress
    }

    /// Handle that can cancel this run from another task or a callback.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn request_cancel(&self) {
        self.cancel.request_cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Tally over every item in the run.
    pub fn summary(&self) -> BatchSummary {
        let count = |status: ItemStatus| self.items.iter().filter(|i| i.status == status).count();

        BatchSummary {
            success_count: count(ItemStatus::Success),
            failed_count: count(ItemStatus::Failed),
            skipped_count: count(ItemStatus::Skipped),
            total: self.items.len(),
            items: self.items.iter().map(BatchItem::report).collect(),
        }
    }

    pub(crate) fn begin(&mut self, total: usize) {
        self.cancel.reset();
        self.progress = BatchProgress {
            completed: 0,
            total,
        };
    }

    pub(crate) fn items_mut(&mut self) -> &mut [BatchItem<A>] {
        &mut self.items
    }

    pub(crate) fn advance(&mut self) -> BatchProgress {
        self.progress.completed += 1;
        self.progress
    }
}

/// Serializable per-item line of a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    pub index: usize,
    pub status: ItemStatus,
    pub retries: u32,
    pub char_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// How a run ended, for the human-readable tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    AllSucceeded,
    PartialSuccess { failed: usize },
    Cancelled { completed: usize, total: usize },
}

/// Terminal report of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub success_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub total: usize,
    pub items: Vec<ItemReport>,
}

impl BatchSummary {
    pub fn outcome(&self) -> BatchOutcome {
        if self.skipped_count > 0 {
            BatchOutcome::Cancelled {
                completed: self.success_count + self.failed_count,
                total: self.total,
            }
        } else if self.failed_count > 0 {
            BatchOutcome::PartialSuccess {
                failed: self.failed_count,
            }
        } else {
            BatchOutcome::AllSucceeded
        }
    }

    /// Failed items as errors, for callers that report them individually.
    pub fn failures(&self) -> Vec<EngineError> {
        self.items
            .iter()
            .filter(|i| i.status == ItemStatus::Failed)
            .map(|i| EngineError::GenerationFailed {
                segment_index: i.index,
                error: i.error.clone().unwrap_or_default(),
            })
            .collect()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome() {
            BatchOutcome::AllSucceeded => {
                write!(f, "All {} segments succeeded", self.total)
            }
            BatchOutcome::PartialSuccess { failed } => write!(
                f,
                "Partial success: {} of {} succeeded, {} failed",
                self.success_count, self.total, failed
            ),
            BatchOutcome::Cancelled { completed, total } => write!(
                f,
                "Cancelled after {} of {} segments ({} succeeded, {} failed)",
                completed, total, self.success_count, self.failed_count
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_of(n: usize) -> BatchRun<String> {
        let segments = (0..n).map(|i| Segment::new(i, format!("seg {i}"))).collect();
        BatchRun::new(segments).unwrap()
    }

    #[test]
    fn test_empty_run_rejected() {
        let err = BatchRun::<String>::new(Vec::new()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_new_run_is_pending() {
        let run = run_of(3);
        assert!(run.items().iter().all(|i| i.status() == ItemStatus::Pending));
        assert_eq!(run.progress(), BatchProgress { completed: 0, total: 3 });
        assert!(!run.is_cancel_requested());
    }

    #[test]
    fn test_item_transitions_keep_invariants() {
        let mut run = run_of(2);
        let items = run.items_mut();

        items[0].mark_generating();
        items[0].mark_failed("boom".to_string(), 3);
        assert_eq!(items[0].error(), Some("boom"));
        assert!(items[0].result().is_none());

        items[0].reset_failed();
        assert_eq!(items[0].status(), ItemStatus::Pending);
        assert_eq!(items[0].retries(), 0);
        assert!(items[0].error().is_none());

        items[1].mark_success("art".to_string(), 1);
        assert_eq!(items[1].result().map(String::as_str), Some("art"));
        assert!(items[1].error().is_none());
        assert_eq!(items[1].retries(), 1);
    }

    #[test]
    fn test_cancel_handle_is_shared() {
        let run = run_of(1);
        let handle = run.cancel_handle();
        handle.request_cancel();
        assert!(run.is_cancel_requested());
    }

    #[test]
    fn test_summary_tallies() {
        let mut run = run_of(4);
        run.items_mut()[0].mark_success("a".to_string(), 0);
        run.items_mut()[1].mark_failed("bad".to_string(), 3);
        run.items_mut()[2].mark_success("c".to_string(), 0);
        run.items_mut()[3].mark_success("d".to_string(), 0);

        let summary = run.summary();
        assert_eq!(summary.outcome(), BatchOutcome::PartialSuccess { failed: 1 });
        assert_eq!(summary.to_string(), "Partial success: 3 of 4 succeeded, 1 failed");

        let failures = summary.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].to_string(),
            "Generation failed for segment 1: bad"
        );
    }

    #[test]
    fn test_summary_display_variants() {
        let mut run = run_of(3);
        for item in run.items_mut() {
            item.mark_success("ok".to_string(), 0);
        }
        assert_eq!(run.summary().to_string(), "All 3 segments succeeded");

        let mut run = run_of(3);
        run.items_mut()[0].mark_success("ok".to_string(), 0);
        run.items_mut()[1].mark_skipped();
        run.items_mut()[2].mark_skipped();
        assert_eq!(
            run.summary().to_string(),
            "Cancelled after 1 of 3 segments (1 succeeded, 0 failed)"
        );
    }

    #[test]
    fn test_summary_serializes() {
        let mut run = run_of(1);
        run.items_mut()[0].mark_failed("nope".to_string(), 2);
        let json = serde_json::to_value(run.summary()).unwrap();
        assert_eq!(json["failed_count"], 1);
        assert_eq!(json["items"][0]["status"], "failed");
        assert_eq!(json["items"][0]["error"], "nope");
    }
}
