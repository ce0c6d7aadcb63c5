//! Mock generator for testing
//!
//! Scripted per-segment failures, call recording, and an optional cancel
//! trigger, so retry, partial-failure and cancellation paths can be driven
//! without a real provider.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::generator::Generator;
use super::run::CancelHandle;
use crate::text::Segment;

/// Failures left for a segment; `usize::MAX` means it never recovers.
const ALWAYS: usize = usize::MAX;

/// A generator whose behaviour is scripted per segment index
#[derive(Default)]
pub struct MockGenerator {
    call_count: AtomicUsize,
    calls: Mutex<Vec<usize>>,
    failures: Mutex<HashMap<usize, usize>>,
    cancel_at: Mutex<Option<(usize, CancelHandle)>>,
}

impl MockGenerator {
    /// Every call succeeds.
    pub fn always_succeeds() -> Self {
        Self::default()
    }

    /// Segment `index` fails `n` times, then succeeds.
    pub fn fails_then_succeeds(self, index: usize, n: usize) -> Self {
        self.lock_failures().insert(index, n);
        self
    }

    /// Segment `index` always fails.
    pub fn always_fails(self, index: usize) -> Self {
        self.fails_then_succeeds(index, ALWAYS)
    }

    /// Request cancellation while generating segment `index`.
    pub fn cancel_during(self, index: usize, handle: CancelHandle) -> Self {
        *self.cancel_at.lock().unwrap_or_else(|e| e.into_inner()) = Some((index, handle));
        self
    }

    /// Clear all scripted failures.
    pub fn heal(&self) {
        self.lock_failures().clear();
    }

    /// Number of times `generate` was called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Segment indices in call order, one entry per attempt.
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, HashMap<usize, usize>> {
        self.failures.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Generator for MockGenerator {
    type Artifact = String;

    async fn generate(&self, segment: &Segment) -> anyhow::Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(segment.index);

        if let Some((index, handle)) = self
            .cancel_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            if *index == segment.index {
                handle.request_cancel();
            }
        }

        {
            let mut failures = self.lock_failures();
            if let Some(left) = failures.get_mut(&segment.index) {
                if *left > 0 {
                    if *left != ALWAYS {
                        *left -= 1;
                    }
                    anyhow::bail!("mock failure for segment {}", segment.index);
                }
            }
        }

        Ok(format!("artifact-{}: {}", segment.index, segment.text))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
