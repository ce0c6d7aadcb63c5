//! Segmented batch-generation engine
//!
//! Splits long text into bounded segments and drives those segments, one at a
//! time, through a slow and fallible generation step:
//! - `text`: segmentation policies (words, sentences, proportional parts, lines)
//! - `timing`: caption schedules and SRT export
//! - `overlap`: trimming of echoed context in continuation-style output
//! - `batch`: the sequential orchestrator with retry, cancellation and progress

pub mod batch;
pub mod config;
pub mod error;
pub mod overlap;
pub mod text;
pub mod timing;

pub use batch::{
    Backoff, BatchEvent, BatchItem, BatchOptions, BatchOrchestrator, BatchOutcome, BatchProgress,
    BatchRun, BatchSummary, CancelHandle, Generator, ItemReport, ItemStatus, MockGenerator,
    RetryPolicy, generator_fn,
};
pub use config::{BackoffKind, BatchgenConfig};
pub use error::{EngineError, Result};
pub use overlap::{Continuation, trim_overlap};
pub use text::{Segment, SegmentPolicy, clean_text, segment};
pub use timing::{SrtEncoder, TimedSegment, allocate, build_subtitles, format_srt_timestamp, to_srt};
