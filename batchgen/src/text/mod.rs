//! Text segmentation: policies, sentence splitting, and cleanup.

pub mod chunker;
mod cleaner;
mod sentences;

pub use cleaner::clean_text;
pub use sentences::split_into_sentences;

use crate::error::{EngineError, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// One bounded chunk of source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Position in the sequence, assigned at segmentation time
    pub index: usize,
    /// The chunk content, trimmed
    pub text: String,
    /// Length of `text` in characters
    pub char_count: usize,
}

impl Segment {
    /// Create a new segment.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let char_count = chunker::char_len(&text);
        Self {
            index,
            text,
            char_count,
        }
    }
}

/// How a body of text is divided into segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SegmentPolicy {
    /// Word-boundary cap with hard cut on whitespace-free runs
    Words { max_chars: usize },
    /// Sentence packing with a word/punctuation fallback for long sentences
    Sentences { max_chars: usize },
    /// Exactly `parts` pieces along paragraph boundaries
    Proportional { parts: usize },
    /// One segment per non-blank line, optionally word-split when too long
    Lines { auto_split: Option<usize> },
}

impl SegmentPolicy {
    /// Reject parameters that cannot produce bounded segments.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Words { max_chars: 0 } | Self::Sentences { max_chars: 0 } => Err(
                EngineError::invalid("max_chars must be at least 1"),
            ),
            Self::Proportional { parts: 0 } => {
                Err(EngineError::invalid("parts must be at least 1"))
            }
            Self::Lines {
                auto_split: Some(0),
            } => Err(EngineError::invalid("auto_split must be at least 1")),
            _ => Ok(()),
        }
    }

    /// Short name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Words { .. } => "words",
            Self::Sentences { .. } => "sentences",
            Self::Proportional { .. } => "proportional",
            Self::Lines { .. } => "lines",
        }
    }
}

/// Split `text` into ordered segments under `policy`.
///
/// Empty or whitespace-only input yields no segments. Invalid policy
/// parameters are reported as [`EngineError::InvalidConfiguration`].
pub fn segment(text: &str, policy: &SegmentPolicy) -> Result<Vec<Segment>> {
    policy.validate()?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let pieces = match *policy {
        SegmentPolicy::Words { max_chars } => {
            chunker::split_on_words(&chunker::normalize_whitespace(text), max_chars)
        }
        SegmentPolicy::Sentences { max_chars } => chunker::split_on_sentences(text, max_chars),
        SegmentPolicy::Proportional { parts } => chunker::split_proportional(text, parts),
        SegmentPolicy::Lines { auto_split } => chunker::split_lines(text, auto_split),
    };

    debug!(
        "Segmented {} chars into {} segments ({})",
        chunker::char_len(text),
        pieces.len(),
        policy.name()
    );

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| Segment::new(index, text))
        .collect())
}
