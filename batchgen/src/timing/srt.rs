//! SubRip (`.srt`) caption output.

use super::{TimedSegment, format_srt_timestamp};
use crate::error::{EngineError, Result};
use std::io::Write;

/// Streams timed segments as numbered SRT blocks.
///
/// Each block is the 1-based cue number, the timing line, the text and a
/// blank line. Numbering follows write order, not the segment index.
pub struct SrtEncoder<W: Write> {
    w: W,
    next_number: usize,
    closed: bool,
}

impl<W: Write> SrtEncoder<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            next_number: 1,
            closed: false,
        }
    }

    /// Write one caption block.
    pub fn write_segment(&mut self, timed: &TimedSegment) -> Result<()> {
        if self.closed {
            return Err(EngineError::invalid(
                "cannot write caption: encoder is already closed",
            ));
        }

        self.w.write_all(format_block(self.next_number, timed).as_bytes())?;
        self.next_number += 1;
        Ok(())
    }

    /// Flush the underlying writer. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.w.flush()?;
        self.closed = true;
        Ok(())
    }
}

/// Render a whole caption track to a string.
pub fn to_srt(timed: &[TimedSegment]) -> String {
    timed
        .iter()
        .enumerate()
        .map(|(i, t)| format_block(i + 1, t))
        .collect()
}

/// One cue: number, timing line, text, blank line.
fn format_block(number: usize, timed: &TimedSegment) -> String {
    format!(
        "{}\n{} --> {}\n{}\n\n",
        number,
        format_srt_timestamp(timed.start_seconds),
        format_srt_timestamp(timed.end_seconds),
        timed.segment.text
    )
}
