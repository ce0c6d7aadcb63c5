//! Caption scheduling for segment sequences.
//!
//! The schedule is purely positional: segment `i` starts at
//! `i * (display + pause)` and ends `display` seconds later.

mod srt;

pub use srt::{SrtEncoder, to_srt};

use crate::error::{EngineError, Result};
use crate::text::{Segment, SegmentPolicy, segment};
use serde::{Deserialize, Serialize};

/// A segment paired with its caption interval, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    pub segment: Segment,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// Assign a `[start, end)` interval to each segment.
pub fn allocate(
    segments: &[Segment],
    display_seconds: f64,
    pause_seconds: f64,
) -> Result<Vec<TimedSegment>> {
    if !display_seconds.is_finite() || display_seconds <= 0.0 {
        return Err(EngineError::invalid(format!(
            "display duration must be positive, got {}",
            display_seconds
        )));
    }
    if !pause_seconds.is_finite() || pause_seconds < 0.0 {
        return Err(EngineError::invalid(format!(
            "pause must be non-negative, got {}",
            pause_seconds
        )));
    }

    let step = display_seconds + pause_seconds;

    Ok(segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let start_seconds = i as f64 * step;
            // Clamp so float rounding never lets a caption overlap the next one.
            let end_seconds = (start_seconds + display_seconds).min((i + 1) as f64 * step);
            TimedSegment {
                segment: segment.clone(),
                start_seconds,
                end_seconds,
            }
        })
        .collect())
}

/// Split text on sentence boundaries and schedule each caption.
pub fn build_subtitles(
    text: &str,
    chars_per_subtitle: usize,
    display_seconds: f64,
    pause_seconds: f64,
) -> Result<Vec<TimedSegment>> {
    let segments = segment(
        text,
        &SegmentPolicy::Sentences {
            max_chars: chars_per_subtitle,
        },
    )?;
    allocate(&segments, display_seconds, pause_seconds)
}

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`), rounded to the millisecond.
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;

    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    let s = total_s % 60;
    let total_m = total_s / 60;
    let m = total_m % 60;
    let h = total_m / 60;

    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn segments(n: usize) -> Vec<Segment> {
        (0..n).map(|i| Segment::new(i, format!("line {i}"))).collect()
    }

    #[test]
    fn test_allocate_positions() {
        let timed = allocate(&segments(3), 5.0, 1.0).unwrap();
        let spans: Vec<(f64, f64)> = timed.iter().map(|t| (t.start_seconds, t.end_seconds)).collect();
        assert_eq!(spans, vec![(0.0, 5.0), (6.0, 11.0), (12.0, 17.0)]);
    }

    #[test]
    fn test_allocate_rejects_bad_durations() {
        assert!(allocate(&segments(1), 0.0, 1.0).is_err());
        assert!(allocate(&segments(1), -2.0, 1.0).is_err());
        assert!(allocate(&segments(1), 2.0, -0.5).is_err());
        assert!(allocate(&segments(1), f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_allocate_empty() {
        assert!(allocate(&[], 5.0, 1.0).unwrap().is_empty());
    }

    #[test]
    fn test_format_srt_timestamp() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(6.0), "00:00:06,000");
        assert_eq!(format_srt_timestamp(61.2346), "00:01:01,235");
        assert_eq!(format_srt_timestamp(3725.5), "01:02:05,500");
        assert_eq!(format_srt_timestamp(59.9996), "00:01:00,000");
    }

    #[test]
    fn test_build_subtitles_scenario() {
        let text = "Hello world. This is a test! Is this working? Yes it is.";
        let timed = build_subtitles(text, 20, 5.0, 1.0).unwrap();
        assert_eq!(timed.len(), 4);
        assert_eq!(timed[1].segment.text, "This is a test!");
        assert_eq!(format_srt_timestamp(timed[1].start_seconds), "00:00:06,000");
        assert_eq!(format_srt_timestamp(timed[1].end_seconds), "00:00:11,000");
    }

    proptest! {
        #[test]
        fn prop_schedule_is_monotonic(
            n in 0usize..200,
            display in 0.001f64..30.0,
            pause in 0.0f64..10.0,
        ) {
            let timed = allocate(&segments(n), display, pause).unwrap();
            for (i, t) in timed.iter().enumerate() {
                prop_assert!(t.start_seconds < t.end_seconds);
                if let Some(next) = timed.get(i + 1) {
                    prop_assert!(t.end_seconds <= next.start_seconds);
                }
            }
        }
    }
}
