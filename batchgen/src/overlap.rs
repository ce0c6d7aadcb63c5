//! Removal of echoed context from continuation-style generation.
//!
//! When part N is generated with the ending of part N-1 as context, the
//! generator sometimes repeats that ending before writing anything new. The
//! trimmer detects the echo with a bag-of-words score and strips it. It is a
//! best-effort safety net: some duplication can survive, and a candidate that
//! merely resembles the context is left alone.

use crate::text::chunker::{char_len, normalize_whitespace};
use crate::text::split_into_sentences;
use log::debug;
use std::collections::HashSet;

/// Similarity above which the candidate is scanned for echoed lines.
pub const SIMILARITY_THRESHOLD: f64 = 0.6;

/// Extra candidate characters compared beyond the tail length.
const LOOKAHEAD_CHARS: usize = 200;

/// Leading candidate lines considered for removal.
const SCAN_LINES: usize = 10;

/// Lines and sentences shorter than this never count as echoes.
const MIN_ECHO_CHARS: usize = 20;

/// Tail length kept by [`Continuation`] unless configured otherwise.
pub const DEFAULT_TAIL_CHARS: usize = 500;

/// Lowercased words longer than three characters.
fn significant_words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| w.chars().count() > 3)
        .map(str::to_lowercase)
        .collect()
}

/// Share of the tail's significant words that reappear near the start of `candidate`.
pub fn similarity(previous_tail: &str, candidate: &str) -> f64 {
    let tail_words = significant_words(previous_tail);
    if tail_words.is_empty() {
        return 0.0;
    }

    let window: String = candidate
        .chars()
        .take(char_len(previous_tail) + LOOKAHEAD_CHARS)
        .collect();
    let candidate_words: HashSet<String> = significant_words(&window).into_iter().collect();

    let shared = tail_words
        .iter()
        .filter(|w| candidate_words.contains(*w))
        .count();

    shared as f64 / tail_words.len() as f64
}

/// Strip the part of `candidate` that repeats `previous_tail`.
///
/// Returns the candidate unchanged when the similarity is at or below
/// [`SIMILARITY_THRESHOLD`] or no echoed line or sentence is found.
pub fn trim_overlap(previous_tail: &str, candidate: &str) -> String {
    let score = similarity(previous_tail, candidate);
    if score <= SIMILARITY_THRESHOLD {
        return candidate.to_string();
    }

    let haystack = normalize_whitespace(previous_tail);
    let is_echo = |text: &str| {
        let text = normalize_whitespace(text);
        char_len(&text) >= MIN_ECHO_CHARS && haystack.contains(&text)
    };

    let lines: Vec<&str> = candidate.lines().collect();
    let cut = lines
        .iter()
        .take(SCAN_LINES)
        .enumerate()
        .filter(|(_, line)| is_echo(**line))
        .map(|(i, _)| i + 1)
        .last()
        .unwrap_or(0);

    let Some((first, rest)) = lines[cut..].split_first() else {
        debug!("Overlap covered the whole candidate ({} lines)", cut);
        return String::new();
    };

    let first_trimmed = strip_echoed_sentences(*first, &is_echo);
    if cut == 0 && first_trimmed.len() == first.len() {
        return candidate.to_string();
    }

    debug!("Trimmed {} echoed lines (similarity {:.2})", cut, score);

    let mut kept: Vec<&str> = Vec::with_capacity(rest.len() + 1);
    if !first_trimmed.trim().is_empty() {
        kept.push(first_trimmed);
    }
    kept.extend_from_slice(rest);
    kept.join("\n").trim_start().to_string()
}

/// Drop leading sentences of `line` that are echoes; returns the remainder.
fn strip_echoed_sentences<'a>(line: &'a str, is_echo: &dyn Fn(&str) -> bool) -> &'a str {
    let mut rest = line.trim_start();
    let mut stripped = false;

    for sentence in split_into_sentences(line) {
        if !is_echo(&sentence) {
            break;
        }
        match rest.strip_prefix(sentence.as_str()) {
            Some(remaining) => {
                rest = remaining.trim_start();
                stripped = true;
            }
            None => break,
        }
    }

    if stripped { rest } else { line }
}

/// Running context for continuation-style batches.
///
/// Keeps the tail of everything accepted so far so the next prompt can carry
/// it, and trims each new output against it.
#[derive(Debug, Clone)]
pub struct Continuation {
    tail_chars: usize,
    tail: String,
}

impl Default for Continuation {
    fn default() -> Self {
        Self::new(DEFAULT_TAIL_CHARS)
    }
}

impl Continuation {
    /// Create a tracker that keeps the last `tail_chars` characters.
    pub fn new(tail_chars: usize) -> Self {
        Self {
            tail_chars: tail_chars.max(1),
            tail: String::new(),
        }
    }

    /// Ending of the accepted output so far, if any.
    pub fn context(&self) -> Option<&str> {
        if self.tail.is_empty() {
            None
        } else {
            Some(&self.tail)
        }
    }

    /// Trim `candidate` against the current tail, record it, and return it.
    pub fn accept(&mut self, candidate: &str) -> String {
        let trimmed = match self.context() {
            Some(tail) => trim_overlap(tail, candidate),
            None => candidate.trim().to_string(),
        };
        self.record(&trimmed);
        trimmed
    }

    /// Append already-accepted output to the tail without trimming it.
    pub fn record(&mut self, accepted: &str) {
        let combined = if self.tail.is_empty() {
            accepted.to_string()
        } else {
            format!("{}\n{}", self.tail, accepted)
        };
        let len = char_len(&combined);
        self.tail = combined
            .chars()
            .skip(len.saturating_sub(self.tail_chars))
            .collect::<String>()
            .trim()
            .to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_echoed_sentence_on_same_line() {
        let prev = "...and the hero walked into the forest.";
        let candidate = "and the hero walked into the forest. Suddenly, a noise echoed.";
        assert_eq!(trim_overlap(prev, candidate), "Suddenly, a noise echoed.");
    }

    #[test]
    fn test_trim_echoed_lines() {
        let prev = "The rain had not stopped for three days.\nMara watched the harbor lights fade.";
        let candidate = "The rain had not stopped for three days.\n\
                         Mara watched the harbor lights fade.\n\
                         A bell rang somewhere below.\n\
                         She went down to meet it.";
        assert_eq!(
            trim_overlap(prev, candidate),
            "A bell rang somewhere below.\nShe went down to meet it."
        );
    }

    #[test]
    fn test_short_lines_are_not_echoes() {
        let prev = "Night fell. Night fell over the quiet valley town.";
        let candidate = "Night fell.\nA wolf called across the valley town night.";
        assert_eq!(trim_overlap(prev, candidate), candidate);
    }

    #[test]
    fn test_dissimilar_candidate_unchanged() {
        let prev = "The committee adjourned without reaching any decision.";
        let candidate = "Meanwhile, across town, a bakery opened its doors.";
        assert!(similarity(prev, candidate) < SIMILARITY_THRESHOLD);
        assert_eq!(trim_overlap(prev, candidate), candidate);
    }

    #[test]
    fn test_similar_but_no_verbatim_echo_unchanged() {
        let prev = "The hero walked into the forest carrying a lantern.";
        let candidate = "Carrying the lantern, the hero walked deeper into the forest.";
        assert!(similarity(prev, candidate) > SIMILARITY_THRESHOLD);
        assert_eq!(trim_overlap(prev, candidate), candidate);
    }

    #[test]
    fn test_similarity_is_case_insensitive() {
        assert_eq!(similarity("Quiet Harbor Lights", "quiet harbor lights"), 1.0);
        assert_eq!(similarity("a an the", "a an the"), 0.0);
    }

    #[test]
    fn test_continuation_tracks_tail_and_trims() {
        let mut continuation = Continuation::new(60);
        assert!(continuation.context().is_none());

        let first = continuation.accept("  Part one ends as the hero walked into the forest.  ");
        assert_eq!(first, "Part one ends as the hero walked into the forest.");
        assert!(continuation.context().unwrap().ends_with("into the forest."));

        let second = continuation.accept("the hero walked into the forest. Then the trees moved.");
        assert_eq!(second, "Then the trees moved.");
        let tail = continuation.context().unwrap();
        assert!(tail.ends_with("Then the trees moved."));
        assert!(tail.chars().count() <= 60);
    }

    #[test]
    fn test_record_rebuilds_tail_without_trimming() {
        let mut continuation = Continuation::new(30);
        continuation.record("first accepted part.");
        continuation.record("second accepted part.");
        // 42 chars combined, the last 30 kept
        assert_eq!(continuation.context(), Some("ed part.\nsecond accepted part."));
    }
}
