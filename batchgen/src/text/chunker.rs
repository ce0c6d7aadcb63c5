//! Bounded splitting of text into segment-sized pieces.
//!
//! All lengths are counted in `char`s so cuts never land inside a UTF-8 sequence.

use super::sentences::split_into_sentences;

/// Secondary punctuation preferred over plain whitespace when re-splitting an
/// over-long sentence.
const SECONDARY_BREAKS: &[char] = &[';', ':', ','];

/// Separator placed between paragraphs that share a proportional part.
const PARAGRAPH_SEPARATOR: &str = "\n\n";

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Collapse every whitespace run (newlines included) into a single space.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text on word boundaries into pieces of at most `max_chars`.
///
/// Backtracks to the nearest whitespace before the cap; a run with no
/// whitespace inside the window is cut hard at `max_chars`.
pub fn split_on_words(text: &str, max_chars: usize) -> Vec<String> {
    split_bounded(text, max_chars, false)
}

/// Pack sentences greedily into chunks of at most `max_chars`.
///
/// A sentence longer than the cap is re-split on its own, preferring `; : ,`
/// once the break lies at least halfway into the window.
pub fn split_on_sentences(text: &str, max_chars: usize) -> Vec<String> {
    let text = normalize_whitespace(text);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_into_sentences(&text) {
        let len = char_len(&sentence);

        if len > max_chars {
            flush(&mut chunks, &mut current);
            chunks.extend(split_long_sentence(&sentence, max_chars));
        } else if current.is_empty() {
            current = sentence;
        } else if char_len(&current) + 1 + len <= max_chars {
            current.push(' ');
            current.push_str(&sentence);
        } else {
            flush(&mut chunks, &mut current);
            current = sentence;
        }
    }

    flush(&mut chunks, &mut current);
    chunks
}

/// Split a single over-long sentence at natural break points.
fn split_long_sentence(sentence: &str, max_chars: usize) -> Vec<String> {
    split_bounded(sentence, max_chars, true)
}

/// Split text into `parts` pieces along paragraph boundaries.
///
/// Paragraphs accumulate until the next one would push the part past
/// `ceil(len / parts)`; the last part absorbs whatever remains. A part is also
/// closed early when the paragraphs left could not otherwise fill the parts
/// still owed, so `parts <= paragraphs` always yields exactly `parts` pieces.
pub fn split_proportional(text: &str, parts: usize) -> Vec<String> {
    let paragraphs = split_into_paragraphs(text);
    if paragraphs.is_empty() {
        return Vec::new();
    }

    let target = char_len(text).div_ceil(parts);
    let total = paragraphs.len();
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, paragraph) in paragraphs.into_iter().enumerate() {
        if !current.is_empty() && chunks.len() + 1 < parts {
            let would_exceed = char_len(&current) + char_len(PARAGRAPH_SEPARATOR) + char_len(&paragraph)
                > target;
            let starved = chunks.len() + (total - i) < parts;
            if would_exceed || starved {
                chunks.push(std::mem::take(&mut current));
            }
        }

        if !current.is_empty() {
            current.push_str(PARAGRAPH_SEPARATOR);
        }
        current.push_str(&paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Every non-blank line becomes a piece; lines over `auto_split` are word-split.
pub fn split_lines(text: &str, auto_split: Option<usize>) -> Vec<String> {
    let mut chunks = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match auto_split {
            Some(max_chars) if char_len(line) > max_chars => {
                chunks.extend(split_on_words(line, max_chars));
            }
            _ => chunks.push(line.to_string()),
        }
    }

    chunks
}

/// Group lines into paragraphs separated by blank lines.
fn split_into_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs
}

/// Walk the text left to right cutting windows of at most `max_chars`.
fn split_bounded(text: &str, max_chars: usize, prefer_punctuation: bool) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;

    loop {
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
        if start >= chars.len() {
            break;
        }

        if chars.len() - start <= max_chars {
            push_piece(&mut pieces, &chars[start..]);
            break;
        }

        // One char past the cap, so a space sitting exactly at the cap counts.
        let window = &chars[start..=start + max_chars];
        let (end, resume) = find_break(window, max_chars, prefer_punctuation);
        push_piece(&mut pieces, &chars[start..start + end]);
        start += resume;
    }

    pieces
}

/// Pick the cut inside `window`: `(piece_end, resume_at)`, both window-relative.
fn find_break(window: &[char], max_chars: usize, prefer_punctuation: bool) -> (usize, usize) {
    if prefer_punctuation {
        let halfway = max_chars.div_ceil(2);
        let punct = (0..max_chars)
            .rev()
            .find(|&i| SECONDARY_BREAKS.contains(&window[i]));
        if let Some(i) = punct.filter(|&i| i + 1 >= halfway) {
            return (i + 1, i + 1);
        }
    }

    match (1..=max_chars).rev().find(|&i| window[i].is_whitespace()) {
        Some(i) => (i, i + 1),
        None => (max_chars, max_chars),
    }
}

fn push_piece(pieces: &mut Vec<String>, chars: &[char]) {
    let piece: String = chars.iter().collect();
    let piece = piece.trim();
    if !piece.is_empty() {
        pieces.push(piece.to_string());
    }
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    let chunk = current.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
    current.clear();
}
