//! Heuristic sentence splitting.
//!
//! A sentence ends at `.`, `!` or `?` when the terminator is followed by
//! whitespace, a quote, or the end of the text. Closing quotes directly after
//! the terminator stay with the sentence; an opening curly quote starts the
//! next one. Abbreviations ("Mr. Smith")
//! still split; decimals ("3.14") do not, since no whitespace follows the dot.

const TERMINATORS: &[char] = &['.', '!', '?'];
const QUOTES: &[char] = &['"', '\'', '\u{201d}', '\u{2019}'];
const OPENING_QUOTES: &[char] = &['\u{201c}', '\u{2018}'];

/// Split text into trimmed, non-empty sentences in source order.
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        if !TERMINATORS.contains(&chars[i]) {
            i += 1;
            continue;
        }

        let end = match chars.get(i + 1) {
            None => i + 1,
            Some(c) if c.is_whitespace() || OPENING_QUOTES.contains(c) => i + 1,
            Some(c) if QUOTES.contains(c) => {
                let mut j = i + 1;
                while j < chars.len() && QUOTES.contains(&chars[j]) {
                    j += 1;
                }
                j
            }
            Some(_) => {
                i += 1;
                continue;
            }
        };

        push_trimmed(&mut sentences, &chars[start..end]);
        start = end;
        i = end;
    }

    push_trimmed(&mut sentences, &chars[start..]);
    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, chars: &[char]) {
    let sentence: String = chars.iter().collect();
    let sentence = sentence.trim();
    if !sentence.is_empty() {
        sentences.push(sentence.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_terminators() {
        let sentences = split_into_sentences("Hello world. This is a test! Is this working? Yes it is.");
        assert_eq!(
            sentences,
            vec!["Hello world.", "This is a test!", "Is this working?", "Yes it is."]
        );
    }

    #[test]
    fn test_trailing_fragment_without_terminator() {
        assert_eq!(split_into_sentences("Done. And then"), vec!["Done.", "And then"]);
    }

    #[test]
    fn test_closing_quote_stays_with_sentence() {
        assert_eq!(
            split_into_sentences("She said \"Stop.\" Then silence."),
            vec!["She said \"Stop.\"", "Then silence."]
        );
    }

    #[test]
    fn test_opening_curly_quote_starts_next_sentence() {
        assert_eq!(
            split_into_sentences("It ended.\u{201c}Next,\u{201d} she said."),
            vec!["It ended.", "\u{201c}Next,\u{201d} she said."]
        );
    }

    #[test]
    fn test_decimals_do_not_split() {
        assert_eq!(split_into_sentences("Pi is 3.14 today."), vec!["Pi is 3.14 today."]);
    }

    #[test]
    fn test_abbreviation_is_a_known_false_break() {
        assert_eq!(split_into_sentences("Mr. Smith left."), vec!["Mr.", "Smith left."]);
    }

    #[test]
    fn test_repeated_terminators() {
        assert_eq!(split_into_sentences("Wait... what?! No."), vec!["Wait...", "what?!", "No."]);
    }

    #[test]
    fn test_whitespace_only() {
        assert!(split_into_sentences("   ").is_empty());
    }
}
