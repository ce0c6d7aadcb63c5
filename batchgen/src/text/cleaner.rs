//! Typographic cleanup applied before segmentation at call sites that ask for it.

/// Typographic characters and their plain replacements.
const REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201c}', "\""),
    ('\u{201d}', "\""),
    ('\u{00ab}', "\""),
    ('\u{00bb}', "\""),
    ('\u{2013}', "-"),
    ('\u{2014}', "-"),
    ('\u{2011}', "-"),
    ('\u{2026}', "..."),
    ('\u{00a0}', " "),
    ('\u{200b}', ""),
    ('\u{200c}', ""),
    ('\u{200d}', ""),
    ('\u{feff}', ""),
];

/// Clean text before it is segmented.
///
/// Replaces smart quotes, dashes, ellipses and invisible characters with plain
/// equivalents, drops control characters other than newline and tab, collapses
/// horizontal whitespace, keeps at most one blank line between paragraphs and
/// tidies runs of periods (`..` becomes `.`, four or more become `...`).
pub fn clean_text(text: &str) -> String {
    let mut replaced = String::with_capacity(text.len());

    for c in text.chars() {
        match REPLACEMENTS.iter().find(|(ch, _)| *ch == c) {
            Some((_, r)) => replaced.push_str(r),
            None if c == '\n' || c == '\t' || !c.is_control() => replaced.push(c),
            None => {}
        }
    }

    collapse_period_runs(&collapse_whitespace(&replaced))
}

fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !result.is_empty() {
            result.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        result.push_str(&line);
        blank_run = 0;
    }

    result
}

fn collapse_period_runs(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut run = 0;

    for c in text.chars() {
        if c == '.' {
            run += 1;
            continue;
        }
        push_periods(&mut result, run);
        run = 0;
        result.push(c);
    }
    push_periods(&mut result, run);

    result
}

fn push_periods(result: &mut String, run: usize) {
    match run {
        0 => {}
        1 | 2 => result.push('.'),
        _ => result.push_str("..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_smart_quotes() {
        let text = "\u{201c}Cut,\u{201d} said the director. \u{2018}Again.\u{2019}";
        assert_eq!(clean_text(text), "\"Cut,\" said the director. 'Again.'");
    }

    #[test]
    fn test_clean_dashes_and_ellipsis() {
        assert_eq!(clean_text("intro\u{2014}outro\u{2026} done"), "intro-outro... done");
    }

    #[test]
    fn test_period_runs() {
        assert_eq!(clean_text("Wait.. what.... ok... fine."), "Wait. what... ok... fine.");
    }

    #[test]
    fn test_paragraphs_preserved_single_blank_line() {
        let text = "  Scene one   opens \n\n\n\n\tScene two\nstill two ";
        assert_eq!(clean_text(text), "Scene one opens\n\nScene two\nstill two");
    }

    #[test]
    fn test_control_and_invisible_chars_dropped() {
        assert_eq!(clean_text("Hook\x00line\u{200b}\u{feff}\x07sinker"), "Hooklinesinker");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_text(" \n\t\n "), "");
    }
}
