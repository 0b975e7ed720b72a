//! Heuristic sentence splitter.
//!
//! A sentence ends at `.`, `?` or `!` followed by a single whitespace
//! character, which is consumed as the separator. The break is suppressed
//! after dotted initials (`U.S. `, `e.g. `) and after a capitalized
//! two-letter abbreviation (`Mr. `, `Dr. `).
//!
//! Known limitations, accepted as-is:
//! - longer abbreviations (`Mrs. `, `etc. `) still break
//! - a number ending a sentence is indistinguishable from a decimal point
//!   only when no whitespace follows, so `3. 5` splits
//! - quotes and brackets after the terminator (`."`) prevent a break

use std::ops::Range;

/// Split `text` into sentence spans (byte ranges into `text`).
///
/// Separators are not part of any span. There is always at least one span,
/// possibly empty.
pub fn split_sentences(text: &str) -> Vec<Range<usize>> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut spans = Vec::new();
    let mut start = 0;

    for (i, &(offset, c)) in chars.iter().enumerate() {
        if !c.is_whitespace() || !is_break_after(&chars, i) {
            continue;
        }
        spans.push(start..offset);
        start = offset + c.len_utf8();
    }
    spans.push(start..text.len());
    spans
}

/// Split `text` into sentence slices.
pub fn sentences(text: &str) -> Vec<&str> {
    split_sentences(text)
        .into_iter()
        .map(|span| &text[span])
        .collect()
}

/// Whether the whitespace at `chars[i]` separates two sentences.
fn is_break_after(chars: &[(usize, char)], i: usize) -> bool {
    let at = |back: usize| chars[i - back].1;

    if i == 0 || !matches!(at(1), '.' | '?' | '!') {
        return false;
    }

    // "U.S.": word, dot, word, terminator
    if i >= 4 && is_word(at(4)) && at(3) == '.' && is_word(at(2)) {
        return false;
    }

    // "Mr.": capital, lowercase, dot
    if i >= 3 && at(3).is_ascii_uppercase() && at(2).is_ascii_lowercase() && at(1) == '.' {
        return false;
    }

    true
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminators() {
        assert_eq!(
            sentences("It rained. Did it stop? No! It poured."),
            vec!["It rained.", "Did it stop?", "No!", "It poured."]
        );
    }

    #[test]
    fn newline_is_a_separator() {
        assert_eq!(sentences("One.\nTwo."), vec!["One.", "Two."]);
    }

    #[test]
    fn title_abbreviation_does_not_split() {
        assert_eq!(
            sentences("Mr. Smith arrived. He sat."),
            vec!["Mr. Smith arrived.", "He sat."]
        );
    }

    #[test]
    fn dotted_initials_do_not_split() {
        assert_eq!(
            sentences("She moved to the U.S. last year. Then back."),
            vec!["She moved to the U.S. last year.", "Then back."]
        );
    }

    #[test]
    fn only_one_whitespace_is_consumed() {
        let text = "Wait.  Then go.";
        assert_eq!(sentences(text), vec!["Wait.", " Then go."]);
    }

    #[test]
    fn terminator_without_whitespace_is_not_a_break() {
        assert_eq!(sentences("Pi is 3.14 roughly."), vec!["Pi is 3.14 roughly."]);
    }

    #[test]
    fn empty_text_is_one_empty_span() {
        assert_eq!(split_sentences(""), vec![0..0]);
    }

    #[test]
    fn trailing_separator_leaves_empty_last_span() {
        let text = "Done.\n";
        assert_eq!(split_sentences(text), vec![0..5, 6..6]);
    }

    #[test]
    fn spans_are_byte_offsets() {
        let text = "Café opens. Tea?";
        let spans = split_sentences(text);
        assert_eq!(&text[spans[0].clone()], "Café opens.");
        assert_eq!(&text[spans[1].clone()], "Tea?");
    }
}
