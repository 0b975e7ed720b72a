//! Trim engine: shorten a token sequence to a limit in whole units.
//!
//! Every trimmer shares one contract: the input is returned unchanged when the
//! direction is [`TrimDirection::None`] or it already fits; otherwise the
//! result is the longest prefix (`Bottom`) or suffix (`Top`) made of whole
//! units that fits in `limit` tokens.
//!
//! | Unit | Fits when |
//! |------|-----------|
//! | token | `len ≤ limit` |
//! | newline | `len ≤ limit`, lines re-encoded with their `\n` |
//! | sentence | `len < limit`, candidates re-encoded from the decoded text |

use akyuu_core::error::TokenizerError;
use akyuu_core::policy::TrimDirection;
use akyuu_core::tokenizer::{TokenId, Tokenizer};

use crate::sentence::split_sentences;

/// Keep the first (`Bottom`) or last (`Top`) `limit` tokens.
pub fn trim_tokens(tokens: &[TokenId], direction: TrimDirection, limit: usize) -> Vec<TokenId> {
    if tokens.len() <= limit {
        return tokens.to_vec();
    }
    match direction {
        TrimDirection::Top => tokens[tokens.len() - limit..].to_vec(),
        TrimDirection::Bottom => tokens[..limit].to_vec(),
        TrimDirection::None => tokens.to_vec(),
    }
}

/// Keep whole `\n`-delimited lines.
///
/// Lines are re-encoded one at a time (`Top`: `"\n" + line`, `Bottom`:
/// `line + "\n"`) and accumulated until the next one would overflow.
pub fn trim_newlines(
    tokenizer: &dyn Tokenizer,
    tokens: &[TokenId],
    direction: TrimDirection,
    limit: usize,
) -> Result<Vec<TokenId>, TokenizerError> {
    if direction == TrimDirection::None || tokens.len() <= limit {
        return Ok(tokens.to_vec());
    }

    let text = tokenizer.decode(tokens)?;
    let lines: Vec<&str> = text.split('\n').collect();
    let mut kept: Vec<Vec<TokenId>> = Vec::new();
    let mut used = 0;

    let ordered: Box<dyn Iterator<Item = &&str>> = match direction {
        TrimDirection::Top => Box::new(lines.iter().rev()),
        _ => Box::new(lines.iter()),
    };

    for line in ordered {
        let piece = match direction {
            TrimDirection::Top => format!("\n{line}"),
            _ => format!("{line}\n"),
        };
        let encoded = tokenizer.encode(&piece)?;
        if used + encoded.len() > limit {
            break;
        }
        used += encoded.len();
        kept.push(encoded);
    }

    if direction == TrimDirection::Top {
        kept.reverse();
    }
    Ok(kept.concat())
}

/// Keep whole sentences.
///
/// `Top` extends the kept suffix leftward one sentence at a time, skipping a
/// single leading space of each candidate; `Bottom` extends the kept prefix
/// rightward, absorbing one `\n` after each sentence. The walk stops at the
/// first candidate that encodes to `limit` tokens or more and returns the
/// previous one.
pub fn trim_sentences(
    tokenizer: &dyn Tokenizer,
    tokens: &[TokenId],
    direction: TrimDirection,
    limit: usize,
) -> Result<Vec<TokenId>, TokenizerError> {
    if direction == TrimDirection::None || tokens.len() <= limit {
        return Ok(tokens.to_vec());
    }

    let text = tokenizer.decode(tokens)?;
    let spans = split_sentences(&text);

    match direction {
        TrimDirection::Top => {
            let mut kept_start = text.len();
            for span in spans.iter().rev() {
                let mut start = span.start;
                if text[start..].starts_with(' ') {
                    start += 1;
                }
                if tokenizer.count(&text[start..])? >= limit {
                    return tokenizer.encode(&text[kept_start..]);
                }
                kept_start = start;
            }
        }
        TrimDirection::Bottom => {
            let mut kept_end = 0;
            for span in &spans {
                let mut end = span.end;
                if text[end..].starts_with('\n') {
                    end += 1;
                }
                if tokenizer.count(&text[..end])? >= limit {
                    return tokenizer.encode(&text[..kept_end]);
                }
                kept_end = end;
            }
        }
        TrimDirection::None => {}
    }

    Ok(tokens.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::ByteTokenizer;

    fn enc(text: &str) -> Vec<TokenId> {
        ByteTokenizer.encode(text).unwrap()
    }

    fn dec(tokens: &[TokenId]) -> String {
        ByteTokenizer.decode(tokens).unwrap()
    }

    // ── Tokens ──────────────────────────────────────────────────────────

    #[test]
    fn token_top_keeps_tail() {
        let out = trim_tokens(&enc("abcdef"), TrimDirection::Top, 4);
        assert_eq!(dec(&out), "cdef");
    }

    #[test]
    fn token_bottom_keeps_head() {
        let out = trim_tokens(&enc("abcdef"), TrimDirection::Bottom, 4);
        assert_eq!(dec(&out), "abcd");
    }

    #[test]
    fn token_none_never_trims() {
        let out = trim_tokens(&enc("abcdef"), TrimDirection::None, 2);
        assert_eq!(dec(&out), "abcdef");
    }

    #[test]
    fn token_zero_limit_is_empty() {
        assert!(trim_tokens(&enc("abc"), TrimDirection::Top, 0).is_empty());
    }

    // ── Newlines ────────────────────────────────────────────────────────

    #[test]
    fn newline_fitting_input_is_unchanged() {
        let tokens = enc("one\ntwo");
        let out = trim_newlines(&ByteTokenizer, &tokens, TrimDirection::Top, 7).unwrap();
        assert_eq!(out, tokens);
    }

    #[test]
    fn newline_top_keeps_last_whole_lines() {
        let tokens = enc("first line\nsecond\nthird");
        // "\nsecond" (7) + "\nthird" (6) = 13; adding "\nfirst line" would be 24
        let out = trim_newlines(&ByteTokenizer, &tokens, TrimDirection::Top, 15).unwrap();
        assert_eq!(dec(&out), "\nsecond\nthird");
    }

    #[test]
    fn newline_bottom_keeps_first_whole_lines() {
        let tokens = enc("first\nsecond\nthird line");
        let out = trim_newlines(&ByteTokenizer, &tokens, TrimDirection::Bottom, 14).unwrap();
        assert_eq!(dec(&out), "first\nsecond\n");
    }

    #[test]
    fn newline_never_splits_a_line() {
        let tokens = enc("a very long single line without breaks");
        let out = trim_newlines(&ByteTokenizer, &tokens, TrimDirection::Bottom, 10).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn newline_none_never_trims() {
        let tokens = enc("one\ntwo\nthree");
        let out = trim_newlines(&ByteTokenizer, &tokens, TrimDirection::None, 3).unwrap();
        assert_eq!(out, tokens);
    }

    // ── Sentences ───────────────────────────────────────────────────────

    #[test]
    fn sentence_top_keeps_last_whole_sentences() {
        let tokens = enc("The sun set. Night fell. Owls woke.");
        let out = trim_sentences(&ByteTokenizer, &tokens, TrimDirection::Top, 23).unwrap();
        assert_eq!(dec(&out), "Night fell. Owls woke.");
    }

    #[test]
    fn sentence_bottom_keeps_first_whole_sentences() {
        let tokens = enc("The sun set. Night fell. Owls woke.");
        let out = trim_sentences(&ByteTokenizer, &tokens, TrimDirection::Bottom, 20).unwrap();
        assert_eq!(dec(&out), "The sun set.");
    }

    #[test]
    fn sentence_bottom_absorbs_trailing_newline() {
        let tokens = enc("Line one.\nLine two is longer.");
        let out = trim_sentences(&ByteTokenizer, &tokens, TrimDirection::Bottom, 12).unwrap();
        assert_eq!(dec(&out), "Line one.\n");
    }

    #[test]
    fn sentence_limit_is_strict() {
        // "Owls woke." is exactly 10 tokens, which does not fit a limit of 10.
        let tokens = enc("Night fell. Owls woke.");
        let out = trim_sentences(&ByteTokenizer, &tokens, TrimDirection::Top, 10).unwrap();
        assert!(out.is_empty());
        let out = trim_sentences(&ByteTokenizer, &tokens, TrimDirection::Top, 11).unwrap();
        assert_eq!(dec(&out), "Owls woke.");
    }

    #[test]
    fn sentence_top_skips_one_leading_space() {
        let tokens = enc("Wait.  Then go.");
        let out = trim_sentences(&ByteTokenizer, &tokens, TrimDirection::Top, 12).unwrap();
        assert_eq!(dec(&out), "Then go.");
    }

    #[test]
    fn sentence_result_never_exceeds_limit() {
        let text = "Reimu swept. Marisa laughed loudly! Was it noon? Yes. The end came.";
        let tokens = enc(text);
        for limit in 0..tokens.len() {
            for direction in [TrimDirection::Top, TrimDirection::Bottom] {
                let out = trim_sentences(&ByteTokenizer, &tokens, direction, limit).unwrap();
                assert!(out.len() <= limit, "{direction:?} limit {limit}: {}", dec(&out));
                let kept = dec(&out);
                match direction {
                    TrimDirection::Top => assert!(text.ends_with(&kept)),
                    _ => assert!(text.starts_with(&kept)),
                }
            }
        }
    }
}
