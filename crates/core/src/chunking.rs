use regex::Regex;
use std::sync::OnceLock;

/// Upper bound on chunk size, counted in whitespace-delimited words.
pub const DEFAULT_CHUNK_WORDS: usize = 500;

/// Cleans raw extracted text before chunking or embedding. Applied in order:
/// spurious intra-word splits are merged, end-of-line hyphenation is joined,
/// and remaining whitespace runs collapse to single spaces.
///
/// The split repair is a heuristic: a one-letter word sitting one or two
/// spaces away from another word is treated as a broken fragment and merged.
/// Legitimately separate one-letter words ("a cat" -> "acat") get merged too.
/// That imprecision is a known property of the cleaner, not something callers
/// should try to compensate for.
///
/// The output is stable under re-application.
pub fn normalize_extracted(text: &str) -> String {
    let repaired = dehyphenate(&merge_split_words(text));
    let mut current = collapse_whitespace(&repaired);

    // Collapsing can narrow a 3+ space gap into merge range, so repair again
    // until the text stops changing.
    loop {
        let next = collapse_whitespace(&merge_split_words(&current));
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Splits normalized text into non-overlapping, order-preserving chunks of at
/// most `max_words` whitespace-delimited words each, joined by single spaces.
/// The final chunk may be shorter. Boundaries never fall mid-word. Empty
/// input produces no chunks.
pub fn chunk_words(text: &str, max_words: usize) -> Vec<String> {
    if max_words == 0 {
        return Vec::new();
    }

    text.split_whitespace()
        .collect::<Vec<_>>()
        .chunks(max_words)
        .map(|run| run.join(" "))
        .collect()
}

fn merge_split_words(text: &str) -> String {
    text.split('\n')
        .map(merge_split_words_in_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn merge_split_words_in_line(line: &str) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_gap = 0usize;

    for piece in line.split(' ') {
        if piece.is_empty() {
            pending_gap += 1;
            continue;
        }

        let gap = pending_gap + 1;
        pending_gap = 0;

        match tokens.last_mut() {
            Some(previous) if gap <= 2 && is_split_fragment(previous, piece) => {
                previous.push_str(piece);
            }
            _ => tokens.push(piece.to_string()),
        }
    }

    tokens.join(" ")
}

fn is_split_fragment(previous: &str, next: &str) -> bool {
    let boundary_ok = previous.chars().next_back().is_some_and(is_word_char)
        && next.chars().next().is_some_and(is_word_char);
    let has_fragment = previous.chars().count() == 1 || next.chars().count() == 1;
    boundary_ok && has_fragment
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn dehyphenate(text: &str) -> String {
    static LINE_BREAK_HYPHEN: OnceLock<Regex> = OnceLock::new();
    let re = LINE_BREAK_HYPHEN
        .get_or_init(|| Regex::new(r"(\w)-\r?\n[ \t]*(\w)").expect("hard-coded pattern"));
    re.replace_all(text, "${1}${2}").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
