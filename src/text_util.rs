use std::ops::Range;

/// Marker inserted before a highlighted term in a snippet.
pub const MARK_OPEN: &str = "<mark>";

/// Marker inserted after a highlighted term in a snippet.
pub const MARK_CLOSE: &str = "</mark>";

/// Maximum number of characters in a snippet before truncation.
pub const DEFAULT_SNIPPET_MAX_CHARS: usize = 200;

/// Turn a file stem into a human title.
///
/// `-` and `_` become spaces and each word is capitalised, so
/// `node-pools_v1` becomes `Node Pools V1`.
pub fn title_from_stem(stem: &str) -> String {
    stem.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Trim trailing whitespace on every line and fold runs of blank lines
/// into a single blank line. Leading and trailing blank lines are dropped.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_blank = false;

    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if pending_blank {
            out.push_str("\n\n");
            pending_blank = false;
        } else if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }

    out
}

/// Wrap each highlighted byte range of `fragment` in `<mark>` tags.
///
/// Ranges must be sorted and non-overlapping, which is what the tantivy
/// snippet generator produces. Ranges that do not fall on character
/// boundaries are skipped.
pub fn mark_ranges(fragment: &str, ranges: &[Range<usize>]) -> String {
    let mut out = String::with_capacity(
        fragment.len() + ranges.len() * (MARK_OPEN.len() + MARK_CLOSE.len()),
    );
    let mut cursor = 0;

    for range in ranges {
        if range.start < cursor {
            continue;
        }
        let (Some(before), Some(term)) =
            (fragment.get(cursor..range.start), fragment.get(range.clone()))
        else {
            continue;
        };
        out.push_str(before);
        out.push_str(MARK_OPEN);
        out.push_str(term);
        out.push_str(MARK_CLOSE);
        cursor = range.end;
    }

    out.push_str(fragment.get(cursor..).unwrap_or_default());
    out
}

/// The first `max_chars` characters of `text` on a single line, with `...`
/// appended when truncated. Used when no content term matched.
pub fn leading_excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", flat[..cut].trim_end()),
        None => flat,
    }
}
