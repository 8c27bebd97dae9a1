/// Text matching for palette queries
///
/// Tries, in order, a prefix match, a word-start match and a plain substring
/// match, all case-insensitive. The first strategy that succeeds decides which
/// characters get highlighted.

/// Highlighted character range `[start, end)`, counted in chars, not bytes
pub type Span = (usize, usize);

/// Highlights for the two texts a candidate can match on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchHighlights {
    pub label: Vec<Span>,
    pub alias: Vec<Span>,
}

/// Match `query` against `text`
///
/// Returns `None` when nothing matches. An empty query matches anything and
/// highlights nothing.
pub fn match_text(query: &str, text: &str) -> Option<Vec<Span>> {
    if query.trim().is_empty() {
        return Some(Vec::new());
    }

    let query: Vec<char> = query.chars().collect();
    let text: Vec<char> = text.chars().collect();

    match_prefix(&query, &text)
        .or_else(|| match_words(&query, &text))
        .or_else(|| match_contiguous(&query, &text))
}

/// Match a candidate by its label or its alias
///
/// When only the alias matches, the label is kept without highlights.
pub fn match_candidate(query: &str, label: &str, alias: Option<&str>) -> Option<MatchHighlights> {
    let label_spans = match_text(query, label);
    let alias_spans = alias.and_then(|alias| match_text(query, alias));

    if label_spans.is_none() && alias_spans.is_none() {
        return None;
    }

    Some(MatchHighlights {
        label: label_spans.unwrap_or_default(),
        alias: alias_spans.unwrap_or_default(),
    })
}

fn match_prefix(query: &[char], text: &[char]) -> Option<Vec<Span>> {
    starts_with_ignore_case(text, query).then(|| vec![(0, query.len())])
}

// Every query word has to start some text word, in the same order
fn match_words(query: &[char], text: &[char]) -> Option<Vec<Span>> {
    let query_words = words(query);
    if query_words.is_empty() {
        return None;
    }

    let text_words = words(text);
    let mut spans = Vec::with_capacity(query_words.len());
    let mut next = 0;

    for &(q_start, q_end) in &query_words {
        let needle = &query[q_start..q_end];
        let offset = text_words[next..]
            .iter()
            .position(|&(start, end)| starts_with_ignore_case(&text[start..end], needle))?;

        let (start, _) = text_words[next + offset];
        spans.push((start, start + needle.len()));
        next += offset + 1;
    }

    Some(spans)
}

fn match_contiguous(query: &[char], text: &[char]) -> Option<Vec<Span>> {
    if query.len() > text.len() {
        return None;
    }

    (0..=text.len() - query.len())
        .find(|&start| starts_with_ignore_case(&text[start..], query))
        .map(|start| vec![(start, start + query.len())])
}

// Ranges of whitespace-separated words
fn words(chars: &[char]) -> Vec<Span> {
    let mut out = Vec::new();
    let mut start = None;

    for (index, c) in chars.iter().enumerate() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push((s, index));
                start = None;
            }
            (false, None) => start = Some(index),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, chars.len()));
    }

    out
}

fn starts_with_ignore_case(text: &[char], prefix: &[char]) -> bool {
    prefix.len() <= text.len()
        && text
            .iter()
            .zip(prefix)
            .all(|(&a, &b)| chars_eq_ignore_case(a, b))
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}
