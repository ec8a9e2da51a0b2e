//! Pure text transforms for the batch processor: URL extraction and
//! rewriting plain-text title mentions into internal note links.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("static regex"));

// Anchors are matched whole so their text is never rewritten; any other
// tag is matched singly so attribute values stay untouched.
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<a\b[^>]*>.*?</a>|<[^>]*>").expect("static regex"));

const MIN_TITLE_LEN: usize = 3;

/// Extract URLs from note body text, in order of appearance, de-duplicated,
/// with trailing punctuation stripped.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in URL_RE.find_iter(text) {
        let url = trim_url(m.as_str());
        if url.is_empty() {
            continue;
        }
        if !seen.iter().any(|s| s == url) {
            seen.push(url.to_string());
        }
    }
    seen
}

// A trailing `)` is only punctuation when unbalanced; wiki-style URLs
// like .../Rust_(language) keep theirs.
fn trim_url(mut url: &str) -> &str {
    loop {
        let trimmed = url.trim_end_matches(['.', ',', ';', ':', '!', '?', '\'', '"']);
        if trimmed.ends_with(')')
            && trimmed.matches('(').count() < trimmed.matches(')').count()
        {
            url = &trimmed[..trimmed.len() - 1];
            continue;
        }
        return trimmed;
    }
}

/// A note title that plain-text mentions may be linked to.
#[derive(Debug, Clone)]
pub struct LinkCandidate {
    pub title: String,
    pub note_id: String,
}

impl LinkCandidate {
    pub fn new(title: impl Into<String>, note_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            note_id: note_id.into(),
        }
    }
}

/// Rewrite plain-text occurrences of candidate titles into internal
/// hyperlinks. Returns the new body and the number of links added.
///
/// Titles shared by several candidates are ambiguous and skipped, as are
/// titles shorter than three characters. Matching is case-sensitive, on
/// word boundaries, longest title first; text inside existing tags or
/// anchors is never touched.
pub fn link_titles(body: &str, candidates: &[LinkCandidate]) -> (String, usize) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for c in candidates {
        *counts.entry(c.title.as_str()).or_default() += 1;
    }
    let mut usable: Vec<(&str, &str)> = candidates
        .iter()
        .filter(|c| c.title.chars().count() >= MIN_TITLE_LEN)
        .filter(|c| counts.get(c.title.as_str()) == Some(&1))
        .map(|c| (c.title.as_str(), c.note_id.as_str()))
        .collect();
    if usable.is_empty() {
        return (body.to_string(), 0);
    }
    usable.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = String::with_capacity(body.len());
    let mut links = 0;
    let mut last = 0;
    for m in TAG_RE.find_iter(body) {
        let (rewritten, n) = rewrite_text(&body[last..m.start()], &usable);
        out.push_str(&rewritten);
        links += n;
        out.push_str(m.as_str());
        last = m.end();
    }
    let (rewritten, n) = rewrite_text(&body[last..], &usable);
    out.push_str(&rewritten);
    links += n;

    (out, links)
}

fn rewrite_text(text: &str, candidates: &[(&str, &str)]) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut links = 0;
    let mut rest = text;

    loop {
        // Earliest valid match wins; candidates are pre-sorted longest
        // first, so at equal positions the longer title takes precedence.
        let mut best: Option<(usize, &str, &str)> = None;
        for &(title, id) in candidates {
            let mut offset = 0;
            while let Some(pos) = rest[offset..].find(title) {
                let abs = offset + pos;
                if boundary_ok(rest, abs, title.len()) {
                    if best.map_or(true, |(b, _, _)| abs < b) {
                        best = Some((abs, title, id));
                    }
                    break;
                }
                offset = abs + title.len();
            }
        }

        match best {
            Some((pos, title, id)) => {
                out.push_str(&rest[..pos]);
                out.push_str(&format!("<a href=\"#root/{}\">{}</a>", id, title));
                links += 1;
                rest = &rest[pos + title.len()..];
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }

    (out, links)
}

fn boundary_ok(text: &str, start: usize, len: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric());
    let after_ok = text[start + len..]
        .chars()
        .next()
        .map_or(true, |c| !c.is_alphanumeric());
    before_ok && after_ok
}
