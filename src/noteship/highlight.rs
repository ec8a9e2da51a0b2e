//! Reading-highlight extraction for web-clipped notes.
//!
//! A `#clipType` note holds a full clipped page; after reading, only the
//! highlighted spans (inline `background-color` styles) and hyperlinks
//! matter. Extraction keeps those fragments in document order, strips the
//! background color, and regroups them by their original paragraph.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<p\b[^>]*>.*?</p>|<div\b[^>]*>.*?</div>|<h[1-6]\b[^>]*>.*?</h[1-6]>")
        .expect("static regex")
});
static RE_HIGHLIGHT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<span\b[^>]*background-color[^>]*>.*?</span>|<mark\b[^>]*background-color[^>]*>.*?</mark>",
    )
    .expect("static regex")
});
static RE_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<a\b[^>]*href\s*=[^>]*>.*?</a>").expect("static regex"));
static RE_BG_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)background-color\s*:\s*[^;"']+;?"#).expect("static regex"));
static RE_EMPTY_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\s*style\s*=\s*"[\s;]*""#).expect("static regex"));

/// Rebuild a note body from its highlighted spans and links only.
/// Returns the new body and the number of extracted fragments, or `None`
/// when the content carries neither.
pub fn extract_highlights(html: &str) -> Option<(String, usize)> {
    let mut spans: Vec<(usize, usize)> = RE_HIGHLIGHT
        .find_iter(html)
        .map(|m| (m.start(), m.end()))
        .collect();
    // Anchors inside an already-captured highlight stay part of it
    for a in RE_ANCHOR.find_iter(html) {
        if !spans.iter().any(|&(s, e)| a.start() >= s && a.end() <= e) {
            spans.push((a.start(), a.end()));
        }
    }
    spans.sort_unstable();
    if spans.is_empty() {
        return None;
    }

    let blocks: Vec<(usize, usize, String)> = RE_BLOCK
        .find_iter(html)
        .map(|m| (m.start(), m.end(), block_tag(m.as_str())))
        .collect();

    // Consecutive fragments from the same block merge into one paragraph
    let mut groups: Vec<(Option<usize>, Vec<&str>)> = Vec::new();
    for &(s, e) in &spans {
        let block = blocks.iter().position(|&(bs, be, _)| s >= bs && e <= be);
        let fragment = &html[s..e];
        if let Some((last, fragments)) = groups.last_mut() {
            if *last == block {
                fragments.push(fragment);
                continue;
            }
        }
        groups.push((block, vec![fragment]));
    }

    let mut out = Vec::new();
    for (block, fragments) in &groups {
        let tag = block
            .map(|i| blocks[i].2.as_str())
            .filter(|t| *t == "p" || *t == "div")
            .unwrap_or("p");
        out.push(format!(
            "<{}>{}</{}>",
            tag,
            strip_background(&fragments.join(" ")),
            tag
        ));
    }
    Some((out.join("\n"), spans.len()))
}

fn block_tag(open: &str) -> String {
    open[1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn strip_background(html: &str) -> String {
    let no_bg = RE_BG_DECL.replace_all(html, "");
    RE_EMPTY_STYLE.replace_all(&no_bg, "").into_owned()
}
