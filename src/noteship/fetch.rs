//! Article fetching for `#link` note enrichment.
//!
//! The extraction pipeline is deliberately plain: pick the main content
//! region (`<article>` or `<main>` when present), strip interference
//! elements (scripts, navigation, forms), then let html2text produce the
//! readable body. Metadata comes from the usual meta tags.

use crate::error::{NoteshipError, Result};
use crate::model::Article;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use std::time::Duration;
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("noteship/", env!("CARGO_PKG_VERSION"));
const TEXT_WIDTH: usize = 80;

/// Capability to turn a URL into extracted article content.
pub trait ArticleFetcher {
    fn fetch(&self, url: &str) -> Result<Article>;
}

/// Production fetcher: blocking GET plus local HTML extraction.
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http })
    }
}

impl ArticleFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Article> {
        let parsed = Url::parse(url)
            .map_err(|e| NoteshipError::Fetch(format!("Invalid URL {}: {}", url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(NoteshipError::Fetch(format!(
                "Unsupported URL scheme: {}",
                url
            )));
        }

        let resp = self
            .http
            .get(parsed)
            .send()
            .map_err(|e| NoteshipError::Fetch(format!("{}: {}", url, e)))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NoteshipError::Fetch(format!(
                "{}: HTTP {}",
                url,
                status.as_u16()
            )));
        }
        let html = resp
            .text()
            .map_err(|e| NoteshipError::Fetch(format!("{}: {}", url, e)))?;

        Ok(extract_article(&html, url))
    }
}

static RE_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b.*?</script>").expect("static regex"));
static RE_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b.*?</style>").expect("static regex"));
static RE_NOSCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<noscript\b.*?</noscript>").expect("static regex"));
static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));
static RE_NAV: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<nav\b.*?</nav>").expect("static regex"));
static RE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<header\b.*?</header>").expect("static regex"));
static RE_FOOTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<footer\b.*?</footer>").expect("static regex"));
static RE_ASIDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<aside\b.*?</aside>").expect("static regex"));
static RE_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<form\b.*?</form>").expect("static regex"));

static RE_ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<article\b[^>]*>(.*?)</article>").expect("static regex"));
static RE_MAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<main\b[^>]*>(.*?)</main>").expect("static regex"));
static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex"));
static RE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<time\b[^>]*datetime\s*=\s*["']([^"']+)["']"#).expect("static regex")
});
static RE_META: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("static regex"));
static RE_META_CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)content\s*=\s*["']([^"']*)["']"#).expect("static regex"));
static RE_ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static regex"));

/// Extract title, text, authors and publish date from an HTML page.
/// Extraction is best-effort; missing pieces fall back to empty values.
pub fn extract_article(html: &str, url: &str) -> Article {
    let title = meta_content(html, &["og:title", "twitter:title"])
        .or_else(|| {
            RE_TITLE
                .captures(html)
                .map(|c| unescape(c[1].trim()))
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| "Untitled".to_string());

    let mut authors = Vec::new();
    for key in ["author", "article:author", "og:article:author"] {
        for value in meta_contents(html, key) {
            if !value.is_empty() && !authors.contains(&value) {
                authors.push(value);
            }
        }
    }

    let published = meta_content(html, &["article:published_time", "og:article:published_time"])
        .or_else(|| RE_TIME.captures(html).map(|c| c[1].to_string()));

    Article {
        url: url.to_string(),
        title,
        text: extract_text(html),
        authors,
        published,
    }
}

fn extract_text(html: &str) -> String {
    let region = RE_ARTICLE
        .captures(html)
        .or_else(|| RE_MAIN.captures(html))
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| html.to_string());

    let cleaned = clean_html(&region);
    let text = match html2text::from_read(cleaned.as_bytes(), TEXT_WIDTH) {
        Ok(text) => text,
        // Malformed markup: fall back to a bare tag strip
        Err(_) => unescape(&RE_ANY_TAG.replace_all(&cleaned, " ")),
    };
    collapse_blank_lines(text.trim())
}

fn clean_html(html: &str) -> String {
    let cleaners = [
        &*RE_SCRIPT,
        &*RE_STYLE,
        &*RE_NOSCRIPT,
        &*RE_COMMENT,
        &*RE_NAV,
        &*RE_HEADER,
        &*RE_FOOTER,
        &*RE_ASIDE,
        &*RE_FORM,
    ];
    let mut out = html.to_string();
    for re in cleaners {
        out = re.replace_all(&out, "").into_owned();
    }
    out
}

fn meta_content(html: &str, keys: &[&str]) -> Option<String> {
    keys.iter()
        .flat_map(|key| meta_contents(html, key).into_iter())
        .find(|v| !v.is_empty())
}

fn meta_contents(html: &str, key: &str) -> Vec<String> {
    let double = format!("\"{}\"", key);
    let single = format!("'{}'", key);
    RE_META
        .find_iter(html)
        .filter(|tag| {
            let t = tag.as_str();
            t.contains(&double) || t.contains(&single)
        })
        .filter_map(|tag| {
            RE_META_CONTENT
                .captures(tag.as_str())
                .map(|c| unescape(c[1].trim()))
        })
        .collect()
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = Vec::new();
    let mut blanks = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blanks += 1;
            if blanks > 1 {
                continue;
            }
        } else {
            blanks = 0;
        }
        out.push(line.trim_end());
    }
    out.join("\n")
}

fn unescape(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <title>Fallback Title - Site</title>
        <meta property="og:title" content="A Proper Headline">
        <meta name="author" content="Ada Lovelace">
        <meta property="article:published_time" content="2024-06-01T10:00:00Z">
        <script>var x = "noise";</script>
    </head><body>
        <nav><a href="/">Home</a></nav>
        <article>
            <h1>A Proper Headline</h1>
            <p>First paragraph of the story.</p>
            <p>Second paragraph with &amp; entity.</p>
        </article>
        <footer>Copyright</footer>
    </body></html>"#;

    #[test]
    fn extracts_metadata_and_text() {
        let article = extract_article(PAGE, "https://example.com/story");
        assert_eq!(article.title, "A Proper Headline");
        assert_eq!(article.authors, vec!["Ada Lovelace"]);
        assert_eq!(article.published.as_deref(), Some("2024-06-01T10:00:00Z"));
        assert!(article.text.contains("First paragraph of the story."));
        assert!(!article.text.contains("noise"));
        assert!(!article.text.contains("Copyright"));
    }

    #[test]
    fn falls_back_to_title_tag() {
        let html = "<html><head><title>Only Title</title></head><body><p>x</p></body></html>";
        let article = extract_article(html, "https://example.com");
        assert_eq!(article.title, "Only Title");
        assert!(article.authors.is_empty());
        assert!(article.published.is_none());
    }

    #[test]
    fn untitled_when_nothing_found() {
        let article = extract_article("<p>bare</p>", "https://example.com");
        assert_eq!(article.title, "Untitled");
    }

    #[test]
    fn rejects_non_http_schemes() {
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch("ftp://example.com/file").unwrap_err();
        assert!(matches!(err, NoteshipError::Fetch(_)));
    }

    #[test]
    fn fetches_over_http() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/story")
            .with_status(200)
            .with_body(PAGE)
            .create();

        let fetcher = HttpFetcher::new().unwrap();
        let article = fetcher.fetch(&format!("{}/story", server.url())).unwrap();
        assert_eq!(article.title, "A Proper Headline");
    }

    #[test]
    fn http_error_is_fetch_error() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/gone").with_status(404).create();

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch(&format!("{}/gone", server.url())).unwrap_err();
        assert!(matches!(err, NoteshipError::Fetch(msg) if msg.contains("404")));
    }
}
