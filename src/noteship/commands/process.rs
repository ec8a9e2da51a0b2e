//! Daily note batch processor: select recently created and recently
//! modified notes, then run independent stages over them — revision
//! snapshots, internal-link rewriting, article enrichment for `#link`
//! notes, and highlight extraction for `#clipType` web clippings.
//!
//! Every stage tallies per-item outcomes and keeps going; only selection
//! and connectivity failures abort the run.

use crate::commands::{BatchReport, CmdMessage, CmdResult};
use crate::error::Result;
use crate::fetch::ArticleFetcher;
use crate::highlight::extract_highlights;
use crate::linkify::{extract_urls, link_titles, LinkCandidate};
use crate::model::{Article, Note};
use crate::store::NoteStore;
use chrono::{Days, Local};

pub const DEFAULT_MAX_NOTES: usize = 100;
pub const LINK_LABEL: &str = "link";
pub const URL_LABEL: &str = "url";
pub const CLIP_LABEL: &str = "clipType";
const IGNORE_LINK_LABEL: &str = "ignoreAutoInternalLink";

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Trailing window, in days, over note creation time
    pub days_back: u32,
    /// Ceiling applied after retrieval, before processing
    pub max_notes: usize,
    /// Process exactly this note instead of a window
    pub note_id: Option<String>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            days_back: 1,
            max_notes: DEFAULT_MAX_NOTES,
            note_id: None,
        }
    }
}

pub fn run<S: NoteStore, F: ArticleFetcher>(
    store: &mut S,
    fetcher: &F,
    opts: &ProcessOptions,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();

    // A single note goes through every applicable stage; window mode
    // selects created notes for the main stages and modified notes for
    // the web-clipping pass.
    let (mut selected, mut modified): (Vec<Note>, Vec<Note>) = match &opts.note_id {
        Some(id) => {
            let note = store.get_note(id)?;
            (vec![note.clone()], vec![note])
        }
        None => {
            let since = Local::now().date_naive() - Days::new(u64::from(opts.days_back));
            result.add_message(CmdMessage::info(format!(
                "Selecting notes created or modified since {}",
                since
            )));
            let created =
                store.search_notes(&format!("note.dateCreated >= TODAY-{}", opts.days_back))?;
            let modified =
                store.search_notes(&format!("note.dateModified >= TODAY-{}", opts.days_back))?;
            (created, modified)
        }
    };

    let mut report = BatchReport {
        found: selected.len(),
        modified_found: modified.len(),
        ..Default::default()
    };

    if selected.len() > opts.max_notes {
        selected.truncate(opts.max_notes);
        result.add_message(CmdMessage::warning(format!(
            "Found {} notes; processing the first {} (ceiling)",
            report.found, opts.max_notes
        )));
    }
    if modified.len() > opts.max_notes {
        modified.truncate(opts.max_notes);
    }
    report.processed = selected.len();

    let read_notes: Vec<Note> = modified
        .iter()
        .filter(|n| n.has_label(CLIP_LABEL))
        .cloned()
        .collect();

    if selected.is_empty() && read_notes.is_empty() {
        result.add_message(CmdMessage::info("No notes found in the selected window."));
        return Ok(result.with_batch(report));
    }

    // Revisions cover every note whose content a later stage may rewrite,
    // including clippings that were only modified in the window.
    let mut revision_targets: Vec<Note> = selected.clone();
    for note in &read_notes {
        if !revision_targets.iter().any(|n| n.note_id == note.note_id) {
            revision_targets.push(note.clone());
        }
    }
    save_revisions(store, &revision_targets, &mut report);

    if !selected.is_empty() {
        let candidates = link_candidates(store)?;
        add_internal_links(store, &selected, &candidates, &mut report, &mut result);
        enrich_link_notes(store, fetcher, &selected, &mut report, &mut result);
    }

    extract_reading_highlights(store, &read_notes, &mut report, &mut result);

    result.add_message(CmdMessage::success(format!(
        "Processed {} of {} notes",
        report.processed, report.found
    )));
    Ok(result.with_batch(report))
}

/// Stage 1: one revision per selected note; a failure is tallied and the
/// loop proceeds to the next note.
fn save_revisions<S: NoteStore>(store: &mut S, notes: &[Note], report: &mut BatchReport) {
    report.revisions.total = notes.len();
    for note in notes {
        match store.save_revision(&note.note_id) {
            Ok(()) => report.revisions.record_ok(),
            Err(e) => report
                .revisions
                .record_err(format!("Revision failed for '{}': {}", note.title, e)),
        }
    }
}

/// All unprotected note titles eligible as internal-link targets.
fn link_candidates<S: NoteStore>(store: &S) -> Result<Vec<LinkCandidate>> {
    let all = store.search_notes(&format!("note.title %= '.*' #!{}", IGNORE_LINK_LABEL))?;
    Ok(all
        .into_iter()
        .filter(|n| !n.is_protected)
        .map(|n| LinkCandidate::new(n.title, n.note_id))
        .collect())
}

/// Stage 2: rewrite plain-text title mentions into internal links.
/// Missing or ambiguous matches are no-ops, not errors.
fn add_internal_links<S: NoteStore>(
    store: &mut S,
    notes: &[Note],
    candidates: &[LinkCandidate],
    report: &mut BatchReport,
    result: &mut CmdResult,
) {
    for note in notes {
        if note.has_label(LINK_LABEL) {
            continue;
        }
        if note.is_protected {
            result.add_message(CmdMessage::warning(format!(
                "Skipping protected note: {}",
                note.title
            )));
            continue;
        }
        if !note.is_text() {
            result.add_message(CmdMessage::info(format!(
                "Skipping non-text note: {}",
                note.title
            )));
            continue;
        }

        report.linking.total += 1;
        let own: Vec<LinkCandidate> = candidates
            .iter()
            .filter(|c| c.note_id != note.note_id)
            .cloned()
            .collect();
        match link_one(store, note, &own) {
            Ok(added) => {
                report.linking.record_ok();
                report.links_added += added;
            }
            Err(e) => report
                .linking
                .record_err(format!("Linking failed for '{}': {}", note.title, e)),
        }
    }
}

fn link_one<S: NoteStore>(
    store: &mut S,
    note: &Note,
    candidates: &[LinkCandidate],
) -> Result<usize> {
    let body = store.get_note_content(&note.note_id)?;
    let (rewritten, added) = link_titles(&body, candidates);
    if added > 0 {
        store.update_note_content(&note.note_id, &rewritten)?;
    }
    Ok(added)
}

/// Stage 3: for `#link` notes, fetch each URL in the body and append the
/// extracted article, recording the source URL as a label. Per-URL
/// failures are tallied and the batch moves on.
fn enrich_link_notes<S: NoteStore, F: ArticleFetcher>(
    store: &mut S,
    fetcher: &F,
    notes: &[Note],
    report: &mut BatchReport,
    result: &mut CmdResult,
) {
    for note in notes {
        if !note.has_label(LINK_LABEL) {
            continue;
        }
        if note.is_protected || !note.is_text() {
            result.add_message(CmdMessage::warning(format!(
                "Skipping unsuitable link note: {}",
                note.title
            )));
            continue;
        }

        report.enrichment.total += 1;
        let mut body = match store.get_note_content(&note.note_id) {
            Ok(body) => body,
            Err(e) => {
                report
                    .enrichment
                    .record_err(format!("Could not read '{}': {}", note.title, e));
                continue;
            }
        };

        let urls = extract_urls(&body);
        report.urls_found += urls.len();
        if urls.is_empty() {
            result.add_message(CmdMessage::info(format!("No URLs found in: {}", note.title)));
            report.enrichment.record_ok();
            continue;
        }

        let mut errors = Vec::new();
        let mut changed = false;
        for url in &urls {
            match fetcher.fetch(url) {
                Ok(article) => {
                    body.push_str(&format_article_block(&article));
                    changed = true;
                    report.articles_fetched += 1;
                    if let Err(e) = store.create_label(&note.note_id, URL_LABEL, url) {
                        errors.push(format!("Label failed for {} on '{}': {}", url, note.title, e));
                    }
                }
                Err(e) => errors.push(format!("Fetch failed for {} in '{}': {}", url, note.title, e)),
            }
        }
        if changed {
            if let Err(e) = store.update_note_content(&note.note_id, &body) {
                errors.push(format!("Update failed for '{}': {}", note.title, e));
            }
        }

        if errors.is_empty() {
            report.enrichment.record_ok();
        } else {
            report.enrichment.failed += 1;
            report.enrichment.errors.extend(errors);
        }
    }
}

/// Stage 4: reduce `#clipType` web clippings to their highlighted spans
/// and links. A clipping with nothing highlighted is left untouched and
/// still counts as handled.
fn extract_reading_highlights<S: NoteStore>(
    store: &mut S,
    notes: &[Note],
    report: &mut BatchReport,
    result: &mut CmdResult,
) {
    for note in notes {
        if note.is_protected || !note.is_text() {
            result.add_message(CmdMessage::warning(format!(
                "Skipping unsuitable clipping: {}",
                note.title
            )));
            continue;
        }

        report.reading.total += 1;
        match reduce_one(store, note) {
            Ok(Some(extracted)) => {
                report.reading.record_ok();
                report.highlights_extracted += extracted;
            }
            Ok(None) => {
                result.add_message(CmdMessage::info(format!(
                    "No highlights or links in: {}",
                    note.title
                )));
                report.reading.record_ok();
            }
            Err(e) => report
                .reading
                .record_err(format!("Clipping failed for '{}': {}", note.title, e)),
        }
    }
}

fn reduce_one<S: NoteStore>(store: &mut S, note: &Note) -> Result<Option<usize>> {
    let body = store.get_note_content(&note.note_id)?;
    if body.trim().is_empty() {
        return Ok(None);
    }
    match extract_highlights(&body) {
        Some((rebuilt, extracted)) => {
            store.update_note_content(&note.note_id, &rebuilt)?;
            Ok(Some(extracted))
        }
        None => Ok(None),
    }
}

/// The block appended to a `#link` note after a successful fetch. The
/// original body stays in place above it.
fn format_article_block(article: &Article) -> String {
    let mut block = String::new();
    block.push_str("\n<hr><p><strong>Source:</strong> <a href=\"");
    block.push_str(&article.url);
    block.push_str("\">");
    block.push_str(&article.url);
    block.push_str("</a></p>");
    if !article.authors.is_empty() {
        block.push_str(&format!("<p><em>By {}</em></p>", article.authors.join(", ")));
    }
    if let Some(published) = &article.published {
        block.push_str(&format!("<p><em>Published: {}</em></p>", published));
    }
    for paragraph in article.text.split("\n\n").filter(|p| !p.trim().is_empty()) {
        block.push_str(&format!("<p>{}</p>", escape_html(paragraph.trim())));
    }
    block
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoteshipError;
    use crate::model::Label;
    use crate::store::memory::InMemoryStore;

    struct StubFetcher {
        fail_urls: Vec<String>,
    }

    impl StubFetcher {
        fn ok() -> Self {
            Self { fail_urls: Vec::new() }
        }
    }

    impl ArticleFetcher for StubFetcher {
        fn fetch(&self, url: &str) -> Result<Article> {
            if self.fail_urls.iter().any(|u| u == url) {
                return Err(NoteshipError::Fetch(format!("{}: connection refused", url)));
            }
            Ok(Article {
                url: url.to_string(),
                title: "Stub Article".to_string(),
                text: "Body text.".to_string(),
                authors: vec!["A. Author".to_string()],
                published: Some("2024-06-01".to_string()),
            })
        }
    }

    fn seed_plain(store: &mut InMemoryStore, n: usize) -> Vec<String> {
        (0..n)
            .map(|i| {
                store
                    .create_note("root", &format!("Daily entry {}", i), "text", "<p>body</p>")
                    .unwrap()
                    .note_id
            })
            .collect()
    }

    fn seed_link_note(store: &mut InMemoryStore, title: &str, body: &str) -> String {
        let mut note = Note::new(format!("link-{}", title), title);
        note.attributes.push(Label::new(LINK_LABEL, ""));
        let id = note.note_id.clone();
        store.seed_note(note, body);
        id
    }

    fn seed_clip_note(store: &mut InMemoryStore, title: &str, body: &str) -> String {
        let mut note = Note::new(format!("clip-{}", title), title);
        note.attributes.push(Label::new(CLIP_LABEL, "web"));
        let id = note.note_id.clone();
        store.seed_note(note, body);
        id
    }

    #[test]
    fn ceiling_caps_processing_and_reports_found() {
        let mut store = InMemoryStore::new();
        seed_plain(&mut store, 25);

        let opts = ProcessOptions {
            max_notes: 20,
            ..Default::default()
        };
        let result = run(&mut store, &StubFetcher::ok(), &opts).unwrap();
        let report = result.batch.unwrap();

        assert_eq!(report.found, 25);
        assert_eq!(report.processed, 20);
        assert_eq!(store.revisions.len(), 20);
    }

    #[test]
    fn revision_failure_is_tallied_and_linking_continues() {
        let mut store = InMemoryStore::new();
        let ids = seed_plain(&mut store, 5);
        store.fail_revision_ids.insert(ids[2].clone());

        let result = run(&mut store, &StubFetcher::ok(), &ProcessOptions::default()).unwrap();
        let report = result.batch.unwrap();

        assert_eq!(report.revisions.total, 5);
        assert_eq!(report.revisions.succeeded, 4);
        assert_eq!(report.revisions.failed, 1);
        assert_eq!(report.revisions.errors.len(), 1);
        // Every note, including the one whose revision failed, was attempted
        assert_eq!(report.linking.total, 5);
        assert_eq!(report.linking.succeeded, 5);
    }

    #[test]
    fn plain_mentions_become_internal_links() {
        let mut store = InMemoryStore::new();
        let target = store
            .create_note("root", "Project Zeus", "text", "<p>plan</p>")
            .unwrap();
        let mention = store
            .create_note("root", "Standup", "text", "Talked about Project Zeus today")
            .unwrap();

        let result = run(&mut store, &StubFetcher::ok(), &ProcessOptions::default()).unwrap();
        let report = result.batch.unwrap();

        assert_eq!(report.links_added, 1);
        let body = store.content_of(&mention.note_id).unwrap();
        assert!(body.contains(&format!("#root/{}", target.note_id)));
    }

    #[test]
    fn link_note_gains_url_label_and_appended_block() {
        let mut store = InMemoryStore::new();
        let id = seed_link_note(&mut store, "Read later", "#link\nSee https://example.com/article");

        let result = run(&mut store, &StubFetcher::ok(), &ProcessOptions::default()).unwrap();
        let report = result.batch.unwrap();

        assert_eq!(report.urls_found, 1);
        assert_eq!(report.articles_fetched, 1);
        assert_eq!(report.enrichment.succeeded, 1);

        let labels = store.note_labels(&id).unwrap();
        assert!(labels
            .iter()
            .any(|l| l.name == URL_LABEL && l.value == "https://example.com/article"));

        let body = store.content_of(&id).unwrap();
        assert!(body.starts_with("#link\nSee https://example.com/article"));
        assert!(body.contains("Source:"));
        assert!(body.contains("By A. Author"));
        assert!(body.contains("Published: 2024-06-01"));
    }

    #[test]
    fn fetch_failure_recorded_and_batch_continues() {
        let mut store = InMemoryStore::new();
        seed_link_note(&mut store, "Broken", "https://down.example/x");
        let ok_id = seed_link_note(&mut store, "Fine", "https://up.example/y");

        let fetcher = StubFetcher {
            fail_urls: vec!["https://down.example/x".to_string()],
        };
        let result = run(&mut store, &fetcher, &ProcessOptions::default()).unwrap();
        let report = result.batch.unwrap();

        assert_eq!(report.enrichment.total, 2);
        assert_eq!(report.enrichment.succeeded, 1);
        assert_eq!(report.enrichment.failed, 1);
        assert!(report.enrichment.errors[0].contains("down.example"));
        assert!(store.content_of(&ok_id).unwrap().contains("Source:"));
    }

    #[test]
    fn link_note_without_urls_is_a_noop_success() {
        let mut store = InMemoryStore::new();
        let id = seed_link_note(&mut store, "Empty", "just some text");

        let result = run(&mut store, &StubFetcher::ok(), &ProcessOptions::default()).unwrap();
        let report = result.batch.unwrap();
        assert_eq!(report.urls_found, 0);
        assert_eq!(report.enrichment.succeeded, 1);
        assert_eq!(store.content_of(&id).unwrap().as_str(), "just some text");
    }

    #[test]
    fn protected_notes_are_skipped_for_linking() {
        let mut store = InMemoryStore::new();
        let mut note = Note::new("p1", "Secret");
        note.is_protected = true;
        store.seed_note(note, "body");

        let result = run(&mut store, &StubFetcher::ok(), &ProcessOptions::default()).unwrap();
        let report = result.batch.unwrap();
        assert_eq!(report.linking.total, 0);
        // Revisions still attempted for protected notes
        assert_eq!(report.revisions.total, 1);
    }

    #[test]
    fn single_note_mode_bypasses_the_window() {
        let mut store = InMemoryStore::new();
        seed_plain(&mut store, 3);
        let target = store
            .create_note("root", "Only this", "text", "body")
            .unwrap();

        let opts = ProcessOptions {
            note_id: Some(target.note_id.clone()),
            ..Default::default()
        };
        let result = run(&mut store, &StubFetcher::ok(), &opts).unwrap();
        let report = result.batch.unwrap();
        assert_eq!(report.found, 1);
        assert_eq!(store.revisions, vec![target.note_id]);
    }

    #[test]
    fn clip_note_is_reduced_to_its_highlights() {
        let mut store = InMemoryStore::new();
        let id = seed_clip_note(
            &mut store,
            "Clipped page",
            "<p>intro <span style=\"background-color: yellow;\">key idea</span> tail</p><p>noise</p>",
        );

        let result = run(&mut store, &StubFetcher::ok(), &ProcessOptions::default()).unwrap();
        let report = result.batch.unwrap();

        assert_eq!(report.reading.total, 1);
        assert_eq!(report.reading.succeeded, 1);
        assert_eq!(report.highlights_extracted, 1);
        assert_eq!(
            store.content_of(&id).unwrap().as_str(),
            "<p><span>key idea</span></p>"
        );
        // A revision is saved before the clipping is rewritten
        assert!(store.revisions.contains(&id));
    }

    #[test]
    fn clip_note_without_highlights_is_untouched() {
        let mut store = InMemoryStore::new();
        let id = seed_clip_note(&mut store, "Plain clip", "<p>nothing marked</p>");

        let result = run(&mut store, &StubFetcher::ok(), &ProcessOptions::default()).unwrap();
        let report = result.batch.unwrap();

        assert_eq!(report.reading.succeeded, 1);
        assert_eq!(report.highlights_extracted, 0);
        assert_eq!(store.content_of(&id).unwrap().as_str(), "<p>nothing marked</p>");
    }

    #[test]
    fn clip_note_keeps_its_links() {
        let mut store = InMemoryStore::new();
        let id = seed_clip_note(
            &mut store,
            "Clip with link",
            "<p>see <a href=\"https://x.example/\">this</a> later</p>",
        );

        run(&mut store, &StubFetcher::ok(), &ProcessOptions::default()).unwrap();
        assert_eq!(
            store.content_of(&id).unwrap().as_str(),
            "<p><a href=\"https://x.example/\">this</a></p>"
        );
    }

    #[test]
    fn clipping_failure_is_tallied_and_batch_continues() {
        let mut store = InMemoryStore::new();
        let bad = seed_clip_note(
            &mut store,
            "Bad clip",
            "<p><span style=\"background-color:red\">x</span></p>",
        );
        let good = seed_clip_note(
            &mut store,
            "Good clip",
            "<p><span style=\"background-color:red\">y</span></p>",
        );
        store.fail_update_ids.insert(bad.clone());

        let result = run(&mut store, &StubFetcher::ok(), &ProcessOptions::default()).unwrap();
        let report = result.batch.unwrap();

        assert_eq!(report.reading.total, 2);
        assert_eq!(report.reading.succeeded, 1);
        assert_eq!(report.reading.failed, 1);
        assert!(report.reading.errors[0].contains("Bad clip"));
        assert_eq!(
            store.content_of(&good).unwrap().as_str(),
            "<p><span>y</span></p>"
        );
    }

    #[test]
    fn missing_note_id_is_fatal() {
        let mut store = InMemoryStore::new();
        let opts = ProcessOptions {
            note_id: Some("nope".to_string()),
            ..Default::default()
        };
        let err = run(&mut store, &StubFetcher::ok(), &opts).unwrap_err();
        assert!(matches!(err, NoteshipError::NoteNotFound(_)));
    }

    #[test]
    fn article_block_escapes_text() {
        let article = Article {
            url: "https://e.example/a".to_string(),
            title: "T".to_string(),
            text: "1 < 2 & 3 > 2".to_string(),
            authors: Vec::new(),
            published: None,
        };
        let block = format_article_block(&article);
        assert!(block.contains("1 &lt; 2 &amp; 3 &gt; 2"));
    }
}
