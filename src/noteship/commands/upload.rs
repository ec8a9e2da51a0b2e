//! Folder uploader: mirrors a local Markdown tree as a note hierarchy.
//!
//! The one subtle rule lives here: a subdirectory named exactly like a
//! sibling Markdown file (`guide.md` next to `guide/`) holds that file's
//! assets. Its referenced files attach to the note created for the
//! Markdown file — never to a second, empty note of the same name.

use crate::commands::{CmdMessage, CmdResult, UploadReport};
use crate::error::{NoteshipError, Result};
use crate::filter::UploadFilter;
use crate::store::NoteStore;
use pulldown_cmark::{Event, Options, Parser, Tag};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub root: PathBuf,
    pub parent_title: String,
    pub create_parent: bool,
    pub filter: UploadFilter,
}

pub fn run<S: NoteStore>(store: &mut S, opts: &UploadOptions) -> Result<CmdResult> {
    if !opts.root.is_dir() {
        return Err(NoteshipError::Usage(format!(
            "Not a directory: {}",
            opts.root.display()
        )));
    }

    let mut result = CmdResult::default();
    let parent_id = resolve_parent(store, opts, &mut result)?;

    let mut report = UploadReport::default();
    upload_dir(store, &opts.root, &parent_id, &opts.filter, &mut report, &mut result);

    result.add_message(CmdMessage::success(format!(
        "Uploaded {} notes, {} assets ({} failures)",
        report.notes_created, report.assets_attached, report.failed
    )));
    Ok(result.with_upload(report))
}

/// Find the parent note by title. Missing parent is only created when the
/// caller already holds consent; otherwise it surfaces as an error the CLI
/// can turn into a prompt.
fn resolve_parent<S: NoteStore>(
    store: &mut S,
    opts: &UploadOptions,
    result: &mut CmdResult,
) -> Result<String> {
    let query = format!("note.title = \"{}\"", opts.parent_title);
    let matches = store.search_notes(&query)?;
    match matches.len() {
        0 => {
            if !opts.create_parent {
                return Err(NoteshipError::ParentNotFound(opts.parent_title.clone()));
            }
            let note = store.create_note("root", &opts.parent_title, "book", "")?;
            result.add_message(CmdMessage::info(format!(
                "Created parent note: {}",
                opts.parent_title
            )));
            Ok(note.note_id)
        }
        1 => Ok(matches[0].note_id.clone()),
        n => {
            result.add_message(CmdMessage::warning(format!(
                "{} notes titled '{}'; using the first",
                n, opts.parent_title
            )));
            Ok(matches[0].note_id.clone())
        }
    }
}

/// Depth-first traversal. Errors are local to the unit of work: a failed
/// entry is tallied and its siblings still upload.
fn upload_dir<S: NoteStore>(
    store: &mut S,
    dir: &Path,
    parent_id: &str,
    filter: &UploadFilter,
    report: &mut UploadReport,
    result: &mut CmdResult,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            report.record_err(format!("{}: {}", dir.display(), e));
            return;
        }
    };

    // BTreeMap keeps traversal order stable across platforms
    let mut md_files: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut subdirs: BTreeMap<String, PathBuf> = BTreeMap::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.record_err(format!("{}: {}", dir.display(), e));
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            if !filter.skips_dir(&name) {
                subdirs.insert(name, path);
            }
        } else if filter.includes(&name) {
            md_files.insert(name, path);
        }
    }

    let shadowed: Vec<String> = md_files
        .values()
        .filter_map(|p| stem_of(p))
        .filter(|stem| subdirs.contains_key(stem))
        .collect();

    for path in md_files.values() {
        let Some(stem) = stem_of(path) else { continue };
        let markdown = match fs::read_to_string(path) {
            Ok(markdown) => markdown,
            Err(e) => {
                report.record_err(format!("{}: {}", path.display(), e));
                continue;
            }
        };

        let html = markdown_to_html(&markdown);
        let note = match store.create_note(parent_id, &stem, "text", &html) {
            Ok(note) => note,
            Err(e) => {
                report.record_err(format!("{}: {}", path.display(), e));
                continue;
            }
        };
        report.notes_created += 1;
        result.add_message(CmdMessage::info(format!("Uploaded: {}", path.display())));

        // Same-named sibling directory: its files are this note's assets
        if let Some(asset_dir) = subdirs.get(&stem) {
            attach_assets(store, &markdown, dir, asset_dir, &note.note_id, report, result);
        }
    }

    for (name, path) in &subdirs {
        if shadowed.contains(name) {
            continue;
        }
        let child = match store.create_note(parent_id, name, "book", "") {
            Ok(child) => child,
            Err(e) => {
                report.record_err(format!("{}: {}", path.display(), e));
                continue;
            }
        };
        report.notes_created += 1;
        upload_dir(store, path, &child.note_id, filter, report, result);
    }
}

/// Upload the asset files the Markdown actually references. Anything in
/// the asset directory the text never mentions is left behind and counted
/// as skipped.
fn attach_assets<S: NoteStore>(
    store: &mut S,
    markdown: &str,
    base_dir: &Path,
    asset_dir: &Path,
    note_id: &str,
    report: &mut UploadReport,
    result: &mut CmdResult,
) {
    let mut attached: Vec<PathBuf> = Vec::new();
    for reference in referenced_paths(markdown) {
        let resolved = base_dir.join(&reference);
        if !resolved.starts_with(asset_dir) || !resolved.is_file() {
            continue;
        }
        let data = match fs::read(&resolved) {
            Ok(data) => data,
            Err(e) => {
                report.record_err(format!("{}: {}", resolved.display(), e));
                continue;
            }
        };
        let title = resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| reference.to_string_lossy().into_owned());
        let mime = guess_mime(&resolved);
        match store.create_file_note(note_id, &title, mime, data) {
            Ok(_) => {
                report.assets_attached += 1;
                attached.push(resolved);
            }
            Err(e) => report.record_err(format!("{}: {}", resolved.display(), e)),
        }
    }

    let skipped = count_unattached(asset_dir, &attached);
    if skipped > 0 {
        report.assets_skipped += skipped;
        result.add_message(CmdMessage::warning(format!(
            "{}: {} unreferenced asset(s) left behind",
            asset_dir.display(),
            skipped
        )));
    }
}

fn count_unattached(asset_dir: &Path, attached: &[PathBuf]) -> usize {
    let mut skipped = 0;
    let mut stack = vec![asset_dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if !attached.contains(&path) {
                skipped += 1;
            }
        }
    }
    skipped
}

/// Relative image and link destinations mentioned in the Markdown.
/// References with `..` components are dropped: they could resolve
/// outside the asset directory while still passing a prefix check.
fn referenced_paths(markdown: &str) -> Vec<PathBuf> {
    let mut refs = Vec::new();
    for event in Parser::new_ext(markdown, Options::all()) {
        let dest = match event {
            Event::Start(Tag::Image { dest_url, .. }) => dest_url,
            Event::Start(Tag::Link { dest_url, .. }) => dest_url,
            _ => continue,
        };
        let dest = dest.as_ref();
        if dest.contains("://") || dest.starts_with('#') || dest.starts_with('/') {
            continue;
        }
        let trimmed = dest.trim_start_matches("./");
        if trimmed.is_empty() {
            continue;
        }
        let path = PathBuf::from(trimmed);
        if path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            continue;
        }
        refs.push(path);
    }
    refs
}

fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::all());
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

fn stem_of(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("txt") | Some("md") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use tempfile::TempDir;

    fn setup() -> (InMemoryStore, String) {
        let mut store = InMemoryStore::new();
        let parent = store.create_note("root", "Inbox", "book", "").unwrap();
        (store, parent.note_id)
    }

    fn options(root: &Path) -> UploadOptions {
        UploadOptions {
            root: root.to_path_buf(),
            parent_title: "Inbox".to_string(),
            create_parent: false,
            filter: UploadFilter::default(),
        }
    }

    #[test]
    fn asset_folder_collision_yields_one_note() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("guide.md"), "# Guide\n\n![shot](guide/shot.png)\n").unwrap();
        fs::create_dir(dir.path().join("guide")).unwrap();
        fs::write(dir.path().join("guide/shot.png"), b"\x89PNG").unwrap();
        fs::write(dir.path().join("guide/unused.png"), b"\x89PNG").unwrap();

        let (mut store, parent_id) = setup();
        let result = run(&mut store, &options(dir.path())).unwrap();
        let report = result.upload.unwrap();

        // Exactly one note titled "guide", never a sibling book of the same name
        assert_eq!(store.count_titled("guide"), 1);
        let guide = store.find_titled("guide").unwrap();
        assert_eq!(guide.note_type, "text");

        let children = store.children_of(&guide.note_id.clone());
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].title, "shot.png");
        assert_eq!(children[0].note_type, "image");

        assert_eq!(report.notes_created, 1);
        assert_eq!(report.assets_attached, 1);
        assert_eq!(report.assets_skipped, 1);
        assert_eq!(store.children_of(&parent_id).len(), 1);
    }

    #[test]
    fn nesting_mirrors_the_tree() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "alpha").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.md"), "beta").unwrap();

        let (mut store, parent_id) = setup();
        run(&mut store, &options(dir.path())).unwrap();

        let top: Vec<_> = store
            .children_of(&parent_id)
            .iter()
            .map(|n| n.title.clone())
            .collect();
        assert_eq!(top, vec!["a", "sub"]);

        let sub_id = store.find_titled("sub").unwrap().note_id.clone();
        let inner: Vec<_> = store
            .children_of(&sub_id)
            .iter()
            .map(|n| n.title.clone())
            .collect();
        assert_eq!(inner, vec!["b"]);
    }

    #[test]
    fn ignored_dirs_are_never_traversed() {
        let dir = TempDir::new().unwrap();
        for sub in ["assets", ".git"] {
            fs::create_dir(dir.path().join(sub)).unwrap();
            fs::write(dir.path().join(sub).join("inner.md"), "hidden").unwrap();
        }
        fs::write(dir.path().join("visible.md"), "shown").unwrap();

        let (mut store, _) = setup();
        let mut opts = options(dir.path());
        opts.filter = UploadFilter::builder()
            .ignore_dirs(vec!["assets".to_string()])
            .build()
            .unwrap();
        run(&mut store, &opts).unwrap();

        assert_eq!(store.count_titled("inner"), 0);
        assert_eq!(store.count_titled("visible"), 1);
    }

    #[test]
    fn missing_parent_refused_without_consent() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "alpha").unwrap();

        let mut store = InMemoryStore::new();
        let mut opts = options(dir.path());
        opts.parent_title = "Nowhere".to_string();

        let err = run(&mut store, &opts).unwrap_err();
        assert!(matches!(err, NoteshipError::ParentNotFound(t) if t == "Nowhere"));

        opts.create_parent = true;
        run(&mut store, &opts).unwrap();
        assert_eq!(store.count_titled("Nowhere"), 1);
        assert_eq!(store.count_titled("a"), 1);
    }

    #[test]
    fn entry_failure_does_not_abort_traversal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.md"), "x").unwrap();
        fs::write(dir.path().join("good.md"), "y").unwrap();

        let (mut store, _) = setup();
        store.fail_create_titles.insert("bad".to_string());

        let result = run(&mut store, &options(dir.path())).unwrap();
        let report = result.upload.unwrap();
        assert_eq!(report.notes_created, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(store.count_titled("good"), 1);
    }

    #[test]
    fn only_included_extensions_upload() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("note.md"), "md").unwrap();
        fs::write(dir.path().join("note.txt"), "txt").unwrap();

        let (mut store, parent_id) = setup();
        run(&mut store, &options(dir.path())).unwrap();
        assert_eq!(store.children_of(&parent_id).len(), 1);
    }

    #[test]
    fn parent_dir_reference_cannot_escape_asset_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("guide.md"),
            "![x](guide/../outside.bin)\n",
        )
        .unwrap();
        fs::create_dir(dir.path().join("guide")).unwrap();
        fs::write(dir.path().join("outside.bin"), b"secret").unwrap();

        let (mut store, _) = setup();
        let result = run(&mut store, &options(dir.path())).unwrap();
        let report = result.upload.unwrap();

        assert_eq!(report.assets_attached, 0);
        let guide = store.find_titled("guide").unwrap();
        assert!(store.children_of(&guide.note_id.clone()).is_empty());
    }

    #[test]
    fn referenced_paths_drops_parent_dir_components() {
        let refs = referenced_paths("![a](pics/../a.png) ![b](pics/b.png)");
        assert_eq!(refs, vec![PathBuf::from("pics/b.png")]);
    }

    #[test]
    fn referenced_paths_skips_absolute_and_external() {
        let refs = referenced_paths(
            "![a](./pics/a.png) [b](https://x.example/b) [c](/abs.png) [d](#frag) ![e](pics/e.png)",
        );
        assert_eq!(refs, vec![PathBuf::from("pics/a.png"), PathBuf::from("pics/e.png")]);
    }

    #[test]
    fn markdown_renders_to_html() {
        let html = markdown_to_html("# Title\n\nBody *emph*.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>emph</em>"));
    }
}
