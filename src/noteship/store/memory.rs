use super::NoteStore;
use crate::error::{NoteshipError, Result};
use crate::model::{AppInfo, Label, Note};
use std::collections::{HashMap, HashSet};

/// In-memory note store for testing.
///
/// Understands the handful of search-query shapes the commands issue
/// (exact title, creation/modification windows, internal-link candidates)
/// rather than the full ETAPI search language. Failure injection via the `fail_*`
/// sets lets tests exercise partial-failure tallies.
#[derive(Default)]
pub struct InMemoryStore {
    notes: Vec<Note>,
    contents: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
    parents: HashMap<String, String>,
    pub revisions: Vec<String>,
    pub fail_create_titles: HashSet<String>,
    pub fail_revision_ids: HashSet<String>,
    pub fail_update_ids: HashSet<String>,
    next_id: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let mut store = Self::default();
        let mut root = Note::new("root", "root");
        root.note_type = "book".to_string();
        store.notes.push(root);
        store
    }

    fn next_note_id(&mut self) -> String {
        self.next_id += 1;
        format!("n{}", self.next_id)
    }

    /// Insert a note directly, bypassing create-note failure injection.
    pub fn seed_note(&mut self, note: Note, content: &str) {
        self.contents
            .insert(note.note_id.clone(), content.to_string());
        self.parents
            .insert(note.note_id.clone(), "root".to_string());
        self.notes.push(note);
    }

    fn note_mut(&mut self, note_id: &str) -> Result<&mut Note> {
        self.notes
            .iter_mut()
            .find(|n| n.note_id == note_id)
            .ok_or_else(|| NoteshipError::NoteNotFound(note_id.to_string()))
    }

    fn find(&self, note_id: &str) -> Result<&Note> {
        self.notes
            .iter()
            .find(|n| n.note_id == note_id)
            .ok_or_else(|| NoteshipError::NoteNotFound(note_id.to_string()))
    }

    /// Notes whose parent is the given id, in creation order.
    pub fn children_of(&self, parent_id: &str) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| self.parents.get(&n.note_id).map(String::as_str) == Some(parent_id))
            .collect()
    }

    /// Number of notes carrying the given title, anywhere in the tree.
    pub fn count_titled(&self, title: &str) -> usize {
        self.notes.iter().filter(|n| n.title == title).count()
    }

    pub fn find_titled(&self, title: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.title == title)
    }

    pub fn content_of(&self, note_id: &str) -> Option<&String> {
        self.contents.get(note_id)
    }

    pub fn file_data(&self, note_id: &str) -> Option<&Vec<u8>> {
        self.files.get(note_id)
    }
}

fn title_from_query(query: &str) -> Option<&str> {
    let rest = query.strip_prefix("note.title = \"")?;
    rest.split('"').next()
}

impl NoteStore for InMemoryStore {
    fn app_info(&self) -> Result<AppInfo> {
        Ok(AppInfo {
            app_version: "test".to_string(),
            db_version: 0,
            build_date: String::new(),
        })
    }

    fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        if let Some(title) = title_from_query(query) {
            return Ok(self
                .notes
                .iter()
                .filter(|n| n.title == title)
                .cloned()
                .collect());
        }
        if query.contains("ignoreAutoInternalLink") {
            return Ok(self
                .notes
                .iter()
                .filter(|n| n.note_id != "root" && !n.has_label("ignoreAutoInternalLink"))
                .cloned()
                .collect());
        }
        if query.contains("dateCreated") || query.contains("dateModified") {
            return Ok(self
                .notes
                .iter()
                .filter(|n| n.note_id != "root")
                .cloned()
                .collect());
        }
        Ok(Vec::new())
    }

    fn get_note(&self, note_id: &str) -> Result<Note> {
        Ok(self.find(note_id)?.clone())
    }

    fn get_note_content(&self, note_id: &str) -> Result<String> {
        self.find(note_id)?;
        Ok(self.contents.get(note_id).cloned().unwrap_or_default())
    }

    fn create_note(
        &mut self,
        parent_id: &str,
        title: &str,
        note_type: &str,
        content: &str,
    ) -> Result<Note> {
        if self.fail_create_titles.contains(title) {
            return Err(NoteshipError::Store(format!(
                "Create rejected for: {}",
                title
            )));
        }
        self.find(parent_id)?;
        let id = self.next_note_id();
        let mut note = Note::new(id.clone(), title);
        note.note_type = note_type.to_string();
        self.contents.insert(id.clone(), content.to_string());
        self.parents.insert(id.clone(), parent_id.to_string());
        self.notes.push(note.clone());
        Ok(note)
    }

    fn create_file_note(
        &mut self,
        parent_id: &str,
        title: &str,
        mime: &str,
        data: Vec<u8>,
    ) -> Result<Note> {
        let note_type = if mime.starts_with("image/") {
            "image"
        } else {
            "file"
        };
        let note = self.create_note(parent_id, title, note_type, "")?;
        self.files.insert(note.note_id.clone(), data);
        Ok(note)
    }

    fn update_note_content(&mut self, note_id: &str, content: &str) -> Result<()> {
        if self.fail_update_ids.contains(note_id) {
            return Err(NoteshipError::Store(format!(
                "Update rejected for: {}",
                note_id
            )));
        }
        self.find(note_id)?;
        self.contents.insert(note_id.to_string(), content.to_string());
        Ok(())
    }

    fn save_revision(&mut self, note_id: &str) -> Result<()> {
        if self.fail_revision_ids.contains(note_id) {
            return Err(NoteshipError::Store(format!(
                "Revision rejected for: {}",
                note_id
            )));
        }
        self.find(note_id)?;
        self.revisions.push(note_id.to_string());
        Ok(())
    }

    fn create_label(&mut self, note_id: &str, name: &str, value: &str) -> Result<()> {
        let label = Label::new(name, value);
        self.note_mut(note_id)?.attributes.push(label);
        Ok(())
    }

    fn note_labels(&self, note_id: &str) -> Result<Vec<Label>> {
        Ok(self
            .find(note_id)?
            .attributes
            .iter()
            .filter(|a| a.kind == "label")
            .cloned()
            .collect())
    }
}
