//! # Store Layer
//!
//! This module defines the note-store abstraction. The [`NoteStore`] trait
//! covers the ETAPI operations the commands consume, so business logic never
//! touches HTTP directly.
//!
//! ## Implementations
//!
//! - [`http::EtapiClient`]: production client over the Trilium external API
//!   (blocking reqwest, token auth header)
//! - [`memory::InMemoryStore`]: in-memory store for testing, with injectable
//!   per-item failures to exercise partial-failure tallies
//!
//! Any implementation exposing equivalent operations over the same remote
//! API is substitutable.

use crate::error::Result;
use crate::model::{AppInfo, Label, Note};

pub mod http;
pub mod memory;

/// Abstract interface to the remote note store.
pub trait NoteStore {
    /// Server/app information; doubles as a connectivity check
    fn app_info(&self) -> Result<AppInfo>;

    /// Run an ETAPI search query and return matching notes
    fn search_notes(&self, query: &str) -> Result<Vec<Note>>;

    /// Get a single note by id
    fn get_note(&self, note_id: &str) -> Result<Note>;

    /// Get a note's body content
    fn get_note_content(&self, note_id: &str) -> Result<String>;

    /// Create a note under the given parent
    fn create_note(
        &mut self,
        parent_id: &str,
        title: &str,
        note_type: &str,
        content: &str,
    ) -> Result<Note>;

    /// Create a binary child note (image or file attachment)
    fn create_file_note(
        &mut self,
        parent_id: &str,
        title: &str,
        mime: &str,
        data: Vec<u8>,
    ) -> Result<Note>;

    /// Replace a note's body content
    fn update_note_content(&mut self, note_id: &str, content: &str) -> Result<()>;

    /// Persist the note's current content as a historical revision
    fn save_revision(&mut self, note_id: &str) -> Result<()>;

    /// Attach a label to a note
    fn create_label(&mut self, note_id: &str, name: &str, value: &str) -> Result<()>;

    /// Labels currently attached to a note
    fn note_labels(&self, note_id: &str) -> Result<Vec<Label>>;
}
