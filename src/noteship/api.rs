//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the
//! single entry point for all noteship operations, regardless of the UI
//! being used.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Dispatches** to the appropriate command function
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! ## What the API Does NOT Do
//!
//! The API explicitly avoids:
//! - **Business logic**: That belongs in `commands/*.rs`
//! - **I/O operations**: No stdout, stderr, or terminal prompts
//! - **Presentation concerns**: Returns data structures, not strings
//!
//! ## Generic Over NoteStore
//!
//! `NoteshipApi<S: NoteStore>` is generic over the storage backend:
//! - Production: `NoteshipApi<EtapiClient>`
//! - Testing: `NoteshipApi<InMemoryStore>`
//!
//! This enables testing the API layer without a running Trilium server.

use crate::commands;
use crate::error::Result;
use crate::fetch::ArticleFetcher;
use crate::store::NoteStore;

/// The main API facade for noteship operations.
///
/// Generic over `NoteStore` to allow different backends. All UI clients
/// should interact through this API.
pub struct NoteshipApi<S: NoteStore> {
    store: S,
}

impl<S: NoteStore> NoteshipApi<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn server_info(&self) -> Result<commands::CmdResult> {
        commands::info::run(&self.store)
    }

    pub fn upload_folder(&mut self, opts: &UploadOptions) -> Result<commands::CmdResult> {
        commands::upload::run(&mut self.store, opts)
    }

    pub fn process_notes<F: ArticleFetcher>(
        &mut self,
        fetcher: &F,
        opts: &ProcessOptions,
    ) -> Result<commands::CmdResult> {
        commands::process::run(&mut self.store, fetcher, opts)
    }
}

pub use commands::process::ProcessOptions;
pub use commands::upload::UploadOptions;
pub use commands::{CmdMessage, CmdResult, MessageLevel};
