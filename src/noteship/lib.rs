//! # Noteship Architecture
//!
//! Noteship is a **UI-agnostic Trilium automation library**. This is not a CLI
//! application that happens to have some library code—it's a library that
//! happens to have a CLI client.
//!
//! This distinction drives the entire architecture and should guide all
//! development.
//!
//! ## The Three-Layer Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (args.rs, wired by main.rs)                      │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Returns structured Result types                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Pure business logic: upload, process, info, token        │
//! │  - Operates on Rust types, returns Rust types               │
//! │  - No I/O assumptions beyond the store trait                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - Abstract NoteStore trait over the Trilium ETAPI          │
//! │  - EtapiClient (production), InMemoryStore (testing)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No Terminal Assumptions in Core
//!
//! From `api.rs` inward (API, commands, storage), code:
//! - Takes regular Rust function arguments
//! - Returns regular Rust types (`Result<CmdResult>`)
//! - **Never** writes to stdout/stderr
//! - **Never** calls `std::process::exit`
//! - **Never** assumes a terminal environment
//!
//! Interactive decisions (creating a missing parent note, prompting for a
//! password) live entirely in the CLI layer; commands surface them as
//! typed errors instead of prompting.
//!
//! ## Testing Strategy
//!
//! 1. **Commands** (`commands/*.rs`): Thorough unit tests of business logic
//!    against `InMemoryStore`. This is where the lion's share of testing lives.
//!
//! 2. **Storage** (`store/http.rs`): Wire-level tests against a mock HTTP
//!    server, verifying headers, encoding, and error mapping.
//!
//! 3. **CLI** (`args.rs` + thin `main.rs`): End-to-end tests of argument
//!    parsing and exit codes in `tests/`.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade—entry point for all operations
//! - [`commands`]: Business logic for each command
//! - [`store`]: The `NoteStore` trait, ETAPI client, and in-memory test store
//! - [`model`]: Core data types (`Note`, `Label`, `AppInfo`, `Article`)
//! - [`envfile`]: Connection settings loaded from `.env` files
//! - [`filter`]: Glob-based file selection for folder uploads
//! - [`linkify`]: URL extraction and internal-link rewriting
//! - [`highlight`]: highlighted-span extraction for web clippings
//! - [`fetch`]: Article retrieval and HTML-to-text extraction
//! - [`error`]: Error types
//! - `args`: Argument parsing for the binary (not part of the lib API)

pub mod api;
pub mod commands;
pub mod envfile;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod highlight;
pub mod linkify;
pub mod model;
pub mod store;
