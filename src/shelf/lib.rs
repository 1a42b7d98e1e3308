//! # Shelf Architecture
//!
//! Shelf is a **personal book library manager**: several named libraries, one
//! shared pool for books the reader did not finish, per-book reading progress,
//! and statistics. The crate is a library first; the `shelf` binary is one
//! client of it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Registry (registry.rs)                                     │
//! │  - Library lifecycle, the shared DNF pool                   │
//! │  - Every move of a book between stores                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Collection Store (store/collection.rs)                     │
//! │  - One book list, write-through persistence, queries, stats │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Backend (store/)                                   │
//! │  - Abstract StorageBackend trait                            │
//! │  - FsBackend (production), MemBackend (testing)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No Terminal Assumptions in Core
//!
//! From the registry inward, code:
//! - Takes regular Rust arguments and returns regular Rust types
//! - **Never** writes to stdout/stderr (diagnostics go through `log`)
//! - **Never** calls `std::process::exit`
//!
//! Missing or corrupt data degrades to empty collections, and failed writes
//! are logged and flagged on the store, so the core never aborts a session.
//!
//! ## Module Overview
//!
//! - [`model`]: The book record and reading status
//! - [`store`]: Storage backends, file codecs and the collection store
//! - [`registry`]: Libraries, the DNF pool and cross-store moves
//! - [`stats`]: Reading statistics
//! - [`config`]: Library configuration and the data directory
//! - [`settings`]: UI settings (theme)
//! - [`lookup`]: Book metadata lookup by ISBN or free text
//! - [`export`]: Archive export
//! - [`error`]: Error types
//! - `cli`: Argument parsing and printing for the binary (not part of the lib API)

pub mod config;
pub mod error;
pub mod export;
pub mod lookup;
pub mod model;
pub mod registry;
pub mod settings;
pub mod stats;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;
