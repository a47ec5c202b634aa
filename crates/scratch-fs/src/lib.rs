//! Filesystem building blocks for scratch storage and build caches.
//!
//! This crate implements the pieces with real ordering and determinism invariants:
//! - content hashing ([`hash_bytes`]) used for cache keys and naming
//! - a single-pass tree walker that lists directories in post-order ([`walk_tree`])
//! - a bulk deletion engine that removes files in parallel and directories sequentially
//!   ([`DeleteEngine`], [`delete_tree`], [`delete_if_exists`])
//! - timestamp-based input fingerprints for build output reuse ([`InputFingerprint`])
//! - a lock-guarded "ensure directory exists" primitive shared by every directory creator
//!   ([`ensure_dir`])
//!
//! ## Deletion ordering
//!
//! [`DeleteEngine::delete_tree`] materializes the whole walk before touching anything, removes
//! every file on a worker pool, waits for all of them, and only then removes directories in the
//! walker's post-order. A directory is therefore never attempted before its files and
//! subdirectories have been.

mod delete;
mod dirs;
mod error;
mod fingerprint;
mod hash;
mod walk;

pub use delete::{
    clear_dir, delete_file_if_exists, delete_if_exists, delete_tree, global_engine, DeleteConfig,
    DeleteEngine, DeleteFailure, DeleteReport, EntryKind, Remover, StdRemover,
};
pub use dirs::{ensure_dir, ensure_parent_dir, rename_file};
pub use error::{FsError, Result};
pub use fingerprint::{expand_inputs, fingerprint, modified_millis, InputFingerprint};
pub use hash::{hash_bytes, hash_file, hash_reader, hash_str};
pub use walk::{walk_tree, walk_tree_with, TreeWalk, WalkOptions};
