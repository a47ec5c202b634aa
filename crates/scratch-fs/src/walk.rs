use crate::error::FsError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Controls how [`walk_tree_with`] treats symbolic links.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalkOptions {
    /// Descend into linked directories and classify links by their target.
    ///
    /// When disabled, links (and any other non-directory entry) are reported as leaves so that
    /// they can be unlinked, and linked directories are never entered.
    pub follow_links: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self { follow_links: true }
    }
}

/// The fully materialized result of walking a directory subtree.
///
/// `dirs` is in strict post-order: every directory appears after all of its descendant
/// directories, and the walked root is always the last element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TreeWalk {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl TreeWalk {
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn into_parts(self) -> (Vec<PathBuf>, Vec<PathBuf>) {
        (self.files, self.dirs)
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }
}

/// Walk `root`, following symbolic links.
pub fn walk_tree(root: impl AsRef<Path>) -> Result<TreeWalk, FsError> {
    walk_tree_with(root, WalkOptions::default())
}

/// Walk `root` and classify every entry into files and post-ordered directories.
///
/// Entries that are neither regular files nor directories (dangling links, sockets, ...) are
/// skipped when following links. Any other error abandons the walk; no partial result is
/// returned.
pub fn walk_tree_with(root: impl AsRef<Path>, options: WalkOptions) -> Result<TreeWalk, FsError> {
    let root = root.as_ref();
    let meta = if options.follow_links {
        std::fs::metadata(root)?
    } else {
        std::fs::symlink_metadata(root)?
    };
    if !meta.is_dir() {
        return Err(FsError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut walk = TreeWalk::default();
    let walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .follow_root_links(options.follow_links)
        .contents_first(true);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if options.follow_links && is_dangling_link(&err) => {
                tracing::debug!(
                    target: "scratch.fs",
                    path = ?err.path(),
                    error = %err,
                    "skipping dangling symbolic link"
                );
                continue;
            }
            Err(err) => {
                return Err(FsError::Walk {
                    root: root.to_path_buf(),
                    source: err,
                })
            }
        };

        let ty = entry.file_type();
        if ty.is_dir() {
            walk.dirs.push(entry.into_path());
        } else if ty.is_file() || !options.follow_links {
            walk.files.push(entry.into_path());
        } else {
            tracing::debug!(
                target: "scratch.fs",
                path = %entry.path().display(),
                "skipping entry that is neither a file nor a directory"
            );
        }
    }

    Ok(walk)
}

fn is_dangling_link(err: &walkdir::Error) -> bool {
    if err.loop_ancestor().is_some() {
        return false;
    }
    let not_found = err
        .io_error()
        .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound);
    if !not_found {
        return false;
    }
    err.path()
        .and_then(|path| std::fs::symlink_metadata(path).ok())
        .is_some_and(|meta| meta.file_type().is_symlink())
}
