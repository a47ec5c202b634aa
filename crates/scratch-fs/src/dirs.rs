use crate::error::FsError;
use parking_lot::{const_mutex, Mutex};
use std::io;
use std::path::{Path, PathBuf};

// Every directory creator in the process funnels through this lock so concurrent requests for
// the same path never race on `create_dir_all`.
static MKDIR_LOCK: Mutex<()> = const_mutex(());

/// Make sure `dir` exists as a directory, creating missing parents.
///
/// A directory that already existed is success. Ending up without a directory at `dir` (a file
/// in the way, permissions, ...) is an error.
pub fn ensure_dir(dir: impl AsRef<Path>) -> Result<(), FsError> {
    let dir = dir.as_ref();
    let _guard = MKDIR_LOCK.lock();
    match std::fs::create_dir_all(dir) {
        Ok(()) if dir.is_dir() => Ok(()),
        Ok(()) => Err(FsError::CreateDir {
            path: dir.to_path_buf(),
            source: io::Error::other("path exists but is not a directory"),
        }),
        Err(_) if dir.is_dir() => Ok(()),
        Err(source) => Err(FsError::CreateDir {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// Make sure the parent directory of `file` exists.
pub fn ensure_parent_dir(file: impl AsRef<Path>) -> Result<(), FsError> {
    let file = file.as_ref();
    let absolute = if file.is_absolute() {
        file.to_path_buf()
    } else {
        std::env::current_dir()?.join(file)
    };
    match absolute.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

/// Move `source` to `target`.
///
/// Conflicts are reported as `false` rather than an error so the caller decides what to do: a
/// missing source, an existing target, or any other rename failure.
pub fn rename_file(source: impl AsRef<Path>, target: impl AsRef<Path>) -> bool {
    let source = source.as_ref();
    let target = target.as_ref();

    if let Err(err) = std::fs::symlink_metadata(source) {
        if err.kind() == io::ErrorKind::NotFound {
            tracing::error!(
                target: "scratch.fs",
                path = %source.display(),
                "file to rename not found"
            );
        } else {
            tracing::error!(
                target: "scratch.fs",
                path = %source.display(),
                error = %err,
                "failed to stat file to rename"
            );
        }
        return false;
    }
    if std::fs::symlink_metadata(target).is_ok() {
        tracing::error!(
            target: "scratch.fs",
            path = %target.display(),
            "file with that name already exists"
        );
        return false;
    }

    match std::fs::rename(source, target) {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(
                target: "scratch.fs",
                source = %source.display(),
                target_path = %target.display(),
                error = %err,
                "error renaming file"
            );
            false
        }
    }
}

pub(crate) fn display_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
