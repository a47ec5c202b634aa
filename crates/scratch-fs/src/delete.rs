use crate::dirs::display_path;
use crate::error::FsError;
use crate::walk::{walk_tree_with, WalkOptions};
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Removal primitives used by [`DeleteEngine`].
///
/// Implementations must be safe to call from several worker threads at once; file removals run
/// concurrently.
pub trait Remover: Send + Sync {
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

/// [`Remover`] backed by `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdRemover;

impl Remover for StdRemover {
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir(path)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeleteConfig {
    /// Worker threads used to remove files. Defaults to the available parallelism.
    pub threads: Option<usize>,
}

impl DeleteConfig {
    pub fn effective_threads(&self) -> usize {
        match self.threads {
            Some(threads) => threads.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

/// A single path that a bulk deletion could not remove.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub error: String,
}

/// Outcome of a best-effort bulk deletion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub files_deleted: usize,
    pub dirs_deleted: usize,
    pub failures: Vec<DeleteFailure>,
}

impl DeleteReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, kind: EntryKind) -> usize {
        self.failures
            .iter()
            .filter(|failure| failure.kind == kind)
            .count()
    }

    pub fn merge(&mut self, other: DeleteReport) {
        self.files_deleted += other.files_deleted;
        self.dirs_deleted += other.dirs_deleted;
        self.failures.extend(other.failures);
    }
}

enum DeletePool {
    Rayon(ThreadPool),
    Inline,
}

impl DeletePool {
    fn threads(&self) -> usize {
        match self {
            DeletePool::Rayon(pool) => pool.current_num_threads(),
            DeletePool::Inline => 1,
        }
    }

    fn for_each<F>(&self, items: &[PathBuf], op: F)
    where
        F: Fn(&PathBuf) + Send + Sync,
    {
        match self {
            // `install` returns only after every item has been processed.
            DeletePool::Rayon(pool) => pool.install(|| items.par_iter().for_each(op)),
            DeletePool::Inline => items.iter().for_each(op),
        }
    }
}

fn build_delete_pool(threads: usize) -> DeletePool {
    // Thread creation can fail in constrained environments (low RLIMIT_NPROC, `EAGAIN`).
    // Shrink the pool rather than failing the deletion.
    let mut threads = threads.max(1);
    loop {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("scratch-delete-{idx}"))
            .build()
        {
            Ok(pool) => return DeletePool::Rayon(pool),
            Err(_) if threads > 1 => {
                threads = (threads / 2).max(1);
            }
            Err(err) => {
                tracing::debug!(
                    target: "scratch.fs",
                    error = %err,
                    "failed to build deletion pool; removing files on the calling thread"
                );
                return DeletePool::Inline;
            }
        }
    }
}

/// Deletes directory trees: files concurrently, then directories sequentially in post-order.
pub struct DeleteEngine {
    pool: DeletePool,
    remover: Arc<dyn Remover>,
}

impl std::fmt::Debug for DeleteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeleteEngine")
            .field("threads", &self.threads())
            .finish_non_exhaustive()
    }
}

impl Default for DeleteEngine {
    fn default() -> Self {
        Self::new(&DeleteConfig::default())
    }
}

impl DeleteEngine {
    pub fn new(config: &DeleteConfig) -> Self {
        Self::with_remover(config, StdRemover)
    }

    pub fn with_remover(config: &DeleteConfig, remover: impl Remover + 'static) -> Self {
        Self {
            pool: build_delete_pool(config.effective_threads()),
            remover: Arc::new(remover),
        }
    }

    pub fn threads(&self) -> usize {
        self.pool.threads()
    }

    /// Delete the subtree at `root`, keeping `root` itself when `keep_root` is set.
    ///
    /// A missing `root` is nothing to delete. Otherwise the walk is completed before anything is
    /// removed; if it fails nothing is touched and the error is returned. After that every
    /// removal is best-effort: failures are logged and collected in the returned report.
    pub fn delete_tree(
        &self,
        root: impl AsRef<Path>,
        keep_root: bool,
    ) -> Result<DeleteReport, FsError> {
        let root = root.as_ref();
        if let Err(err) = std::fs::symlink_metadata(root) {
            if err.kind() == io::ErrorKind::NotFound {
                tracing::debug!(
                    target: "scratch.fs",
                    root = %root.display(),
                    "nothing to delete"
                );
                return Ok(DeleteReport::default());
            }
        }
        let walk = walk_tree_with(
            root,
            WalkOptions {
                follow_links: false,
            },
        )?;
        let (files, mut dirs) = walk.into_parts();

        let mut report = DeleteReport::default();
        let failures = Mutex::new(Vec::new());

        if !files.is_empty() {
            let deleted = AtomicUsize::new(0);
            self.pool.for_each(&files, |path| {
                match self.remover.remove_file(path) {
                    Ok(()) => {
                        deleted.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => {
                        tracing::warn!(
                            target: "scratch.fs",
                            path = %display_path(path).display(),
                            error = %err,
                            "failed to delete file"
                        );
                        failures.lock().push(DeleteFailure {
                            path: path.clone(),
                            kind: EntryKind::File,
                            error: err.to_string(),
                        });
                    }
                }
            });
            report.files_deleted = deleted.into_inner();
        }

        if keep_root {
            // Post-order always lists the walked root last.
            let popped = dirs.pop();
            debug_assert_eq!(popped.as_deref(), Some(root));
        }

        let mut failures = failures.into_inner();
        for dir in &dirs {
            match self.remover.remove_dir(dir) {
                Ok(()) => report.dirs_deleted += 1,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::warn!(
                        target: "scratch.fs",
                        path = %display_path(dir).display(),
                        error = %err,
                        "failed to delete directory"
                    );
                    failures.push(DeleteFailure {
                        path: dir.clone(),
                        kind: EntryKind::Directory,
                        error: err.to_string(),
                    });
                }
            }
        }
        report.failures = failures;

        tracing::debug!(
            target: "scratch.fs",
            root = %root.display(),
            keep_root,
            files_deleted = report.files_deleted,
            dirs_deleted = report.dirs_deleted,
            failures = report.failures.len(),
            "deleted directory tree"
        );
        Ok(report)
    }

    /// Remove everything below `dir` while keeping `dir` itself.
    pub fn clear_dir(&self, dir: impl AsRef<Path>) -> Result<DeleteReport, FsError> {
        self.delete_tree(dir, true)
    }

    /// Delete `path` if it exists, whatever it is. Never fails; problems are logged and
    /// reported.
    pub fn delete_if_exists(&self, path: impl AsRef<Path>) -> DeleteReport {
        let path = path.as_ref();
        let meta = match std::fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return DeleteReport::default(),
            Err(err) => {
                tracing::error!(
                    target: "scratch.fs",
                    path = %display_path(path).display(),
                    error = %err,
                    "failed to stat path before deletion"
                );
                return single_failure(path, EntryKind::Directory, err.to_string());
            }
        };

        if !meta.is_dir() {
            return match self.remover.remove_file(path) {
                Ok(()) => DeleteReport {
                    files_deleted: 1,
                    ..DeleteReport::default()
                },
                Err(err) if err.kind() == io::ErrorKind::NotFound => DeleteReport::default(),
                Err(err) => {
                    tracing::error!(
                        target: "scratch.fs",
                        path = %display_path(path).display(),
                        error = %err,
                        "failed to delete file"
                    );
                    single_failure(path, EntryKind::File, err.to_string())
                }
            };
        }

        match self.delete_tree(path, false) {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(
                    target: "scratch.fs",
                    path = %display_path(path).display(),
                    error = %err,
                    "failed to delete dir"
                );
                single_failure(path, EntryKind::Directory, err.to_string())
            }
        }
    }
}

fn single_failure(path: &Path, kind: EntryKind, error: String) -> DeleteReport {
    DeleteReport {
        failures: vec![DeleteFailure {
            path: path.to_path_buf(),
            kind,
            error,
        }],
        ..DeleteReport::default()
    }
}

/// The process-wide engine behind the free functions of this module.
///
/// Built on first use from [`DeleteConfig::default`]. Share it instead of building another
/// engine so the process keeps a single deletion pool.
pub fn global_engine() -> Arc<DeleteEngine> {
    static ENGINE: OnceLock<Arc<DeleteEngine>> = OnceLock::new();
    Arc::clone(ENGINE.get_or_init(|| Arc::new(DeleteEngine::default())))
}

/// [`DeleteEngine::delete_tree`] on the process-wide engine.
pub fn delete_tree(root: impl AsRef<Path>, keep_root: bool) -> Result<DeleteReport, FsError> {
    global_engine().delete_tree(root, keep_root)
}

/// [`DeleteEngine::clear_dir`] on the process-wide engine.
pub fn clear_dir(dir: impl AsRef<Path>) -> Result<DeleteReport, FsError> {
    global_engine().clear_dir(dir)
}

/// [`DeleteEngine::delete_if_exists`] on the process-wide engine.
pub fn delete_if_exists(path: impl AsRef<Path>) -> DeleteReport {
    global_engine().delete_if_exists(path)
}

/// Remove a single file. Returns `Ok(false)` if there was nothing to remove.
pub fn delete_file_if_exists(path: impl AsRef<Path>) -> Result<bool, FsError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
