use crate::config::TempConfig;
use crate::error::TempError;
use parking_lot::{Mutex, MutexGuard};
use scratch_fs::{ensure_dir, DeleteEngine, DeleteFailure, DeleteReport, EntryKind};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, OnceLock};

pub const INSTANCE_PREFIX: &str = "scratch-instance-";
pub const TEMP_FILE_PREFIX: &str = "scratch-tmp-";
pub const PERSIST_PREFIX: &str = "scratch-persist";

#[derive(Clone, Debug)]
struct Registered {
    path: PathBuf,
    kind: EntryKind,
}

#[derive(Debug)]
struct State {
    root: PathBuf,
    // Registration order; teardown walks it backwards.
    registered: Vec<Registered>,
}

impl State {
    fn register(&mut self, path: PathBuf, kind: EntryKind) {
        if !self.registered.iter().any(|entry| entry.path == path) {
            self.registered.push(Registered { path, kind });
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    engine: Arc<DeleteEngine>,
}

/// Handle to a process instance's scratch storage.
///
/// Clones share the same root and teardown registry. The current root and every creation
/// under it are serialized behind one lock.
#[derive(Clone, Debug)]
pub struct TempWorkspace {
    inner: Arc<Inner>,
}

impl TempWorkspace {
    /// Create a uniquely-named root under the configured base directory.
    ///
    /// Deletions go through the process-wide [`scratch_fs::global_engine`].
    pub fn new(config: &TempConfig) -> Result<Self, TempError> {
        Self::with_engine(config, scratch_fs::global_engine())
    }

    pub fn with_engine(config: &TempConfig, engine: Arc<DeleteEngine>) -> Result<Self, TempError> {
        let base = config.base_dir();
        ensure_dir(&base)?;
        let root = create_unique_dir(&base, INSTANCE_PREFIX)
            .map_err(|source| TempError::CreateRoot { base, source })?;
        tracing::debug!(
            target: "scratch.temp",
            root = %root.display(),
            "created temp root"
        );

        let mut state = State {
            root: root.clone(),
            registered: Vec::new(),
        };
        state.register(root, EntryKind::Directory);
        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                engine,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock()
    }

    /// The current temp root.
    pub fn root(&self) -> PathBuf {
        self.lock().root.clone()
    }

    /// The current temp root, re-created if something removed it from disk.
    pub fn ensure_root(&self) -> Result<PathBuf, TempError> {
        let mut state = self.lock();
        ensure_root_locked(&mut state)?;
        Ok(state.root.clone())
    }

    /// Swap in a fresh root under `new_base` and return it.
    ///
    /// `new_base` and its parents are created if needed. The previous root is left on disk (it
    /// stays registered for teardown).
    pub fn reconfigure(&self, new_base: impl AsRef<Path>) -> Result<PathBuf, TempError> {
        let new_base = new_base.as_ref();
        let mut state = self.lock();
        ensure_dir(new_base)?;
        let root = create_unique_dir(new_base, INSTANCE_PREFIX).map_err(|source| {
            TempError::CreateRoot {
                base: new_base.to_path_buf(),
                source,
            }
        })?;
        state.register(root.clone(), EntryKind::Directory);
        let previous = std::mem::replace(&mut state.root, root.clone());
        tracing::info!(
            target: "scratch.temp",
            previous = %previous.display(),
            root = %root.display(),
            "temp root reconfigured"
        );
        Ok(root)
    }

    /// Create a uniquely-named directory under the current root.
    ///
    /// `prefix` must not contain a path separator.
    pub fn create_instance_dir(&self, prefix: &str) -> Result<PathBuf, TempError> {
        check_name_fragment(prefix)?;
        let mut state = self.lock();
        ensure_root_locked(&mut state)?;
        let dir = create_unique_dir(&state.root, prefix).map_err(|source| TempError::Create {
            what: "directory",
            root: state.root.clone(),
            source,
        })?;
        state.register(dir.clone(), EntryKind::Directory);
        Ok(dir)
    }

    /// Create a uniquely-named empty file ending in `suffix` under the current root.
    ///
    /// `suffix` must not contain a path separator.
    pub fn create_temp_file(&self, suffix: &str) -> Result<PathBuf, TempError> {
        check_name_fragment(suffix)?;
        let mut state = self.lock();
        ensure_root_locked(&mut state)?;
        let file = create_unique_file(&state.root, TEMP_FILE_PREFIX, suffix).map_err(|source| {
            TempError::Create {
                what: "file",
                root: state.root.clone(),
                source,
            }
        })?;
        state.register(file.clone(), EntryKind::File);
        Ok(file)
    }

    /// Create an empty file called exactly `name` under the current root.
    ///
    /// Fails if a file with that name already exists.
    pub fn create_named_file(&self, name: &str) -> Result<PathBuf, TempError> {
        if !is_single_component(name) {
            return Err(TempError::InvalidName {
                name: name.to_owned(),
            });
        }
        let mut state = self.lock();
        ensure_root_locked(&mut state)?;
        let path = state.root.join(name);
        std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| TempError::Create {
                what: "named file",
                root: state.root.clone(),
                source,
            })?;
        state.register(path.clone(), EntryKind::File);
        Ok(path)
    }

    /// Remove everything inside the current root, keeping the root itself.
    ///
    /// Never fails: problems are logged and returned in the report.
    pub fn clear_root(&self) -> DeleteReport {
        let mut state = self.lock();
        if !state.root.is_dir() {
            return DeleteReport::default();
        }
        let report = match self.inner.engine.clear_dir(&state.root) {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(
                    target: "scratch.temp",
                    root = %state.root.display(),
                    error = %err,
                    "failed to clear temp root"
                );
                DeleteReport {
                    failures: vec![DeleteFailure {
                        path: state.root.clone(),
                        kind: EntryKind::Directory,
                        error: err.to_string(),
                    }],
                    ..DeleteReport::default()
                }
            }
        };
        state
            .registered
            .retain(|entry| std::fs::symlink_metadata(&entry.path).is_ok());
        report
    }

    /// Delete `path` (file or whole subtree) if it exists. Never fails.
    pub fn delete_dir_if_exists(&self, path: impl AsRef<Path>) -> DeleteReport {
        self.inner.engine.delete_if_exists(path)
    }

    /// Remove every registered path, newest first, and forget them.
    ///
    /// This is the teardown hook for the owner of the workspace. Running it again only removes
    /// what was registered since.
    pub fn cleanup(&self) -> DeleteReport {
        let registered = std::mem::take(&mut self.lock().registered);
        let mut report = DeleteReport::default();
        for entry in registered.iter().rev() {
            match entry.kind {
                EntryKind::File => match std::fs::remove_file(&entry.path) {
                    Ok(()) => report.files_deleted += 1,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => {
                        tracing::warn!(
                            target: "scratch.temp",
                            path = %entry.path.display(),
                            error = %err,
                            "failed to delete temp file"
                        );
                        report.failures.push(DeleteFailure {
                            path: entry.path.clone(),
                            kind: EntryKind::File,
                            error: err.to_string(),
                        });
                    }
                },
                EntryKind::Directory => {
                    report.merge(self.inner.engine.delete_if_exists(&entry.path));
                }
            }
        }
        tracing::debug!(
            target: "scratch.temp",
            entries = registered.len(),
            files_deleted = report.files_deleted,
            dirs_deleted = report.dirs_deleted,
            failures = report.failures.len(),
            "temp workspace cleaned up"
        );
        report
    }

    /// Returns a guard that runs [`TempWorkspace::cleanup`] when dropped.
    pub fn teardown_guard(&self) -> TeardownGuard {
        TeardownGuard {
            workspace: self.clone(),
        }
    }
}

/// Runs [`TempWorkspace::cleanup`] on drop.
#[must_use = "the workspace is cleaned up when the guard is dropped"]
#[derive(Debug)]
pub struct TeardownGuard {
    workspace: TempWorkspace,
}

impl TeardownGuard {
    pub fn workspace(&self) -> &TempWorkspace {
        &self.workspace
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        let report = self.workspace.cleanup();
        if !report.is_clean() {
            tracing::warn!(
                target: "scratch.temp",
                failures = report.failures.len(),
                "temp workspace teardown left files behind"
            );
        }
    }
}

/// The lazily-created process-wide workspace.
///
/// Nothing tears it down automatically: whoever owns the process must call
/// `global()?.cleanup()` before exiting, or hold `global()?.teardown_guard()` for the process
/// lifetime. Otherwise its root is left behind.
pub fn global() -> Result<&'static TempWorkspace, TempError> {
    static GLOBAL: OnceLock<TempWorkspace> = OnceLock::new();
    static INIT: Mutex<()> = parking_lot::const_mutex(());

    if let Some(workspace) = GLOBAL.get() {
        return Ok(workspace);
    }
    let _guard = INIT.lock();
    if let Some(workspace) = GLOBAL.get() {
        return Ok(workspace);
    }
    let workspace = TempWorkspace::new(&TempConfig::from_env())?;
    Ok(GLOBAL.get_or_init(|| workspace))
}

/// Create a temp file that is never registered for teardown.
///
/// The file lives in its own fresh directory under the platform temp dir.
pub fn create_persistent_temp_file(suffix: &str) -> Result<PathBuf, TempError> {
    check_name_fragment(suffix)?;
    let base = std::env::temp_dir();
    let dir = create_unique_dir(&base, PERSIST_PREFIX).map_err(|source| TempError::Create {
        what: "directory",
        root: base,
        source,
    })?;
    create_unique_file(&dir, "scratch-", suffix).map_err(|source| TempError::Create {
        what: "file",
        root: dir,
        source,
    })
}

fn ensure_root_locked(state: &mut State) -> Result<(), TempError> {
    if state.root.is_dir() {
        return Ok(());
    }
    ensure_dir(&state.root)?;
    let root = state.root.clone();
    state.register(root, EntryKind::Directory);
    Ok(())
}

fn create_unique_dir(parent: &Path, prefix: &str) -> io::Result<PathBuf> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(parent)
        .map(tempfile::TempDir::keep)
}

fn create_unique_file(parent: &Path, prefix: &str, suffix: &str) -> io::Result<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(parent)?;
    file.into_temp_path().keep().map_err(|err| err.error)
}

// Prefixes and suffixes are glued to a random name; a separator would move the result out of
// the root.
fn check_name_fragment(fragment: &str) -> Result<(), TempError> {
    if fragment.chars().any(std::path::is_separator) {
        return Err(TempError::InvalidName {
            name: fragment.to_owned(),
        });
    }
    Ok(())
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
