use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, FsError>;

/// Errors that abort a filesystem operation.
///
/// Best-effort failures during bulk deletion are never represented here; they are recorded in
/// [`crate::DeleteReport`] instead.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("failed to walk directory tree {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("can't create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build fingerprint for inputs: {source}")]
    Fingerprint {
        #[source]
        source: Box<FsError>,
    },
}

impl FsError {
    /// Returns the underlying `io::ErrorKind` when the failure came from the OS.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            FsError::Io(err) => Some(err.kind()),
            FsError::CreateDir { source, .. } => Some(source.kind()),
            FsError::Walk { source, .. } => source.io_error().map(|err| err.kind()),
            FsError::Fingerprint { source } => source.io_kind(),
            FsError::NotADirectory { .. } => None,
        }
    }
}
