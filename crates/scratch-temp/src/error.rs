use scratch_fs::FsError;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, TempError>;

/// Errors produced while creating scratch storage.
#[derive(Debug, thiserror::Error)]
pub enum TempError {
    #[error("failed to create temp root directory under {base}: {source}")]
    CreateRoot {
        base: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create temp {what} under {root}: {source}")]
    Create {
        what: &'static str,
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid temp name {name:?}: the created path must stay a direct child of the temp root")]
    InvalidName { name: String },

    #[error(transparent)]
    Fs(#[from] FsError),
}
