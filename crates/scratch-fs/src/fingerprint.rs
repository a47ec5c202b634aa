use crate::error::FsError;
use crate::hash::hash_bytes;
use crate::walk::walk_tree;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// A cache key derived from a set of input paths and their modification times.
///
/// The key is timestamp-based, not content-based: touching a file changes it even if the bytes
/// are identical, and rewriting a file while preserving its mtime does not.
///
/// File paths are part of the key, so moving or renaming the input tree changes it too.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputFingerprint(String);

impl InputFingerprint {
    /// Fingerprint `inputs`: directories are expanded to their regular files, the expanded list
    /// is sorted, and counts, paths and modification times are digested.
    pub fn for_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Self, FsError> {
        Self::build(inputs).map_err(|err| FsError::Fingerprint {
            source: Box::new(err),
        })
    }

    fn build<P: AsRef<Path>>(inputs: &[P]) -> Result<Self, FsError> {
        let mut files = expand_inputs(inputs)?;
        files.sort();

        let mut bytes = Vec::with_capacity(16 + files.len() * 64);
        bytes.extend_from_slice(&(inputs.len() as u64).to_be_bytes());
        bytes.extend_from_slice(&(files.len() as u64).to_be_bytes());
        for file in &files {
            let path = file.to_string_lossy();
            bytes.extend_from_slice(&(path.len() as u64).to_be_bytes());
            bytes.extend_from_slice(path.as_bytes());

            let meta = std::fs::metadata(file)?;
            bytes.extend_from_slice(&modified_millis(&meta)?.to_be_bytes());
        }

        Ok(Self(hash_bytes(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InputFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for InputFingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Shorthand for [`InputFingerprint::for_inputs`] returning the hex digest.
pub fn fingerprint<P: AsRef<Path>>(inputs: &[P]) -> Result<String, FsError> {
    InputFingerprint::for_inputs(inputs).map(|fp| fp.0)
}

/// Replace every directory in `inputs` by the regular files below it (links followed).
///
/// Non-directory inputs pass through unchanged, in order. The order of files discovered inside
/// a directory is unspecified.
pub fn expand_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<PathBuf>, FsError> {
    let mut files = Vec::with_capacity(inputs.len());
    for input in inputs {
        let input = input.as_ref();
        if input.is_dir() {
            let (found, _) = walk_tree(input)?.into_parts();
            files.extend(found);
        } else {
            files.push(input.to_path_buf());
        }
    }
    Ok(files)
}

/// Last-modified time of `meta` in milliseconds since the unix epoch.
///
/// Times before the epoch are negative.
pub fn modified_millis(meta: &std::fs::Metadata) -> Result<i64, FsError> {
    let modified = meta.modified()?;
    Ok(system_time_millis(modified))
}

fn system_time_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(err) => {
            let before = err.duration();
            i64::try_from(before.as_millis()).map_or(i64::MIN, |millis| -millis)
        }
    }
}
