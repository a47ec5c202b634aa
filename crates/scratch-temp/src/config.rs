use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Selects where temp roots are created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TempConfig {
    /// Base directory for temp roots. Defaults to the platform temp directory.
    pub base_dir: Option<PathBuf>,
}

impl TempConfig {
    pub fn from_env() -> Self {
        Self {
            base_dir: std::env::var_os("SCRATCH_TEMP_DIR")
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn base_dir(&self) -> PathBuf {
        match &self.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir(),
        }
    }
}
