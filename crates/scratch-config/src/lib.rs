//! `scratch.toml` loading and tracing setup.
//!
//! The sub-configs live next to the code they configure ([`TempConfig`] in `scratch-temp`,
//! [`DeleteConfig`] in `scratch-fs`); [`ScratchConfig`] aggregates them with [`LoggingConfig`].

use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use scratch_fs::DeleteConfig;
pub use scratch_temp::TempConfig;

mod logging;

pub use logging::{init_tracing, LoggingConfig};

/// Env var naming an explicit config file (absolute or relative to the search directory).
pub const SCRATCH_CONFIG_ENV_VAR: &str = "SCRATCH_CONFIG";
/// Env var overriding `temp.base_dir`.
pub const SCRATCH_TEMP_DIR_ENV_VAR: &str = "SCRATCH_TEMP_DIR";
/// Env var overriding `delete.threads`.
pub const SCRATCH_DELETE_THREADS_ENV_VAR: &str = "SCRATCH_DELETE_THREADS";

const CONFIG_FILE_NAMES: [&str; 2] = ["scratch.toml", ".scratch.toml"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScratchConfig {
    pub temp: TempConfig,
    pub delete: DeleteConfig,
    pub logging: LoggingConfig,
}

impl ScratchConfig {
    /// Parse and validate a TOML document. Env overrides are not applied.
    pub fn load_from_str(text: &str) -> Result<Self> {
        let config: ScratchConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from TOML. Env overrides are not applied.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    /// Apply `SCRATCH_TEMP_DIR` and `SCRATCH_DELETE_THREADS` on top of the loaded values, then
    /// re-validate.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        with_config_env_lock(|| {
            if let Some(base_dir) = TempConfig::from_env().base_dir {
                self.temp.base_dir = Some(base_dir);
            }

            if let Some(value) = std::env::var_os(SCRATCH_DELETE_THREADS_ENV_VAR) {
                let value = value.to_string_lossy();
                let value = value.trim();
                if !value.is_empty() {
                    let threads = value.parse::<usize>().map_err(|err| ConfigError::Invalid {
                        field: "delete.threads",
                        message: format!(
                            "{SCRATCH_DELETE_THREADS_ENV_VAR}={value:?} is not a thread count ({err})"
                        ),
                    })?;
                    self.delete.threads = Some(threads);
                }
            }
            Ok::<(), ConfigError>(())
        })?;
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.delete.threads == Some(0) {
            return Err(ConfigError::Invalid {
                field: "delete.threads",
                message: "must be at least 1".to_owned(),
            });
        }
        if self
            .temp
            .base_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            return Err(ConfigError::Invalid {
                field: "temp.base_dir",
                message: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

static CONFIG_ENV_LOCK: ReentrantMutex<()> = parking_lot::const_reentrant_mutex(());

/// Run `f` while holding the config environment lock.
///
/// Environment variables are process-global; tests that set `SCRATCH_*` variables wrap the
/// mutation and the lookup in this helper so concurrent discovery doesn't observe them.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = CONFIG_ENV_LOCK.lock();
    f()
}

/// Discover the config file for a directory.
///
/// Search order:
/// 1) `SCRATCH_CONFIG` (absolute or relative to `dir`)
/// 2) `scratch.toml` in `dir`
/// 3) `.scratch.toml` in `dir`
pub fn discover_config_path(dir: &Path) -> Option<PathBuf> {
    let _guard = CONFIG_ENV_LOCK.lock();
    if let Some(value) = std::env::var_os(SCRATCH_CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            dir.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    CONFIG_FILE_NAMES
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Load the config for a directory with env overrides applied.
///
/// If no config file is present, returns the defaults (plus overrides) and `None`.
pub fn load_for_dir(dir: &Path) -> Result<(ScratchConfig, Option<PathBuf>)> {
    let path = discover_config_path(dir);
    let mut config = match &path {
        Some(path) => ScratchConfig::load_from_path(path)?,
        None => ScratchConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok((config, path))
}
