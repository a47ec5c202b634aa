//! Scratch storage for a process instance.
//!
//! A [`TempWorkspace`] owns one temp root directory at a time. Instance directories and temp
//! files are created under the current root and registered for teardown; the owner of the
//! workspace runs [`TempWorkspace::cleanup`] (directly or through a [`TeardownGuard`]) when it
//! is done. [`TempWorkspace::reconfigure`] swaps in a fresh root under another base directory
//! without deleting the old one.
//!
//! Callers that don't want to thread a handle around can use [`global`], which lazily creates a
//! process-wide workspace from [`TempConfig::from_env`].

mod config;
mod error;
mod workspace;

pub use config::TempConfig;
pub use error::{Result, TempError};
pub use workspace::{
    create_persistent_temp_file, global, TeardownGuard, TempWorkspace, INSTANCE_PREFIX,
    PERSIST_PREFIX, TEMP_FILE_PREFIX,
};
