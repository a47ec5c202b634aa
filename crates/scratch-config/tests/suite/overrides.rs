use scratch_config::{
    load_for_dir, with_config_env_lock, ConfigError, ScratchConfig, SCRATCH_CONFIG_ENV_VAR,
    SCRATCH_DELETE_THREADS_ENV_VAR, SCRATCH_TEMP_DIR_ENV_VAR,
};
use std::fs;
use std::path::PathBuf;

fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
    with_config_env_lock(|| {
        std::env::remove_var(SCRATCH_CONFIG_ENV_VAR);
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let out = f();
        for (key, _) in vars {
            std::env::remove_var(key);
        }
        out
    })
}

#[test]
fn env_overrides_win_over_the_file() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("scratch.toml"),
        "[temp]\nbase_dir = \"/from/file\"\n[delete]\nthreads = 2\n",
    )
    .unwrap();

    let (config, path) = with_env(
        &[
            (SCRATCH_TEMP_DIR_ENV_VAR, "/from/env"),
            (SCRATCH_DELETE_THREADS_ENV_VAR, "7"),
        ],
        || load_for_dir(tmp.path()),
    )
    .unwrap();

    assert!(path.is_some());
    assert_eq!(config.temp.base_dir, Some(PathBuf::from("/from/env")));
    assert_eq!(config.delete.threads, Some(7));
}

#[test]
fn unparsable_thread_count_is_invalid() {
    let mut config = ScratchConfig::default();
    let err = with_env(&[(SCRATCH_DELETE_THREADS_ENV_VAR, "many")], || {
        config.apply_env_overrides()
    })
    .unwrap_err();
    assert!(
        matches!(err, ConfigError::Invalid { field: "delete.threads", .. }),
        "{err:?}"
    );
}

#[test]
fn zero_threads_from_env_fails_validation() {
    let mut config = ScratchConfig::default();
    let err = with_env(&[(SCRATCH_DELETE_THREADS_ENV_VAR, "0")], || {
        config.apply_env_overrides()
    })
    .unwrap_err();
    assert!(err.to_string().contains("at least 1"), "{err}");
}

#[test]
fn empty_overrides_are_ignored() {
    let mut config = ScratchConfig::load_from_str("[delete]\nthreads = 3\n").unwrap();
    with_env(
        &[
            (SCRATCH_TEMP_DIR_ENV_VAR, ""),
            (SCRATCH_DELETE_THREADS_ENV_VAR, "  "),
        ],
        || config.apply_env_overrides(),
    )
    .unwrap();
    assert_eq!(config.delete.threads, Some(3));
    assert_eq!(config.temp.base_dir, None);
}
