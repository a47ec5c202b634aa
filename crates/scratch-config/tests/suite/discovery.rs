use scratch_config::{
    discover_config_path, load_for_dir, with_config_env_lock, ScratchConfig,
    SCRATCH_CONFIG_ENV_VAR,
};
use std::fs;
use std::path::PathBuf;

#[test]
fn scratch_toml_wins_over_dotfile() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("scratch.toml"), "[delete]\nthreads = 3\n").unwrap();
    fs::write(tmp.path().join(".scratch.toml"), "[delete]\nthreads = 5\n").unwrap();

    let found = with_config_env_lock(|| {
        std::env::remove_var(SCRATCH_CONFIG_ENV_VAR);
        discover_config_path(tmp.path())
    })
    .unwrap();
    assert_eq!(found.file_name().unwrap(), "scratch.toml");
}

#[test]
fn dotfile_is_used_when_alone() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join(".scratch.toml"), "[delete]\nthreads = 5\n").unwrap();

    let found = with_config_env_lock(|| {
        std::env::remove_var(SCRATCH_CONFIG_ENV_VAR);
        discover_config_path(tmp.path())
    })
    .unwrap();
    assert_eq!(found.file_name().unwrap(), ".scratch.toml");
}

#[test]
fn env_var_points_at_a_relative_config() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("conf")).unwrap();
    fs::write(
        tmp.path().join("conf/custom.toml"),
        "[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let found = with_config_env_lock(|| {
        std::env::set_var(SCRATCH_CONFIG_ENV_VAR, "conf/custom.toml");
        let found = discover_config_path(tmp.path());
        std::env::remove_var(SCRATCH_CONFIG_ENV_VAR);
        found
    })
    .unwrap();
    assert_eq!(found, tmp.path().join("conf/custom.toml").canonicalize().unwrap());

    let config = ScratchConfig::load_from_path(&found).unwrap();
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn missing_config_loads_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let (config, path) = with_config_env_lock(|| {
        std::env::remove_var(SCRATCH_CONFIG_ENV_VAR);
        std::env::remove_var("SCRATCH_TEMP_DIR");
        std::env::remove_var("SCRATCH_DELETE_THREADS");
        load_for_dir(tmp.path())
    })
    .unwrap();
    assert_eq!(path, None);
    assert_eq!(config, ScratchConfig::default());
}

#[test]
fn full_document_round_trips_into_sub_configs() {
    let config = ScratchConfig::load_from_str(
        r#"
[temp]
base_dir = "/var/tmp/scratch"

[delete]
threads = 4

[logging]
level = "warn"
json = true
stderr = false
file = "/var/log/scratch.log"
"#,
    )
    .unwrap();

    assert_eq!(config.temp.base_dir, Some(PathBuf::from("/var/tmp/scratch")));
    assert_eq!(config.delete.threads, Some(4));
    assert_eq!(config.delete.effective_threads(), 4);
    assert_eq!(config.logging.level, "warn");
    assert!(config.logging.json);
    assert!(!config.logging.stderr);
    assert_eq!(
        config.logging.file,
        Some(PathBuf::from("/var/log/scratch.log"))
    );
}
