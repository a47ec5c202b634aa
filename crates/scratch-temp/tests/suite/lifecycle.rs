use scratch_temp::{TempConfig, TempWorkspace, INSTANCE_PREFIX};
use std::fs;
use std::path::Path;

fn workspace_in(base: &Path) -> TempWorkspace {
    TempWorkspace::new(&TempConfig {
        base_dir: Some(base.to_path_buf()),
    })
    .unwrap()
}

#[test]
fn reconfigure_swaps_root_and_keeps_the_old_one() {
    let tmp = tempfile::tempdir().unwrap();
    let workspace = workspace_in(&tmp.path().join("first"));
    let old_root = workspace.root();
    let old_file = workspace.create_temp_file(".txt").unwrap();

    let new_base = tmp.path().join("second/nested");
    let new_root = workspace.reconfigure(&new_base).unwrap();

    assert_eq!(workspace.root(), new_root);
    assert!(new_root.starts_with(&new_base));
    assert!(new_root
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with(INSTANCE_PREFIX));
    assert!(old_root.is_dir());
    assert!(old_file.is_file());

    let dir = workspace.create_instance_dir("decompile-").unwrap();
    assert_eq!(dir.parent(), Some(new_root.as_path()));

    // Teardown still covers the abandoned root.
    workspace.cleanup();
    assert!(!old_root.exists());
    assert!(!new_root.exists());
}

#[test]
fn clones_share_the_root() {
    let tmp = tempfile::tempdir().unwrap();
    let workspace = workspace_in(tmp.path());
    let other = workspace.clone();

    let new_root = other.reconfigure(tmp.path().join("moved")).unwrap();
    assert_eq!(workspace.root(), new_root);
}

#[test]
fn clear_root_empties_but_keeps_the_root() {
    let tmp = tempfile::tempdir().unwrap();
    let workspace = workspace_in(tmp.path());
    let dir = workspace.create_instance_dir("cache-").unwrap();
    fs::create_dir_all(dir.join("a/b")).unwrap();
    fs::write(dir.join("a/b/res.arsc"), b"res").unwrap();
    workspace.create_temp_file(".smali").unwrap();
    workspace.create_named_file("AndroidManifest.xml").unwrap();

    let report = workspace.clear_root();
    assert!(report.is_clean());
    assert_eq!(report.files_deleted, 3);

    let root = workspace.root();
    assert!(root.is_dir());
    assert_eq!(fs::read_dir(&root).unwrap().count(), 0);

    // The root is still usable afterwards.
    workspace.create_temp_file(".txt").unwrap();
}

#[test]
fn cleanup_removes_everything_registered() {
    let tmp = tempfile::tempdir().unwrap();
    let workspace = workspace_in(tmp.path());
    let root = workspace.root();
    let dir = workspace.create_instance_dir("out-").unwrap();
    fs::write(dir.join("unregistered.txt"), b"x").unwrap();
    let file = workspace.create_temp_file(".tmp").unwrap();

    let report = workspace.cleanup();
    assert!(report.is_clean(), "{report:?}");
    assert!(!file.exists());
    assert!(!dir.exists());
    assert!(!root.exists());

    // Nothing left to do on a second run.
    let again = workspace.cleanup();
    assert_eq!(again.files_deleted + again.dirs_deleted, 0);
}

#[test]
fn teardown_guard_cleans_up_on_drop() {
    let tmp = tempfile::tempdir().unwrap();
    let workspace = workspace_in(tmp.path());
    let root = workspace.root();
    {
        let guard = workspace.teardown_guard();
        guard.workspace().create_temp_file(".log").unwrap();
        assert!(root.is_dir());
    }
    assert!(!root.exists());
}

#[test]
fn delete_dir_if_exists_is_a_no_op_for_missing_paths() {
    let tmp = tempfile::tempdir().unwrap();
    let workspace = workspace_in(tmp.path());
    let dir = workspace.create_instance_dir("gone-").unwrap();
    fs::write(dir.join("f"), b"f").unwrap();

    assert_eq!(workspace.delete_dir_if_exists(&dir).dirs_deleted, 1);
    assert!(!dir.exists());
    assert!(workspace.delete_dir_if_exists(&dir).is_clean());
}

#[test]
fn global_workspace_is_created_once() {
    let first = scratch_temp::global().unwrap();
    let second = scratch_temp::global().unwrap();
    assert!(std::ptr::eq(first, second));
    let root = first.ensure_root().unwrap();
    assert!(root.is_dir());

    first.cleanup();
    assert!(!root.exists());
}
