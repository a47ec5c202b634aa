use filetime::FileTime;
use scratch_fs::{fingerprint, InputFingerprint};
use std::fs;
use std::path::{Path, PathBuf};

fn set_mtime_millis(path: &Path, millis: i64) {
    let time = FileTime::from_unix_time(millis / 1000, ((millis % 1000) * 1_000_000) as u32);
    filetime::set_file_mtime(path, time).unwrap();
}

fn inputs(root: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let classes = root.join("classes");
    fs::create_dir_all(classes.join("pkg")).unwrap();
    fs::write(classes.join("pkg/A.class"), b"A").unwrap();
    fs::write(classes.join("pkg/B.class"), b"B").unwrap();
    let jar = root.join("lib.jar");
    fs::write(&jar, b"jar").unwrap();
    let dex = root.join("app.dex");
    fs::write(&dex, b"dex").unwrap();
    for file in [
        classes.join("pkg/A.class"),
        classes.join("pkg/B.class"),
        jar.clone(),
        dex.clone(),
    ] {
        set_mtime_millis(&file, 1_000);
    }
    (classes, jar, dex)
}

#[test]
fn touching_a_file_changes_the_fingerprint() {
    let tmp = tempfile::tempdir().unwrap();
    let f1 = tmp.path().join("f1.txt");
    fs::write(&f1, b"content").unwrap();
    set_mtime_millis(&f1, 1_000);

    let h1 = fingerprint(&[&f1]).unwrap();
    set_mtime_millis(&f1, 2_000);
    let h2 = fingerprint(&[&f1]).unwrap();
    assert_ne!(h1, h2);

    set_mtime_millis(&f1, 1_000);
    assert_eq!(fingerprint(&[&f1]).unwrap(), h1);
}

#[test]
fn fingerprint_is_stable_across_calls() {
    let tmp = tempfile::tempdir().unwrap();
    let (classes, jar, dex) = inputs(tmp.path());

    let first = InputFingerprint::for_inputs(&[&classes, &jar, &dex]).unwrap();
    let second = InputFingerprint::for_inputs(&[&classes, &jar, &dex]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn input_order_does_not_matter() {
    let tmp = tempfile::tempdir().unwrap();
    let (classes, jar, dex) = inputs(tmp.path());

    let forward = fingerprint(&[&classes, &jar, &dex]).unwrap();
    let reversed = fingerprint(&[&dex, &jar, &classes]).unwrap();
    assert_eq!(forward, reversed);
}

#[test]
fn content_changes_with_same_mtime_are_invisible() {
    let tmp = tempfile::tempdir().unwrap();
    let (classes, jar, dex) = inputs(tmp.path());

    let before = fingerprint(&[&classes, &jar, &dex]).unwrap();
    fs::write(&jar, b"different bytes").unwrap();
    set_mtime_millis(&jar, 1_000);
    assert_eq!(fingerprint(&[&classes, &jar, &dex]).unwrap(), before);
}

#[test]
fn file_set_changes_the_fingerprint() {
    let tmp = tempfile::tempdir().unwrap();
    let (classes, jar, dex) = inputs(tmp.path());
    let before = fingerprint(&[&classes, &jar, &dex]).unwrap();

    let added = classes.join("pkg/C.class");
    fs::write(&added, b"C").unwrap();
    set_mtime_millis(&added, 1_000);
    let with_added = fingerprint(&[&classes, &jar, &dex]).unwrap();
    assert_ne!(before, with_added);

    // Same count and timestamps, different name.
    fs::rename(&added, classes.join("pkg/D.class")).unwrap();
    let renamed = fingerprint(&[&classes, &jar, &dex]).unwrap();
    assert_ne!(with_added, renamed);

    // Dropping a requested input changes the requested count.
    assert_ne!(before, fingerprint(&[&classes, &jar]).unwrap());
}

#[test]
fn moving_the_inputs_changes_the_fingerprint() {
    let tmp = tempfile::tempdir().unwrap();
    let (classes, jar, dex) = inputs(&tmp.path().join("checkout-a"));
    let (moved_classes, moved_jar, moved_dex) = inputs(&tmp.path().join("checkout-b"));

    // Same names, same timestamps, different location.
    assert_ne!(
        fingerprint(&[&classes, &jar, &dex]).unwrap(),
        fingerprint(&[&moved_classes, &moved_jar, &moved_dex]).unwrap()
    );
}
