// Integration tests for Pipeline operations
mod common;

use beltline::{Pipeline, PipelineError};
use common::{slash, tree, write};
use std::collections::BTreeSet;
use std::fs;
use std::rc::Rc;

fn live(pipeline: &Pipeline) -> BTreeSet<String> {
    pipeline.paths().iter().map(|p| slash(p)).collect()
}

fn set(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

#[test]
fn test_load_deduplicates_absolute_paths() {
    let dir = tree(&[("a.txt", "a"), ("sub/c.txt", "c")]);
    let mut pipeline = Pipeline::in_dir(dir.path());

    pipeline.load(&["a.txt", "./a.txt", "sub/../a.txt"]);
    assert_eq!(pipeline.len(), 1);

    pipeline.load(&["*.txt", "**/*.txt"]);
    assert_eq!(pipeline.len(), 2);
    assert_eq!(pipeline.source_keys().len(), 2);
    assert!(pipeline.contains_source(&dir.path().join("a.txt")));
}

#[test]
fn test_load_reads_contents() {
    let dir = tree(&[("css/site.css", "body {}")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["css/*.css"]);

    let artifact = pipeline.get("site.css").unwrap();
    assert_eq!(artifact.data(), b"body {}");
    assert_eq!(artifact.extension(), "css");
    assert_eq!(artifact.source_path(), Some(dir.path().join("css/site.css").as_path()));
    assert!(!artifact.is_changed());
}

#[test]
fn test_load_rejects_absolute_patterns() {
    let dir = tree(&[("a.txt", "a")]);
    let mut pipeline = Pipeline::in_dir(dir.path());

    let absolute = dir.path().join("*.txt").to_string_lossy().into_owned();
    pipeline.load(&[absolute]);

    assert!(pipeline.is_empty());
    assert!(pipeline.source_keys().is_empty());
}

#[test]
fn test_load_filter_mode() {
    let dir = tree(&[("a.css", "a"), ("_partial.css", "p"), ("b.js", "b")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["!_*"]);

    assert_eq!(live(&pipeline), set(&["a.css", "b.js"]));
}

#[cfg(unix)]
#[test]
fn test_load_skips_named_pipes() {
    let dir = tree(&[("a.txt", "a")]);
    let status = std::process::Command::new("mkfifo")
        .arg(dir.path().join("pipe.txt"))
        .status()
        .unwrap();
    assert!(status.success());

    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["*.txt", "pipe.txt"]);

    assert_eq!(live(&pipeline), set(&["a.txt"]));
    assert!(!pipeline.contains_source(&dir.path().join("pipe.txt")));
}

#[cfg(target_os = "linux")]
#[test]
fn test_load_skips_unreadable_files() {
    // Reading offset 0 of the process memory fails with EIO
    let dir = tree(&[("a.txt", "a"), ("b.txt", "b")]);
    std::os::unix::fs::symlink("/proc/self/mem", dir.path().join("mem.txt")).unwrap();

    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["mem.txt", "a.txt", "b.txt"]);

    assert_eq!(live(&pipeline), set(&["a.txt", "b.txt"]));
    assert!(!pipeline.contains_source(&dir.path().join("mem.txt")));

    pipeline.load(&["*.txt"]);
    assert_eq!(live(&pipeline), set(&["a.txt", "b.txt"]));
}

#[test]
fn test_ignore_recover_round_trip() {
    let dir = tree(&[("a.css", "a"), ("b.css", "b"), ("c.js", "c")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["*"]);
    let original = live(&pipeline);

    pipeline.ignore("*.css", Some("1")).unwrap();
    assert_eq!(live(&pipeline), set(&["c.js"]));
    assert_eq!(pipeline.all_artifacts().len(), 3);
    assert!(pipeline.has_recover_id("1"));

    pipeline.recover(Some("1"), false);
    assert_eq!(live(&pipeline), original);
    assert!(!pipeline.has_recover_id("1"));
    assert!(pipeline
        .all_artifacts()
        .iter()
        .all(|a| !a.borrow().is_ignored()));
}

#[test]
fn test_ignore_globstar_covers_root_level() {
    let dir = tree(&[("a.css", "a"), ("sub/b.css", "b"), ("c.js", "c")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["**/*"]);

    pipeline.ignore("**/*.css", Some("styles")).unwrap();
    assert_eq!(live(&pipeline), set(&["c.js"]));
}

#[test]
fn test_duplicate_recover_id_is_fatal() {
    let dir = tree(&[("a.css", "a")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["*"]);

    pipeline.ignore("*.css", Some("x")).unwrap();
    let err = pipeline.ignore("*.js", Some("x")).err().unwrap();

    assert!(matches!(err, PipelineError::DuplicateRecoverId(ref id) if id == "x"));
    assert!(err.is_fatal());
}

#[test]
fn test_recover_snapshots_are_taken_at_ignore_time() {
    let dir = tree(&[("a.css", "a"), ("b.css", "b")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["*"]);

    pipeline.ignore("a.css", Some("first")).unwrap();
    pipeline.ignore("*.css", Some("second")).unwrap();
    assert!(pipeline.is_empty());

    pipeline.recover(Some("first"), false);
    assert_eq!(live(&pipeline), set(&["a.css"]));

    pipeline.recover(Some("unknown"), false);
    assert_eq!(live(&pipeline), set(&["a.css"]));

    pipeline.recover(None, true);
    assert_eq!(live(&pipeline), set(&["a.css", "b.css"]));
    assert!(!pipeline.has_recover_id("second"));
}

#[test]
fn test_ignore_without_id_deletes() {
    let dir = tree(&[("a.css", "a"), ("c.js", "c")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["*"]);

    pipeline.ignore("*.css", None).unwrap();
    assert_eq!(pipeline.all_artifacts().len(), 1);
    assert_eq!(pipeline.source_keys().len(), 1);

    pipeline.recover(None, true);
    assert_eq!(live(&pipeline), set(&["c.js"]));
}

#[test]
fn test_concat_orders_and_releases_sources() {
    let dir = tree(&[("x.txt", "1"), ("y.txt", "2"), ("z.txt", "3")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["x.txt", "y.txt", "z.txt"]);

    pipeline.concat("out.txt");
    assert_eq!(pipeline.paths(), vec!["out.txt".to_string()]);
    assert_eq!(pipeline.all_artifacts().len(), 1);

    {
        let out = pipeline.get("out.txt").unwrap();
        assert_eq!(out.data(), b"123");
        assert!(out.is_changed());
        assert!(out.source_path().is_none());
        assert_eq!(out.extension(), "txt");
    }
    assert!(pipeline.source_keys().is_empty());

    pipeline.load(&["x.txt"]);
    assert_eq!(
        pipeline.paths(),
        vec!["out.txt".to_string(), "x.txt".to_string()]
    );
}

#[test]
fn test_concat_keeps_ignored_artifacts() {
    let dir = tree(&[("a.js", "a"), ("b.js", "b"), ("c.css", "c")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["a.js", "b.js", "c.css"]);

    pipeline.ignore("*.css", Some("css")).unwrap();
    pipeline.concat("all.js");
    assert_eq!(pipeline.get("all.js").unwrap().data(), b"ab");

    pipeline.recover(Some("css"), false);
    assert_eq!(
        pipeline.paths(),
        vec!["all.js".to_string(), "c.css".to_string()]
    );
    assert!(pipeline.contains_source(&dir.path().join("c.css")));
}

#[test]
fn test_concat_without_live_artifacts_is_noop() {
    let dir = tree(&[]);
    let mut pipeline = Pipeline::in_dir(dir.path());

    pipeline.concat("out.txt");
    assert!(pipeline.all_artifacts().is_empty());
}

#[test]
fn test_delete_with_pattern_uses_plain_match() {
    let dir = tree(&[("a.txt", "a"), ("sub/b.txt", "b"), ("c.css", "c")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["**/*"]);

    pipeline.delete(Some("**/*.txt")).unwrap();
    assert_eq!(live(&pipeline), set(&["a.txt", "c.css"]));
    assert!(!pipeline.contains_source(&dir.path().join("sub/b.txt")));

    pipeline.load(&["sub/*.txt"]);
    assert_eq!(live(&pipeline), set(&["a.txt", "c.css", "b.txt"]));
}

#[test]
fn test_delete_all_resets() {
    let dir = tree(&[("a.css", "a"), ("b.js", "b")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["*"]);
    pipeline.ignore("*.css", Some("7")).unwrap();

    pipeline.delete(None).unwrap();
    assert!(pipeline.all_artifacts().is_empty());
    assert!(pipeline.source_keys().is_empty());
    assert!(!pipeline.has_recover_id("7"));

    assert!(pipeline.ignore("*", Some("7")).is_ok());
}

#[test]
fn test_merge_first_wins_and_shares() {
    let dir = tree(&[("x.txt", "from disk")]);

    let mut a = Pipeline::in_dir(dir.path());
    a.load(&["x.txt"]);
    a.artifacts().next().unwrap().borrow_mut().set_data(b"A".to_vec());

    let mut b = Pipeline::in_dir(dir.path());
    b.load(&["x.txt"]);
    b.artifacts().next().unwrap().borrow_mut().set_data(b"B".to_vec());

    let mut c = Pipeline::in_dir(dir.path());
    c.merge(&[&a, &b]);

    assert_eq!(c.len(), 1);
    assert_eq!(c.get("x.txt").unwrap().data(), b"A");
    assert!(Rc::ptr_eq(
        c.artifacts().next().unwrap(),
        a.artifacts().next().unwrap()
    ));

    c.artifacts().next().unwrap().borrow_mut().set_data(b"C".to_vec());
    assert_eq!(a.get("x.txt").unwrap().data(), b"C");
}

#[test]
fn test_merge_skips_ignored_and_keeps_synthesized() {
    let dir = tree(&[("a.js", "a"), ("b.css", "b")]);

    let mut a = Pipeline::in_dir(dir.path());
    a.load(&["*"]);
    a.ignore("*.css", Some("css")).unwrap();
    a.concat("bundle.js");

    let mut b = Pipeline::in_dir(dir.path());
    b.load(&["a.js"]);
    b.concat("bundle.js");

    let merged = Pipeline::from_pipelines(&[&a, &b]);
    assert_eq!(
        merged.paths(),
        vec!["bundle.js".to_string(), "bundle.js".to_string()]
    );
}

#[test]
fn test_persist_writes_live_artifacts() {
    let dir = tree(&[("src/a.txt", "a"), ("src/sub/b.txt", "b"), ("src/c.css", "c")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["src/**/*"]);
    pipeline.ignore("*.css", Some("css")).unwrap();

    write(dir.path(), "out/a.txt", "stale and longer");
    pipeline.persist("out").unwrap();

    assert_eq!(fs::read_to_string(dir.path().join("out/a.txt")).unwrap(), "a");
    assert_eq!(fs::read_to_string(dir.path().join("out/sub/b.txt")).unwrap(), "b");
    assert!(!dir.path().join("out/c.css").exists());
    assert_eq!(
        pipeline.get("a.txt").unwrap().last_destination(),
        Some(dir.path().join("out/a.txt").as_path())
    );
}

#[test]
fn test_persist_does_not_overwrite_source() {
    let dir = tree(&[("dest/sub/f.txt", "original")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["dest/**/*.txt"]);
    pipeline
        .artifacts()
        .next()
        .unwrap()
        .borrow_mut()
        .set_data(b"changed".to_vec());

    pipeline.persist("dest").unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("dest/sub/f.txt")).unwrap(),
        "original"
    );
    assert!(pipeline.get(&slash_native("sub/f.txt")).unwrap().last_destination().is_none());
}

#[test]
fn test_persist_into_file_is_fatal() {
    let dir = tree(&[("src/sub/c.txt", "c"), ("out/sub", "i am a file")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["src/**/*.txt"]);

    let err = pipeline.persist("out").err().unwrap();
    assert!(matches!(err, PipelineError::DestinationOccupied(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_persist_onto_directory_is_fatal_write_error() {
    let dir = tree(&[("src/a.txt", "a")]);
    fs::create_dir_all(dir.path().join("out/a.txt")).unwrap();
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["src/*.txt"]);

    let err = pipeline.persist("out").err().unwrap();
    assert!(matches!(err, PipelineError::Write { ref path, .. } if path == &dir.path().join("out/a.txt")));
    assert!(err.is_fatal());
}

#[test]
fn test_persist_below_a_file_is_fatal_create_dir_error() {
    let dir = tree(&[("src/sub/deep/c.txt", "c"), ("out", "i am a file")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.load(&["src/**/*.txt"]);

    let err = pipeline.persist("out").err().unwrap();
    assert!(matches!(err, PipelineError::CreateDir { .. }));
    assert!(err.is_fatal());
    assert_eq!(
        fs::read_to_string(dir.path().join("out")).unwrap(),
        "i am a file"
    );
}

#[test]
fn test_from_pipelines_keeps_source_root() {
    let dir = tree(&[("site/a.txt", "a"), ("site/b.txt", "b")]);
    let mut a = Pipeline::in_dir(dir.path().join("site"));
    a.load(&["a.txt"]);

    let mut merged = Pipeline::from_pipelines(&[&a]);
    assert_eq!(merged.root(), dir.path().join("site"));

    merged.load(&["b.txt"]).persist("dist").unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("site/dist/b.txt")).unwrap(),
        "b"
    );
    assert!(dir.path().join("site/dist/a.txt").exists());
}

#[test]
fn test_configure_changes_root() {
    let dir = tree(&[("site/a.txt", "a")]);
    let mut pipeline = Pipeline::in_dir(dir.path());
    pipeline.configure("site").load(&["*.txt"]);

    assert_eq!(pipeline.root(), dir.path().join("site"));
    assert_eq!(live(&pipeline), set(&["a.txt"]));
}

fn slash_native(path: &str) -> String {
    path.replace('/', std::path::MAIN_SEPARATOR_STR)
}
