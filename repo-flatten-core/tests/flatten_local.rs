use repo_flatten_core::contract::FlattenError;
use repo_flatten_core::flatten::{flatten_source, flatten_tree, flatten_tree_with_stats, READ_ERROR_PREFIX};
use repo_flatten_core::ignore::IgnorePatterns;
use repo_flatten_core::local::LocalSource;
use std::fs::{create_dir_all, write};
use tempfile::tempdir;

#[tokio::test]
async fn test_flatten_exact_format_files_before_subdirectories() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    create_dir_all(root.join("sub")).unwrap();
    write(root.join("sub/c.txt"), "world").unwrap();
    write(root.join("a.txt"), "hello").unwrap();

    let source = LocalSource::new(root);
    let output = flatten_source(&source).await.expect("Should flatten");

    assert_eq!(
        output,
        "\n\n+++++ #FILE: a.txt\n\nhello\n\n\
         \n#DIRECTORY: sub\n\n\
         \n\n+++++ #FILE: c.txt\n\nworld\n\n"
    );
}

#[tokio::test]
async fn test_nested_directory_markers_use_forward_slash_relative_paths() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    create_dir_all(root.join("src/module")).unwrap();
    write(root.join("src/module/nested.md"), "hello nested").unwrap();

    let output = flatten_source(&LocalSource::new(root)).await.unwrap();

    assert_eq!(
        output,
        "\n#DIRECTORY: src\n\n\
         \n#DIRECTORY: src/module\n\n\
         \n\n+++++ #FILE: nested.md\n\nhello nested\n\n"
    );
}

#[tokio::test]
async fn test_gitignore_patterns_skip_files_but_keep_directory_markers() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    create_dir_all(root.join("sub")).unwrap();
    write(root.join(".gitignore"), "# logs\n*.log\n").unwrap();
    write(root.join("a.txt"), "keep me").unwrap();
    write(root.join("b.log"), "drop me").unwrap();
    write(root.join("sub/c.log"), "drop me too").unwrap();

    let output = flatten_source(&LocalSource::new(root)).await.unwrap();

    assert!(output.contains("+++++ #FILE: a.txt\n\nkeep me\n\n"));
    assert!(!output.contains("b.log"));
    assert!(!output.contains("c.log"));
    assert!(!output.contains("drop me"));
    // Directory still labeled even though everything inside was filtered.
    assert!(output.ends_with("\n#DIRECTORY: sub\n\n"));
    // The ignore file itself is ordinary content.
    assert!(output.contains("+++++ #FILE: .gitignore\n\n# logs\n*.log\n\n\n"));
}

#[tokio::test]
async fn test_nested_gitignore_is_not_merged() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    create_dir_all(root.join("pkg")).unwrap();
    write(root.join("pkg/.gitignore"), "*.txt\n").unwrap();
    write(root.join("pkg/notes.txt"), "still here").unwrap();

    let output = flatten_source(&LocalSource::new(root)).await.unwrap();
    assert!(output.contains("+++++ #FILE: notes.txt\n\nstill here\n\n"));
}

#[tokio::test]
async fn test_unreadable_file_is_reported_inline_and_walk_continues() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    create_dir_all(root.join("later")).unwrap();
    write(root.join("image.bin"), [0xff, 0xfe, 0x00]).unwrap();
    write(root.join("later/after.txt"), "after").unwrap();

    let (output, stats) = flatten_tree_with_stats(&LocalSource::new(root), &IgnorePatterns::empty())
        .await
        .unwrap();

    let header = "\n\n+++++ #FILE: image.bin\n\n";
    let start = output.find(header).expect("binary file still gets a header") + header.len();
    assert!(output[start..].starts_with(READ_ERROR_PREFIX));
    assert!(output[start..].contains("invalid utf-8"));
    assert!(output.contains("+++++ #FILE: after.txt\n\nafter\n\n"));
    assert_eq!(stats.files, 2);
    assert_eq!(stats.unreadable, 1);
    assert_eq!(stats.directories, 1);
}

#[tokio::test]
async fn test_crlf_line_endings_are_normalised() {
    let tmp = tempdir().unwrap();
    write(tmp.path().join("win.txt"), "one\r\ntwo\r\n").unwrap();

    let output = flatten_source(&LocalSource::new(tmp.path())).await.unwrap();
    assert_eq!(output, "\n\n+++++ #FILE: win.txt\n\none\ntwo\n\n\n");
}

#[tokio::test]
async fn test_one_block_per_file_and_one_marker_per_directory() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    create_dir_all(root.join("a/b")).unwrap();
    create_dir_all(root.join("c")).unwrap();
    for file in ["x.txt", "y.txt", "a/1.txt", "a/b/2.txt", "c/3.txt"] {
        write(root.join(file), file).unwrap();
    }

    let output = flatten_tree(&LocalSource::new(root), &IgnorePatterns::empty())
        .await
        .unwrap();

    assert_eq!(output.matches("+++++ #FILE: ").count(), 5);
    assert_eq!(output.matches("#DIRECTORY: ").count(), 3);
    let marker = output.find("#DIRECTORY: a/b\n").unwrap();
    let child = output.find("+++++ #FILE: 2.txt").unwrap();
    assert!(marker < child);
}

#[tokio::test]
async fn test_flatten_is_idempotent() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    create_dir_all(root.join("d/e")).unwrap();
    write(root.join(".gitignore"), "*.tmp\n").unwrap();
    write(root.join("d/one.rs"), "fn one() {}").unwrap();
    write(root.join("d/e/two.tmp"), "scratch").unwrap();
    write(root.join("three.md"), "# three").unwrap();

    let source = LocalSource::new(root);
    let first = flatten_source(&source).await.unwrap();
    let second = flatten_source(&source).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_empty_tree_yields_empty_document() {
    let tmp = tempdir().unwrap();
    let output = flatten_source(&LocalSource::new(tmp.path())).await.unwrap();
    assert_eq!(output, "");
}

#[tokio::test]
async fn test_missing_root_is_a_listing_error() {
    let tmp = tempdir().unwrap();
    let missing = tmp.path().join("does-not-exist");

    let err = flatten_source(&LocalSource::new(missing)).await.unwrap_err();
    assert!(matches!(err, FlattenError::Listing(_)), "got {err:?}");
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_non_utf8_names_are_skipped_and_walk_continues() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let bad_dir = root.join(OsStr::from_bytes(b"bad\xffdir"));
    create_dir_all(&bad_dir).unwrap();
    write(bad_dir.join("inner.txt"), "hidden").unwrap();
    write(root.join(OsStr::from_bytes(b"bad\xfe.txt")), "also hidden").unwrap();
    write(root.join("good.txt"), "kept").unwrap();

    let output = flatten_source(&LocalSource::new(root)).await.expect("Should flatten");

    assert_eq!(output, "\n\n+++++ #FILE: good.txt\n\nkept\n\n");
}
