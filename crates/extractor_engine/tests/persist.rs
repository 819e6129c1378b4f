use std::fs;

use extractor_engine::{ensure_output_dir, MarkdownWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = MarkdownWriter::new(temp.path().to_path_buf());

    let first = writer.write("chat.md", "hello").unwrap();
    assert_eq!(first.file_name().unwrap(), "chat.md");
    assert_eq!(fs::read_to_string(&first).unwrap(), "hello");

    // Replace existing
    let second = writer.write("chat.md", "world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "world");
}

#[test]
fn bom_is_prepended_when_enabled() {
    let temp = TempDir::new().unwrap();
    let writer = MarkdownWriter::new(temp.path().to_path_buf()).with_bom(true);

    let path = writer.write("chat.md", "content").unwrap();
    let bytes = fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    assert_eq!(&bytes[3..], b"content");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = MarkdownWriter::new(file_path.clone());
    let result = writer.write("chat.md", "data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("chat.md").exists());
}
