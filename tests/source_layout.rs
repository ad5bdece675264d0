//! Keeps every Rust source line within rustfmt's default width.

use std::fs;
use std::path::{Path, PathBuf};

const MAX_WIDTH: usize = 100;

fn rust_files(dir: &Path, found: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            rust_files(&path, found);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            found.push(path);
        }
    }
}

#[test]
fn source_lines_fit_rustfmt_width() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    rust_files(&root.join("src"), &mut files);
    rust_files(&root.join("tests"), &mut files);
    assert!(!files.is_empty());

    let mut long = Vec::new();
    for file in &files {
        let source = fs::read_to_string(file).unwrap();
        for (index, line) in source.lines().enumerate() {
            if line.chars().count() > MAX_WIDTH {
                long.push(format!("{}:{}", file.display(), index + 1));
            }
        }
    }
    assert!(long.is_empty(), "lines wider than {MAX_WIDTH} columns:\n{}", long.join("\n"));
}
