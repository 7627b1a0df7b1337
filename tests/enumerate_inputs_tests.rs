use std::fs;
use std::path::PathBuf;

use contract_candidates::{enumerate_inputs, EnumerateError};

#[test]
fn enumerate_inputs_finds_nested_files_sorted() {
    let td = tempfile::tempdir().unwrap();
    let base = td.path();
    let nested = base.join("input/retainers");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("b-2025.json"), b"{}").unwrap();
    fs::write(base.join("input/a-2024.json"), b"{}").unwrap();
    fs::write(base.join("input/notes.txt"), b"skip").unwrap();

    let pattern = format!("{}/input/**/*.json", base.display());
    let files = enumerate_inputs(&pattern).expect("should find files");
    let files: Vec<PathBuf> = files.into_iter().map(|p| p.strip_prefix(base).unwrap().to_path_buf()).collect();
    assert_eq!(files, vec![PathBuf::from("input/a-2024.json"), PathBuf::from("input/retainers/b-2025.json")]);
}

#[test]
fn enumerate_inputs_empty_returns_error_with_guidance() {
    let td = tempfile::tempdir().unwrap();
    let pattern = format!("{}/input/**/*.json", td.path().display());
    let err = enumerate_inputs(&pattern).err().expect("should be error");
    assert_eq!(format!("{}", err), "NoFilesFound");
    let EnumerateError::NoFilesFound { guidance } = err;
    assert!(guidance.contains(&pattern));
}
