//! Integration tests for the filesystem upload store and model registry.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::PathBuf;

use eyenemia_adapters::{collect_inputs, FsAssetStore, ModelRegistry};
use eyenemia_core::AssetStore;
use image::{ImageFormat, RgbImage};
use tempfile::TempDir;

fn write_png(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    RgbImage::from_pixel(8, 8, image::Rgb([200, 40, 40]))
        .save_with_format(&path, ImageFormat::Png)
        .expect("write png");
    path
}

#[test]
fn test_ingest_stages_sanitized_copy() {
    let inputs = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let source = write_png(&inputs, "left eye (1).png");

    let store = FsAssetStore::new(uploads.path().join("staged")).unwrap();
    let staged = store.ingest(&source).unwrap();

    assert_eq!(staged.file_name().unwrap(), "left_eye_1.png");
    assert!(staged.starts_with(store.root()));
    assert_eq!(store.read(&staged).unwrap(), fs::read(&source).unwrap());
    assert!(source.exists(), "original must be untouched");
}

#[test]
fn test_ingest_from_inside_store_leaves_source_intact() {
    let uploads = TempDir::new().unwrap();
    let store = FsAssetStore::new(uploads.path()).unwrap();
    let source = uploads.path().join("eye.png");
    fs::write(&source, b"0123456789").unwrap();

    let staged = store.ingest(&source).unwrap();

    assert_ne!(staged, source);
    assert_eq!(staged.file_name().unwrap(), "eye-1.png");
    assert_eq!(fs::read(&source).unwrap(), b"0123456789");
    assert_eq!(fs::read(&staged).unwrap(), b"0123456789");

    // rejecting the staged copy must not reach the original
    store.delete(&staged).unwrap();
    assert_eq!(fs::read(&source).unwrap(), b"0123456789");
}

#[test]
fn test_ingest_same_basename_gets_distinct_paths() {
    let inputs = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    fs::create_dir_all(inputs.path().join("a")).unwrap();
    fs::create_dir_all(inputs.path().join("b")).unwrap();
    let first = inputs.path().join("a/eye.png");
    let second = inputs.path().join("b/eye.png");
    fs::write(&first, b"AA").unwrap();
    fs::write(&second, b"BB").unwrap();

    let store = FsAssetStore::new(uploads.path()).unwrap();
    let staged_first = store.ingest(&first).unwrap();
    let staged_second = store.ingest(&second).unwrap();

    assert_ne!(staged_first, staged_second);
    assert_eq!(fs::read(&staged_first).unwrap(), b"AA");
    assert_eq!(fs::read(&staged_second).unwrap(), b"BB");

    store.delete(&staged_second).unwrap();
    assert_eq!(fs::read(&staged_first).unwrap(), b"AA");
}

#[test]
fn test_ingest_suffix_without_extension() {
    let inputs = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let source = inputs.path().join("scan");
    fs::write(&source, b"x").unwrap();

    let store = FsAssetStore::new(uploads.path()).unwrap();
    let names: Vec<_> = (0..3)
        .map(|_| store.ingest(&source).unwrap())
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, vec!["scan", "scan-1", "scan-2"]);
}

#[test]
fn test_ingest_missing_source_creates_nothing() {
    let uploads = TempDir::new().unwrap();
    let store = FsAssetStore::new(uploads.path()).unwrap();

    assert!(store.ingest(&uploads.path().join("nope/eye.png")).is_err());
    assert_eq!(fs::read_dir(uploads.path()).unwrap().count(), 0);
}

#[test]
fn test_delete_is_idempotent() {
    let uploads = TempDir::new().unwrap();
    let store = FsAssetStore::new(uploads.path()).unwrap();
    let path = write_png(&uploads, "eye.png");

    store.delete(&path).unwrap();
    assert!(!path.exists());
    store.delete(&path).unwrap();
}

#[test]
fn test_read_missing_is_error() {
    let uploads = TempDir::new().unwrap();
    let store = FsAssetStore::new(uploads.path()).unwrap();
    assert!(store.read(&uploads.path().join("gone.png")).is_err());
}

#[test]
fn test_collect_inputs_skips_hidden_and_respects_recursion() {
    let dir = TempDir::new().unwrap();
    write_png(&dir, "b.png");
    write_png(&dir, "a.jpg");
    write_png(&dir, ".hidden.png");
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested/c.png"), b"x").unwrap();

    let flat = collect_inputs(&[dir.path().to_path_buf()], false);
    let names: Vec<_> = flat
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.jpg", "b.png"]);

    let deep = collect_inputs(&[dir.path().to_path_buf()], true);
    assert_eq!(deep.len(), 3);
    assert!(deep.iter().any(|p| p.ends_with("nested/c.png")));
}

#[test]
fn test_collect_inputs_missing_path() {
    let files = collect_inputs(&[PathBuf::from("/nonexistent/eye.png")], false);
    assert!(files.is_empty());
}

#[test]
fn test_registry_install_state_and_hash() {
    let dir = TempDir::new().unwrap();
    let registry = ModelRegistry::new(dir.path());
    assert!(!registry.all_installed());

    fs::write(dir.path().join("eye-seg.safetensors"), b"abc").unwrap();
    fs::write(dir.path().join("anemia-cls.safetensors"), b"").unwrap();
    assert!(registry.all_installed());

    assert_eq!(
        registry.sha256("eye-seg").unwrap(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(
        registry.sha256("anemia-cls").unwrap(),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert!(registry.sha256("unknown").is_err());
}
