//! Eyenemia Adapters - External adapters for eyenemia.
//!
//! This crate provides adapters for:
//! - Filesystem upload staging and input discovery
//! - Model registry and weight hashing

pub mod fs;
pub mod models;

pub use fs::{collect_inputs, sanitize_filename, FsAssetStore};
pub use models::{models_dir, sha256_file, ModelInfo, ModelRegistry, ModelRole, ModelStatus, MODELS};
