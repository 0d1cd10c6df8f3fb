//! Configuration file support for eyenemia.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/eyenemia/config.toml` (lowest priority)
//! - Project-local: `.eyenemia.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Quality gate settings.
    pub quality: QualityConfig,
    /// Segmentation settings.
    pub segmentation: SegmentationConfig,
    /// Normalization and classification settings.
    pub classification: ClassificationConfig,
    /// Model settings.
    pub models: ModelsConfig,
    /// Upload store settings.
    pub storage: StorageConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
}

/// Quality gate configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Laplacian-variance blur threshold.
    pub blur_threshold: Option<f64>,
    /// Minimum width in pixels.
    pub min_width: Option<u32>,
    /// Minimum height in pixels.
    pub min_height: Option<u32>,
    /// Maximum width in pixels.
    pub max_width: Option<u32>,
    /// Maximum height in pixels.
    pub max_height: Option<u32>,
}

/// Segmentation configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Minimum detection confidence (0.0-1.0).
    pub confidence: Option<f32>,
    /// Mask binarization threshold (0.0-1.0).
    pub mask_threshold: Option<f32>,
}

/// Normalization and classification configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Side of the square classifier input.
    pub input_size: Option<u32>,
    /// Alpha flattening: "discard" or "matte".
    pub flatten: Option<String>,
    /// Matte colour used when `flatten = "matte"`.
    pub matte_color: Option<[u8; 3]>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Custom models directory path.
    pub dir: Option<PathBuf>,
    /// Run inference on the CPU even when an accelerator is available.
    pub force_cpu: Option<bool>,
}

/// Upload store configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory uploads are staged into.
    pub upload_dir: Option<PathBuf>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/eyenemia/config.toml`
    /// 2. Project-local: `.eyenemia.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(t) = self.quality.blur_threshold {
            if !t.is_finite() || t < 0.0 {
                return Err(format!(
                    "quality.blur_threshold must be a non-negative number, got {t}"
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.quality.min_width, self.quality.max_width) {
            if min > max {
                return Err(format!(
                    "quality.min_width ({min}) exceeds quality.max_width ({max})"
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.quality.min_height, self.quality.max_height) {
            if min > max {
                return Err(format!(
                    "quality.min_height ({min}) exceeds quality.max_height ({max})"
                ));
            }
        }

        if let Some(t) = self.segmentation.confidence {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!("segmentation.confidence must be 0.0-1.0, got {t}"));
            }
        }
        if let Some(t) = self.segmentation.mask_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!(
                    "segmentation.mask_threshold must be 0.0-1.0, got {t}"
                ));
            }
        }

        if self.classification.input_size == Some(0) {
            return Err("classification.input_size must be positive".to_string());
        }
        if let Some(ref f) = self.classification.flatten {
            if f != "discard" && f != "matte" {
                return Err(format!(
                    "classification.flatten must be 'discard' or 'matte', got '{f}'"
                ));
            }
        }

        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                return Err(format!(
                    "output.format must be 'json' or 'jsonl', got '{f}'"
                ));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        self.general.recursive = other.general.recursive.or(self.general.recursive);

        self.quality.blur_threshold = other.quality.blur_threshold.or(self.quality.blur_threshold);
        self.quality.min_width = other.quality.min_width.or(self.quality.min_width);
        self.quality.min_height = other.quality.min_height.or(self.quality.min_height);
        self.quality.max_width = other.quality.max_width.or(self.quality.max_width);
        self.quality.max_height = other.quality.max_height.or(self.quality.max_height);

        self.segmentation.confidence = other
            .segmentation
            .confidence
            .or(self.segmentation.confidence);
        self.segmentation.mask_threshold = other
            .segmentation
            .mask_threshold
            .or(self.segmentation.mask_threshold);

        self.classification.input_size = other
            .classification
            .input_size
            .or(self.classification.input_size);
        self.classification.flatten = other
            .classification
            .flatten
            .or_else(|| self.classification.flatten.take());
        self.classification.matte_color = other
            .classification
            .matte_color
            .or(self.classification.matte_color);

        self.models.dir = other.models.dir.or_else(|| self.models.dir.take());
        self.models.force_cpu = other.models.force_cpu.or(self.models.force_cpu);

        self.storage.upload_dir = other
            .storage
            .upload_dir
            .or_else(|| self.storage.upload_dir.take());

        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("eyenemia").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.eyenemia.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".eyenemia.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
