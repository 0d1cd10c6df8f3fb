//! Model registry: canonical weight files and where they live.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use eyenemia_core::ModelPaths;
use sha2::{Digest, Sha256};
use tracing::debug;

/// What a model is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Eye-region segmentation.
    Segmentation,
    /// Anemia classification.
    Classification,
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Segmentation => write!(f, "segmentation"),
            Self::Classification => write!(f, "classification"),
        }
    }
}

/// Model metadata.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name/identifier.
    pub name: &'static str,
    /// Filename in the models directory.
    pub filename: &'static str,
    /// Pipeline role.
    pub role: ModelRole,
}

/// Known models.
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "eye-seg",
        filename: "eye-seg.safetensors",
        role: ModelRole::Segmentation,
    },
    ModelInfo {
        name: "anemia-cls",
        filename: "anemia-cls.safetensors",
        role: ModelRole::Classification,
    },
];

/// Returns the default models directory.
///
/// Uses `XDG_DATA_HOME/eyenemia/models` or `~/.local/share/eyenemia/models`.
#[must_use]
pub fn models_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eyenemia")
        .join("models")
}

/// Installation state of one model.
#[derive(Debug, Clone)]
pub struct ModelStatus {
    /// Registry entry.
    pub info: &'static ModelInfo,
    /// Expected location.
    pub path: PathBuf,
    /// Whether the file exists.
    pub installed: bool,
}

/// Registry over a models directory.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    dir: PathBuf,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(models_dir())
    }
}

impl ModelRegistry {
    /// Creates a registry over `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The models directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a model by name.
    #[must_use]
    pub fn model_path(&self, name: &str) -> Option<PathBuf> {
        MODELS
            .iter()
            .find(|m| m.name == name)
            .map(|m| self.dir.join(m.filename))
    }

    fn path_for(&self, role: ModelRole) -> PathBuf {
        MODELS
            .iter()
            .find(|m| m.role == role)
            .map_or_else(|| self.dir.clone(), |m| self.dir.join(m.filename))
    }

    /// Weight paths handed to the model loader.
    #[must_use]
    pub fn paths(&self) -> ModelPaths {
        ModelPaths {
            segmentation: self.path_for(ModelRole::Segmentation),
            classification: self.path_for(ModelRole::Classification),
        }
    }

    /// Lists every known model with its installation state.
    #[must_use]
    pub fn list(&self) -> Vec<ModelStatus> {
        MODELS
            .iter()
            .map(|info| {
                let path = self.dir.join(info.filename);
                let installed = path.is_file();
                ModelStatus {
                    info,
                    path,
                    installed,
                }
            })
            .collect()
    }

    /// Returns true when every model file exists.
    #[must_use]
    pub fn all_installed(&self) -> bool {
        self.list().iter().all(|s| s.installed)
    }

    /// SHA-256 of an installed model, as lowercase hex.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unknown or the file cannot be read.
    pub fn sha256(&self, name: &str) -> Result<String> {
        let path = self
            .model_path(name)
            .with_context(|| format!("Unknown model: {name}"))?;
        sha256_file(&path)
    }
}

/// SHA-256 of a file, streamed, as lowercase hex.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let bytes = io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    debug!("Hashed {} ({bytes} bytes)", path.display());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models_dir() {
        assert!(models_dir().ends_with("eyenemia/models"));
    }

    #[test]
    fn test_paths_use_canonical_filenames() {
        let registry = ModelRegistry::new("/opt/models");
        let paths = registry.paths();
        assert_eq!(paths.segmentation, PathBuf::from("/opt/models/eye-seg.safetensors"));
        assert_eq!(
            paths.classification,
            PathBuf::from("/opt/models/anemia-cls.safetensors")
        );
    }

    #[test]
    fn test_model_path_unknown() {
        assert!(ModelRegistry::new("/opt/models").model_path("u2net").is_none());
    }

    #[test]
    fn test_every_role_registered_once() {
        for role in [ModelRole::Segmentation, ModelRole::Classification] {
            assert_eq!(MODELS.iter().filter(|m| m.role == role).count(), 1);
        }
    }
}
