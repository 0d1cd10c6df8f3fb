//! Filesystem adapters: the upload store and input discovery.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use eyenemia_core::AssetStore;
use tracing::{debug, warn};

/// Name used when sanitizing leaves nothing.
const FALLBACK_FILENAME: &str = "upload";

/// Suffixes tried before giving up on a crowded store.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Upload store rooted at a directory.
///
/// Inputs are copied in under a sanitized name; the gate and pipeline only
/// ever see the staged copy.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    /// Opens (creating if needed) a store at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create upload directory {}", root.display()))?;
        Ok(Self { root })
    }

    /// The store directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copies `source` into the store and returns the staged path.
    ///
    /// The name is sanitized and the staged file is always newly created:
    /// when the name is taken a `-N` suffix is added, so neither an earlier
    /// upload nor a source that already lives in the store is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or no name can be claimed.
    pub fn ingest(&self, source: &Path) -> Result<PathBuf> {
        let name = source
            .file_name()
            .map(|n| sanitize_filename(&n.to_string_lossy()))
            .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

        let mut input =
            File::open(source).with_context(|| format!("Failed to open {}", source.display()))?;
        let (dest, mut staged) = self.claim(&name)?;

        if let Err(e) = io::copy(&mut input, &mut staged) {
            drop(staged);
            if let Err(cleanup) = fs::remove_file(&dest) {
                warn!("Failed to remove partial upload {}: {cleanup}", dest.display());
            }
            return Err(e).with_context(|| {
                format!("Failed to stage {} as {}", source.display(), dest.display())
            });
        }

        debug!("Staged {} -> {}", source.display(), dest.display());
        Ok(dest)
    }

    /// Creates the first free file among `name`, `stem-1.ext`, `stem-2.ext`, ...
    fn claim(&self, name: &str) -> Result<(PathBuf, File)> {
        let candidate = Path::new(name);
        let stem = candidate
            .file_stem()
            .map_or_else(|| FALLBACK_FILENAME.to_string(), |s| s.to_string_lossy().into_owned());
        let ext = candidate.extension().map(|e| e.to_string_lossy().into_owned());

        for n in 0..MAX_NAME_ATTEMPTS {
            let file_name = match (n, &ext) {
                (0, _) => name.to_string(),
                (_, Some(ext)) => format!("{stem}-{n}.{ext}"),
                (_, None) => format!("{stem}-{n}"),
            };
            let path = self.root.join(file_name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create {}", path.display()))
                }
            }
        }

        anyhow::bail!(
            "No free upload name for {name} in {} after {MAX_NAME_ATTEMPTS} attempts",
            self.root.display()
        )
    }
}

impl AssetStore for FsAssetStore {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn delete(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }
}

/// Reduces a filename to ASCII letters, digits, `.`, `-` and `_`.
///
/// Whitespace becomes `_`, other characters are dropped and leading dots or
/// underscores are stripped, so the result can never escape the store
/// directory or be hidden. Falls back to `upload` when nothing is left.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let trimmed = cleaned.trim_start_matches(['.', '_']);

    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Expands files and directories into a sorted list of input files.
///
/// Hidden entries are skipped inside directories; `recursive` descends into
/// subdirectories. Missing paths are reported and skipped.
#[must_use]
pub fn collect_inputs(paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            collect_from_dir(path, recursive, &mut files);
        } else {
            warn!("Path does not exist: {}", path.display());
        }
    }
    files
}

fn collect_from_dir(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Failed to read directory {}: {e}", dir.display());
            return;
        }
    };

    let mut found: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| !is_hidden(p))
        .collect();
    found.sort();

    for path in found {
        if path.is_file() {
            files.push(path);
        } else if path.is_dir() && recursive {
            collect_from_dir(&path, recursive, files);
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
