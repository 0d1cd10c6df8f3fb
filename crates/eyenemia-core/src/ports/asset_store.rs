//! Storage port for persisted uploads.

use std::path::Path;

/// Port for reading and discarding persisted uploads.
pub trait AssetStore: Send + Sync {
    /// Reads the raw bytes of a stored upload.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset cannot be read.
    fn read(&self, path: &Path) -> anyhow::Result<Vec<u8>>;

    /// Deletes a stored upload.
    ///
    /// Must be idempotent: deleting an asset that no longer exists succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset exists but cannot be removed.
    fn delete(&self, path: &Path) -> anyhow::Result<()>;
}
