//! Storage for rendered artifacts and image assets.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Destination for output files, addressed by relative path.
///
/// Implementations must accept concurrent writes to distinct paths.
pub trait DataWriter: Send + Sync {
    /// Write `data` to `path`, replacing any previous content.
    fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Write UTF-8 text.
    fn write_string(&self, path: &str, text: &str) -> Result<()> {
        self.write(path, text.as_bytes())
    }
}

/// Writes files below a base directory.
#[derive(Debug, Clone)]
pub struct FileWriter {
    base_dir: PathBuf,
}

impl FileWriter {
    /// Create a writer rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path);
        if rel.is_absolute() || rel.components().any(|c| c == std::path::Component::ParentDir) {
            return Err(Error::InvalidInput(format!(
                "output path must stay below the base directory: {}",
                path
            )));
        }
        Ok(self.base_dir.join(rel))
    }
}

impl DataWriter for FileWriter {
    fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, data)?;
        log::debug!("Wrote {} bytes to {}", data.len(), full.display());
        Ok(())
    }
}

/// Keeps written files in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Content written to `path`, if any.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(path).cloned()
    }

    /// Paths written so far, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of files written.
    pub fn len(&self) -> usize {
        self.files.lock().map(|f| f.len()).unwrap_or(0)
    }

    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataWriter for MemoryWriter {
    fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| Error::Other("memory writer lock poisoned".to_string()))?;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

/// Asynchronous file writer (requires `async` feature).
#[cfg(feature = "async")]
#[derive(Debug, Clone)]
pub struct AsyncFileWriter {
    base_dir: PathBuf,
}

#[cfg(feature = "async")]
impl AsyncFileWriter {
    /// Create a writer rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Write `data` to `path` below the base directory.
    pub async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full = FileWriter::new(self.base_dir.clone()).resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, data).await?;
        Ok(())
    }
}
