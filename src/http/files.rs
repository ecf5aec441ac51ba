//! Maps request paths onto files below the static root.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

#[derive(Debug)]
pub enum FileError {
    /// Nothing servable exists at the path.
    NotFound,
    /// The path resolves outside the static root.
    Forbidden,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::NotFound => f.write_str("resource not found"),
            FileError::Forbidden => f.write_str("resource outside of static root"),
        }
    }
}

impl std::error::Error for FileError {}

/// Joins `path` onto `root` and canonicalizes the result. `root` must
/// already be canonical.
pub fn resolve(root: &Path, path: &str) -> Result<PathBuf, FileError> {
    let relative = path.trim_start_matches('/');
    let resolved = root
        .join(relative)
        .canonicalize()
        .map_err(|_| FileError::NotFound)?;

    if !resolved.starts_with(root) {
        return Err(FileError::Forbidden);
    }

    Ok(resolved)
}

/// An open regular file below the static root. The handle is closed when
/// this value is dropped.
#[derive(Debug)]
pub struct StaticFile {
    file: File,
    size: u64,
}

impl StaticFile {
    pub fn open(root: &Path, path: &str) -> Result<Self, FileError> {
        let resolved = resolve(root, path)?;
        let file = File::open(&resolved).map_err(|_| FileError::NotFound)?;
        let metadata = file.metadata().map_err(|_| FileError::NotFound)?;

        if !metadata.is_file() {
            return Err(FileError::NotFound);
        }

        debug!("file size: {} bytes", metadata.len());
        Ok(Self {
            file,
            size: metadata.len(),
        })
    }

    /// Reads at most `limit` bytes from the start of the file.
    pub fn read_to_limit(self, limit: usize) -> io::Result<Vec<u8>> {
        let capacity = self.size.min(limit as u64) as usize;
        let mut content = Vec::with_capacity(capacity);
        self.file.take(limit as u64).read_to_end(&mut content)?;
        debug!("Read from file: {} bytes", content.len());
        Ok(content)
    }
}
