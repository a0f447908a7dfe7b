//! Atomic file output
//!
//! Every file the exporter produces goes through [`atomic_write`]: the bytes
//! land in a temporary file in the destination directory, are synced, and
//! then renamed over the target. A failure at any step leaves the target
//! untouched and the temporary file is removed when it drops.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use escn_core::{Error, Result, ResultExt};
use tempfile::NamedTempFile;
use tracing::debug;

/// Write `contents` to `path` atomically
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .map_err(|e| Error::Io(e.error))
        .with_context(|| format!("replacing {}", path.display()))?;

    debug!("Wrote {} bytes to {:?}", contents.len(), path);
    Ok(())
}

/// Check that files can be created in a directory
pub fn probe_writable(dir: &Path) -> bool {
    dir.is_dir() && NamedTempFile::new_in(dir).is_ok()
}

/// Side file produced alongside the scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingFile {
    /// Write generated contents
    Write { path: PathBuf, contents: Vec<u8> },
    /// Copy an existing file
    Copy { from: PathBuf, to: PathBuf },
}

impl PendingFile {
    /// Destination path
    pub fn destination(&self) -> &Path {
        match self {
            Self::Write { path, .. } => path,
            Self::Copy { to, .. } => to,
        }
    }
}

/// Side files collected during traversal, written only once it succeeds
#[derive(Debug, Clone, Default)]
pub struct PendingFiles {
    files: Vec<PendingFile>,
}

impl PendingFiles {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a file; a later entry for the same destination is ignored
    pub fn push(&mut self, file: PendingFile) {
        if self
            .files
            .iter()
            .any(|f| f.destination() == file.destination())
        {
            return;
        }
        self.files.push(file);
    }

    /// Number of queued files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over queued files
    pub fn iter(&self) -> impl Iterator<Item = &PendingFile> {
        self.files.iter()
    }

    /// Write every queued file
    pub fn commit(&self) -> Result<usize> {
        for file in &self.files {
            match file {
                PendingFile::Write { path, contents } => atomic_write(path, contents)?,
                PendingFile::Copy { from, to } => {
                    if same_file(from, to) {
                        continue;
                    }
                    let bytes = fs::read(from)
                        .with_context(|| format!("reading {}", from.display()))?;
                    atomic_write(to, &bytes)?;
                }
            }
        }
        Ok(self.files.len())
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
