//! Directory-backed [`Storage`]: the mount point of the removable card.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use super::{Storage, WriteMode};
use crate::util::error::{FieldLogError, Result};

/// Files stored flat under one root directory.
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    /// Mount `root`. Fails if it does not exist or is not a directory,
    /// which is how a missing or unreadable card shows up.
    pub fn mount(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        match std::fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {
                tracing::debug!("Mounted storage at {}", root.display());
                Ok(Self { root })
            }
            Ok(_) => Err(FieldLogError::StorageUnavailable(format!(
                "{} is not a directory",
                root.display()
            ))),
            Err(e) => Err(FieldLogError::StorageUnavailable(format!(
                "{}: {e}",
                root.display()
            ))),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a flat name to a path under the root. Names with path components
    /// are refused so nothing escapes the mount.
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim_start_matches('/');
        let flat = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !flat {
            return Err(FieldLogError::InvalidArgument(format!(
                "not a flat file name: {name:?}"
            )));
        }
        Ok(self.root.join(name))
    }
}

impl Storage for DirStorage {
    type Reader = File;
    type Writer = File;

    fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn open_read(&self, name: &str) -> Result<File> {
        Ok(File::open(self.resolve(name)?)?)
    }

    fn open_write(&self, name: &str, mode: WriteMode) -> Result<File> {
        let path = self.resolve(name)?;
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Truncate => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };
        Ok(options.open(path)?)
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
