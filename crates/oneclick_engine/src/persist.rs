use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot write into {}: {source}", dir.display())]
    OutputDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Replaces whole files in one directory. Content is staged in a temp file
/// next to the target and renamed over it, so a reader sees either the old
/// file or the new one.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Writes `content` to `dir/filename`, creating `dir` on first use.
    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(filename);
        let write_error = |source: io::Error| PersistError::Write {
            path: target.clone(),
            source,
        };

        let mut staged = self.stage()?;
        staged.write_all(content).map_err(write_error)?;
        staged.as_file().sync_all().map_err(write_error)?;
        staged
            .persist(&target)
            .map_err(|err| write_error(err.error))?;
        Ok(target)
    }

    fn stage(&self) -> Result<NamedTempFile, PersistError> {
        let dir_error = |source: io::Error| PersistError::OutputDir {
            dir: self.dir.clone(),
            source,
        };
        match NamedTempFile::new_in(&self.dir) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&self.dir).map_err(dir_error)?;
                NamedTempFile::new_in(&self.dir).map_err(dir_error)
            }
            staged => staged.map_err(dir_error),
        }
    }
}
