use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Error;

/// A file written beside its target and moved over it on [`StagedFile::commit`].
/// Dropping it uncommitted removes the temporary file and leaves the target untouched.
pub struct StagedFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    pub fn new(target: &Path) -> Result<Self, Error> {
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp = NamedTempFile::new_in(dir)?;
        Ok(Self {
            temp,
            target: target.to_path_buf(),
        })
    }

    pub fn file_mut(&mut self) -> &mut File {
        self.temp.as_file_mut()
    }

    pub fn commit(mut self) -> Result<(), Error> {
        self.temp.as_file_mut().sync_all()?;
        self.temp
            .persist(&self.target)
            .map_err(|e| Error::Io(e.error))?;
        debug!("Replaced {}", self.target.display());
        Ok(())
    }
}

pub fn write_atomically(target: &Path, bytes: &[u8]) -> Result<(), Error> {
    let mut staged = StagedFile::new(target)?;
    staged.file_mut().write_all(bytes)?;
    staged.commit()
}
