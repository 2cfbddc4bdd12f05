//! File copy and delete steps.

use std::fs::{self, File, FileTimes};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{InstallKitError, Result};
use crate::param::Param;
use crate::task::{Outcome, Task};

// ============================================================================
// Copy
// ============================================================================

/// Copy files to a directory or a file path.
///
/// Permissions and access/modification times are carried over. When the
/// target is an existing directory each source lands at
/// `target/<file name>`; otherwise the target is the destination path.
pub struct CopyFiles {
    name: String,
    sources: Param<Vec<PathBuf>>,
    target: Param<PathBuf>,
}

impl CopyFiles {
    pub fn new(
        sources: impl Into<Param<Vec<PathBuf>>>,
        target: impl Into<Param<PathBuf>>,
    ) -> Self {
        Self {
            name: "CopyFiles".to_string(),
            sources: sources.into(),
            target: target.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn run(&self) -> Result<()> {
        let sources = self.sources.resolve()?;
        let target = self.target.resolve()?;
        for source in &sources {
            let destination = destination_for(source, &target)?;
            copy_with_metadata(source, &destination).map_err(|e| {
                InstallKitError::general(format!(
                    "{} -> {}: {e}",
                    source.display(),
                    destination.display()
                ))
            })?;
            debug!(from = %source.display(), to = %destination.display(), "file copied");
        }
        Ok(())
    }
}

impl Task for CopyFiles {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> Outcome {
        Outcome::from_result(self.run(), "Failed to copy files")
    }
}

fn destination_for(source: &Path, target: &Path) -> Result<PathBuf> {
    if !target.is_dir() {
        return Ok(target.to_path_buf());
    }
    let file_name = source.file_name().ok_or_else(|| {
        InstallKitError::validation(format!("Source has no file name: {}", source.display()))
    })?;
    Ok(target.join(file_name))
}

/// Copy contents, then times, then permissions. Times are set through the
/// open handle before a read-only mode can lock the destination.
fn copy_with_metadata(source: &Path, destination: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    let mut reader = File::open(source)?;
    let mut writer = File::create(destination)?;
    io::copy(&mut reader, &mut writer)?;

    let times = FileTimes::new()
        .set_accessed(metadata.accessed()?)
        .set_modified(metadata.modified()?);
    writer.set_times(times)?;
    drop(writer);

    fs::set_permissions(destination, metadata.permissions())
}

// ============================================================================
// Delete
// ============================================================================

/// Delete files.
///
/// A missing path fails the task unless `fail_on_doesnt_exist(false)` was
/// set, in which case it is skipped. Paths before a failing one stay deleted.
pub struct DeleteFiles {
    name: String,
    paths: Param<Vec<PathBuf>>,
    fail_on_doesnt_exist: bool,
}

impl DeleteFiles {
    pub fn new(paths: impl Into<Param<Vec<PathBuf>>>) -> Self {
        Self {
            name: "DeleteFiles".to_string(),
            paths: paths.into(),
            fail_on_doesnt_exist: true,
        }
    }

    /// Whether a missing path fails the task (default true)
    pub fn fail_on_doesnt_exist(mut self, fail: bool) -> Self {
        self.fail_on_doesnt_exist = fail;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn run(&self) -> Result<()> {
        for path in &self.paths.resolve()? {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "file deleted"),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    if self.fail_on_doesnt_exist {
                        return Err(InstallKitError::file_not_found(path));
                    }
                    debug!(path = %path.display(), "file already absent");
                }
                Err(e) => {
                    return Err(InstallKitError::general(format!("{}: {e}", path.display())));
                }
            }
        }
        Ok(())
    }
}

impl Task for DeleteFiles {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> Outcome {
        match self.run() {
            Err(e @ InstallKitError::FileNotFound { .. }) => Outcome::failure(e.to_string()),
            result => Outcome::from_result(result, "Failed to delete files"),
        }
    }
}
