//! Obtains the working directory and reads the source files fed to the model.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::{FeatureRequest, GENERATED_TEST_FILE, RAW_TEST_OUTPUT, SourceFile};

/// Files that are outputs of a previous run and never fed back as sources.
const RESERVED_FILE_NAMES: [&str; 2] = [GENERATED_TEST_FILE, RAW_TEST_OUTPUT];

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("cannot derive a directory name from repository location '{0}'")]
    InvalidLocation(String),

    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("failed to clone {location} into {destination}: {reason}")]
    Clone {
        location: String,
        destination: PathBuf,
        reason: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fetches a remote repository into a local directory.
pub trait RepositoryCloner {
    /// Clones `location` into `destination`, which does not exist yet.
    fn fetch(&self, location: &str, destination: &Path) -> Result<(), LoaderError>;
}

/// Resolves working directories under `base_dir` and enumerates their sources.
pub struct RepositoryLoader<C: RepositoryCloner> {
    base_dir: PathBuf,
    cloner: C,
    extension: String,
}

impl<C: RepositoryCloner> RepositoryLoader<C> {
    /// # Arguments
    /// * `base_dir` - Directory the working copies live in, usually the process cwd
    /// * `cloner` - Used by clone mode only
    /// * `extension` - Source-file extension without the dot, e.g. `py`
    pub fn new(base_dir: impl Into<PathBuf>, cloner: C, extension: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cloner,
            extension: extension.into(),
        }
    }

    /// Clone mode: fetches the repository into a fresh directory.
    ///
    /// An existing directory with the repository's name is left alone; the new
    /// copy gets a `_YYYYmmdd_HHMMSS` suffix instead.
    pub fn clone_repository(&self, request: &FeatureRequest) -> Result<PathBuf, LoaderError> {
        let mut destination = self.default_workdir(request)?;

        if destination.exists() {
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            info!(
                "Directory {} already exists. Adding timestamp suffix.",
                destination.display()
            );
            let mut name = destination.as_os_str().to_os_string();
            name.push(format!("_{}", timestamp));
            destination = PathBuf::from(name);
        }

        info!("Cloning repository to {}", destination.display());
        self.cloner.fetch(&request.location, &destination)?;
        Ok(destination)
    }

    /// Reuse mode: the working directory must already exist.
    pub fn reuse_repository(&self, request: &FeatureRequest) -> Result<PathBuf, LoaderError> {
        let workdir = self.default_workdir(request)?;
        if !workdir.is_dir() {
            return Err(LoaderError::DirectoryNotFound(workdir));
        }
        info!("Reusing working directory {}", workdir.display());
        Ok(workdir)
    }

    fn default_workdir(&self, request: &FeatureRequest) -> Result<PathBuf, LoaderError> {
        let name = request
            .repository_name()
            .ok_or_else(|| LoaderError::InvalidLocation(request.location.clone()))?;
        Ok(self.base_dir.join(name))
    }

    /// Reads every source file under `workdir` in a deterministic order.
    pub fn enumerate(&self, workdir: &Path) -> Result<Vec<SourceFile>, LoaderError> {
        info!("Starting codebase analysis in {}", workdir.display());
        let mut files = Vec::new();
        self.collect(workdir, workdir, &mut files)?;
        info!(
            "Completed codebase analysis. Found {} .{} files",
            files.len(),
            self.extension
        );
        Ok(files)
    }

    fn collect(&self, root: &Path, dir: &Path, files: &mut Vec<SourceFile>) -> Result<(), LoaderError> {
        let io_err = |source| LoaderError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = fs::read_dir(dir)
            .map_err(io_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_err)?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!("Error reading file {}: {}", path.display(), e);
                    continue;
                }
            };

            if file_type.is_dir() {
                if entry.file_name() == ".git" {
                    continue;
                }
                self.collect(root, &path, files)?;
            } else if file_type.is_file() && self.is_source(&path) {
                if let Some(file) = read_source(root, &path) {
                    files.push(file);
                }
            }
        }

        Ok(())
    }

    fn is_source(&self, path: &Path) -> bool {
        if path.extension().and_then(|s| s.to_str()) != Some(self.extension.as_str()) {
            return false;
        }
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default();
        if RESERVED_FILE_NAMES.contains(&name) {
            debug!("Skipping file: {}", name);
            return false;
        }
        true
    }
}

/// Undecodable or unreadable files are skipped, never fatal.
fn read_source(root: &Path, path: &Path) -> Option<SourceFile> {
    let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    match fs::read_to_string(path) {
        Ok(content) => {
            debug!("Successfully read file: {}", relative.display());
            Some(SourceFile::new(relative, content))
        }
        Err(e) => {
            warn!("Error reading file {}: {}", path.display(), e);
            None
        }
    }
}
