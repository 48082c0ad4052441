use git2::Repository;
use std::path::Path;
use tracing::debug;

use crate::contexts::{LoaderError, RepositoryCloner};

/// Clones with libgit2; accepts remote URLs and local repository paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCloner;

impl RepositoryCloner for GitCloner {
    fn fetch(&self, location: &str, destination: &Path) -> Result<(), LoaderError> {
        debug!("git2::Repository::clone {} -> {}", location, destination.display());
        Repository::clone(location, destination)
            .map(|_| ())
            .map_err(|e| LoaderError::Clone {
                location: location.to_string(),
                destination: destination.to_path_buf(),
                reason: e.message().to_string(),
            })
    }
}
