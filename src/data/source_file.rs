use std::path::{Path, PathBuf};

/// A source file read from the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the working-directory root.
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Containing directory as shown in prompts; files at the root report `.`.
    pub fn directory(&self) -> String {
        match self.path.parent() {
            Some(parent) if parent != Path::new("") => parent.display().to_string(),
            _ => ".".to_string(),
        }
    }

    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}
