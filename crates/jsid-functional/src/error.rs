use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FunctionalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Source directory not found: {0}")]
    SourceDirNotFound(PathBuf),
}
