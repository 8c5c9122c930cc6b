use scenepack_files::ChunkError;
use thiserror::Error;

use crate::rendering::batch::BuildError;

/// Everything that can end a scene load. Surfaces to callers only through the terminal state of the load's
/// [`crate::loading::AsyncOperation`] and its failure reason.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Malformed resource chunk: {0}")]
    Format(#[from] ChunkError),

    #[error("Failed to parse the scene source: {0:#}")]
    Parse(anyhow::Error),

    #[error("Failed to build the asset batch: {0}")]
    Build(BuildError),

    #[error("{0}")]
    Concurrency(&'static str),

    #[error("The operation has been cancelled")]
    Cancelled,
}

impl From<BuildError> for LoadError {
    fn from(value: BuildError) -> Self {
        match value {
            BuildError::Cancelled => LoadError::Cancelled,
            BuildError::RebuildNotSupported => LoadError::Concurrency("The batch has already been built"),
            other => LoadError::Build(other),
        }
    }
}
