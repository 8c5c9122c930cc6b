use scenepack_files::chunk::types::VertexSemantic;
use thiserror::Error;

use crate::rendering::batch::MeshId;
use crate::rendering::gpu::GpuError;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("A mesh needs at least one non-empty vertex stream")]
    EmptyVertexStreams,

    #[error("A mesh needs a non-empty triangle list, got {count} indices")]
    InvalidIndexCount { count: usize },

    #[error("The vertex stream {semantic:?} is present more than once")]
    DuplicateSemantic { semantic: VertexSemantic },

    #[error("The vertex stream {semantic:?} has {actual} elements, expected {expected}")]
    MismatchedStreamLength {
        semantic: VertexSemantic,
        expected: usize,
        actual: usize,
    },

    #[error("Index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("Image \"{label}\" has {actual} bytes of pixel data, {width}x{height} RGBA8 needs {expected}")]
    InvalidImage {
        label: String,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("There is no mesh {0:?}")]
    UnknownMesh(MeshId),

    #[error("There are no vertex arrays to optimise")]
    NoVertexArrays,

    #[error("The mesh optimizer failed: {0:#}")]
    Optimizer(anyhow::Error),

    #[error("The batch does not contain any mesh")]
    NothingToBuild,

    #[error("Processing image \"{label}\" failed: {reason}")]
    ImageProcessing { label: String, reason: String },

    #[error("The cache chunk is unusable: {0}")]
    CorruptCache(String),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("The batch has already been built, rebuilding is not supported")]
    RebuildNotSupported,

    #[error("The build has been cancelled")]
    Cancelled,
}
