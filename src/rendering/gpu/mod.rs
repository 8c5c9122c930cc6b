use scenepack_files::chunk::types::{ImageHeader, VertexSemantic};
use thiserror::Error;

mod headless;

pub use headless::{HeadlessUploader, UploadRecord};

/// What a buffer is used for, so backends can pick usage flags and memory types.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex(VertexSemantic),
    Index,
    Instance,
    Indirect,
    Bounds,
}

/// An opaque reference to a GPU resource, only meaningful to the uploader that created it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GpuHandle(pub u64);

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("Failed to create the {kind:?} buffer \"{label}\" ({size} bytes): {reason}")]
    BufferCreation {
        kind: BufferKind,
        label: String,
        size: usize,
        reason: String,
    },

    #[error("Failed to create the image \"{label}\" ({width}x{height}): {reason}")]
    ImageCreation {
        label: String,
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("The device has been lost")]
    DeviceLost,
}

/// The boundary to the graphics API: given raw bytes and a target kind, produce an opaque handle.
/// Implementations may block on staging copies and command submission.
pub trait GpuUploader: Send + Sync {
    fn upload_buffer(&self, kind: BufferKind, label: &str, bytes: &[u8]) -> Result<GpuHandle, GpuError>;

    /// `bytes` holds every mip level of the image, largest first, tightly packed in `header.format`.
    fn upload_image(&self, header: &ImageHeader, label: &str, bytes: &[u8]) -> Result<GpuHandle, GpuError>;
}

/// The merged, uploaded result of one batch build: everything a renderer needs to issue the indirect draws.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuBatch {
    pub vertex_buffers: Vec<(VertexSemantic, GpuHandle)>,
    pub index_buffer: GpuHandle,
    pub instance_buffer: GpuHandle,
    pub indirect_buffer: GpuHandle,
    pub bounds_buffer: GpuHandle,
    pub images: Vec<GpuHandle>,
    pub vertex_count: u32,
    pub index_count: u32,
    pub draw_count: u32,
    /// Whether the contents came straight out of a cache chunk.
    pub from_cache: bool,
}
