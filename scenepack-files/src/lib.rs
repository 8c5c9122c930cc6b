use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("The file's magic value does not match the expectation {magic:#x}")]
    InvalidMagicValue { magic: u64 },

    #[error("Unsupported chunk format version {version}, only {supported} can be read")]
    UnsupportedVersion { version: u32, supported: u32 },

    #[error("The file is violating the expected format, because: {reason}")]
    FormatError { reason: &'static str },

    #[error("Unknown resource type tag {tag}")]
    UnknownResourceType { tag: u32 },

    #[error("Unknown vertex semantic {semantic}")]
    UnknownVertexSemantic { semantic: u32 },

    #[error("Unknown image format {format}")]
    UnknownImageFormat { format: u32 },

    #[error("Record payload [{offset}, {offset} + {size}) exceeds the {len} byte backing buffer")]
    RecordOutOfBounds { offset: u64, size: u64, len: u64 },

    /// Writing a chunk without a single record would produce a file that can never be useful as a cache.
    #[error("The chunk does not contain any resource")]
    EmptyChunk,

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

pub mod chunk;
pub mod common;
