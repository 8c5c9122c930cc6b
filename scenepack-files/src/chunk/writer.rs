use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::ChunkError;
use crate::chunk::ResourceChunk;
use crate::chunk::types::{
    CHUNK_FORMAT_VERSION, CHUNK_MAGIC, ChunkHeader, RawImageHeader, RecordHeader, ResourceType, VertexStreamHeader,
};
use crate::common::writer::Writable;

pub struct ChunkWriter {}

impl ChunkWriter {
    /// Writes every live record of `chunk` to `wtr`, generic records first, then vertex streams, then images.
    pub fn write<W: Write>(chunk: &ResourceChunk, wtr: &mut W) -> Result<(), ChunkError> {
        if chunk.is_empty() {
            return Err(ChunkError::EmptyChunk);
        }

        let header = ChunkHeader {
            magic: CHUNK_MAGIC,
            version: CHUNK_FORMAT_VERSION,
            resource_count: u32::try_from(chunk.resource_count()).map_err(|_| ChunkError::FormatError {
                reason: "Too many resources for a single chunk",
            })?,
        };
        header.write(wtr)?;

        for (identifier, bytes) in chunk.generic_records() {
            Self::record_header(ResourceType::Generic, identifier, bytes).write(wtr)?;
            wtr.write_all(bytes)?;
        }

        for (semantic, bytes) in chunk.vertex_records() {
            Self::record_header(ResourceType::VertexStream, 0, bytes).write(wtr)?;
            VertexStreamHeader {
                semantic: semantic.into(),
            }
            .write(wtr)?;
            wtr.write_all(bytes)?;
        }

        for (index, (image_header, bytes)) in chunk.image_records().enumerate() {
            let index = u32::try_from(index).map_err(|_| ChunkError::FormatError {
                reason: "Too many images for a single chunk",
            })?;
            Self::record_header(ResourceType::Image, index, bytes).write(wtr)?;
            RawImageHeader::from(image_header).write(wtr)?;
            wtr.write_all(bytes)?;
        }

        Ok(())
    }

    pub fn write_file(chunk: &ResourceChunk, path: &Path) -> Result<(), ChunkError> {
        // don't truncate an existing cache for nothing
        if chunk.is_empty() {
            return Err(ChunkError::EmptyChunk);
        }

        let mut wtr = BufWriter::new(File::create(path)?);
        Self::write(chunk, &mut wtr)?;

        let file = wtr.into_inner().map_err(|err| err.into_error())?;
        file.sync_all()?;
        Ok(())
    }

    fn record_header(resource_type: ResourceType, identifier: u32, bytes: &[u8]) -> RecordHeader {
        RecordHeader {
            resource_type: resource_type.into(),
            identifier,
            size: bytes.len() as u64,
        }
    }
}
