//! The resource chunk: a single binary file holding typed, named byte blobs.
//!
//! Layout (all integers little endian):
//!
//! ```text
//! ChunkHeader   { magic: u64, version: u32, resource_count: u32 }
//! repeated resource_count times:
//!   RecordHeader  { resource_type: u32, identifier: u32, size: u64 }
//!   sub header    (VertexStream: { semantic: u32 },
//!                  Image: { width: u32, height: u32, flags: u32, mip_count: u32, format: u32 },
//!                  Generic: none)
//!   payload       (size bytes)
//! ```
//!
//! A chunk owns exactly one backing buffer (the arena). Every record is an index entry pointing into that buffer,
//! lookups hand out borrowed slices, so a view can never outlive the chunk it was taken from.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};

use crate::ChunkError;
use crate::chunk::types::{ByteRange, ImageHeader, VertexSemantic};

pub mod reader;
pub mod types;
pub mod writer;

#[cfg(test)]
mod tests;

#[derive(Debug, Default)]
pub struct ResourceChunk {
    data: Vec<u8>,
    generic: HashMap<u32, ByteRange>,
    vertex_streams: HashMap<VertexSemantic, ByteRange>,
    images: Vec<(ImageHeader, ByteRange)>,
    loaded_from_disk: bool,
}

impl ResourceChunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for `new()` followed by [`ResourceChunk::parse_file`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ChunkError> {
        let mut chunk = Self::new();
        chunk.parse_file(path)?;
        Ok(chunk)
    }

    /// Whether the contents stem from [`ResourceChunk::parse_file`] / [`ResourceChunk::parse_bytes`] rather than
    /// from incremental `set_*` calls.
    pub fn loaded_from_disk(&self) -> bool {
        self.loaded_from_disk
    }

    pub fn resource_count(&self) -> usize {
        self.generic.len() + self.vertex_streams.len() + self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resource_count() == 0
    }

    /// Size of the backing buffer, including bytes of replaced records.
    pub fn backing_size(&self) -> usize {
        self.data.len()
    }

    fn view(&self, range: ByteRange) -> &[u8] {
        &self.data[range.offset..range.end()]
    }

    fn append(&mut self, bytes: &[u8]) -> ByteRange {
        let range = ByteRange {
            offset: self.data.len(),
            len: bytes.len(),
        };
        self.data.extend_from_slice(bytes);
        range
    }

    pub fn get_generic(&self, identifier: u32) -> Option<&[u8]> {
        self.generic.get(&identifier).map(|&range| self.view(range))
    }

    pub fn get_vertex_data(&self, semantic: VertexSemantic) -> Option<&[u8]> {
        self.vertex_streams.get(&semantic).map(|&range| self.view(range))
    }

    pub fn get_image_data(&self, index: usize) -> Option<(&ImageHeader, &[u8])> {
        self.images
            .get(index)
            .map(|(header, range)| (header, self.view(*range)))
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// The semantics present in this chunk, in their stable (declaration) order.
    pub fn vertex_semantics(&self) -> Vec<VertexSemantic> {
        let mut semantics = self.vertex_streams.keys().copied().collect::<Vec<_>>();
        semantics.sort();
        semantics
    }

    pub fn generic_identifiers(&self) -> Vec<u32> {
        let mut identifiers = self.generic.keys().copied().collect::<Vec<_>>();
        identifiers.sort();
        identifiers
    }

    /// Appends `bytes` and makes `identifier` resolve to them. A previous record with the same identifier keeps its
    /// bytes in the backing buffer until the chunk is dropped, but is no longer reachable nor written to disk.
    pub fn set_generic(&mut self, identifier: u32, bytes: &[u8]) {
        let range = self.append(bytes);
        if self.generic.insert(identifier, range).is_some() {
            debug!("Replacing generic resource {}", identifier);
        }
    }

    /// See [`ResourceChunk::set_generic`] for the replacement semantics.
    pub fn set_vertex_data(&mut self, semantic: VertexSemantic, bytes: &[u8]) {
        let range = self.append(bytes);
        if self.vertex_streams.insert(semantic, range).is_some() {
            debug!("Replacing vertex stream {:?}", semantic);
        }
    }

    /// Images are addressed by their insertion order, the returned index is what [`ResourceChunk::get_image_data`]
    /// expects.
    pub fn add_image_data(&mut self, header: ImageHeader, bytes: &[u8]) -> usize {
        let range = self.append(bytes);
        self.images.push((header, range));
        self.images.len() - 1
    }

    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<(), ChunkError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        self.parse_bytes(data)?;
        info!(
            "Parsed resource chunk {} ({} resources, {} bytes)",
            path.display(),
            self.resource_count(),
            self.data.len()
        );
        Ok(())
    }

    /// Takes ownership of `data` as the backing buffer and indexes it. On failure, `self` is left untouched.
    pub fn parse_bytes(&mut self, data: Vec<u8>) -> Result<(), ChunkError> {
        let index = reader::ChunkReader::index(&data)?;

        self.data = data;
        self.generic = index.generic;
        self.vertex_streams = index.vertex_streams;
        self.images = index.images;
        self.loaded_from_disk = true;
        Ok(())
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), ChunkError> {
        let path = path.as_ref();
        writer::ChunkWriter::write_file(self, path)?;
        info!(
            "Wrote resource chunk {} ({} resources)",
            path.display(),
            self.resource_count()
        );
        Ok(())
    }

    /// Serializes the live records in file layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChunkError> {
        let mut buf = Vec::with_capacity(self.data.len() + 64);
        writer::ChunkWriter::write(self, &mut buf)?;
        Ok(buf)
    }

    /// Live records in their stable write order: generic by identifier, vertex streams by semantic, images by
    /// insertion.
    pub(crate) fn generic_records(&self) -> impl Iterator<Item = (u32, &[u8])> + '_ {
        self.generic_identifiers()
            .into_iter()
            .map(|id| (id, self.view(self.generic[&id])))
    }

    pub(crate) fn vertex_records(&self) -> impl Iterator<Item = (VertexSemantic, &[u8])> + '_ {
        self.vertex_semantics()
            .into_iter()
            .map(|semantic| (semantic, self.view(self.vertex_streams[&semantic])))
    }

    pub(crate) fn image_records(&self) -> impl Iterator<Item = (&ImageHeader, &[u8])> + '_ {
        self.images
            .iter()
            .map(|(header, range)| (header, self.view(*range)))
    }
}
