//! How a built batch maps onto the records of a resource chunk.
//!
//! Vertex streams are stored as vertex stream records, images as image records in batch order, everything else as
//! generic records with the identifiers below.

use bytemuck::Pod;
use scenepack_files::chunk::ResourceChunk;
use scenepack_files::chunk::types::{ImageHeader, VertexSemantic};

use crate::rendering::batch::BuildError;
use crate::rendering::batch::records::{BatchManifest, BoundingSphere, IndirectDrawCommand, MeshInstance, NO_IMAGE};
use crate::rendering::common::types::VertexStream;

pub const MANIFEST_ID: u32 = 0;
pub const INDEX_BUFFER_ID: u32 = 1;
pub const INSTANCE_BUFFER_ID: u32 = 2;
pub const INDIRECT_BUFFER_ID: u32 = 3;
pub const BOUNDS_BUFFER_ID: u32 = 4;

/// The merged contents of a batch in upload layout, borrowed either from the freshly merged CPU buffers or
/// straight from a cache chunk.
#[derive(Debug)]
pub struct BatchData<'a> {
    pub manifest: BatchManifest,
    pub vertex_streams: Vec<(VertexSemantic, &'a [u8])>,
    pub indices: &'a [u8],
    pub instances: &'a [u8],
    pub indirect: &'a [u8],
    pub bounds: &'a [u8],
    pub images: Vec<(ImageHeader, &'a [u8])>,
}

fn corrupt(reason: impl Into<String>) -> BuildError {
    BuildError::CorruptCache(reason.into())
}

fn expect_size(what: &str, bytes: &[u8], count: u32, element_size: usize) -> Result<(), BuildError> {
    let expected = count as usize * element_size;
    if bytes.len() != expected {
        return Err(corrupt(format!(
            "{} holds {} bytes, {} elements need {}",
            what,
            bytes.len(),
            count,
            expected
        )));
    }
    Ok(())
}

/// Chunk payloads have no alignment guarantees, so records are read one by one.
fn read_records<T: Pod>(bytes: &[u8]) -> impl Iterator<Item = T> + '_ {
    bytes
        .chunks_exact(size_of::<T>())
        .map(bytemuck::pod_read_unaligned::<T>)
}

impl<'a> BatchData<'a> {
    /// Validates everything a renderer could trip over before a single byte gets uploaded: sizes against the
    /// manifest, draw ranges against the merged buffers, image references against the image list.
    pub fn from_chunk(chunk: &'a ResourceChunk) -> Result<Self, BuildError> {
        let generic = move |id: u32, what: &str| {
            chunk
                .get_generic(id)
                .ok_or_else(|| corrupt(format!("The {} record is missing", what)))
        };

        let manifest_bytes = generic(MANIFEST_ID, "manifest")?;
        let manifest = bytemuck::try_pod_read_unaligned::<BatchManifest>(manifest_bytes)
            .map_err(|_| corrupt("The manifest has the wrong size"))?;

        if manifest.draw_count == 0 {
            return Err(corrupt("The chunk does not contain any draw"));
        }

        let vertex_streams = chunk
            .vertex_semantics()
            .into_iter()
            .filter_map(|semantic| chunk.get_vertex_data(semantic).map(|bytes| (semantic, bytes)))
            .collect::<Vec<_>>();
        if vertex_streams.is_empty() {
            return Err(corrupt("The chunk does not contain any vertex stream"));
        }
        for (semantic, bytes) in &vertex_streams {
            expect_size(
                &format!("The {:?} stream", semantic),
                bytes,
                manifest.vertex_count,
                VertexStream::element_size(*semantic),
            )?;
        }

        let indices = generic(INDEX_BUFFER_ID, "index buffer")?;
        expect_size("The index buffer", indices, manifest.index_count, size_of::<u32>())?;

        let instances = generic(INSTANCE_BUFFER_ID, "instance buffer")?;
        expect_size(
            "The instance buffer",
            instances,
            manifest.draw_count,
            size_of::<MeshInstance>(),
        )?;

        let indirect = generic(INDIRECT_BUFFER_ID, "indirect buffer")?;
        expect_size(
            "The indirect buffer",
            indirect,
            manifest.draw_count,
            size_of::<IndirectDrawCommand>(),
        )?;

        let bounds = generic(BOUNDS_BUFFER_ID, "bounds buffer")?;
        expect_size(
            "The bounds buffer",
            bounds,
            manifest.draw_count,
            size_of::<BoundingSphere>(),
        )?;

        if chunk.image_count() != manifest.image_count as usize {
            return Err(corrupt(format!(
                "The chunk holds {} images, the manifest {}",
                chunk.image_count(),
                manifest.image_count
            )));
        }

        let images = (0..chunk.image_count())
            .filter_map(|index| chunk.get_image_data(index))
            .map(|(header, bytes)| {
                if header.expected_payload_size() != Some(bytes.len()) {
                    return Err(corrupt(format!(
                        "An image of {}x{} {:?} with {} mips holds {} bytes",
                        header.width,
                        header.height,
                        header.format,
                        header.mip_count,
                        bytes.len()
                    )));
                }
                Ok((*header, bytes))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for command in read_records::<IndirectDrawCommand>(indirect) {
            let index_end = command.first_index as u64 + command.index_count as u64;
            if index_end > manifest.index_count as u64
                || command.vertex_offset < 0
                || command.vertex_offset as u32 >= manifest.vertex_count
                || command.first_instance as u64 + command.instance_count as u64 > manifest.draw_count as u64
            {
                return Err(corrupt(format!("The draw {:?} exceeds the merged buffers", command)));
            }
        }

        for instance in read_records::<MeshInstance>(instances) {
            if instance
                .images
                .iter()
                .any(|&image| image != NO_IMAGE && image >= manifest.image_count)
            {
                return Err(corrupt("An instance references a missing image"));
            }
        }

        Ok(Self {
            manifest,
            vertex_streams,
            indices,
            instances,
            indirect,
            bounds,
            images,
        })
    }

    pub fn write_to_chunk(&self, chunk: &mut ResourceChunk) {
        chunk.set_generic(MANIFEST_ID, bytemuck::bytes_of(&self.manifest));
        for (semantic, bytes) in &self.vertex_streams {
            chunk.set_vertex_data(*semantic, bytes);
        }
        chunk.set_generic(INDEX_BUFFER_ID, self.indices);
        chunk.set_generic(INSTANCE_BUFFER_ID, self.instances);
        chunk.set_generic(INDIRECT_BUFFER_ID, self.indirect);
        chunk.set_generic(BOUNDS_BUFFER_ID, self.bounds);
        for (header, bytes) in &self.images {
            chunk.add_image_data(*header, bytes);
        }
    }

    pub fn byte_size(&self) -> u64 {
        let streams = self.vertex_streams.iter().map(|(_, bytes)| bytes.len()).sum::<usize>();
        let images = self.images.iter().map(|(_, bytes)| bytes.len()).sum::<usize>();
        (streams + self.indices.len() + self.instances.len() + self.indirect.len() + self.bounds.len() + images) as u64
    }
}
