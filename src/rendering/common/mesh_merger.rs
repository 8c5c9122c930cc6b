use log::warn;
use scenepack_files::chunk::types::VertexSemantic;

use crate::rendering::common::types::{VertexBuffers, VertexStream};

/// Vertex arrays concatenated stream by stream.
#[derive(Debug, Default)]
pub struct MergedVertices {
    /// One tightly packed buffer per semantic, sorted by semantic.
    pub streams: Vec<(VertexSemantic, Vec<u8>)>,
    /// The first vertex of every input array within the merged streams.
    pub base_vertices: Vec<u32>,
    pub vertex_count: u32,
}

#[derive(Debug, Default)]
pub struct MergedIndices {
    pub indices: Vec<u32>,
    /// The first index of every input buffer within `indices`.
    pub first_indices: Vec<u32>,
}

pub enum MeshMerger {}

impl MeshMerger {
    /// Concatenates the vertex arrays over the union of their semantics. Arrays lacking a semantic that others
    /// have are zero filled, so every merged stream ends up with the same vertex count.
    /// Indices are not rebased: draws address their array through a base vertex instead.
    pub fn merge_vertex_buffers(input: &[&VertexBuffers]) -> MergedVertices {
        if input.is_empty() {
            warn!("Merging 0 vertex arrays");
            return MergedVertices::default();
        }

        let mut semantics = input
            .iter()
            .flat_map(|buffers| buffers.semantics())
            .collect::<Vec<_>>();
        semantics.sort();
        semantics.dedup();

        let mut base_vertices = Vec::with_capacity(input.len());
        let mut vertex_count = 0u32;
        for buffers in input {
            base_vertices.push(vertex_count);
            vertex_count += buffers.vertex_count() as u32;
        }

        let streams = semantics
            .into_iter()
            .map(|semantic| {
                let element_size = VertexStream::element_size(semantic);
                let mut merged = Vec::with_capacity(vertex_count as usize * element_size);
                for buffers in input {
                    match buffers.stream(semantic) {
                        Some(stream) => merged.extend_from_slice(stream.as_bytes()),
                        None => merged.resize(merged.len() + buffers.vertex_count() * element_size, 0),
                    }
                }
                (semantic, merged)
            })
            .collect();

        MergedVertices {
            streams,
            base_vertices,
            vertex_count,
        }
    }

    pub fn merge_index_buffers(input: &[&[u32]]) -> MergedIndices {
        let mut merged = MergedIndices {
            indices: Vec::with_capacity(input.iter().map(|indices| indices.len()).sum()),
            first_indices: Vec::with_capacity(input.len()),
        };

        for indices in input {
            merged.first_indices.push(merged.indices.len() as u32);
            merged.indices.extend_from_slice(indices);
        }

        merged
    }

    /// Reverses the winding of every triangle of a triangle list.
    pub fn mirror_winding(indices: &mut [u32]) {
        for triangle in indices.chunks_exact_mut(3) {
            triangle.swap(1, 2);
        }
    }
}
