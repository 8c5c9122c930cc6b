use anyhow::{bail, ensure};

use crate::rendering::common::types::Mesh;

/// Reorders a mesh for the GPU in place. The result has to render exactly like the input.
/// On error, `mesh` has to be left untouched.
pub trait MeshOptimizer: Send + Sync {
    fn optimize(&self, mesh: &mut Mesh) -> anyhow::Result<()>;
}

/// Leaves every mesh as it is.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoopOptimizer;

impl MeshOptimizer for NoopOptimizer {
    fn optimize(&self, _mesh: &mut Mesh) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Triangle order optimization for the post-transform vertex cache (Tipsify, Sander et al. 2007), followed by
/// renumbering the vertices in first-use order for better vertex fetch locality.
/// Does not reduce overdraw.
#[derive(Debug, Copy, Clone)]
pub struct VertexCacheOptimizer {
    pub cache_size: u32,
}

impl Default for VertexCacheOptimizer {
    fn default() -> Self {
        Self { cache_size: 16 }
    }
}

impl MeshOptimizer for VertexCacheOptimizer {
    fn optimize(&self, mesh: &mut Mesh) -> anyhow::Result<()> {
        profiling::scope!("VertexCacheOptimizer::optimize");

        let vertex_count = mesh.vertex_buffers.vertex_count();
        let indices = &mesh.index_buffer;
        ensure!(
            indices.len() % 3 == 0,
            "Not a triangle list: {} indices",
            indices.len()
        );
        if let Some(&index) = indices.iter().find(|&&index| index as usize >= vertex_count) {
            bail!("Index {} is out of range for {} vertices", index, vertex_count);
        }

        let reordered = tipsify(indices, vertex_count, self.cache_size as usize);
        let (remap, order) = fetch_remap(&reordered, vertex_count);

        mesh.index_buffer = reordered
            .into_iter()
            .map(|index| remap[index as usize])
            .collect();
        for stream in &mut mesh.vertex_buffers.streams {
            stream.remap(&order);
        }

        Ok(())
    }
}

/// Returns `indices` with its triangles reordered. Indices have to be in range.
pub fn tipsify(indices: &[u32], vertex_count: usize, cache_size: usize) -> Vec<u32> {
    let triangle_count = indices.len() / 3;

    // vertex -> triangles adjacency, compressed
    let mut live = vec![0u32; vertex_count];
    for &index in indices {
        live[index as usize] += 1;
    }

    let mut offsets = vec![0usize; vertex_count + 1];
    for vertex in 0..vertex_count {
        offsets[vertex + 1] = offsets[vertex] + live[vertex] as usize;
    }

    let mut fill = offsets.clone();
    let mut adjacency = vec![0u32; indices.len()];
    for (triangle, corners) in indices.chunks_exact(3).enumerate() {
        for &vertex in corners {
            adjacency[fill[vertex as usize]] = triangle as u32;
            fill[vertex as usize] += 1;
        }
    }

    let mut cache_time = vec![0usize; vertex_count];
    let mut emitted = vec![false; triangle_count];
    let mut dead_end = Vec::new();
    let mut output = Vec::with_capacity(indices.len());

    let mut timestamp = cache_size + 1;
    let mut cursor = 0usize;
    let mut fanning = (vertex_count > 0).then_some(0usize);

    while let Some(vertex) = fanning {
        let mut candidates = Vec::new();

        for &triangle in &adjacency[offsets[vertex]..offsets[vertex + 1]] {
            let triangle = triangle as usize;
            if emitted[triangle] {
                continue;
            }

            for &corner in &indices[triangle * 3..triangle * 3 + 3] {
                let corner = corner as usize;
                output.push(corner as u32);
                dead_end.push(corner);
                candidates.push(corner);
                live[corner] -= 1;

                if timestamp - cache_time[corner] > cache_size {
                    cache_time[corner] = timestamp;
                    timestamp += 1;
                }
            }
            emitted[triangle] = true;
        }

        fanning = next_vertex(
            &candidates,
            &live,
            &cache_time,
            timestamp,
            cache_size,
            &mut dead_end,
            &mut cursor,
        );
    }

    output
}

fn next_vertex(
    candidates: &[usize],
    live: &[u32],
    cache_time: &[usize],
    timestamp: usize,
    cache_size: usize,
    dead_end: &mut Vec<usize>,
    cursor: &mut usize,
) -> Option<usize> {
    let mut best = None;
    let mut best_priority = -1i64;

    for &vertex in candidates {
        if live[vertex] == 0 {
            continue;
        }

        // prefer vertices that are still in the cache after fanning all their remaining triangles
        let age = timestamp - cache_time[vertex];
        let priority = if age + 2 * live[vertex] as usize <= cache_size {
            age as i64
        } else {
            0
        };

        if priority > best_priority {
            best_priority = priority;
            best = Some(vertex);
        }
    }

    if best.is_some() {
        return best;
    }

    while let Some(vertex) = dead_end.pop() {
        if live[vertex] > 0 {
            return Some(vertex);
        }
    }

    while *cursor < live.len() {
        if live[*cursor] > 0 {
            return Some(*cursor);
        }
        *cursor += 1;
    }

    None
}

/// Numbers the vertices in the order `indices` first uses them, unreferenced vertices last.
/// Returns `(old -> new, new -> old)`.
pub fn fetch_remap(indices: &[u32], vertex_count: usize) -> (Vec<u32>, Vec<u32>) {
    const UNASSIGNED: u32 = u32::MAX;

    let mut remap = vec![UNASSIGNED; vertex_count];
    let mut order = Vec::with_capacity(vertex_count);

    for vertex in indices.iter().copied().chain(0..vertex_count as u32) {
        if remap[vertex as usize] == UNASSIGNED {
            remap[vertex as usize] = order.len() as u32;
            order.push(vertex);
        }
    }

    (remap, order)
}
