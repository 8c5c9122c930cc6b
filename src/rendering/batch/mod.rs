//! Merges independently submitted meshes into one set of GPU ready buffers.
//!
//! Vertex arrays, index arrays and images are deduplicated by content on submission, each in its own table.
//! Mesh slots only refer to table entries. [`AssetBatch::build`] then either concatenates everything the active
//! slots refer to (and optionally records the result into a [`ResourceChunk`]), or, given a chunk loaded from
//! disk, uploads the previously merged buffers unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use arc_swap::ArcSwapOption;
use glam::{Mat4, Vec4};
use itertools::Itertools;
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use scenepack_files::chunk::ResourceChunk;

use crate::loading::AsyncOperation;
use crate::rendering::batch::cache::BatchData;
use crate::rendering::batch::dedup::{DedupTable, hash_image, hash_indices, hash_vertex_streams};
use crate::rendering::batch::records::{
    BatchManifest, IndirectDrawCommand, MeshInstance, NO_IMAGE, local_bounding_sphere, transform_bounding_sphere,
};
use crate::rendering::batch::slots::SlotArena;
use crate::rendering::common::mesh_merger::MeshMerger;
use crate::rendering::common::types::{Mesh, SourceImage, VertexBuffers, VertexStream};
use crate::rendering::gpu::{BufferKind, GpuBatch, GpuUploader};
use crate::rendering::image_processing::{BlockCompressor, ImageProcessor};
use crate::rendering::optimizer::{MeshOptimizer, VertexCacheOptimizer};
use crate::settings::BuildSettings;

pub mod cache;
mod dedup;
mod error;
pub mod records;
mod slots;

#[cfg(test)]
mod tests;

pub use error::BuildError;
pub use slots::MeshSlot;

/// A stable handle to a mesh slot. Ids of destroyed meshes are handed out again.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// Everything a mesh submission consists of.
#[derive(Debug, Clone)]
pub struct MeshDescriptor {
    pub vertex_streams: Vec<VertexStream>,
    pub indices: Vec<u32>,
    pub transform: Mat4,
    pub base_colour: Vec4,
    pub diffuse: Option<Arc<SourceImage>>,
    pub normal: Option<Arc<SourceImage>>,
    pub metallic_roughness: Option<Arc<SourceImage>>,
    /// Reverse the triangle winding, e.g. for a handedness flip.
    pub mirror_winding: bool,
}

impl MeshDescriptor {
    pub fn new(vertex_streams: Vec<VertexStream>, indices: Vec<u32>) -> Self {
        Self {
            vertex_streams,
            indices,
            transform: Mat4::IDENTITY,
            base_colour: Vec4::ONE,
            diffuse: None,
            normal: None,
            metallic_roughness: None,
            mirror_winding: false,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_base_colour(mut self, base_colour: Vec4) -> Self {
        self.base_colour = base_colour;
        self
    }

    pub fn with_diffuse(mut self, image: Arc<SourceImage>) -> Self {
        self.diffuse = Some(image);
        self
    }

    pub fn with_normal(mut self, image: Arc<SourceImage>) -> Self {
        self.normal = Some(image);
        self
    }

    pub fn with_metallic_roughness(mut self, image: Arc<SourceImage>) -> Self {
        self.metallic_roughness = Some(image);
        self
    }

    pub fn mirrored(mut self, mirror_winding: bool) -> Self {
        self.mirror_winding = mirror_winding;
        self
    }
}

/// Where parsers put their meshes.
pub trait MeshSink {
    fn create_mesh(&mut self, mesh: MeshDescriptor) -> Result<MeshId, BuildError>;
}

/// The part of a batch a render thread may look at while the batch is being built elsewhere.
#[derive(Debug)]
pub struct BatchStatus {
    creating: AtomicBool,
    gpu_batch: ArcSwapOption<GpuBatch>,
}

impl BatchStatus {
    fn new() -> Self {
        Self {
            creating: AtomicBool::new(true),
            gpu_batch: ArcSwapOption::empty(),
        }
    }

    /// While true, nothing of the batch may be drawn.
    pub fn is_creating(&self) -> bool {
        self.creating.load(Ordering::Acquire)
    }

    pub fn is_draw_safe(&self) -> bool {
        !self.is_creating() && self.gpu_batch.load().is_some()
    }

    /// The uploaded batch, once it is safe to draw.
    pub fn gpu_batch(&self) -> Option<Arc<GpuBatch>> {
        if self.is_creating() {
            return None;
        }
        self.gpu_batch.load_full()
    }
}

#[derive(Debug)]
struct ImageEntry {
    /// Released once the batch has been built.
    image: Option<Arc<SourceImage>>,
}

pub struct AssetBatch {
    uploader: Arc<dyn GpuUploader>,
    optimizer: Arc<dyn MeshOptimizer>,
    compressor: Option<Arc<dyn BlockCompressor>>,
    settings: BuildSettings,

    slots: SlotArena,
    vertex_arrays: DedupTable<VertexBuffers>,
    index_arrays: DedupTable<Vec<u32>>,
    images: DedupTable<ImageEntry>,
    /// Vertex arrays created since the last [`AssetBatch::optimise`]
    pending_optimisation: Vec<usize>,

    status: Arc<BatchStatus>,
}

fn check_cancelled(op: &AsyncOperation) -> Result<(), BuildError> {
    if op.is_cancelled() {
        return Err(BuildError::Cancelled);
    }
    Ok(())
}

/// Sorts the streams and checks that they form a usable vertex array. Returns the vertex count.
fn validate_streams(streams: &mut [VertexStream]) -> Result<usize, BuildError> {
    if streams.iter().all(VertexStream::is_empty) {
        return Err(BuildError::EmptyVertexStreams);
    }

    streams.sort_by_key(VertexStream::semantic);
    if let Some((duplicate, _)) = streams
        .iter()
        .tuple_windows()
        .find(|(a, b)| a.semantic() == b.semantic())
    {
        return Err(BuildError::DuplicateSemantic {
            semantic: duplicate.semantic(),
        });
    }

    let expected = streams.iter().map(VertexStream::len).max().unwrap_or(0);
    if let Some(stream) = streams.iter().find(|stream| stream.len() != expected) {
        return Err(BuildError::MismatchedStreamLength {
            semantic: stream.semantic(),
            expected,
            actual: stream.len(),
        });
    }

    Ok(expected)
}

fn validate_indices(indices: &[u32], vertex_count: usize) -> Result<(), BuildError> {
    if indices.is_empty() || indices.len() % 3 != 0 {
        return Err(BuildError::InvalidIndexCount { count: indices.len() });
    }

    if let Some(&index) = indices.iter().find(|&&index| index as usize >= vertex_count) {
        return Err(BuildError::IndexOutOfRange { index, vertex_count });
    }

    Ok(())
}

fn validate_image(image: &SourceImage) -> Result<(), BuildError> {
    let expected = image.width as usize * image.height as usize * 4;
    if expected == 0 || image.pixels.len() != expected {
        return Err(BuildError::InvalidImage {
            label: image.label().to_string(),
            width: image.width,
            height: image.height,
            expected,
            actual: image.pixels.len(),
        });
    }
    Ok(())
}

/// Densely renumbers the referenced table entries, in table order.
fn compact(referenced: impl Iterator<Item = usize>) -> BTreeMap<usize, usize> {
    referenced
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(position, table_index)| (table_index, position))
        .collect()
}

impl AssetBatch {
    pub fn new(uploader: Arc<dyn GpuUploader>) -> Self {
        Self {
            uploader,
            optimizer: Arc::new(VertexCacheOptimizer::default()),
            compressor: None,
            settings: BuildSettings::default(),
            slots: SlotArena::default(),
            vertex_arrays: DedupTable::default(),
            index_arrays: DedupTable::default(),
            images: DedupTable::default(),
            pending_optimisation: Vec::new(),
            status: Arc::new(BatchStatus::new()),
        }
    }

    pub fn with_optimizer(mut self, optimizer: Arc<dyn MeshOptimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn BlockCompressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn with_settings(mut self, settings: BuildSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The handle render threads poll. Stays valid independently of the batch.
    pub fn status(&self) -> Arc<BatchStatus> {
        self.status.clone()
    }

    pub fn gpu_batch(&self) -> Option<Arc<GpuBatch>> {
        self.status.gpu_batch()
    }

    pub fn is_built(&self) -> bool {
        self.status.gpu_batch.load().is_some()
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshSlot> {
        self.slots.get(id)
    }

    pub fn mesh_count(&self) -> usize {
        self.slots.active_count()
    }

    /// Number of slots ever allocated, including the recycled ones.
    pub fn slot_capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn recycled_slot_count(&self) -> usize {
        self.slots.free_count()
    }

    pub fn vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn index_array_count(&self) -> usize {
        self.index_arrays.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn vertex_array(&self, index: usize) -> Option<&VertexBuffers> {
        self.vertex_arrays.get(index)
    }

    pub fn index_array(&self, index: usize) -> Option<&[u32]> {
        self.index_arrays.get(index).map(Vec::as_slice)
    }

    /// The CPU copy of an image; `None` once the batch has been built.
    pub fn image(&self, index: usize) -> Option<&Arc<SourceImage>> {
        self.images.get(index)?.image.as_ref()
    }

    /// Validates the submission completely before anything is allocated, then stores it. Content that is already
    /// known resolves to the existing table entries.
    pub fn create_mesh(&mut self, mesh: MeshDescriptor) -> Result<MeshId, BuildError> {
        profiling::scope!("AssetBatch::create_mesh");

        let MeshDescriptor {
            mut vertex_streams,
            indices,
            transform,
            base_colour,
            diffuse,
            normal,
            metallic_roughness,
            mirror_winding,
        } = mesh;

        let vertex_count = validate_streams(&mut vertex_streams)?;
        validate_indices(&indices, vertex_count)?;
        let images = [diffuse, normal, metallic_roughness];
        for image in images.iter().flatten() {
            validate_image(image)?;
        }

        let (vertex_array, new_vertices) = self
            .vertex_arrays
            .get_or_insert_with(hash_vertex_streams(&vertex_streams), || VertexBuffers {
                streams: vertex_streams,
            });
        if new_vertices {
            self.pending_optimisation.push(vertex_array);
        }

        let (index_array, _) = self
            .index_arrays
            .get_or_insert_with(hash_indices(&indices, mirror_winding), || {
                let mut indices = indices;
                if mirror_winding {
                    MeshMerger::mirror_winding(&mut indices);
                }
                indices
            });

        let images = images.map(|image| {
            image.map(|image| {
                self.images
                    .get_or_insert_with(hash_image(&image), || ImageEntry { image: Some(image) })
                    .0
            })
        });

        let id = self.slots.insert(MeshSlot {
            transform,
            base_colour,
            vertex_array,
            index_array,
            images,
        });

        trace!(
            "Created mesh {:?} (vertex array {}, index array {}, images {:?})",
            id, vertex_array, index_array, images
        );
        Ok(id)
    }

    /// Releases the slot. Its id is the next one handed out. The deduplicated data stays, but is skipped by
    /// [`AssetBatch::build`] when no other mesh refers to it.
    pub fn destroy_mesh(&mut self, id: MeshId) -> Result<(), BuildError> {
        self.slots.remove(id).ok_or(BuildError::UnknownMesh(id))?;
        trace!("Destroyed mesh {:?}", id);
        Ok(())
    }

    /// Runs the mesh optimizer over every vertex array created since the last call. Returns how many arrays have
    /// been optimised.
    ///
    /// Optimising reorders vertices, so an array is only touched when it is used with exactly one index array
    /// that in turn is used with no other vertex array. Later submissions of the original content get arrays of
    /// their own.
    pub fn optimise(&mut self) -> Result<usize, BuildError> {
        profiling::scope!("AssetBatch::optimise");

        if self.vertex_arrays.is_empty() {
            return Err(BuildError::NoVertexArrays);
        }

        let pending = std::mem::take(&mut self.pending_optimisation);
        let mut optimised = 0;

        for vertex_array in pending {
            let index_arrays = self
                .slots
                .active()
                .filter(|(_, slot)| slot.vertex_array == vertex_array)
                .map(|(_, slot)| slot.index_array)
                .unique()
                .collect_vec();

            let [index_array] = index_arrays[..] else {
                debug!(
                    "Not optimising vertex array {}, it is used with {} index arrays",
                    vertex_array,
                    index_arrays.len()
                );
                continue;
            };

            if self
                .slots
                .active()
                .any(|(_, slot)| slot.index_array == index_array && slot.vertex_array != vertex_array)
            {
                debug!(
                    "Not optimising vertex array {}, its index array {} is shared",
                    vertex_array, index_array
                );
                continue;
            }

            let (Some(vertex_buffers), Some(index_buffer)) = (
                self.vertex_arrays.get_mut(vertex_array),
                self.index_arrays.get_mut(index_array),
            ) else {
                continue;
            };

            let mut mesh = Mesh {
                vertex_buffers: std::mem::take(vertex_buffers),
                index_buffer: std::mem::take(index_buffer),
            };
            let result = self.optimizer.optimize(&mut mesh);
            *vertex_buffers = mesh.vertex_buffers;
            *index_buffer = mesh.index_buffer;

            result.map_err(BuildError::Optimizer)?;
            let vertex_hash = hash_vertex_streams(&vertex_buffers.streams);

            // the index array is keyed by the submitted indices, which no longer match the reordered vertices
            self.vertex_arrays.rehash(vertex_array, vertex_hash);
            self.index_arrays.retire(index_array);
            optimised += 1;
        }

        debug!("Optimised {} vertex arrays", optimised);
        Ok(optimised)
    }

    /// Builds the batch and publishes the result through [`AssetBatch::status`].
    ///
    /// With a chunk loaded from disk, its pre-merged buffers are uploaded unchanged. Otherwise everything the
    /// active meshes refer to is merged; a supplied chunk then receives the merged buffers, but only once the
    /// build has fully succeeded.
    ///
    /// A failed or cancelled build may be retried, a successful one may not.
    pub fn build(&mut self, chunk: Option<&mut ResourceChunk>, op: &AsyncOperation) -> Result<(), BuildError> {
        if self.is_built() {
            return Err(BuildError::RebuildNotSupported);
        }

        self.status.creating.store(true, Ordering::Release);
        let start = Instant::now();

        let result = match chunk {
            Some(chunk) if chunk.loaded_from_disk() => self.build_from_cache(chunk, op),
            chunk => self.build_merged(chunk, op),
        };

        let gpu_batch = match result {
            Ok(gpu_batch) => gpu_batch,
            Err(err) => {
                self.status.creating.store(false, Ordering::Release);
                return Err(err);
            }
        };

        info!(
            "Built batch of {} draws, {} vertices, {} indices, {} images in {:?}{}",
            gpu_batch.draw_count,
            gpu_batch.vertex_count,
            gpu_batch.index_count,
            gpu_batch.images.len(),
            start.elapsed(),
            if gpu_batch.from_cache { " (from cache)" } else { "" }
        );

        self.status.gpu_batch.store(Some(Arc::new(gpu_batch)));
        self.status.creating.store(false, Ordering::Release);

        for entry in self.images.iter_mut() {
            entry.image = None;
        }

        Ok(())
    }

    fn build_from_cache(&self, chunk: &ResourceChunk, op: &AsyncOperation) -> Result<GpuBatch, BuildError> {
        profiling::scope!("AssetBatch::build_from_cache");

        check_cancelled(op)?;
        let data = BatchData::from_chunk(chunk)?;
        check_cancelled(op)?;
        self.upload(&data, &[], op, true)
    }

    fn build_merged(&self, chunk: Option<&mut ResourceChunk>, op: &AsyncOperation) -> Result<GpuBatch, BuildError> {
        profiling::scope!("AssetBatch::build_merged");

        let active = self.slots.active().map(|(_, slot)| slot).collect_vec();
        if active.is_empty() {
            return Err(BuildError::NothingToBuild);
        }

        let vertex_positions = compact(active.iter().map(|slot| slot.vertex_array));
        let index_positions = compact(active.iter().map(|slot| slot.index_array));
        let image_positions = compact(active.iter().flat_map(|slot| slot.images.iter().flatten().copied()));

        let vertex_inputs = vertex_positions
            .keys()
            .map(|&index| &self.vertex_arrays[index])
            .collect_vec();
        let index_inputs = index_positions
            .keys()
            .map(|&index| self.index_arrays[index].as_slice())
            .collect_vec();
        let image_inputs = image_positions
            .keys()
            .map(|&index| {
                self.images[index]
                    .image
                    .clone()
                    .ok_or_else(|| BuildError::ImageProcessing {
                        label: format!("image {}", index),
                        reason: "The pixel data has already been released".to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let draw_count = active.len();
        let vertex_bytes = vertex_inputs.iter().map(|b| b.byte_size() as u64).sum::<u64>();
        let index_bytes = index_inputs.iter().map(|i| (i.len() * size_of::<u32>()) as u64).sum::<u64>();
        let image_bytes = image_inputs.iter().map(|i| i.byte_size() as u64).sum::<u64>();
        let instance_bytes = (draw_count * size_of::<MeshInstance>()) as u64;
        let indirect_bytes = (draw_count * size_of::<IndirectDrawCommand>()) as u64;
        let bounds_bytes = (draw_count * size_of::<Vec4>()) as u64;

        op.init_stage(
            "Building scene batch",
            vertex_bytes + index_bytes + image_bytes + instance_bytes + indirect_bytes + bounds_bytes,
        );

        check_cancelled(op)?;
        let stage_start = Instant::now();
        op.init_sub_stage("Merging vertex streams", vertex_bytes);
        let merged_vertices = MeshMerger::merge_vertex_buffers(&vertex_inputs);
        op.add_progress(vertex_bytes);
        debug!(
            "Merged {} vertex arrays into {} vertices in {:?}",
            vertex_inputs.len(),
            merged_vertices.vertex_count,
            stage_start.elapsed()
        );

        check_cancelled(op)?;
        op.init_sub_stage("Merging index buffers", index_bytes);
        let merged_indices = MeshMerger::merge_index_buffers(&index_inputs);
        op.add_progress(index_bytes);

        check_cancelled(op)?;
        let stage_start = Instant::now();
        op.init_sub_stage("Processing images", image_bytes);
        let processor = ImageProcessor::new(self.settings, self.compressor.as_deref());
        let processed_images = image_inputs
            .par_iter()
            .map(|image| {
                check_cancelled(op)?;
                let processed = processor.process(image)?;
                op.add_progress(image.byte_size() as u64);
                Ok(processed)
            })
            .collect::<Result<Vec<_>, BuildError>>()?;
        debug!(
            "Processed {} images in {:?}",
            processed_images.len(),
            stage_start.elapsed()
        );

        check_cancelled(op)?;
        op.init_sub_stage("Writing instance data", instance_bytes);
        let instances = active
            .iter()
            .map(|slot| MeshInstance {
                transform: slot.transform,
                base_colour: slot.base_colour,
                images: slot
                    .images
                    .map(|image| image.map_or(NO_IMAGE, |index| image_positions[&index] as u32)),
                _padding: 0,
            })
            .collect_vec();
        op.add_progress(instance_bytes);

        check_cancelled(op)?;
        op.init_sub_stage("Writing draw commands", indirect_bytes);
        let commands = active
            .iter()
            .enumerate()
            .map(|(draw, slot)| IndirectDrawCommand {
                index_count: self.index_arrays[slot.index_array].len() as u32,
                instance_count: 1,
                first_index: merged_indices.first_indices[index_positions[&slot.index_array]],
                vertex_offset: merged_vertices.base_vertices[vertex_positions[&slot.vertex_array]] as i32,
                first_instance: draw as u32,
            })
            .collect_vec();
        op.add_progress(indirect_bytes);

        check_cancelled(op)?;
        op.init_sub_stage("Computing bounds", bounds_bytes);
        let local_bounds = vertex_inputs
            .iter()
            .map(|buffers| local_bounding_sphere(buffers.positions().unwrap_or_default()))
            .collect_vec();
        let bounds = active
            .iter()
            .map(|slot| transform_bounding_sphere(local_bounds[vertex_positions[&slot.vertex_array]], &slot.transform))
            .collect_vec();
        op.add_progress(bounds_bytes);

        let data = BatchData {
            manifest: BatchManifest {
                vertex_count: merged_vertices.vertex_count,
                index_count: merged_indices.indices.len() as u32,
                draw_count: draw_count as u32,
                image_count: processed_images.len() as u32,
            },
            vertex_streams: merged_vertices
                .streams
                .iter()
                .map(|(semantic, bytes)| (*semantic, bytes.as_slice()))
                .collect(),
            indices: bytemuck::cast_slice(&merged_indices.indices),
            instances: bytemuck::cast_slice(&instances),
            indirect: bytemuck::cast_slice(&commands),
            bounds: bytemuck::cast_slice(&bounds),
            images: processed_images
                .iter()
                .map(|image| (image.header, image.data.as_slice()))
                .collect(),
        };

        check_cancelled(op)?;
        let labels = image_inputs.iter().map(|image| image.label()).collect_vec();
        let gpu_batch = self.upload(&data, &labels, op, false)?;

        // a cancelled build must not leave a partial cache behind
        check_cancelled(op)?;
        if let Some(chunk) = chunk {
            data.write_to_chunk(chunk);
            debug!("Recorded the batch into the cache chunk ({} bytes)", data.byte_size());
        }

        Ok(gpu_batch)
    }

    fn upload(
        &self,
        data: &BatchData,
        image_labels: &[&str],
        op: &AsyncOperation,
        from_cache: bool,
    ) -> Result<GpuBatch, BuildError> {
        profiling::scope!("AssetBatch::upload");

        let stage_start = Instant::now();
        op.init_stage("Uploading scene batch", data.byte_size());

        let upload_buffer = |kind: BufferKind, label: &str, bytes: &[u8]| {
            let handle = self.uploader.upload_buffer(kind, label, bytes)?;
            op.add_progress(bytes.len() as u64);
            Ok::<_, BuildError>(handle)
        };

        let vertex_buffers = data
            .vertex_streams
            .iter()
            .map(|(semantic, bytes)| {
                let handle = upload_buffer(
                    BufferKind::Vertex(*semantic),
                    &format!("Batch {:?}", semantic),
                    bytes,
                )?;
                Ok((*semantic, handle))
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        let index_buffer = upload_buffer(BufferKind::Index, "Batch indices", data.indices)?;
        let instance_buffer = upload_buffer(BufferKind::Instance, "Batch instances", data.instances)?;
        let indirect_buffer = upload_buffer(BufferKind::Indirect, "Batch draw commands", data.indirect)?;
        let bounds_buffer = upload_buffer(BufferKind::Bounds, "Batch bounds", data.bounds)?;

        let images = data
            .images
            .iter()
            .enumerate()
            .map(|(index, (header, bytes))| {
                let label = image_labels
                    .get(index)
                    .map(|label| label.to_string())
                    .unwrap_or_else(|| format!("Batch image {}", index));
                let handle = self.uploader.upload_image(header, &label, bytes)?;
                op.add_progress(bytes.len() as u64);
                Ok(handle)
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        if data.manifest.image_count as usize != images.len() {
            warn!(
                "The manifest announces {} images, uploaded {}",
                data.manifest.image_count,
                images.len()
            );
        }

        debug!(
            "Uploaded {} bytes in {:?}",
            data.byte_size(),
            stage_start.elapsed()
        );

        Ok(GpuBatch {
            vertex_buffers,
            index_buffer,
            instance_buffer,
            indirect_buffer,
            bounds_buffer,
            images,
            vertex_count: data.manifest.vertex_count,
            index_count: data.manifest.index_count,
            draw_count: data.manifest.draw_count,
            from_cache,
        })
    }
}

impl MeshSink for AssetBatch {
    fn create_mesh(&mut self, mesh: MeshDescriptor) -> Result<MeshId, BuildError> {
        AssetBatch::create_mesh(self, mesh)
    }
}
