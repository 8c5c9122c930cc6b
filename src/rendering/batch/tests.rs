use std::sync::Arc;
use std::sync::mpsc::channel;

use anyhow::bail;
use glam::{Mat4, Vec2, Vec3, Vec4};
use scenepack_files::chunk::ResourceChunk;
use scenepack_files::chunk::types::VertexSemantic;

use crate::loading::AsyncOperation;
use crate::rendering::batch::cache::BatchData;
use crate::rendering::batch::records::{IndirectDrawCommand, MeshInstance, NO_IMAGE};
use crate::rendering::batch::{AssetBatch, BuildError, MeshDescriptor, MeshId};
use crate::rendering::common::types::{ImageUsage, Mesh, SourceImage, VertexStream};
use crate::rendering::gpu::{HeadlessUploader, UploadRecord};
use crate::rendering::optimizer::{MeshOptimizer, NoopOptimizer};

fn quad(offset: f32) -> MeshDescriptor {
    let positions = vec![
        Vec3::new(offset, 0.0, 0.0),
        Vec3::new(offset + 1.0, 0.0, 0.0),
        Vec3::new(offset + 1.0, 1.0, 0.0),
        Vec3::new(offset, 1.0, 0.0),
    ];
    let tex_coords = vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
    MeshDescriptor::new(
        vec![VertexStream::Positions(positions), VertexStream::TexCoords(tex_coords)],
        vec![0, 1, 2, 0, 2, 3],
    )
}

fn triangle() -> MeshDescriptor {
    MeshDescriptor::new(
        vec![VertexStream::Positions(vec![Vec3::ZERO, Vec3::X, Vec3::Y])],
        vec![0, 1, 2],
    )
}

fn checker(usage: ImageUsage) -> Arc<SourceImage> {
    Arc::new(SourceImage {
        label: Some("checker".to_string()),
        width: 2,
        height: 2,
        srgb: usage == ImageUsage::Diffuse,
        usage,
        pixels: [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255], [255, 255, 255, 255]].concat(),
    })
}

fn batch(uploader: &Arc<HeadlessUploader>) -> AssetBatch {
    AssetBatch::new(uploader.clone()).with_optimizer(Arc::new(NoopOptimizer))
}

fn buffer_contents(uploads: &[UploadRecord]) -> Vec<Vec<u8>> {
    uploads
        .iter()
        .map(|upload| upload.contents().unwrap_or_default().to_vec())
        .collect()
}

fn read<T: bytemuck::Pod>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

fn reload(chunk: &ResourceChunk) -> anyhow::Result<ResourceChunk> {
    let mut loaded = ResourceChunk::new();
    loaded.parse_bytes(chunk.to_bytes()?)?;
    Ok(loaded)
}

#[test]
fn identical_submissions_share_their_arrays() -> anyhow::Result<()> {
    let uploader = Arc::new(HeadlessUploader::new());
    let mut batch = batch(&uploader);

    let first = batch.create_mesh(quad(0.0))?;
    let second = batch.create_mesh(quad(0.0).with_transform(Mat4::from_translation(Vec3::Z)))?;
    assert_ne!(first, second);

    assert_eq!(batch.mesh_count(), 2);
    assert_eq!(batch.vertex_array_count(), 1);
    assert_eq!(batch.index_array_count(), 1);

    let (Some(first), Some(second)) = (batch.mesh(first), batch.mesh(second)) else {
        bail!("Both meshes have to exist");
    };
    assert_eq!(first.vertex_array, second.vertex_array);
    assert_eq!(first.index_array, second.index_array);
    assert_ne!(first.transform, second.transform);
    Ok(())
}

#[test]
fn stream_order_does_not_matter() -> anyhow::Result<()> {
    let uploader = Arc::new(HeadlessUploader::new());
    let mut batch = batch(&uploader);

    let mut reversed = quad(0.0);
    reversed.vertex_streams.reverse();

    batch.create_mesh(quad(0.0))?;
    batch.create_mesh(reversed)?;
    assert_eq!(batch.vertex_array_count(), 1);
    Ok(())
}

#[test]
fn mirrored_indices_are_stored_separately() -> anyhow::Result<()> {
    let uploader = Arc::new(HeadlessUploader::new());
    let mut batch = batch(&uploader);

    let plain = batch.create_mesh(quad(0.0))?;
    let mirrored = batch.create_mesh(quad(0.0).mirrored(true))?;
    assert_eq!(batch.vertex_array_count(), 1);
    assert_eq!(batch.index_array_count(), 2);

    let index_array = batch.mesh(mirrored).map(|slot| slot.index_array);
    assert_eq!(
        index_array.and_then(|index| batch.index_array(index)),
        Some(&[0, 2, 1, 0, 3, 2][..])
    );
    assert_ne!(batch.mesh(plain).map(|slot| slot.index_array), index_array);
    Ok(())
}

#[test]
fn images_are_deduplicated_per_usage() -> anyhow::Result<()> {
    let uploader = Arc::new(HeadlessUploader::new());
    let mut batch = batch(&uploader);

    let a = batch.create_mesh(quad(0.0).with_diffuse(checker(ImageUsage::Diffuse)))?;
    let b = batch.create_mesh(quad(1.0).with_diffuse(checker(ImageUsage::Diffuse)))?;
    let c = batch.create_mesh(quad(2.0).with_normal(checker(ImageUsage::Normal)))?;
    assert_eq!(batch.image_count(), 2);

    let images = |id: MeshId| batch.mesh(id).map(|slot| slot.images);
    assert_eq!(images(a), Some([Some(0), None, None]));
    assert_eq!(images(b), Some([Some(0), None, None]));
    assert_eq!(images(c), Some([None, Some(1), None]));
    Ok(())
}

#[test]
fn invalid_submissions_allocate_nothing() -> anyhow::Result<()> {
    let uploader = Arc::new(HeadlessUploader::new());
    let mut batch = batch(&uploader);

    let first = batch.create_mesh(triangle())?;
    batch.destroy_mesh(first)?;
    assert_eq!(batch.recycled_slot_count(), 1);

    let empty = MeshDescriptor::new(vec![], vec![0, 1, 2]);
    assert!(matches!(batch.create_mesh(empty), Err(BuildError::EmptyVertexStreams)));

    let no_vertices = MeshDescriptor::new(vec![VertexStream::Positions(vec![])], vec![0, 1, 2]);
    assert!(matches!(
        batch.create_mesh(no_vertices),
        Err(BuildError::EmptyVertexStreams)
    ));

    let mut mismatched = triangle();
    mismatched.vertex_streams.push(VertexStream::Normals(vec![Vec3::Z; 2]));
    assert!(matches!(
        batch.create_mesh(mismatched),
        Err(BuildError::MismatchedStreamLength {
            semantic: VertexSemantic::Normals,
            expected: 3,
            actual: 2
        })
    ));

    let mut duplicate = triangle();
    duplicate.vertex_streams.push(VertexStream::Positions(vec![Vec3::ONE; 3]));
    assert!(matches!(
        batch.create_mesh(duplicate),
        Err(BuildError::DuplicateSemantic {
            semantic: VertexSemantic::Positions
        })
    ));

    let mut out_of_range = triangle();
    out_of_range.indices = vec![0, 1, 3];
    assert!(matches!(
        batch.create_mesh(out_of_range),
        Err(BuildError::IndexOutOfRange { index: 3, vertex_count: 3 })
    ));

    let mut not_triangles = triangle();
    not_triangles.indices = vec![0, 1];
    assert!(matches!(
        batch.create_mesh(not_triangles),
        Err(BuildError::InvalidIndexCount { count: 2 })
    ));

    let broken_image = Arc::new(SourceImage {
        pixels: vec![0; 3],
        ..(*checker(ImageUsage::Diffuse)).clone()
    });
    assert!(matches!(
        batch.create_mesh(triangle().with_diffuse(broken_image)),
        Err(BuildError::InvalidImage { expected: 16, actual: 3, .. })
    ));

    assert_eq!(batch.recycled_slot_count(), 1);
    assert_eq!(batch.slot_capacity(), 1);
    assert_eq!(batch.mesh_count(), 0);
    assert_eq!(batch.vertex_array_count(), 1);
    assert_eq!(batch.index_array_count(), 1);
    assert_eq!(batch.image_count(), 0);
    Ok(())
}

#[test]
fn destroyed_ids_are_recycled() -> anyhow::Result<()> {
    let uploader = Arc::new(HeadlessUploader::new());
    let mut batch = batch(&uploader);

    let ids = (0..3)
        .map(|i| batch.create_mesh(quad(i as f32)))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(ids, vec![MeshId(0), MeshId(1), MeshId(2)]);

    batch.destroy_mesh(MeshId(1))?;
    assert!(batch.mesh(MeshId(1)).is_none());
    assert!(matches!(
        batch.destroy_mesh(MeshId(1)),
        Err(BuildError::UnknownMesh(MeshId(1)))
    ));
    assert!(matches!(
        batch.destroy_mesh(MeshId(17)),
        Err(BuildError::UnknownMesh(MeshId(17)))
    ));

    assert_eq!(batch.create_mesh(triangle())?, MeshId(1));
    assert_eq!(batch.create_mesh(triangle())?, MeshId(3));
    Ok(())
}

struct CountingOptimizer(std::sync::Mutex<usize>);

impl MeshOptimizer for CountingOptimizer {
    fn optimize(&self, _mesh: &mut Mesh) -> anyhow::Result<()> {
        *self.0.lock().unwrap() += 1;
        Ok(())
    }
}

struct FailingOptimizer;

impl MeshOptimizer for FailingOptimizer {
    fn optimize(&self, mesh: &mut Mesh) -> anyhow::Result<()> {
        bail!("Refusing to touch {} indices", mesh.index_buffer.len())
    }
}

/// Reverses the vertex order, so every optimised array differs from what has been submitted.
struct ReversingOptimizer;

impl MeshOptimizer for ReversingOptimizer {
    fn optimize(&self, mesh: &mut Mesh) -> anyhow::Result<()> {
        let count = mesh.vertex_buffers.vertex_count() as u32;
        let order = (0..count).rev().collect::<Vec<_>>();
        for stream in &mut mesh.vertex_buffers.streams {
            stream.remap(&order);
        }
        for index in &mut mesh.index_buffer {
            *index = count - 1 - *index;
        }
        Ok(())
    }
}

fn corners(batch: &AssetBatch, id: MeshId) -> anyhow::Result<Vec<[i32; 3]>> {
    let Some(slot) = batch.mesh(id) else { bail!("The mesh has to exist") };
    let (Some(buffers), Some(indices)) = (batch.vertex_array(slot.vertex_array), batch.index_array(slot.index_array))
    else {
        bail!("The arrays have to exist");
    };
    let positions = buffers.positions().unwrap_or_default();
    Ok(indices
        .iter()
        .map(|&i| positions[i as usize].to_array().map(|c| c as i32))
        .collect())
}

#[test]
fn optimise_needs_vertex_arrays() {
    let mut batch = AssetBatch::new(Arc::new(HeadlessUploader::new()));
    assert!(matches!(batch.optimise(), Err(BuildError::NoVertexArrays)));
}

#[test]
fn optimise_skips_shared_arrays() -> anyhow::Result<()> {
    let optimizer = Arc::new(CountingOptimizer(Default::default()));
    let mut batch = AssetBatch::new(Arc::new(HeadlessUploader::new())).with_optimizer(optimizer.clone());

    // same vertices, two different index arrays
    batch.create_mesh(quad(0.0))?;
    batch.create_mesh(quad(0.0).mirrored(true))?;
    // different vertices, but sharing the index array of the first quad
    batch.create_mesh(quad(5.0))?;
    // exclusive pair
    batch.create_mesh(triangle())?;

    assert_eq!(batch.optimise()?, 1);
    assert_eq!(*optimizer.0.lock().unwrap(), 1);

    // only arrays created since the last call are considered
    assert_eq!(batch.optimise()?, 0);
    batch.create_mesh(MeshDescriptor::new(
        vec![VertexStream::Positions(vec![Vec3::ONE, Vec3::Z, Vec3::X])],
        vec![2, 1, 0],
    ))?;
    assert_eq!(batch.optimise()?, 1);
    Ok(())
}

#[test]
fn submissions_after_optimise_keep_their_triangles() -> anyhow::Result<()> {
    let mut batch = AssetBatch::new(Arc::new(HeadlessUploader::new())).with_optimizer(Arc::new(ReversingOptimizer));
    let optimised = batch.create_mesh(quad(0.0))?;
    assert_eq!(batch.optimise()?, 1);

    // the original vertices again, with indices the optimised array has not been remapped for
    let later = batch.create_mesh(MeshDescriptor::new(quad(0.0).vertex_streams, vec![0, 1, 3]))?;
    assert_eq!(corners(&batch, later)?, vec![[0, 0, 0], [1, 0, 0], [0, 1, 0]]);
    assert_eq!(
        corners(&batch, optimised)?,
        vec![[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 0, 0], [1, 1, 0], [0, 1, 0]]
    );

    // the original indices with other vertices must not pick up the remapped index array
    let other = batch.create_mesh(quad(5.0))?;
    assert_eq!(
        corners(&batch, other)?,
        vec![[5, 0, 0], [6, 0, 0], [6, 1, 0], [5, 0, 0], [6, 1, 0], [5, 1, 0]]
    );
    assert_eq!(batch.vertex_array_count(), 3);
    Ok(())
}

#[test]
fn optimised_content_is_deduplicated() -> anyhow::Result<()> {
    let mut batch = AssetBatch::new(Arc::new(HeadlessUploader::new())).with_optimizer(Arc::new(ReversingOptimizer));
    let optimised = batch.create_mesh(quad(0.0))?;
    batch.optimise()?;

    let Some(slot) = batch.mesh(optimised).cloned() else { bail!("The mesh has to exist") };
    let Some(buffers) = batch.vertex_array(slot.vertex_array).cloned() else { bail!("The array has to exist") };

    let resubmitted = batch.create_mesh(MeshDescriptor::new(buffers.streams, vec![0, 1, 2]))?;
    assert_eq!(batch.mesh(resubmitted).map(|slot| slot.vertex_array), Some(slot.vertex_array));
    assert_eq!(batch.vertex_array_count(), 1);
    Ok(())
}

#[test]
fn optimise_failure_keeps_the_mesh() -> anyhow::Result<()> {
    let mut batch = AssetBatch::new(Arc::new(HeadlessUploader::new())).with_optimizer(Arc::new(FailingOptimizer));
    let id = batch.create_mesh(quad(0.0))?;

    assert!(matches!(batch.optimise(), Err(BuildError::Optimizer(_))));

    let slot = batch.mesh(id).cloned();
    let Some(slot) = slot else { bail!("The mesh has to survive") };
    assert_eq!(batch.index_array(slot.index_array), Some(&[0, 1, 2, 0, 2, 3][..]));
    assert_eq!(
        batch.vertex_array(slot.vertex_array).map(|buffers| buffers.vertex_count()),
        Some(4)
    );
    Ok(())
}

#[test]
fn default_optimizer_keeps_the_triangles() -> anyhow::Result<()> {
    let mut batch = AssetBatch::new(Arc::new(HeadlessUploader::new()));
    let id = batch.create_mesh(quad(0.0))?;
    assert_eq!(batch.optimise()?, 1);

    let Some(slot) = batch.mesh(id).cloned() else { bail!("The mesh has to exist") };
    let (Some(buffers), Some(indices)) = (batch.vertex_array(slot.vertex_array), batch.index_array(slot.index_array))
    else {
        bail!("The arrays have to exist");
    };
    let positions = buffers.positions().unwrap_or_default();
    let mut corners = indices.iter().map(|&i| positions[i as usize].to_array().map(|c| c as i32)).collect::<Vec<_>>();
    corners.sort();
    let mut expected = [0, 1, 2, 0, 2, 3]
        .iter()
        .map(|&i| [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]][i])
        .collect::<Vec<_>>();
    expected.sort();
    assert_eq!(corners, expected);
    Ok(())
}

#[test]
fn build_merges_the_active_meshes() -> anyhow::Result<()> {
    let uploader = Arc::new(HeadlessUploader::new().with_contents());
    let mut batch = batch(&uploader);
    let status = batch.status();
    assert!(status.is_creating());
    assert!(!status.is_draw_safe());

    batch.create_mesh(quad(0.0).with_diffuse(checker(ImageUsage::Diffuse)))?;
    let dropped = batch.create_mesh(quad(7.0))?;
    batch.create_mesh(triangle().with_transform(Mat4::from_translation(Vec3::X * 10.0)))?;
    batch.create_mesh(quad(0.0).with_base_colour(Vec4::new(1.0, 0.0, 0.0, 1.0)))?;
    batch.destroy_mesh(dropped)?;

    let mut chunk = ResourceChunk::new();
    batch.build(Some(&mut chunk), &AsyncOperation::new())?;

    assert!(status.is_draw_safe());
    let Some(gpu_batch) = status.gpu_batch() else { bail!("The batch has to be published") };
    assert!(!gpu_batch.from_cache);
    assert_eq!(gpu_batch.draw_count, 3);
    // the quad at 7.0 is not referenced anymore; the triangle has no tex coords, which get zero filled
    assert_eq!(gpu_batch.vertex_count, 4 + 3);
    assert_eq!(gpu_batch.index_count, 6 + 3);
    assert_eq!(gpu_batch.images.len(), 1);
    assert_eq!(gpu_batch.vertex_buffers.len(), 2);

    let data = BatchData::from_chunk(&chunk)?;
    let commands = read::<IndirectDrawCommand>(data.indirect);
    assert_eq!(
        commands,
        vec![
            IndirectDrawCommand {
                index_count: 6,
                instance_count: 1,
                first_index: 0,
                vertex_offset: 0,
                first_instance: 0,
            },
            IndirectDrawCommand {
                index_count: 3,
                instance_count: 1,
                first_index: 6,
                vertex_offset: 4,
                first_instance: 1,
            },
            IndirectDrawCommand {
                index_count: 6,
                instance_count: 1,
                first_index: 0,
                vertex_offset: 0,
                first_instance: 2,
            },
        ]
    );

    let instances = read::<MeshInstance>(data.instances);
    assert_eq!(instances[0].images, [0, NO_IMAGE, NO_IMAGE]);
    assert_eq!(instances[1].images, [NO_IMAGE; 3]);
    assert_eq!(instances[2].base_colour, Vec4::new(1.0, 0.0, 0.0, 1.0));

    let bounds = read::<Vec4>(data.bounds);
    assert!(bounds[1].x > 10.0);

    // pixel data is released once uploaded
    assert!(batch.image(0).is_none());
    Ok(())
}

#[test]
fn cached_build_uploads_the_same_bytes() -> anyhow::Result<()> {
    let fresh_uploader = Arc::new(HeadlessUploader::new().with_contents());
    let mut fresh = batch(&fresh_uploader);
    fresh.create_mesh(quad(0.0).with_diffuse(checker(ImageUsage::Diffuse)))?;
    fresh.create_mesh(triangle().with_normal(checker(ImageUsage::Normal)))?;

    let mut chunk = ResourceChunk::new();
    fresh.build(Some(&mut chunk), &AsyncOperation::new())?;
    assert!(!chunk.is_empty());

    let loaded = reload(&chunk)?;
    assert!(loaded.loaded_from_disk());

    let cached_uploader = Arc::new(HeadlessUploader::new().with_contents());
    let mut cached = batch(&cached_uploader);
    let mut loaded = loaded;
    cached.build(Some(&mut loaded), &AsyncOperation::new())?;

    let Some(gpu_batch) = cached.gpu_batch() else { bail!("The cached batch has to be published") };
    assert!(gpu_batch.from_cache);
    assert_eq!(gpu_batch.draw_count, 2);
    assert_eq!(
        buffer_contents(&cached_uploader.uploads()),
        buffer_contents(&fresh_uploader.uploads())
    );
    Ok(())
}

#[test]
fn corrupt_cache_is_rejected_before_uploading() -> anyhow::Result<()> {
    let mut chunk = ResourceChunk::new();
    let mut fresh = batch(&Arc::new(HeadlessUploader::new()));
    fresh.create_mesh(quad(0.0))?;
    fresh.build(Some(&mut chunk), &AsyncOperation::new())?;

    // truncate the index buffer
    let indices = chunk.get_generic(1).map(|bytes| bytes[..4].to_vec()).unwrap_or_default();
    chunk.set_generic(1, &indices);
    let mut loaded = reload(&chunk)?;

    let uploader = Arc::new(HeadlessUploader::new());
    let mut cached = batch(&uploader);
    assert!(matches!(
        cached.build(Some(&mut loaded), &AsyncOperation::new()),
        Err(BuildError::CorruptCache(_))
    ));
    assert_eq!(uploader.upload_count(), 0);
    assert!(!cached.status().is_creating());
    Ok(())
}

#[test]
fn nothing_to_build() -> anyhow::Result<()> {
    let mut batch = batch(&Arc::new(HeadlessUploader::new()));
    assert!(matches!(
        batch.build(None, &AsyncOperation::new()),
        Err(BuildError::NothingToBuild)
    ));

    let id = batch.create_mesh(triangle())?;
    batch.destroy_mesh(id)?;
    assert!(matches!(
        batch.build(None, &AsyncOperation::new()),
        Err(BuildError::NothingToBuild)
    ));
    assert!(!batch.status().is_creating());
    Ok(())
}

#[test]
fn rebuild_is_refused() -> anyhow::Result<()> {
    let uploader = Arc::new(HeadlessUploader::new());
    let mut batch = batch(&uploader);
    batch.create_mesh(triangle())?;
    batch.build(None, &AsyncOperation::new())?;
    let uploads = uploader.upload_count();

    assert!(matches!(
        batch.build(None, &AsyncOperation::new()),
        Err(BuildError::RebuildNotSupported)
    ));
    assert_eq!(uploader.upload_count(), uploads);
    assert!(batch.status().is_draw_safe());
    Ok(())
}

#[test]
fn gpu_failure_fails_the_build() -> anyhow::Result<()> {
    let uploader = Arc::new(HeadlessUploader::new().with_failure_after(2));
    let mut batch = batch(&uploader);
    batch.create_mesh(quad(0.0))?;

    let mut chunk = ResourceChunk::new();
    assert!(matches!(
        batch.build(Some(&mut chunk), &AsyncOperation::new()),
        Err(BuildError::Gpu(_))
    ));
    assert!(chunk.is_empty());
    assert!(!batch.status().is_creating());
    assert!(batch.gpu_batch().is_none());
    assert!(!batch.is_built());
    Ok(())
}

#[test]
fn cancelled_build_leaves_no_cache() -> anyhow::Result<()> {
    let uploader = Arc::new(HeadlessUploader::new());
    let mut batch = batch(&uploader);
    batch.create_mesh(quad(0.0))?;

    let (tx, rx) = channel();
    let op = Arc::new(AsyncOperation::new());
    op.start("cancelled build", move |op| {
        op.request_cancel();
        let mut chunk = ResourceChunk::new();
        let result = batch.build(Some(&mut chunk), op);
        let _ = tx.send((result.map_err(|e| e.to_string()), chunk.is_empty(), batch.status().is_creating()));
        Ok(())
    })?;
    op.wait();

    let (result, chunk_empty, creating) = rx.recv()?;
    assert_eq!(result, Err(BuildError::Cancelled.to_string()));
    assert!(chunk_empty);
    assert!(!creating);
    assert_eq!(uploader.upload_count(), 0);
    Ok(())
}
