//! The fixed-layout records that end up in GPU buffers and, unchanged, in the cache chunk.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::rendering::common::coordinate_systems::max_axis_scale;

/// Marks an absent image in [`MeshInstance::images`].
pub const NO_IMAGE: u32 = u32::MAX;

/// Per draw data, indexed by the draw's `first_instance`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MeshInstance {
    pub transform: Mat4,
    pub base_colour: Vec4,
    /// diffuse, normal, metallic-roughness; indices into the batch's image list or [`NO_IMAGE`]
    pub images: [u32; 3],
    pub _padding: u32,
}

/// Laid out like `VkDrawIndexedIndirectCommand` / wgpu's `DrawIndexedIndirectArgs`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct IndirectDrawCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

/// Sizes of the merged buffers, stored alongside them so a cache chunk can be validated before anything is
/// uploaded.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct BatchManifest {
    pub vertex_count: u32,
    pub index_count: u32,
    pub draw_count: u32,
    pub image_count: u32,
}

/// Center in xyz, radius in w.
pub type BoundingSphere = Vec4;

/// The centroid of `positions` and the distance to the farthest of them, in object space.
pub fn local_bounding_sphere(positions: &[Vec3]) -> BoundingSphere {
    if positions.is_empty() {
        return BoundingSphere::ZERO;
    }

    let centroid = positions.iter().copied().sum::<Vec3>() / positions.len() as f32;
    let max_distance_squared = positions
        .iter()
        .map(|position| position.distance_squared(centroid))
        .fold(0.0f32, f32::max);

    centroid.extend(max_distance_squared.sqrt())
}

/// Moves the sphere into world space. Non-uniform scale grows it by the largest axis scale, so it stays
/// conservative.
pub fn transform_bounding_sphere(sphere: BoundingSphere, transform: &Mat4) -> BoundingSphere {
    let center = transform.transform_point3(sphere.truncate());
    center.extend(sphere.w * max_axis_scale(transform))
}
