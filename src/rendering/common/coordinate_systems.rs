use std::f32::consts::PI;

use glam::{EulerRot, Mat4, Vec3};

/// glTF is RH, Up: +Y, Forward: +Z. Our convention is "blender" (RH, Up: +Z, North being +Y)
#[inline]
pub fn gltf_to_blender(source: Vec3) -> Vec3 {
    Vec3::new(source.x, -source.z, source.y)
}

#[inline]
pub fn gltf_to_blender_rot() -> Mat4 {
    // flip 90 degrees around the X axis
    Mat4::from_euler(EulerRot::XYZ, 0.5 * PI, 0.0, 0.0)
}

/// A transform with a negative determinant flips handedness, which turns front faces into back faces unless the
/// triangle winding is mirrored as well.
#[inline]
pub fn flips_handedness(transform: &Mat4) -> bool {
    transform.determinant() < 0.0
}

/// The largest scale factor along any axis, which is what a bounding sphere's radius grows by.
#[inline]
pub fn max_axis_scale(transform: &Mat4) -> f32 {
    transform
        .x_axis
        .truncate()
        .length()
        .max(transform.y_axis.truncate().length())
        .max(transform.z_axis.truncate().length())
}
