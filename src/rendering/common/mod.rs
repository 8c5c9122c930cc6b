/// Source formats come with their own axis conventions, and so we regularly need to transform between them.
/// The convention that we want to use is "blender" (RHS, Z Up, North being +Y)
pub mod coordinate_systems;
pub mod mesh_merger;
/// basic types (e.g. mesh) to abstract away from both the asset format and the render backend.
pub mod types;
