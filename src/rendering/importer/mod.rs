use std::path::Path;

use crate::loading::AsyncOperation;
use crate::rendering::batch::MeshSink;

/// Turns a scene file into mesh submissions. Parsers should return early (successfully) once `op` has been
/// cancelled, the caller checks for cancellation after parsing.
pub trait SceneParser: Send + Sync {
    fn parse(&self, path: &Path, sink: &mut dyn MeshSink, op: &AsyncOperation) -> anyhow::Result<()>;
}

pub mod gltf_importer;
