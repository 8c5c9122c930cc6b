//! Turns parsed 3D scenes into deduplicated, GPU ready buffers on a background thread, with an on-disk cache that
//! lets later loads skip the rebuild.

pub mod io;
pub mod loading;
pub mod rendering;
pub mod scene;
pub mod settings;
