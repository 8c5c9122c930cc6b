pub mod scene_loader;

pub use scene_loader::SceneLoader;
