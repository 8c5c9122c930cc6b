use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "scenepack")]
#[command(version)]
#[command(about = "Builds a glTF scene into GPU ready, deduplicated buffers and caches the result")]
pub struct CliArgs {
    /// The glTF (.gltf/.glb) scene to load. The cache is stored next to it as `<file name>.chunk`.
    #[arg(env = "SCENEPACK_SCENE")]
    pub scene: PathBuf,

    /// Neither read nor write the cache chunk.
    #[arg(long, env = "SCENEPACK_NO_CACHE")]
    pub no_cache: bool,

    /// Upload images without generating mip chains.
    #[arg(long, env = "SCENEPACK_NO_MIPS")]
    pub no_mips: bool,

    /// Mirror the triangle winding of every mesh, e.g. when the target renderer uses the opposite handedness.
    #[arg(long, env = "SCENEPACK_MIRROR_WINDING")]
    pub mirror_winding: bool,

    /// Rotate the scene from glTF's Y up into our Z up convention.
    #[arg(long, env = "SCENEPACK_Z_UP")]
    pub z_up: bool,

    #[arg(long, default_value_t = 100, env = "SCENEPACK_POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,

    /// Request cancellation of the load after this many milliseconds.
    #[arg(long, env = "SCENEPACK_CANCEL_AFTER_MS")]
    pub cancel_after_ms: Option<u64>,
}

/// Knobs of [`crate::rendering::batch::AssetBatch::build`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Generate the full mip chain of every image.
    pub generate_mips: bool,
    /// Hand images to the block compressor, if one is installed.
    pub block_compression: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            generate_mips: true,
            block_compression: true,
        }
    }
}

impl From<&CliArgs> for BuildSettings {
    fn from(args: &CliArgs) -> Self {
        Self {
            generate_mips: !args.no_mips,
            ..Default::default()
        }
    }
}

/// Knobs of the scene importer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ImportSettings {
    pub mirror_winding: bool,
    pub z_up: bool,
}

impl From<&CliArgs> for ImportSettings {
    fn from(args: &CliArgs) -> Self {
        Self {
            mirror_winding: args.mirror_winding,
            z_up: args.z_up,
        }
    }
}
