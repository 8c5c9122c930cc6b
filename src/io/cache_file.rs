use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::trace;

pub const CACHE_EXTENSION: &str = "chunk";

/// The cache sibling of a scene file: `scene.gltf` caches to `scene.gltf.chunk` in the same directory.
pub fn cache_path(source: &Path) -> Option<PathBuf> {
    let file_name = source.file_name()?.to_str()?;
    Some(source.with_file_name(format!("{}.{}", file_name, CACHE_EXTENSION)))
}

/// A cache is fresh when it exists and is not older than its source. A missing cache is simply not fresh, a
/// missing source is an error.
pub fn is_cache_fresh(source: &Path, cache: &Path) -> Result<bool, std::io::Error> {
    let source_modified = fs::metadata(source)?.modified()?;
    let cache_modified = match fs::metadata(cache) {
        Ok(metadata) => metadata.modified()?,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            trace!("There is no cache at {}", cache.display());
            return Ok(false);
        }
        Err(err) => return Err(err),
    };

    Ok(cache_modified >= source_modified)
}
