use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use log::{error, info, warn};
use scenepack_files::chunk::ResourceChunk;

use crate::io::cache_file::{cache_path, is_cache_fresh};
use crate::loading::{AsyncOperation, LoadError};
use crate::rendering::batch::AssetBatch;
use crate::rendering::importer::SceneParser;

/// Loads scenes into asset batches on a background thread, one load at a time: cache check, parse, optimise,
/// build and persisting the cache.
pub struct SceneLoader {
    parser: Arc<dyn SceneParser>,
    loading: Arc<AtomicBool>,
}

/// Releases the loader for the next load, whatever way the current one ends.
struct LoadingGuard(Arc<AtomicBool>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn check_cancelled(op: &AsyncOperation) -> Result<(), LoadError> {
    if op.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    Ok(())
}

impl SceneLoader {
    pub fn new(parser: Arc<dyn SceneParser>) -> Self {
        Self {
            parser,
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Starts loading `path` into `batch` and returns right away; the outcome is reported through `op` only.
    ///
    /// While another load of this loader is running, `op` fails immediately. The error returned here only
    /// mirrors that rejection (or `op` having been started before).
    pub fn load_scene(
        &self,
        path: impl Into<PathBuf>,
        batch: Arc<Mutex<AssetBatch>>,
        use_cache: bool,
        op: &Arc<AsyncOperation>,
    ) -> Result<(), LoadError> {
        let path = path.into();

        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejecting {}, another scene is still loading", path.display());
            op.reject("Another scene is still loading");
            return Err(LoadError::Concurrency("Another scene is still loading"));
        }

        let guard = LoadingGuard(self.loading.clone());
        let parser = self.parser.clone();
        let name = format!("Load {}", path.display());

        op.start(&name, move |op| {
            let _guard = guard;
            let start = Instant::now();
            info!("Loading {} (cache {})", path.display(), if use_cache { "enabled" } else { "disabled" });

            let mut batch = batch.lock().unwrap_or_else(PoisonError::into_inner);
            let result = load(parser.as_ref(), &path, &mut batch, use_cache, op);

            match &result {
                Ok(()) => info!("Loaded {} in {:?}", path.display(), start.elapsed()),
                Err(LoadError::Cancelled) => info!("Loading {} has been cancelled", path.display()),
                Err(err) => error!("Loading {} failed: {}", path.display(), err),
            }
            result
        })
    }
}

fn load(
    parser: &dyn SceneParser,
    path: &Path,
    batch: &mut AssetBatch,
    use_cache: bool,
    op: &AsyncOperation,
) -> Result<(), LoadError> {
    profiling::scope!("SceneLoader::load");

    let cache = if use_cache { cache_path(path) } else { None };

    if let Some(cache) = &cache {
        match load_from_cache(path, cache, batch, op) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(LoadError::Cancelled) => return Err(LoadError::Cancelled),
            Err(err) => warn!(
                "Ignoring the cache {}, rebuilding from scratch: {}",
                cache.display(),
                err
            ),
        }
    }

    op.init_stage("Parsing scene", 1);
    parser.parse(path, batch, op).map_err(LoadError::Parse)?;
    check_cancelled(op)?;
    op.add_progress(1);

    op.init_stage("Optimising meshes", 1);
    batch.optimise()?;
    check_cancelled(op)?;
    op.add_progress(1);

    let mut chunk = cache.as_ref().map(|_| ResourceChunk::new());
    batch.build(chunk.as_mut(), op)?;

    if let (Some(cache), Some(chunk)) = (&cache, &chunk) {
        // the load itself has succeeded at this point
        if let Err(err) = chunk.write_to_file(cache) {
            warn!("Failed to write the cache {}: {}", cache.display(), err);
        }
    }

    Ok(())
}

/// Returns `Ok(false)` when there is no usable cache to begin with.
fn load_from_cache(
    source: &Path,
    cache: &Path,
    batch: &mut AssetBatch,
    op: &AsyncOperation,
) -> Result<bool, LoadError> {
    if !is_cache_fresh(source, cache)? {
        info!("No fresh cache at {}", cache.display());
        return Ok(false);
    }

    op.init_stage("Reading cache", 1);
    let mut chunk = ResourceChunk::from_file(cache)?;
    op.add_progress(1);
    check_cancelled(op)?;

    batch.build(Some(&mut chunk), op)?;
    Ok(true)
}
