use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::bail;
use clap::Parser;
use log::{info, trace};

use scenepack::loading::{AsyncOperation, OperationState};
use scenepack::rendering::batch::AssetBatch;
use scenepack::rendering::gpu::HeadlessUploader;
use scenepack::rendering::importer::gltf_importer::GltfImporter;
use scenepack::scene::SceneLoader;
use scenepack::settings::{BuildSettings, CliArgs, ImportSettings};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = CliArgs::parse();
    trace!("Starting with args: {:?}", args);

    // There is no device here, the headless uploader only accounts for what would have been uploaded.
    let uploader = Arc::new(HeadlessUploader::new());
    let batch = AssetBatch::new(uploader.clone()).with_settings(BuildSettings::from(&args));
    let status = batch.status();
    let batch = Arc::new(Mutex::new(batch));

    let loader = SceneLoader::new(Arc::new(GltfImporter::new(ImportSettings::from(&args))));
    let op = Arc::new(AsyncOperation::new());
    loader.load_scene(&args.scene, batch.clone(), !args.no_cache, &op)?;

    let start = Instant::now();
    let poll_interval = Duration::from_millis(args.poll_interval_ms.max(1));
    let cancel_after = args.cancel_after_ms.map(Duration::from_millis);

    while !op.state().is_terminal() {
        std::thread::sleep(poll_interval);

        let snapshot = op.snapshot();
        info!(
            "{} {:>5.1}% | {} {:>5.1}%",
            snapshot.stage_label,
            snapshot.progress * 100.0,
            snapshot.sub_stage_label,
            snapshot.sub_progress * 100.0
        );

        if cancel_after.is_some_and(|after| start.elapsed() >= after) {
            info!("Cancelling after {:?}", start.elapsed());
            op.request_cancel();
        }
    }

    let state = op.wait();
    match state {
        OperationState::Completed => {}
        OperationState::Cancelled => {
            info!("The load has been cancelled");
            return Ok(());
        }
        other => bail!(
            "The load ended as {:?}: {}",
            other,
            op.failure_reason().unwrap_or_default()
        ),
    }

    let Some(gpu_batch) = status.gpu_batch() else {
        bail!("The load completed without publishing a batch");
    };

    let batch = batch.lock().unwrap_or_else(PoisonError::into_inner);
    info!(
        "{} meshes ({} unique vertex arrays, {} unique index arrays, {} unique images) in {} draws{}",
        batch.mesh_count(),
        batch.vertex_array_count(),
        batch.index_array_count(),
        batch.image_count(),
        gpu_batch.draw_count,
        if gpu_batch.from_cache { ", from cache" } else { "" }
    );
    info!(
        "{} vertices, {} indices, {} images, {} uploads totalling {} bytes in {:?}",
        gpu_batch.vertex_count,
        gpu_batch.index_count,
        gpu_batch.images.len(),
        uploader.upload_count(),
        uploader.uploaded_bytes(),
        start.elapsed()
    );

    Ok(())
}
