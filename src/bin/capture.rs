// Headless rig capture: discover cameras, start pipelines, capture a
// fixed number of framesets per device, and persist raw buffers plus a
// metadata sidecar into a timestamped session directory.
//
// Usage: rig-capture [name-filter] [framesets-per-device]

use anyhow::Result;
use depthrig::backend::realsense::RealSenseSdk;
use depthrig::{
    capture_images, CaptureSettings, DeviceManager, FrameSet, FrameWriter, StreamConfigTable,
    DEFAULT_WAIT_TIMEOUT,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const STREAM_TABLE_PATH: &str = "streams.toml";

fn main() -> Result<()> {
    depthrig::init_logging();

    let mut args = std::env::args().skip(1);
    let filter = args.next().unwrap_or_default();
    let framesets: u32 = match args.next() {
        Some(raw) => raw.parse()?,
        None => 10,
    };

    let session_dir = PathBuf::from(format!(
        "rig-capture-{}",
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    ));
    let writer = FrameWriter::new(&session_dir)?;

    let manager = DeviceManager::new(
        Box::new(RealSenseSdk::new()?),
        StreamConfigTable::load_from_file(STREAM_TABLE_PATH)?,
    );

    let mut devices = manager.discover(&filter)?;
    manager.start_all(&mut devices, &CaptureSettings::default())?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))?;
    }

    // Early returns below drop the devices, releasing their pipelines
    // through the backend.
    for device in devices.iter_mut() {
        let metadata = manager.extract_metadata(device)?;
        let path = session_dir.join(format!("{}_metadata.json", device.label()));
        std::fs::write(&path, serde_json::to_string_pretty(&metadata)?)?;
    }

    'capture: for cycle in 0..framesets {
        for device in devices.iter_mut() {
            if stop.load(Ordering::Relaxed) {
                log::info!("Interrupted after {} cycles", cycle);
                break 'capture;
            }
            let label = device.label();
            let pipeline = device
                .pipeline_mut()
                .ok_or(depthrig::CameraError::NotStarted {
                    device: label.clone(),
                })?;
            match capture_images(pipeline, &label, DEFAULT_WAIT_TIMEOUT) {
                Ok((color, depth)) => writer.persist(
                    &label,
                    FrameSet {
                        color: Some(color),
                        depth: Some(depth),
                    },
                ),
                Err(e) if e.is_recoverable() => log::warn!("{}", e),
                Err(e) => return Err(e.into()),
            }
        }
    }

    manager.stop_all(&mut devices);
    // Dropping the writer flushes queued disk writes.
    drop(writer);
    log::info!("Session saved under {:?}", session_dir);
    Ok(())
}
