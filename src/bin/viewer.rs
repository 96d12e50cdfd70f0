// Interactive rig viewer: discover cameras, start pipelines, preview in
// per-device windows, save snapshots with 's', exit with 'q'/Esc.
//
// Usage: rig-viewer [name-filter]

use anyhow::Result;
use depthrig::backend::realsense::RealSenseSdk;
use depthrig::viewer::{run_event_loop, CameraView, ViewerOptions};
use depthrig::{CaptureSettings, Device, DeviceManager, StreamConfigTable, DEFAULT_RESET_SETTLE};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const STREAM_TABLE_PATH: &str = "streams.toml";

fn main() -> Result<()> {
    depthrig::init_logging();

    let filter = std::env::args().nth(1).unwrap_or_default();
    let save_dir = PathBuf::from("rig-snapshots");
    std::fs::create_dir_all(&save_dir)?;

    let mut manager = DeviceManager::new(
        Box::new(RealSenseSdk::new()?),
        StreamConfigTable::load_from_file(STREAM_TABLE_PATH)?,
    );
    let settings = CaptureSettings::default();

    // The USB connection on these devices is unreliable; reset everything
    // up front, then enumerate again once the bus has settled.
    let devices = manager.discover(&filter)?;
    manager.hardware_reset(&devices, DEFAULT_RESET_SETTLE)?;
    manager.refresh()?;
    let mut devices = manager.discover(&filter)?;

    manager.start_all(&mut devices, &settings)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))?;
    }

    // Any early return below drops the devices, which releases their
    // pipelines through the backend.
    for device in devices.iter_mut() {
        manager.extract_metadata(device)?;
    }

    let options = ViewerOptions::new(&save_dir);
    let mut views = Vec::with_capacity(devices.len());
    for device in devices {
        views.push(CameraView::open(device, options.clone())?);
    }

    run_event_loop(&mut views, &stop);

    let mut devices: Vec<Device> = views.into_iter().map(CameraView::into_device).collect();
    manager.stop_all(&mut devices);
    Ok(())
}
