//! Capture-loop behavior: recoverable misses and raw persistence.

use depthrig::testing::{FrameBehavior, SyntheticSdk};
use depthrig::{
    capture_images, CameraError, CaptureSettings, DeviceManager, FrameSet, FrameWriter,
    StreamConfigTable, DEFAULT_WAIT_TIMEOUT,
};

fn quick_settings() -> CaptureSettings {
    CaptureSettings {
        warmup_frames: 0,
        ..CaptureSettings::default()
    }
}

#[test]
fn timeouts_do_not_kill_the_capture_loop() {
    let sdk = SyntheticSdk::new()
        .with_device("Intel RealSense D435", "0001")
        .with_behavior("0001", FrameBehavior::Timeout);
    let manager = DeviceManager::new(Box::new(sdk), StreamConfigTable::default());

    let mut devices = manager.discover("").unwrap();
    manager.start_pipeline(&mut devices[0], &quick_settings()).unwrap();

    let label = devices[0].label();
    for _ in 0..3 {
        let pipeline = devices[0].pipeline_mut().unwrap();
        let err = capture_images(pipeline, &label, DEFAULT_WAIT_TIMEOUT).unwrap_err();
        assert_eq!(err, CameraError::FrameTimeout { timeout_ms: 100 });
        assert!(err.is_recoverable());
    }

    // The device is still usable; stopping it works normally.
    manager.stop_pipeline(&mut devices[0]);
    assert!(!devices[0].is_started());
}

#[test]
fn writer_persists_color_and_depth_buffers() {
    let dir = tempfile::tempdir().unwrap();

    let sdk = SyntheticSdk::new().with_device("Intel RealSense D435", "0001");
    let manager = DeviceManager::new(Box::new(sdk), StreamConfigTable::default());
    let mut devices = manager.discover("").unwrap();
    manager.start_pipeline(&mut devices[0], &quick_settings()).unwrap();

    let label = devices[0].label();
    let pipeline = devices[0].pipeline_mut().unwrap();
    let (color, depth) = capture_images(pipeline, &label, DEFAULT_WAIT_TIMEOUT).unwrap();

    let writer = FrameWriter::new(dir.path()).unwrap();
    writer.persist(
        &label,
        FrameSet {
            color: Some(color.clone()),
            depth: Some(depth.clone()),
        },
    );
    // Drop joins the writer thread, so queued writes are on disk.
    drop(writer);

    let color_path = dir.path().join(format!("{}_color.raw", label));
    let depth_path = dir.path().join(format!("{}_depth.raw", label));
    assert_eq!(
        std::fs::metadata(&color_path).unwrap().len(),
        (color.width * color.height * 3) as u64
    );
    assert_eq!(
        std::fs::metadata(&depth_path).unwrap().len(),
        (depth.width * depth.height * 2) as u64
    );

    manager.stop_pipeline(&mut devices[0]);
}

#[test]
fn writer_skips_absent_subframes() {
    let dir = tempfile::tempdir().unwrap();
    let writer = FrameWriter::new(dir.path()).unwrap();
    writer.persist(
        "cam",
        FrameSet {
            color: None,
            depth: None,
        },
    );
    drop(writer);

    assert!(!dir.path().join("cam_color.raw").exists());
    assert!(!dir.path().join("cam_depth.raw").exists());
}
