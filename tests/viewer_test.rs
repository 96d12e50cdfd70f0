//! Multi-window orchestration: lockstep saves and exit-after-pass.

use depthrig::testing::SyntheticSdk;
use depthrig::viewer::{run_event_loop, DeviceView};
use depthrig::{CameraError, CaptureSettings, DeviceManager, StreamConfigTable, WindowEvent};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Simulated device window. Scripted events stand in for keypresses; a
/// forced save does not consume the script, mirroring a real window where
/// the save flag overrides whatever the keyboard poll saw.
struct FakeView {
    label: String,
    script: VecDeque<WindowEvent>,
    save_dir: PathBuf,
    counter: u32,
    /// `force_save` flag observed on every tick, in order.
    ticks: Vec<bool>,
    closed: bool,
}

impl FakeView {
    fn new(label: &str, save_dir: PathBuf, script: Vec<WindowEvent>) -> Self {
        Self {
            label: label.to_string(),
            script: script.into(),
            save_dir,
            counter: 0,
            ticks: Vec::new(),
            closed: false,
        }
    }

    fn save_snapshot(&mut self) {
        let path = self.save_dir.join(format!("color-{}.png", self.counter));
        std::fs::write(path, b"png").unwrap();
        self.counter += 1;
    }
}

impl DeviceView for FakeView {
    fn label(&self) -> &str {
        &self.label
    }

    fn tick(&mut self, force_save: bool) -> Result<WindowEvent, CameraError> {
        self.ticks.push(force_save);
        if force_save {
            self.save_snapshot();
            return Ok(WindowEvent::Save);
        }
        let event = self.script.pop_front().unwrap_or(WindowEvent::None);
        if event == WindowEvent::Save {
            self.save_snapshot();
        }
        Ok(event)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[test]
fn save_on_one_window_snapshots_all_in_lockstep() {
    let root = tempfile::tempdir().unwrap();
    let dir = |name: &str| {
        let path = root.path().join(name);
        std::fs::create_dir_all(&path).unwrap();
        path
    };

    // Window 2 saves on the first pass; window 1 exits on the second.
    let mut views = vec![
        FakeView::new(
            "cam-1",
            dir("cam-1"),
            vec![WindowEvent::None, WindowEvent::Exit],
        ),
        FakeView::new("cam-2", dir("cam-2"), vec![WindowEvent::Save]),
        FakeView::new("cam-3", dir("cam-3"), vec![]),
    ];

    run_event_loop(&mut views, &AtomicBool::new(false));

    // Window 3 was forced within the pass, window 1 by the catch-up tick.
    assert_eq!(views[2].ticks[0], true);
    assert_eq!(views[0].ticks, vec![false, true, false]);

    for view in &views {
        assert_eq!(view.counter, 1, "{} should have saved once", view.label);
        assert!(view.save_dir.join("color-0.png").exists());
        assert!(view.closed);
    }
}

#[test]
fn exit_finishes_the_pass_then_closes_everything() {
    let root = tempfile::tempdir().unwrap();
    let mut views = vec![
        FakeView::new("cam-1", root.path().into(), vec![WindowEvent::Exit]),
        FakeView::new("cam-2", root.path().into(), vec![]),
        FakeView::new("cam-3", root.path().into(), vec![]),
    ];

    run_event_loop(&mut views, &AtomicBool::new(false));

    // Every window was still ticked in the exiting pass, exactly once.
    for view in &views {
        assert_eq!(view.ticks, vec![false]);
        assert!(view.closed);
    }
}

#[test]
fn external_stop_flag_ends_the_loop_before_a_pass() {
    let mut views = vec![FakeView::new(
        "cam-1",
        std::env::temp_dir(),
        vec![],
    )];
    run_event_loop(&mut views, &AtomicBool::new(true));
    assert!(views[0].ticks.is_empty());
    assert!(views[0].closed);
}

#[test]
fn every_device_is_stopped_after_the_loop_ends() {
    let sdk = SyntheticSdk::new()
        .with_device("Intel RealSense D435", "0001")
        .with_device("Intel RealSense D435", "0002")
        .with_device("Intel RealSense L515", "0003");
    let stopped = sdk.stopped_counter();
    let manager = DeviceManager::new(Box::new(sdk), StreamConfigTable::default());

    let settings = CaptureSettings {
        warmup_frames: 0,
        ..CaptureSettings::default()
    };
    let mut devices = manager.discover("").unwrap();
    manager.start_all(&mut devices, &settings).unwrap();

    let mut views = vec![
        FakeView::new("cam-1", std::env::temp_dir(), vec![WindowEvent::Exit]),
        FakeView::new("cam-2", std::env::temp_dir(), vec![]),
        FakeView::new("cam-3", std::env::temp_dir(), vec![]),
    ];
    run_event_loop(&mut views, &AtomicBool::new(false));

    manager.stop_all(&mut devices);
    assert!(devices.iter().all(|d| !d.is_started()));
    assert_eq!(stopped.load(Ordering::SeqCst), 3);
}
