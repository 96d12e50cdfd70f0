//! Synthetic SDK backend for offline testing.
//!
//! Implements the full backend boundary without hardware, generating
//! deterministic frames, so discovery, pipeline lifecycle, capture, and
//! the viewer loop can be exercised in CI.

use crate::backend::{CameraSdk, CapturePipeline, DeviceInfo};
use crate::config::StreamDescriptor;
use crate::errors::CameraError;
use crate::types::{ColorImage, DepthImage, FrameSet, Intrinsics, SensorOption};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a synthetic pipeline answers each frame wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBehavior {
    Normal,
    Timeout,
    MissingDepth,
    MissingColor,
}

/// Create a synthetic color frame with a gradient that varies by position
/// and frame number.
pub fn synthetic_color_frame(frame_number: u64, width: u32, height: u32) -> ColorImage {
    let mut data = vec![0u8; (width * height * 3) as usize];
    let base = (frame_number % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            data[idx] = base.wrapping_add((x % 256) as u8);
            data[idx + 1] = base.wrapping_add((y % 256) as u8);
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }
    ColorImage::new(width, height, data)
}

/// Create a synthetic depth frame: a planar ramp in depth units.
pub fn synthetic_depth_frame(frame_number: u64, width: u32, height: u32) -> DepthImage {
    let mut data = vec![0u16; (width * height) as usize];
    let base = (frame_number % 1000) as u16;
    for y in 0..height {
        for x in 0..width {
            data[(y * width + x) as usize] = base + (x + y) as u16;
        }
    }
    DepthImage::new(width, height, data)
}

fn default_intrinsics() -> Intrinsics {
    Intrinsics {
        width: 640,
        height: 480,
        fx: 615.0,
        fy: 615.0,
        ppx: 320.0,
        ppy: 240.0,
        coeffs: vec![0.0; 5],
    }
}

/// Deterministic in-memory SDK.
///
/// Counters are shared handles so tests keep visibility after the backend
/// is boxed into a manager.
pub struct SyntheticSdk {
    devices: Vec<DeviceInfo>,
    behavior: HashMap<String, FrameBehavior>,
    failing_serials: HashSet<String>,
    intrinsics: Intrinsics,
    depth_scale: f32,
    opened: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
    options_log: Arc<Mutex<Vec<(String, SensorOption, f32)>>>,
}

impl Default for SyntheticSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticSdk {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            behavior: HashMap::new(),
            failing_serials: HashSet::new(),
            intrinsics: default_intrinsics(),
            depth_scale: 0.001,
            opened: Arc::new(AtomicUsize::new(0)),
            stopped: Arc::new(AtomicUsize::new(0)),
            resets: Arc::new(AtomicUsize::new(0)),
            options_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_device(mut self, name: &str, serial_number: &str) -> Self {
        self.devices.push(DeviceInfo::new(name, serial_number));
        self
    }

    /// Register a device whose pipeline start fails to resolve streams.
    pub fn with_failing_device(mut self, name: &str, serial_number: &str) -> Self {
        self.devices.push(DeviceInfo::new(name, serial_number));
        self.failing_serials.insert(serial_number.to_string());
        self
    }

    pub fn with_behavior(mut self, serial_number: &str, behavior: FrameBehavior) -> Self {
        self.behavior.insert(serial_number.to_string(), behavior);
        self
    }

    pub fn with_intrinsics(mut self, intrinsics: Intrinsics) -> Self {
        self.intrinsics = intrinsics;
        self
    }

    pub fn with_depth_scale(mut self, depth_scale: f32) -> Self {
        self.depth_scale = depth_scale;
        self
    }

    /// Pipelines opened over the backend's lifetime.
    pub fn opened_counter(&self) -> Arc<AtomicUsize> {
        self.opened.clone()
    }

    /// Pipelines stopped over the backend's lifetime.
    pub fn stopped_counter(&self) -> Arc<AtomicUsize> {
        self.stopped.clone()
    }

    pub fn reset_counter(&self) -> Arc<AtomicUsize> {
        self.resets.clone()
    }

    /// Every `(serial, option, value)` applied through a pipeline.
    pub fn options_log(&self) -> Arc<Mutex<Vec<(String, SensorOption, f32)>>> {
        self.options_log.clone()
    }
}

impl CameraSdk for SyntheticSdk {
    fn query_devices(&self) -> Result<Vec<DeviceInfo>, CameraError> {
        Ok(self.devices.clone())
    }

    fn open_pipeline(
        &self,
        serial_number: &str,
        streams: &[StreamDescriptor],
    ) -> Result<Box<dyn CapturePipeline>, CameraError> {
        if self.failing_serials.contains(serial_number) {
            return Err(CameraError::Sdk("Couldn't resolve requests".to_string()));
        }

        let (width, height) = streams
            .first()
            .map(|s| (s.width, s.height))
            .unwrap_or((self.intrinsics.width, self.intrinsics.height));

        self.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(SyntheticPipeline {
            serial_number: serial_number.to_string(),
            width,
            height,
            behavior: self
                .behavior
                .get(serial_number)
                .copied()
                .unwrap_or(FrameBehavior::Normal),
            intrinsics: Intrinsics {
                width,
                height,
                ..self.intrinsics.clone()
            },
            depth_scale: self.depth_scale,
            frame_number: 0,
            stopped: self.stopped.clone(),
            options_log: self.options_log.clone(),
            released: false,
        }))
    }

    fn hardware_reset(&mut self, _serial_number: &str) -> Result<(), CameraError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), CameraError> {
        Ok(())
    }
}

pub struct SyntheticPipeline {
    serial_number: String,
    width: u32,
    height: u32,
    behavior: FrameBehavior,
    intrinsics: Intrinsics,
    depth_scale: f32,
    frame_number: u64,
    stopped: Arc<AtomicUsize>,
    options_log: Arc<Mutex<Vec<(String, SensorOption, f32)>>>,
    released: bool,
}

impl CapturePipeline for SyntheticPipeline {
    fn wait_frames(&mut self, timeout: Duration) -> Result<FrameSet, CameraError> {
        match self.behavior {
            FrameBehavior::Timeout => Err(CameraError::FrameTimeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            behavior => {
                self.frame_number += 1;
                let depth = (behavior != FrameBehavior::MissingDepth)
                    .then(|| synthetic_depth_frame(self.frame_number, self.width, self.height));
                let color = (behavior != FrameBehavior::MissingColor)
                    .then(|| synthetic_color_frame(self.frame_number, self.width, self.height));
                Ok(FrameSet { depth, color })
            }
        }
    }

    fn align_to_color(&mut self, frames: FrameSet) -> FrameSet {
        // Synthetic streams share one resolution, so alignment is exact.
        frames
    }

    fn depth_scale(&self) -> Result<f32, CameraError> {
        Ok(self.depth_scale)
    }

    fn color_intrinsics(&self) -> Result<Intrinsics, CameraError> {
        Ok(self.intrinsics.clone())
    }

    fn set_color_option(&mut self, option: SensorOption, value: f32) -> Result<(), CameraError> {
        self.options_log
            .lock()
            .expect("lock poisoned")
            .push((self.serial_number.clone(), option, value));
        Ok(())
    }

    fn stop(&mut self) {
        if !self.released {
            self.released = true;
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for SyntheticPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_color_frames_differ_by_frame_number() {
        let frame0 = synthetic_color_frame(0, 320, 240);
        let frame1 = synthetic_color_frame(1, 320, 240);
        assert_ne!(frame0.data[0], frame1.data[0]);
    }

    #[test]
    fn synthetic_depth_frame_correct_size() {
        let frame = synthetic_depth_frame(0, 320, 240);
        assert_eq!(frame.data.len(), 320 * 240);
    }

    #[test]
    fn timeout_behavior_reports_frame_timeout() {
        let sdk = SyntheticSdk::new()
            .with_device("Intel RealSense D435", "0001")
            .with_behavior("0001", FrameBehavior::Timeout);
        let mut pipeline = sdk.open_pipeline("0001", &[]).unwrap();
        let err = pipeline
            .wait_frames(Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, CameraError::FrameTimeout { timeout_ms: 100 }));
    }
}
