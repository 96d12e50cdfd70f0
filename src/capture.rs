//! Frame capture: bounded waits, alignment, and optional raw persistence.

use crate::backend::CapturePipeline;
use crate::errors::CameraError;
use crate::types::{ColorImage, DepthImage, FrameSet};
use crossbeam_channel::{unbounded, Sender};
use std::fs;
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Duration;

/// Default frame wait. Expiry is a per-cycle miss, not a failure.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(100);

/// Wait up to `timeout` for a synchronized frameset and align it to the
/// color viewpoint. Timeout surfaces as [`CameraError::FrameTimeout`];
/// callers log it and skip the cycle.
pub fn capture_frameset(
    pipeline: &mut dyn CapturePipeline,
    timeout: Duration,
) -> Result<FrameSet, CameraError> {
    let frames = pipeline.wait_frames(timeout)?;
    Ok(pipeline.align_to_color(frames))
}

/// As [`capture_frameset`], then require both sub-frames. A missing
/// sub-frame after alignment can happen transiently and is reported as
/// [`CameraError::IncompleteFrame`].
pub fn capture_images(
    pipeline: &mut dyn CapturePipeline,
    label: &str,
    timeout: Duration,
) -> Result<(ColorImage, DepthImage), CameraError> {
    let frames = capture_frameset(pipeline, timeout)?;
    match (frames.color, frames.depth) {
        (Some(color), Some(depth)) => Ok((color, depth)),
        _ => Err(CameraError::IncompleteFrame {
            device: label.to_string(),
        }),
    }
}

struct WriteJob {
    label: String,
    frames: FrameSet,
}

/// Background writer for raw frame buffers.
///
/// Sends never block: disk writes that lag simply queue, and the capture
/// loop keeps its cadence. Buffers land as `{label}_color.raw` (RGB8) and
/// `{label}_depth.raw` (Z16, little-endian) under the target directory.
/// The thread drains and exits when the writer is dropped.
pub struct FrameWriter {
    sender: Option<Sender<WriteJob>>,
    handle: Option<JoinHandle<()>>,
}

impl FrameWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CameraError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| CameraError::Io(format!("Failed to create {:?}: {}", dir, e)))?;

        let (sender, receiver) = unbounded::<WriteJob>();
        let handle = std::thread::Builder::new()
            .name("depthrig-frame-writer".to_string())
            .spawn(move || {
                for job in receiver.iter() {
                    if let Err(e) = write_frames(&dir, &job) {
                        log::error!("Failed to persist frames for {}: {}", job.label, e);
                    } else {
                        log::debug!("Saved {} frames to disk", job.label);
                    }
                }
            })
            .map_err(|e| CameraError::Io(format!("Failed to spawn writer thread: {}", e)))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queue a frameset for persistence and return immediately.
    pub fn persist(&self, label: &str, frames: FrameSet) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(WriteJob {
                label: label.to_string(),
                frames,
            });
        }
    }
}

impl Drop for FrameWriter {
    fn drop(&mut self) {
        // Closing the channel lets the thread finish queued writes.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn write_frames(dir: &std::path::Path, job: &WriteJob) -> Result<(), CameraError> {
    if let Some(color) = &job.frames.color {
        fs::write(dir.join(format!("{}_color.raw", job.label)), &color.data)?;
    }
    if let Some(depth) = &job.frames.depth {
        let bytes: Vec<u8> = depth.data.iter().flat_map(|d| d.to_le_bytes()).collect();
        fs::write(dir.join(format!("{}_depth.raw", job.label)), bytes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CameraSdk;
    use crate::testing::{FrameBehavior, SyntheticSdk};

    fn pipeline_with(behavior: FrameBehavior) -> Box<dyn CapturePipeline> {
        let sdk = SyntheticSdk::new()
            .with_device("Intel RealSense D435", "0001")
            .with_behavior("0001", behavior);
        sdk.open_pipeline("0001", &[]).unwrap()
    }

    #[test]
    fn missing_depth_reports_incomplete_frame() {
        let mut pipeline = pipeline_with(FrameBehavior::MissingDepth);
        let err = capture_images(pipeline.as_mut(), "cam", DEFAULT_WAIT_TIMEOUT).unwrap_err();
        assert_eq!(
            err,
            CameraError::IncompleteFrame {
                device: "cam".to_string()
            }
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn frameset_still_returned_when_depth_missing() {
        let mut pipeline = pipeline_with(FrameBehavior::MissingDepth);
        let frames = capture_frameset(pipeline.as_mut(), DEFAULT_WAIT_TIMEOUT).unwrap();
        assert!(frames.color.is_some());
        assert!(frames.depth.is_none());
    }
}
