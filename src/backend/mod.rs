//! Vendor SDK boundary.
//!
//! Everything the rig needs from a depth-camera SDK is expressed through
//! the two traits below. The RealSense implementation lives behind the
//! `realsense` feature; [`crate::testing::SyntheticSdk`] provides a
//! deterministic implementation for offline use.

#[cfg(feature = "realsense")]
pub mod realsense;

use crate::config::StreamDescriptor;
use crate::errors::CameraError;
use crate::types::{FrameSet, Intrinsics, SensorOption};
use std::time::Duration;

/// Identity of an attached device as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub serial_number: String,
}

impl DeviceInfo {
    pub fn new(name: impl Into<String>, serial_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            serial_number: serial_number.into(),
        }
    }
}

/// Device enumeration and pipeline creation.
///
/// Implementations own their enumeration context; `refresh` recreates it
/// rather than mutating shared process state.
pub trait CameraSdk: Send {
    fn query_devices(&self) -> Result<Vec<DeviceInfo>, CameraError>;

    /// Start a capture pipeline bound to the device with the given serial
    /// number, enabling exactly the listed streams. A failure to resolve
    /// the stream combination surfaces as [`CameraError::Sdk`]; the
    /// manager rewraps it with device identity attached.
    fn open_pipeline(
        &self,
        serial_number: &str,
        streams: &[StreamDescriptor],
    ) -> Result<Box<dyn CapturePipeline>, CameraError>;

    /// Issue a hardware reset. Reset is asynchronous at the hardware
    /// level; callers are responsible for the settle sleep.
    fn hardware_reset(&mut self, serial_number: &str) -> Result<(), CameraError>;

    /// Recreate the enumeration context.
    fn refresh(&mut self) -> Result<(), CameraError>;
}

/// One device's active stream configuration and frame-delivery channel.
pub trait CapturePipeline: Send {
    /// Block up to `timeout` for a synchronized frameset. Expiry is
    /// reported as [`CameraError::FrameTimeout`].
    fn wait_frames(&mut self, timeout: Duration) -> Result<FrameSet, CameraError>;

    /// Reproject the depth frame into the color frame's viewpoint.
    fn align_to_color(&mut self, frames: FrameSet) -> FrameSet;

    /// Number of depth units per meter, from the depth sensor.
    fn depth_scale(&self) -> Result<f32, CameraError>;

    /// Intrinsics of the active color stream.
    fn color_intrinsics(&self) -> Result<Intrinsics, CameraError>;

    /// Set an option on the color sensor.
    fn set_color_option(&mut self, option: SensorOption, value: f32) -> Result<(), CameraError>;

    /// Stop streaming and release the pipeline.
    fn stop(&mut self);
}
