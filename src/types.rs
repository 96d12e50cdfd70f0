//! Core types shared across the rig: capture settings, device metadata,
//! frame buffers, and viewer events.

use crate::errors::CameraError;
use serde::{Deserialize, Serialize};

/// Settings applied uniformly to every camera on the rig.
///
/// Depth and color resolutions are assumed equal. These are called
/// settings rather than configurations to avoid confusion with the SDK's
/// own `Config` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub enable_depth: bool,
    pub enable_color: bool,
    pub align_depth_to_color: bool,
    /// Manual exposure applied to the color sensor once auto-exposure is
    /// locked off.
    pub exposure: f32,
    pub gain: f32,
    pub white_balance: f32,
    /// Framesets discarded after stream start while the sensors settle.
    pub warmup_frames: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            enable_depth: true,
            enable_color: true,
            align_depth_to_color: true,
            exposure: 800.0,
            gain: 0.0,
            white_balance: 4000.0,
            warmup_frames: 30,
        }
    }
}

impl CaptureSettings {
    /// Build settings with the given resolution and frame rate, both
    /// streams enabled and depth aligned to color.
    pub fn new(width: u32, height: u32, fps: u32) -> Result<Self, CameraError> {
        Self {
            width,
            height,
            fps,
            ..Self::default()
        }
        .validated()
    }

    /// Only streaming both depth and color, aligned depth-to-color, is
    /// supported; everything else is rejected here rather than partially
    /// honored downstream.
    pub fn validated(self) -> Result<Self, CameraError> {
        if !(self.enable_depth && self.enable_color) {
            return Err(CameraError::InvalidSettings(
                "only streaming both depth and color is supported".to_string(),
            ));
        }
        if !self.align_depth_to_color {
            return Err(CameraError::InvalidSettings(
                "only aligning depth to color is supported".to_string(),
            ));
        }
        for (attr, value) in [
            ("width", self.width),
            ("height", self.height),
            ("fps", self.fps),
        ] {
            if value == 0 {
                return Err(CameraError::InvalidSettings(format!(
                    "{} must be a positive integer",
                    attr
                )));
            }
        }
        Ok(self)
    }
}

/// Camera intrinsics for a single stream, as reported by the SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f32,
    pub fy: f32,
    pub ppx: f32,
    pub ppy: f32,
    pub coeffs: Vec<f32>,
}

/// Read-only snapshot of a device's identity and calibration, derived once
/// from an active pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    pub name: String,
    pub serial_number: String,
    /// Width and height of the color stream in pixels.
    pub width: u32,
    pub height: u32,
    /// Number of depth units per meter.
    pub depth_scale: f32,
    pub intrinsic_matrix: [[f32; 3]; 3],
    pub distortion_coefficients: Vec<f32>,
}

impl DeviceMetadata {
    /// Assemble metadata from the color-stream intrinsics of an aligned
    /// pipeline.
    pub fn from_intrinsics(
        name: impl Into<String>,
        serial_number: impl Into<String>,
        depth_scale: f32,
        intrinsics: &Intrinsics,
    ) -> Self {
        Self {
            name: name.into(),
            serial_number: serial_number.into(),
            width: intrinsics.width,
            height: intrinsics.height,
            depth_scale,
            intrinsic_matrix: [
                [intrinsics.fx, 0.0, intrinsics.ppx],
                [0.0, intrinsics.fy, intrinsics.ppy],
                [0.0, 0.0, 1.0],
            ],
            distortion_coefficients: intrinsics.coeffs.clone(),
        }
    }
}

/// Result of one visualization poll, consumed within the same loop pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Exit,
    Save,
    RobotTrigger,
    None,
}

/// RGB8 color frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ColorImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width * height * 3) as usize);
        Self {
            width,
            height,
            data,
        }
    }
}

/// Z16 depth frame, one u16 depth unit per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u16>,
}

impl DepthImage {
    pub fn new(width: u32, height: u32, data: Vec<u16>) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self {
            width,
            height,
            data,
        }
    }
}

/// Sub-frames of one synchronized capture. Either may be transiently
/// absent, even after alignment.
#[derive(Debug, Clone, Default)]
pub struct FrameSet {
    pub depth: Option<DepthImage>,
    pub color: Option<ColorImage>,
}

/// Color-sensor options the manager locks after warmup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorOption {
    EnableAutoExposure,
    Exposure,
    Gain,
    EnableAutoWhiteBalance,
    WhiteBalance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_validate() {
        assert!(CaptureSettings::default().validated().is_ok());
    }

    #[test]
    fn depth_only_rejected() {
        let settings = CaptureSettings {
            enable_color: false,
            ..CaptureSettings::default()
        };
        assert!(matches!(
            settings.validated(),
            Err(CameraError::InvalidSettings(_))
        ));
    }

    #[test]
    fn unaligned_rejected() {
        let settings = CaptureSettings {
            align_depth_to_color: false,
            ..CaptureSettings::default()
        };
        assert!(settings.validated().is_err());
    }

    #[test]
    fn zero_fps_rejected() {
        assert!(CaptureSettings::new(1280, 720, 0).is_err());
    }

    #[test]
    fn metadata_matrix_shape() {
        let intrinsics = Intrinsics {
            width: 1920,
            height: 1080,
            fx: 910.5,
            fy: 911.2,
            ppx: 960.1,
            ppy: 540.7,
            coeffs: vec![0.1, -0.2, 0.0, 0.0, 0.0],
        };
        let meta = DeviceMetadata::from_intrinsics("Intel RealSense D435", "843112", 0.001, &intrinsics);
        assert_eq!(meta.intrinsic_matrix[0], [910.5, 0.0, 960.1]);
        assert_eq!(meta.intrinsic_matrix[1], [0.0, 911.2, 540.7]);
        assert_eq!(meta.intrinsic_matrix[2], [0.0, 0.0, 1.0]);
        assert_eq!(meta.width, 1920);
    }
}
