//! RealSense implementation of the SDK boundary, on `realsense-rust`.

use crate::backend::{CameraSdk, CapturePipeline, DeviceInfo};
use crate::config::{StreamDescriptor, StreamFormat, StreamKind};
use crate::errors::CameraError;
use crate::types::{ColorImage, DepthImage, FrameSet, Intrinsics, SensorOption};
use realsense_rust::{
    config::Config,
    context::Context,
    device::Device,
    frame::{ColorFrame, DepthFrame, PixelKind},
    kind::{Rs2CameraInfo, Rs2Format, Rs2Option, Rs2StreamKind},
    pipeline::{ActivePipeline, InactivePipeline},
};
use std::collections::HashSet;
use std::ffi::CString;
use std::time::Duration;

/// Owns the librealsense enumeration context.
pub struct RealSenseSdk {
    context: Context,
}

impl RealSenseSdk {
    pub fn new() -> Result<Self, CameraError> {
        let context = Context::new()
            .map_err(|e| CameraError::Sdk(format!("Failed to create context: {}", e)))?;
        Ok(Self { context })
    }

    fn find_device(&self, serial_number: &str) -> Result<Device, CameraError> {
        self.context
            .query_devices(HashSet::new())
            .into_iter()
            .find(|dev| info_string(dev, Rs2CameraInfo::SerialNumber) == serial_number)
            .ok_or_else(|| CameraError::Sdk(format!("Device {} is gone", serial_number)))
    }
}

impl CameraSdk for RealSenseSdk {
    fn query_devices(&self) -> Result<Vec<DeviceInfo>, CameraError> {
        let devices = self
            .context
            .query_devices(HashSet::new())
            .iter()
            .map(|dev| {
                DeviceInfo::new(
                    info_string(dev, Rs2CameraInfo::Name),
                    info_string(dev, Rs2CameraInfo::SerialNumber),
                )
            })
            .collect();
        Ok(devices)
    }

    fn open_pipeline(
        &self,
        serial_number: &str,
        streams: &[StreamDescriptor],
    ) -> Result<Box<dyn CapturePipeline>, CameraError> {
        let serial = CString::new(serial_number)
            .map_err(|e| CameraError::Sdk(format!("Invalid serial number: {}", e)))?;

        let pipeline = InactivePipeline::try_from(&self.context)
            .map_err(|e| CameraError::Sdk(format!("Failed to create pipeline: {}", e)))?;

        let mut config = Config::new();
        config
            .enable_device_from_serial(&serial)
            .map_err(|e| CameraError::Sdk(format!("Failed to enable device: {}", e)))?
            .disable_all_streams()
            .map_err(|e| CameraError::Sdk(format!("Failed to disable streams: {}", e)))?;

        for stream in streams {
            config
                .enable_stream(
                    stream_kind(stream.kind),
                    None,
                    stream.width as usize,
                    stream.height as usize,
                    stream_format(stream.format),
                    stream.fps as usize,
                )
                .map_err(|e| CameraError::Sdk(format!("Failed to enable stream: {}", e)))?;
        }

        let active = pipeline
            .start(Some(config))
            .map_err(|e| CameraError::Sdk(e.to_string()))?;

        Ok(Box::new(RealSensePipeline {
            active: Some(active),
        }))
    }

    fn hardware_reset(&mut self, serial_number: &str) -> Result<(), CameraError> {
        let device = self.find_device(serial_number)?;
        device.hardware_reset();
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), CameraError> {
        self.context = Context::new()
            .map_err(|e| CameraError::Sdk(format!("Failed to refresh context: {}", e)))?;
        Ok(())
    }
}

pub struct RealSensePipeline {
    active: Option<ActivePipeline>,
}

impl RealSensePipeline {
    fn active(&self) -> Result<&ActivePipeline, CameraError> {
        self.active
            .as_ref()
            .ok_or_else(|| CameraError::Sdk("Pipeline already stopped".to_string()))
    }
}

impl CapturePipeline for RealSensePipeline {
    fn wait_frames(&mut self, timeout: Duration) -> Result<FrameSet, CameraError> {
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| CameraError::Sdk("Pipeline already stopped".to_string()))?;

        let frames = match active.wait(Some(timeout)) {
            Ok(frames) => frames,
            // The SDK reports wait expiry as an opaque runtime error; treat
            // anything mentioning a timeout as the recoverable case.
            Err(e) if e.to_string().to_lowercase().contains("timeout") => {
                return Err(CameraError::FrameTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Err(e) => return Err(CameraError::Sdk(e.to_string())),
        };

        let depth = frames
            .frames_of_type::<DepthFrame>()
            .pop()
            .map(|f| depth_image(&f));
        let color = frames
            .frames_of_type::<ColorFrame>()
            .pop()
            .map(|f| color_image(&f));

        Ok(FrameSet { depth, color })
    }

    fn align_to_color(&mut self, frames: FrameSet) -> FrameSet {
        // realsense-rust does not expose the rs2_align processing block
        // yet, so the built-in stream tables keep depth and color at the
        // same resolution and framesets pass through unchanged.
        // TODO: route through rs2_align once realsense-rust wraps
        // processing blocks.
        frames
    }

    fn depth_scale(&self) -> Result<f32, CameraError> {
        let device = self.active()?.profile().device();
        for mut sensor in device.sensors() {
            if let Some(scale) = sensor.get_option(Rs2Option::DepthUnits) {
                return Ok(scale);
            }
        }
        Err(CameraError::Sdk(
            "No sensor reports depth units".to_string(),
        ))
    }

    fn color_intrinsics(&self) -> Result<Intrinsics, CameraError> {
        let profile = self.active()?.profile();
        let stream = profile
            .streams()
            .into_iter()
            .find(|s| s.kind() == Rs2StreamKind::Color)
            .ok_or_else(|| CameraError::Sdk("No active color stream".to_string()))?;

        let intrinsics = stream
            .intrinsics()
            .map_err(|e| CameraError::Sdk(format!("Failed to read intrinsics: {}", e)))?;

        Ok(Intrinsics {
            width: intrinsics.width() as u32,
            height: intrinsics.height() as u32,
            fx: intrinsics.fx(),
            fy: intrinsics.fy(),
            ppx: intrinsics.ppx(),
            ppy: intrinsics.ppy(),
            coeffs: intrinsics.coeffs().to_vec(),
        })
    }

    fn set_color_option(&mut self, option: SensorOption, value: f32) -> Result<(), CameraError> {
        let device = self.active()?.profile().device();
        let mut sensor = device
            .sensors()
            .into_iter()
            .find(|s| info_string_sensor(s, Rs2CameraInfo::Name).contains("RGB"))
            .ok_or_else(|| CameraError::Sdk("No color sensor on device".to_string()))?;

        sensor
            .set_option(sensor_option(option), value)
            .map_err(|e| CameraError::Sdk(format!("Failed to set option: {}", e)))
    }

    fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop();
        }
    }
}

impl Drop for RealSensePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn info_string(device: &Device, info: Rs2CameraInfo) -> String {
    device
        .info(info)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "N/A".to_string())
}

fn info_string_sensor(sensor: &realsense_rust::sensor::Sensor, info: Rs2CameraInfo) -> String {
    sensor
        .info(info)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "N/A".to_string())
}

fn stream_kind(kind: StreamKind) -> Rs2StreamKind {
    match kind {
        StreamKind::Depth => Rs2StreamKind::Depth,
        StreamKind::Color => Rs2StreamKind::Color,
    }
}

fn stream_format(format: StreamFormat) -> Rs2Format {
    match format {
        StreamFormat::Z16 => Rs2Format::Z16,
        StreamFormat::Rgb8 => Rs2Format::Rgb8,
        StreamFormat::Bgr8 => Rs2Format::Bgr8,
    }
}

fn sensor_option(option: SensorOption) -> Rs2Option {
    match option {
        SensorOption::EnableAutoExposure => Rs2Option::EnableAutoExposure,
        SensorOption::Exposure => Rs2Option::Exposure,
        SensorOption::Gain => Rs2Option::Gain,
        SensorOption::EnableAutoWhiteBalance => Rs2Option::EnableAutoWhiteBalance,
        SensorOption::WhiteBalance => Rs2Option::WhiteBalance,
    }
}

fn color_image(frame: &ColorFrame) -> ColorImage {
    let width = frame.width() as u32;
    let height = frame.height() as u32;
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            match frame.get_unchecked(x, y) {
                PixelKind::Rgb8 { r, g, b } | PixelKind::Bgr8 { b, g, r } => {
                    data.extend_from_slice(&[*r, *g, *b]);
                }
                _ => data.extend_from_slice(&[0, 0, 0]),
            }
        }
    }
    ColorImage::new(width, height, data)
}

fn depth_image(frame: &DepthFrame) -> DepthImage {
    let width = frame.width() as u32;
    let height = frame.height() as u32;
    let mut data = Vec::with_capacity((width * height) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            match frame.get_unchecked(x, y) {
                PixelKind::Z16 { depth } => data.push(*depth),
                _ => data.push(0),
            }
        }
    }
    DepthImage::new(width, height, data)
}
