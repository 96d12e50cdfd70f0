//! Device discovery and pipeline lifecycle.
//!
//! The manager owns the SDK backend and the stream configuration table;
//! each [`Device`] exclusively owns its running pipeline for the duration
//! of its active lifetime.

use crate::backend::{CameraSdk, CapturePipeline, DeviceInfo};
use crate::config::StreamConfigTable;
use crate::errors::CameraError;
use crate::types::{CaptureSettings, DeviceMetadata, SensorOption};
use std::fmt;
use std::time::Duration;

/// Settle time after a hardware reset; the USB stack gives no other
/// completion signal.
pub const DEFAULT_RESET_SETTLE: Duration = Duration::from_secs(3);

/// Wait timeout used while discarding warmup framesets.
const WARMUP_WAIT: Duration = Duration::from_secs(5);

/// One attached camera and, while started, its capture pipeline.
pub struct Device {
    pub name: String,
    pub serial_number: String,
    pipeline: Option<Box<dyn CapturePipeline>>,
    metadata: Option<DeviceMetadata>,
    /// Snapshot numbering for this device's saved images. Per instance,
    /// never shared.
    pub snapshot_counter: u32,
}

impl Device {
    fn from_info(info: DeviceInfo) -> Self {
        Self {
            name: info.name,
            serial_number: info.serial_number,
            pipeline: None,
            metadata: None,
            snapshot_counter: 0,
        }
    }

    pub fn is_started(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn pipeline_mut(&mut self) -> Option<&mut (dyn CapturePipeline + 'static)> {
        self.pipeline.as_deref_mut()
    }

    /// Metadata snapshot, present once extracted after pipeline start.
    pub fn metadata(&self) -> Option<&DeviceMetadata> {
        self.metadata.as_ref()
    }

    /// `"{name} ({serial})"`, used for window titles and capture labels.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.serial_number)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.serial_number)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("serial_number", &self.serial_number)
            .field("started", &self.pipeline.is_some())
            .field("metadata", &self.metadata)
            .field("snapshot_counter", &self.snapshot_counter)
            .finish()
    }
}

/// Discovers devices and manages their pipelines.
pub struct DeviceManager {
    sdk: Box<dyn CameraSdk>,
    streams: StreamConfigTable,
}

impl DeviceManager {
    pub fn new(sdk: Box<dyn CameraSdk>, streams: StreamConfigTable) -> Self {
        Self { sdk, streams }
    }

    /// Enumerate attached devices, keeping only those whose name contains
    /// `filter` (case-insensitive). An empty filter keeps everything.
    ///
    /// e.g. `discover("d435")` keeps only D435 cameras.
    pub fn discover(&self, filter: &str) -> Result<Vec<Device>, CameraError> {
        let filter_lower = filter.to_lowercase();
        let devices: Vec<Device> = self
            .sdk
            .query_devices()?
            .into_iter()
            .filter(|info| filter.is_empty() || info.name.to_lowercase().contains(&filter_lower))
            .map(Device::from_info)
            .collect();

        if filter.is_empty() {
            log::info!("Found {} devices", devices.len());
        } else {
            log::info!("Found {} devices (filter={})", devices.len(), filter);
        }

        if devices.is_empty() {
            return Err(CameraError::NoDevicesFound);
        }
        Ok(devices)
    }

    /// Start the device's pipeline with its registered stream
    /// configuration, discard warmup framesets, and lock the color
    /// sensor's exposure and white balance.
    ///
    /// Idempotent: a second call on a started device logs a warning and
    /// leaves the running pipeline untouched.
    pub fn start_pipeline(
        &self,
        device: &mut Device,
        settings: &CaptureSettings,
    ) -> Result<(), CameraError> {
        if device.is_started() {
            log::warn!("Pipeline already started for {}", device);
            return Ok(());
        }

        let streams = self
            .streams
            .streams_for(&device.name)
            .ok_or_else(|| CameraError::UnconfiguredModel {
                name: device.name.clone(),
            })?;

        let mut pipeline = self
            .sdk
            .open_pipeline(&device.serial_number, streams)
            .map_err(|e| CameraError::StreamConfiguration {
                name: device.name.clone(),
                serial: device.serial_number.clone(),
                message: match e {
                    CameraError::Sdk(msg) => msg,
                    other => other.to_string(),
                },
            })?;

        if let Err(e) = warmup(pipeline.as_mut(), settings.warmup_frames) {
            pipeline.stop();
            return Err(e);
        }
        log::debug!(
            "Warmed up {} for {} framesets",
            device,
            settings.warmup_frames
        );

        if let Err(e) = lock_color_sensor(pipeline.as_mut(), settings) {
            pipeline.stop();
            return Err(e);
        }
        log::debug!("Locked exposure and white balance for {}", device);

        device.pipeline = Some(pipeline);
        log::debug!("Started pipeline for {}", device);
        Ok(())
    }

    /// Start every device, all-or-nothing: when one startup fails, every
    /// pipeline started earlier in the pass is stopped before the error
    /// propagates.
    pub fn start_all(
        &self,
        devices: &mut [Device],
        settings: &CaptureSettings,
    ) -> Result<(), CameraError> {
        for i in 0..devices.len() {
            if let Err(e) = self.start_pipeline(&mut devices[i], settings) {
                log::error!("Startup failed for {}: {}", devices[i], e);
                for started in &mut devices[..i] {
                    self.stop_pipeline(started);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Stop the device's pipeline. Warns and no-ops when nothing is
    /// running.
    pub fn stop_pipeline(&self, device: &mut Device) {
        match device.pipeline.take() {
            Some(mut pipeline) => {
                pipeline.stop();
                log::debug!("Stopped pipeline for {}", device);
            }
            None => log::warn!("Device {} does not have a pipeline initialized", device),
        }
    }

    pub fn stop_all(&self, devices: &mut [Device]) {
        for device in devices {
            self.stop_pipeline(device);
        }
    }

    /// Hardware reset every device, then block while the USB stack
    /// recovers. Use when devices stop delivering frames.
    pub fn hardware_reset(
        &mut self,
        devices: &[Device],
        settle: Duration,
    ) -> Result<(), CameraError> {
        for device in devices {
            self.sdk.hardware_reset(&device.serial_number)?;
        }
        std::thread::sleep(settle);
        log::debug!("Hardware reset {} devices", devices.len());
        Ok(())
    }

    /// Recreate the SDK enumeration context.
    pub fn refresh(&mut self) -> Result<(), CameraError> {
        self.sdk.refresh()
    }

    /// Derive the device's metadata snapshot from its active pipeline and
    /// cache it on the device. Requires a started, color-aligned pipeline.
    pub fn extract_metadata(&self, device: &mut Device) -> Result<DeviceMetadata, CameraError> {
        let pipeline = device
            .pipeline
            .as_ref()
            .ok_or_else(|| CameraError::NotStarted {
                device: device.label(),
            })?;

        let depth_scale = pipeline.depth_scale()?;
        let intrinsics = pipeline.color_intrinsics()?;
        let metadata = DeviceMetadata::from_intrinsics(
            device.name.clone(),
            device.serial_number.clone(),
            depth_scale,
            &intrinsics,
        );
        log::info!("{:?}", metadata);
        device.metadata = Some(metadata.clone());
        Ok(metadata)
    }
}

fn warmup(pipeline: &mut dyn CapturePipeline, frames: u32) -> Result<(), CameraError> {
    for _ in 0..frames {
        pipeline.wait_frames(WARMUP_WAIT)?;
    }
    Ok(())
}

fn lock_color_sensor(
    pipeline: &mut dyn CapturePipeline,
    settings: &CaptureSettings,
) -> Result<(), CameraError> {
    pipeline.set_color_option(SensorOption::EnableAutoExposure, 0.0)?;
    pipeline.set_color_option(SensorOption::Exposure, settings.exposure)?;
    pipeline.set_color_option(SensorOption::Gain, settings.gain)?;
    pipeline.set_color_option(SensorOption::EnableAutoWhiteBalance, 0.0)?;
    pipeline.set_color_option(SensorOption::WhiteBalance, settings.white_balance)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DeviceInfo;

    #[test]
    fn device_label_includes_serial() {
        let device = Device::from_info(DeviceInfo::new("Intel RealSense D435", "843112071624"));
        assert_eq!(device.label(), "Intel RealSense D435 (843112071624)");
        assert_eq!(device.to_string(), device.label());
        assert_eq!(device.snapshot_counter, 0);
        assert!(!device.is_started());
    }
}
