//! depthrig: multi-camera depth capture rig on the RealSense SDK
//!
//! This crate is a convenience layer over the vendor SDK: it discovers
//! connected depth cameras, starts per-device capture pipelines with
//! fixed per-model stream configurations, aligns depth to color, exposes
//! per-frame images to a viewer loop, and saves snapshots on keypresses.
//!
//! # Features
//! - Device discovery with optional name filtering
//! - Per-model stream configuration tables (TOML-loadable)
//! - Pipeline warmup and exposure/white-balance locking
//! - Depth-to-color aligned frame capture with a recoverable-miss model
//! - Multi-window viewer with lockstep snapshot saving
//! - Deterministic synthetic backend for offline testing
//!
//! # Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! depthrig = { version = "0.3", features = ["realsense", "viewer"] }
//! ```
//!
//! Then wire up a rig:
//! ```rust,ignore
//! use depthrig::{CaptureSettings, DeviceManager, StreamConfigTable};
//! use depthrig::backend::realsense::RealSenseSdk;
//!
//! let manager = DeviceManager::new(
//!     Box::new(RealSenseSdk::new()?),
//!     StreamConfigTable::default(),
//! );
//! let mut devices = manager.discover("d435")?;
//! manager.start_all(&mut devices, &CaptureSettings::default())?;
//! ```
pub mod backend;
pub mod capture;
pub mod config;
pub mod device;
pub mod errors;
pub mod testing;
pub mod types;
pub mod viewer;

// Re-exports for convenience
pub use capture::{capture_frameset, capture_images, FrameWriter, DEFAULT_WAIT_TIMEOUT};
pub use config::{StreamConfigTable, StreamDescriptor, StreamFormat, StreamKind};
pub use device::{Device, DeviceManager, DEFAULT_RESET_SETTLE};
pub use errors::CameraError;
pub use types::{CaptureSettings, ColorImage, DepthImage, DeviceMetadata, FrameSet, WindowEvent};

/// Initialize logging for the rig.
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "depthrig=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_name() {
        assert_eq!(NAME, "depthrig");
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_settings_are_valid() {
        assert!(CaptureSettings::default().validated().is_ok());
    }
}
