use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CameraError {
    /// Discovery produced an empty device list.
    NoDevicesFound,
    /// A connected device has no registered stream configuration.
    UnconfiguredModel { name: String },
    /// The SDK could not resolve the requested stream combination.
    StreamConfiguration {
        name: String,
        serial: String,
        message: String,
    },
    /// No frameset arrived within the wait timeout. Recoverable.
    FrameTimeout { timeout_ms: u64 },
    /// A sub-frame was missing after alignment. Recoverable.
    IncompleteFrame { device: String },
    /// An operation that needs an active pipeline ran before start.
    NotStarted { device: String },
    InvalidSettings(String),
    Sdk(String),
    Io(String),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CameraError::NoDevicesFound => write!(f, "No devices connected"),
            CameraError::UnconfiguredModel { name } => {
                write!(f, "Stream configuration not specified for {}", name)
            }
            CameraError::StreamConfiguration {
                name,
                serial,
                message,
            } => write!(
                f,
                "Stream configuration error for {} ({}): {}. Check stream settings and the USB connection.",
                name, serial, message
            ),
            CameraError::FrameTimeout { timeout_ms } => {
                write!(f, "No frameset received within {} ms", timeout_ms)
            }
            CameraError::IncompleteFrame { device } => {
                write!(f, "Missing color or depth frame for {}", device)
            }
            CameraError::NotStarted { device } => {
                write!(f, "Pipeline for {} not started", device)
            }
            CameraError::InvalidSettings(msg) => write!(f, "Invalid settings: {}", msg),
            CameraError::Sdk(msg) => write!(f, "SDK error: {}", msg),
            CameraError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for CameraError {}

impl CameraError {
    /// Timeouts and incomplete framesets are per-cycle misses; everything
    /// else aborts the calling operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CameraError::FrameTimeout { .. } | CameraError::IncompleteFrame { .. }
        )
    }
}

impl From<std::io::Error> for CameraError {
    fn from(e: std::io::Error) -> Self {
        CameraError::Io(e.to_string())
    }
}
