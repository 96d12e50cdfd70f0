//! Live preview windows and the multi-device event loop.
//!
//! One [`DeviceView`] per camera; the outer loop coordinates the two
//! cross-window behaviors: a save keypress on any window snapshots every
//! camera in lockstep, and an exit keypress closes everything once the
//! current pass completes.

use crate::errors::CameraError;
use crate::types::{ColorImage, WindowEvent};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// A single keypress observed on a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Char(char),
    Escape,
}

/// Map a keypress to its viewer event: `q`/Esc exits, `s` saves, `g`
/// triggers the robot, anything else is ignored.
pub fn decode_key(key: Option<KeyPress>) -> WindowEvent {
    match key {
        Some(KeyPress::Escape) | Some(KeyPress::Char('q')) => WindowEvent::Exit,
        Some(KeyPress::Char('s')) => WindowEvent::Save,
        Some(KeyPress::Char('g')) => WindowEvent::RobotTrigger,
        _ => WindowEvent::None,
    }
}

/// One device's visualization surface.
pub trait DeviceView {
    /// Window title / device identity, for logging.
    fn label(&self) -> &str;

    /// Run one visualization tick: capture, display, poll input. With
    /// `force_save`, the tick saves a snapshot as if `s` were pressed.
    fn tick(&mut self, force_save: bool) -> Result<WindowEvent, CameraError>;

    /// Stop displaying. Further ticks are not expected.
    fn close(&mut self);
}

/// Poll every view until a window requests exit or `stop` is raised.
///
/// Per pass: a Save from any window forces the save flag for the windows
/// still to be ticked in that pass, and windows ticked before the saver
/// get one forced save tick at the end of the pass, so all cameras
/// snapshot together. An Exit lets the pass finish, then all windows are
/// closed. Capture errors never end the loop; they are logged and the
/// cycle yields nothing for that device.
pub fn run_event_loop<V: DeviceView>(views: &mut [V], stop: &AtomicBool) {
    log::info!("Beginning visualization loop. Press 'q' or Esc to exit.");

    while !stop.load(Ordering::Relaxed) {
        let mut save = false;
        let mut exit = false;
        let mut saved = vec![false; views.len()];

        for (i, view) in views.iter_mut().enumerate() {
            match view.tick(save) {
                Ok(WindowEvent::Save) => {
                    save = true;
                    saved[i] = true;
                }
                Ok(WindowEvent::Exit) => exit = true,
                Ok(WindowEvent::RobotTrigger) => {
                    log::info!("Robot trigger from {}", view.label())
                }
                Ok(WindowEvent::None) => {}
                Err(e) if e.is_recoverable() => log::warn!("{}: {}", view.label(), e),
                Err(e) => log::error!("{}: {}", view.label(), e),
            }
        }

        if save {
            for (i, view) in views.iter_mut().enumerate() {
                if saved[i] {
                    continue;
                }
                match view.tick(true) {
                    Ok(WindowEvent::Exit) => exit = true,
                    Ok(_) => {}
                    Err(e) => log::warn!("{}: {}", view.label(), e),
                }
            }
        }

        if exit {
            log::info!("Exit key pressed.");
            break;
        }
    }

    for view in views.iter_mut() {
        view.close();
    }
}

/// Write a color frame as PNG.
pub fn save_color_png(image: &ColorImage, path: &Path) -> Result<(), CameraError> {
    let rgb = to_rgb_image(image)?;
    rgb.save(path)
        .map_err(|e| CameraError::Io(format!("Failed to write {:?}: {}", path, e)))
}

/// Rotate a color frame by 180 degrees, for upside-down camera mounts.
pub fn rotate_180(image: &ColorImage) -> Result<ColorImage, CameraError> {
    let rotated = image::imageops::rotate180(&to_rgb_image(image)?);
    Ok(ColorImage::new(
        image.width,
        image.height,
        rotated.into_raw(),
    ))
}

fn to_rgb_image(image: &ColorImage) -> Result<image::RgbImage, CameraError> {
    image::RgbImage::from_raw(image.width, image.height, image.data.clone())
        .ok_or_else(|| CameraError::Io("Color buffer does not match its dimensions".to_string()))
}

#[cfg(feature = "viewer")]
pub use window::{CameraView, ViewerOptions};

#[cfg(feature = "viewer")]
mod window {
    use super::{decode_key, save_color_png, DeviceView, KeyPress};
    use crate::capture::{capture_frameset, DEFAULT_WAIT_TIMEOUT};
    use crate::device::Device;
    use crate::errors::CameraError;
    use crate::types::{ColorImage, WindowEvent};
    use minifb::{Key, KeyRepeat, Window, WindowOptions};
    use std::path::PathBuf;
    use std::time::Duration;

    /// Viewer behavior shared by every window.
    #[derive(Debug, Clone)]
    pub struct ViewerOptions {
        /// Snapshot directory; must already exist.
        pub save_dir: PathBuf,
        pub rotate_180: bool,
        pub wait_timeout: Duration,
    }

    impl ViewerOptions {
        pub fn new(save_dir: impl Into<PathBuf>) -> Self {
            Self {
                save_dir: save_dir.into(),
                rotate_180: true,
                wait_timeout: DEFAULT_WAIT_TIMEOUT,
            }
        }
    }

    /// A minifb window showing one device's color stream.
    pub struct CameraView {
        device: Device,
        label: String,
        window: Window,
        options: ViewerOptions,
        closed: bool,
    }

    impl CameraView {
        /// Open a window titled with the device identity, sized from its
        /// metadata when available.
        pub fn open(device: Device, options: ViewerOptions) -> Result<Self, CameraError> {
            let label = device.label();
            let (width, height) = device
                .metadata()
                .map(|m| (m.width as usize, m.height as usize))
                .unwrap_or((1280, 720));

            let window = Window::new(&label, width, height, WindowOptions::default())
                .map_err(|e| CameraError::Io(format!("Failed to open window: {}", e)))?;

            Ok(Self {
                device,
                label,
                window,
                options,
                closed: false,
            })
        }

        /// Release the view and hand the device back for teardown.
        pub fn into_device(self) -> Device {
            self.device
        }

        fn pressed_key(&self) -> Option<KeyPress> {
            if self.window.is_key_down(Key::Escape) {
                return Some(KeyPress::Escape);
            }
            if self.window.is_key_down(Key::Q) {
                return Some(KeyPress::Char('q'));
            }
            if self.window.is_key_pressed(Key::S, KeyRepeat::No) {
                return Some(KeyPress::Char('s'));
            }
            if self.window.is_key_pressed(Key::G, KeyRepeat::No) {
                return Some(KeyPress::Char('g'));
            }
            None
        }

        fn save_snapshot(&mut self, image: &ColorImage) -> Result<(), CameraError> {
            let path = self
                .options
                .save_dir
                .join(format!("color-{}.png", self.device.snapshot_counter));
            save_color_png(image, &path)?;
            log::info!("Saved color image for {} to {:?}", self.label, path);
            self.device.snapshot_counter += 1;
            Ok(())
        }
    }

    impl DeviceView for CameraView {
        fn label(&self) -> &str {
            &self.label
        }

        fn tick(&mut self, force_save: bool) -> Result<WindowEvent, CameraError> {
            if self.closed {
                return Ok(WindowEvent::None);
            }

            let label = self.label.clone();
            let pipeline = self
                .device
                .pipeline_mut()
                .ok_or(CameraError::NotStarted { device: label })?;

            let frames = capture_frameset(pipeline, self.options.wait_timeout)?;
            let color = frames.color.ok_or_else(|| CameraError::IncompleteFrame {
                device: self.label.clone(),
            })?;
            let color = if self.options.rotate_180 {
                super::rotate_180(&color)?
            } else {
                color
            };

            let buffer: Vec<u32> = color
                .data
                .chunks_exact(3)
                .map(|px| ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32)
                .collect();
            self.window
                .update_with_buffer(&buffer, color.width as usize, color.height as usize)
                .map_err(|e| CameraError::Io(format!("Failed to update window: {}", e)))?;

            if !self.window.is_open() {
                return Ok(WindowEvent::Exit);
            }

            let event = decode_key(self.pressed_key());
            if event == WindowEvent::Exit {
                return Ok(WindowEvent::Exit);
            }
            if event == WindowEvent::Save || force_save {
                self.save_snapshot(&color)?;
                return Ok(WindowEvent::Save);
            }
            Ok(event)
        }

        fn close(&mut self) {
            // minifb destroys the native window when the view drops; the
            // flag just stops further ticks from drawing to it.
            self.closed = true;
        }
    }
}
